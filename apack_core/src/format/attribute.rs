use crate::byteio::{ByteReader, ByteWriter};
use crate::error::{ApackError, Result};
use std::io::{Read, Write};

const VALUE_TYPE_STRING: u8 = 0;
const VALUE_TYPE_I64: u8 = 1;
const VALUE_TYPE_BOOL: u8 = 2;
const VALUE_TYPE_BYTES: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    I64(i64),
    Bool(bool),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn write_to<W: Write>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_str_u16(&self.key)?;
        match &self.value {
            AttributeValue::String(s) => {
                w.write_u8(VALUE_TYPE_STRING)?;
                w.write_bytes_u32(s.as_bytes())?;
            }
            AttributeValue::I64(v) => {
                w.write_u8(VALUE_TYPE_I64)?;
                w.write_i64(*v)?;
            }
            AttributeValue::Bool(v) => {
                w.write_u8(VALUE_TYPE_BOOL)?;
                w.write_u8(*v as u8)?;
            }
            AttributeValue::Bytes(b) => {
                w.write_u8(VALUE_TYPE_BYTES)?;
                w.write_bytes_u32(b)?;
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut ByteReader<R>) -> Result<Self> {
        let key = r.read_str_u16()?;
        let value_type = r.read_u8()?;
        let value = match value_type {
            VALUE_TYPE_STRING => {
                let bytes = r.read_bytes_u32()?;
                AttributeValue::String(
                    String::from_utf8(bytes).map_err(|e| ApackError::format(format!("invalid UTF-8 attribute value: {e}")))?,
                )
            }
            VALUE_TYPE_I64 => AttributeValue::I64(r.read_i64()?),
            VALUE_TYPE_BOOL => AttributeValue::Bool(r.read_u8()? != 0),
            VALUE_TYPE_BYTES => AttributeValue::Bytes(r.read_bytes_u32()?),
            other => return Err(ApackError::format(format!("unknown attribute value type {other}"))),
        };
        Ok(Self { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_all_value_types() {
        let attrs = vec![
            Attribute {
                key: "mime-hint".into(),
                value: AttributeValue::String("text/plain".into()),
            },
            Attribute {
                key: "mtime".into(),
                value: AttributeValue::I64(-1),
            },
            Attribute {
                key: "executable".into(),
                value: AttributeValue::Bool(true),
            },
            Attribute {
                key: "thumbnail".into(),
                value: AttributeValue::Bytes(vec![1, 2, 3, 4]),
            },
        ];

        let mut w = ByteWriter::new(Vec::new());
        for a in &attrs {
            a.write_to(&mut w).unwrap();
        }
        let buf = w.into_inner();

        let mut r = ByteReader::new(Cursor::new(buf));
        for expected in &attrs {
            let parsed = Attribute::read_from(&mut r).unwrap();
            assert_eq!(&parsed, expected);
        }
    }
}
