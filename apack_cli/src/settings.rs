//! Layered defaults: CLI flags override an optional `apack.toml` (or the
//! file named by `$APACK_CONFIG`), which overrides the built-in constants.
//! Nothing here touches archive bytes; by the time a value reaches
//! `apack_core`, layering is already resolved.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct FileDefaults {
    pub chunk_size_kib: Option<u32>,
    pub compression: Option<String>,
    pub level: Option<i32>,
    pub encryption: Option<String>,
}

pub fn load() -> anyhow::Result<FileDefaults> {
    let mut builder = config::Config::builder().add_source(config::File::with_name("apack").required(false));
    if let Ok(path) = std::env::var("APACK_CONFIG") {
        builder = builder.add_source(config::File::with_name(&path).required(false));
    }
    let built = builder.build()?;
    match built.try_deserialize() {
        Ok(defaults) => Ok(defaults),
        Err(config::ConfigError::NotFound(_)) => Ok(FileDefaults::default()),
        Err(e) => Err(e.into()),
    }
}
