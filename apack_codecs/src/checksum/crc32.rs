use apack_core::format::algorithm_ids;
use apack_core::providers::{ChecksumHasher, ChecksumProvider};

/// CRC-32 (the `crc32fast` crate's default polynomial/implementation),
/// registered as the format's default checksum algorithm.
pub struct Crc32Checksum;

impl ChecksumProvider for Crc32Checksum {
    fn name(&self) -> &'static str {
        "crc32"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::CHECKSUM_CRC32
    }

    fn compute(&self, data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    fn hasher(&self) -> Box<dyn ChecksumHasher> {
        Box::new(Crc32Hasher(crc32fast::Hasher::new()))
    }
}

struct Crc32Hasher(crc32fast::Hasher);

impl ChecksumHasher for Crc32Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(&mut self) -> u32 {
        self.0.clone().finalize()
    }

    fn reset(&mut self) {
        self.0 = crc32fast::Hasher::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_matches_incremental() {
        let provider = Crc32Checksum;
        let data = b"the quick brown fox";
        let one_shot = provider.compute(data);

        let mut hasher = provider.hasher();
        hasher.update(&data[..10]);
        hasher.update(&data[10..]);
        assert_eq!(hasher.finalize(), one_shot);
    }
}
