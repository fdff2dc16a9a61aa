use apack_core::format::algorithm_ids;
use apack_core::providers::{ChecksumHasher, ChecksumProvider};

/// XXH3-64, truncated to 32 bits to fit the chunk header's `checksum32`
/// field. Faster than CRC-32 on large chunks at the cost of being a
/// non-cryptographic, non-standardized digest.
pub struct Xxh3Checksum;

impl ChecksumProvider for Xxh3Checksum {
    fn name(&self) -> &'static str {
        "xxh3-64"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::CHECKSUM_XXH3_64
    }

    fn compute(&self, data: &[u8]) -> u32 {
        xxhash_rust::xxh3::xxh3_64(data) as u32
    }

    fn hasher(&self) -> Box<dyn ChecksumHasher> {
        Box::new(Xxh3Hasher(xxhash_rust::xxh3::Xxh3::new()))
    }
}

struct Xxh3Hasher(xxhash_rust::xxh3::Xxh3);

impl ChecksumHasher for Xxh3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(&mut self) -> u32 {
        self.0.digest() as u32
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_matches_incremental() {
        let provider = Xxh3Checksum;
        let data = b"the quick brown fox";
        let one_shot = provider.compute(data);

        let mut hasher = provider.hasher();
        hasher.update(&data[..10]);
        hasher.update(&data[10..]);
        assert_eq!(hasher.finalize(), one_shot);
    }
}
