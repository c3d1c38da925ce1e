use std::io::Cursor;
use std::num::NonZeroU32;

use murmur3::murmur3_32;

/// Hashes feature names to signed 32-bit values.
pub trait FeatureHashFunction {
    fn hash_signed(&self, name: &[u8]) -> i32;
}

/// MurmurHash3 (x86, 32-bit) with the output read as a signed integer.
///
/// With the default seed of 0 this matches `mmh3.hash(name)`, so columns agree
/// with other hashing-trick implementations built on the same hash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Murmur3Hasher {
    /// Seed value for MurmurHash3 (typically 0).
    pub seed: u32,
}

impl FeatureHashFunction for Murmur3Hasher {
    fn hash_signed(&self, name: &[u8]) -> i32 {
        let hash = murmur3_32(&mut Cursor::new(name), self.seed)
            .expect("murmur3_32 should not fail on in-memory data");
        hash as i32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    pub fn of(hash: i32) -> Self {
        if hash >= 0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        match self {
            Sign::Positive => value,
            Sign::Negative => -value,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Sign::Positive => 1,
            Sign::Negative => -1,
        }
    }
}

/// Where a feature lands: its output column and the sign of its contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HashedFeature {
    pub column: u32,
    pub sign: Sign,
}

impl HashedFeature {
    /// Folds a signed hash into `[0, n_features)`.
    ///
    /// `i32::MIN` has no positive counterpart; its magnitude is taken as its own
    /// bit pattern, 2^31, before reduction.
    pub fn from_hash(hash: i32, n_features: NonZeroU32) -> Self {
        Self {
            column: hash.unsigned_abs() % n_features.get(),
            sign: Sign::of(hash),
        }
    }
}

/// Derives the column and sign of `name` with the seed-0 MurmurHash3.
pub fn derive(name: &[u8], n_features: NonZeroU32) -> HashedFeature {
    derive_with(&Murmur3Hasher::default(), name, n_features)
}

pub fn derive_with<H: FeatureHashFunction + ?Sized>(
    hasher: &H,
    name: &[u8],
    n_features: NonZeroU32,
) -> HashedFeature {
    HashedFeature::from_hash(hasher.hash_signed(name), n_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    #[test]
    fn test_murmur3_reference_values() {
        let hasher = Murmur3Hasher::default();
        assert_eq!(hasher.hash_signed(b""), 0);
        assert_eq!(hasher.hash_signed(b"hello"), 613153351);
        assert_eq!(hasher.hash_signed(b"dog"), -1312749093);
        assert_eq!(hasher.hash_signed(b"cat"), 1751422759);
    }

    #[test]
    fn test_derive_columns_and_signs() {
        assert_eq!(
            derive(b"dog", n(10)),
            HashedFeature {
                column: 3,
                sign: Sign::Negative
            }
        );
        assert_eq!(
            derive(b"cat", n(10)),
            HashedFeature {
                column: 9,
                sign: Sign::Positive
            }
        );
        assert_eq!(
            derive(b"elephant", n(10)),
            HashedFeature {
                column: 2,
                sign: Sign::Negative
            }
        );
        assert_eq!(derive("a".as_bytes(), n(5)).column, 0);
        assert_eq!(derive("z".as_bytes(), n(5)).column, 0);
    }

    #[test]
    fn test_min_hash_wraps_to_its_bit_pattern() {
        let hashed = HashedFeature::from_hash(i32::MIN, n(10));
        assert_eq!(hashed.sign, Sign::Negative);
        assert_eq!(hashed.column, (1u32 << 31) % 10);

        let max = HashedFeature::from_hash(i32::MAX, n(u32::MAX));
        assert_eq!(max.column, i32::MAX as u32);
        assert_eq!(max.sign, Sign::Positive);
    }

    #[test]
    fn test_seed_changes_hash() {
        let seeded = Murmur3Hasher { seed: 42 };
        assert_ne!(
            seeded.hash_signed(b"dog"),
            Murmur3Hasher::default().hash_signed(b"dog")
        );
    }

    #[test]
    fn test_sign_apply() {
        assert_eq!(Sign::Positive.apply(2.0), 2.0);
        assert_eq!(Sign::Negative.apply(2.0), -2.0);
        assert_eq!(Sign::of(0), Sign::Positive);
        assert_eq!(Sign::of(-1).as_i32(), -1);
    }
}
