//! A Bloom filter over pattern tuples, used to prune candidates before they are shuffled.
//!
//! The filter answers `possibly_contains` with false positives only: an inserted tuple always
//! tests positive, so discarding a negative never discards a real match.

use std::hash::Hasher;

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::tuple::PatternTuple;

// seeds for the two independent FNV streams combined by double hashing.
const SEED_A: u64 = 0xcbf2_9ce4_8422_2325;
const SEED_B: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    hashes: u32,
}

impl BloomFilter {
    /// Sizes a filter for `expected` insertions at the given false-positive rate.
    ///
    /// `false_positive_rate` is clamped into (0, 1); `PipelineConfig::validate` rejects
    /// out-of-range rates before a filter is ever built from configuration.
    pub fn with_rate(expected: usize, false_positive_rate: f64) -> BloomFilter {
        let rate = false_positive_rate.clamp(1e-12, 0.999_999);
        let n = expected.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let bits = (-(n * rate.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let hashes = ((bits as f64 / n) * ln2).round().clamp(1.0, 32.0) as u32;
        let words = ((bits + 63) / 64) as usize;
        BloomFilter { bits: vec![0; words], num_bits: words as u64 * 64, hashes }
    }

    /// Builds a filter holding every tuple in `tuples`.
    pub fn from_tuples<I>(tuples: I, false_positive_rate: f64) -> BloomFilter
    where
        I: IntoIterator<Item = PatternTuple>,
        I::IntoIter: ExactSizeIterator,
    {
        let tuples = tuples.into_iter();
        let mut filter = BloomFilter::with_rate(tuples.len(), false_positive_rate);
        for tuple in tuples {
            filter.insert(&tuple);
        }
        filter
    }

    pub fn insert(&mut self, tuple: &PatternTuple) {
        let (h1, h2) = self.hash(tuple);
        for round in 0..self.hashes as u64 {
            let bit = h1.wrapping_add(round.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    /// False means `tuple` was certainly never inserted.
    pub fn possibly_contains(&self, tuple: &PatternTuple) -> bool {
        let (h1, h2) = self.hash(tuple);
        (0..self.hashes as u64).all(|round| {
            let bit = h1.wrapping_add(round.wrapping_mul(h2)) % self.num_bits;
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    #[inline]
    pub fn num_bits(&self) -> u64 { self.num_bits }
    #[inline]
    pub fn hashes(&self) -> u32 { self.hashes }

    fn hash(&self, tuple: &PatternTuple) -> (u64, u64) {
        let mut a = FnvHasher::with_key(SEED_A);
        let mut b = FnvHasher::with_key(SEED_B);
        for &vertex in tuple.as_slice() {
            a.write_u64(vertex);
            b.write_u64(vertex.rotate_left(29));
        }
        // odd step, so the index sequence does not collapse onto one bit.
        (mix(a.finish()), mix(b.finish()) | 1)
    }
}

// murmur3 finalizer; FNV leaves the high bits of short inputs poorly mixed.
#[inline(always)]
fn mix(mut hash: u64) -> u64 {
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    hash ^ (hash >> 33)
}
