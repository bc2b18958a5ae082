// argus is a distributed web search engine.
// Copyright (C) 2026 Argus Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A Bloom filter tuned for term membership tests ahead of an inverted-index lookup.
//!
//! Sizing follows the standard formulas for a target false-positive rate `p` and
//! an expected element count `n`:
//!
//! - `m = ceil(-n * ln(p) / ln(2)^2)` bits
//! - `k = ceil((m / n) * ln(2))` hash functions
//!
//! Membership uses double hashing (Kirsch/Mitzenmacher): a single 64-bit hash is
//! split into two halves and combined as `h1 + i * h2` for `i` in `0..k`, which
//! avoids computing `k` independent hashes per operation while keeping the
//! no-false-negatives guarantee.

use bitvec::vec::BitVec;

const XXH3_SECRET: &[u8] = &xxhash_rust::const_xxh3::const_custom_default_secret(42);

/// The platform-stable hash used to derive both `h1` and `h2`.
fn stable_hash(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64_with_secret(bytes, XXH3_SECRET)
}

fn num_bits(expected_elements: u64, false_positive_rate: f64) -> u64 {
    ((-(expected_elements as f64) * false_positive_rate.ln()) / std::f64::consts::LN_2.powi(2))
        .ceil() as u64
}

fn num_hashes(num_bits: u64, expected_elements: u64) -> u64 {
    (((num_bits as f64) / (expected_elements.max(1) as f64) * std::f64::consts::LN_2).ceil()
        as u64)
        .max(1)
}

/// A Bloom filter over byte-string keys (terms). False negatives are impossible:
/// once [`BloomFilter::insert`] has been called for `x`, [`BloomFilter::might_contain`]
/// always returns `true` for `x`.
#[derive(
    Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct BloomFilter {
    #[bincode(with_serde)]
    bits: BitVec,
    num_hashes: u64,
    expected_elements: u64,
    false_positive_rate: f64,
}

impl BloomFilter {
    pub fn new(expected_elements: u64, false_positive_rate: f64) -> Self {
        let m = num_bits(expected_elements, false_positive_rate).max(1);
        let k = num_hashes(m, expected_elements);

        Self {
            bits: BitVec::repeat(false, m as usize),
            num_hashes: k,
            expected_elements,
            false_positive_rate,
        }
    }

    /// A filter with the same dimensions as `other` but all bits cleared. Used
    /// when rebuilding a filter from scratch (e.g. from the inverted-index key set)
    /// without disturbing the sizing parameters learned from configuration.
    pub fn empty_like(other: &Self) -> Self {
        Self {
            bits: BitVec::repeat(false, other.bits.len()),
            num_hashes: other.num_hashes,
            expected_elements: other.expected_elements,
            false_positive_rate: other.false_positive_rate,
        }
    }

    fn indices(&self, item: &[u8]) -> impl Iterator<Item = usize> + '_ {
        let h1 = stable_hash(item);
        let h2 = h1 >> 16;
        let m = self.bits.len() as u64;

        (0..self.num_hashes).map(move |i| {
            let combined = h1.wrapping_add(i.wrapping_mul(h2));
            (combined % m) as usize
        })
    }

    pub fn insert<T: AsRef<[u8]>>(&mut self, item: T) {
        for idx in self.indices(item.as_ref()).collect::<Vec<_>>() {
            self.bits.set(idx, true);
        }
    }

    pub fn might_contain<T: AsRef<[u8]>>(&self, item: T) -> bool {
        self.indices(item.as_ref()).all(|idx| self.bits[idx])
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn num_hashes(&self) -> u64 {
        self.num_hashes
    }

    /// Number of set bits, used purely for reporting (`getCardinality` equivalent).
    pub fn cardinality(&self) -> usize {
        self.bits.count_ones()
    }

    /// Fraction of bits that are set, used purely for reporting.
    pub fn occupancy_rate(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.cardinality() as f64 / self.bits.len() as f64
    }
}

/// Rebuilds a filter with the same dimensions as `template` from a fresh set of keys.
/// Storage nodes use this instead of deserializing a persisted filter, since the
/// inverted index is always authoritative and rebuilding is both simpler and cheap.
pub fn rebuild_from_keys<'a, T: AsRef<[u8]> + 'a>(
    template: &BloomFilter,
    keys: impl IntoIterator<Item = &'a T>,
) -> BloomFilter {
    let mut filter = BloomFilter::empty_like(template);
    for key in keys {
        filter.insert(key);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let mut bf = BloomFilter::new(1_000, 0.01);
        let words = [
            "rust", "ferris", "tokio", "bloom", "filter", "inverted", "index", "crawl",
        ];

        for w in words {
            bf.insert(w.as_bytes());
        }

        for w in words {
            assert!(bf.might_contain(w.as_bytes()));
        }
    }

    #[test]
    fn absent_term_is_usually_rejected() {
        let mut bf = BloomFilter::new(1_000, 0.001);
        for i in 0..500 {
            bf.insert(format!("term-{i}").as_bytes());
        }

        assert!(!bf.might_contain(b"definitely-not-inserted-xyz"));
    }

    #[test]
    fn rebuild_matches_direct_insertion() {
        let template = BloomFilter::new(100, 0.01);
        let keys: Vec<String> = (0..20).map(|i| format!("key-{i}")).collect();

        let rebuilt = rebuild_from_keys(&template, keys.iter());

        for k in &keys {
            assert!(rebuilt.might_contain(k.as_bytes()));
        }
    }

    #[test]
    fn empty_like_preserves_dimensions() {
        let mut bf = BloomFilter::new(500, 0.02);
        bf.insert(b"anything");
        let empty = BloomFilter::empty_like(&bf);

        assert_eq!(empty.num_bits(), bf.num_bits());
        assert_eq!(empty.num_hashes(), bf.num_hashes());
        assert_eq!(empty.cardinality(), 0);
    }

    #[test]
    fn sizing_matches_formula() {
        let bf = BloomFilter::new(10_000, 0.01);
        let expected_m = ((-(10_000f64) * 0.01f64.ln()) / std::f64::consts::LN_2.powi(2)).ceil();
        assert_eq!(bf.num_bits(), expected_m as usize);
    }
}
