//! Pattern tuples and sign-tagged shuffle keys.
//!
//! Every stage ships its records as `(key, payload)` pairs. A plain grouping stage keys by
//! `PatternTuple`; a join stage keys by `SignedKey`, whose ordering sorts the reference side
//! (`Sign::Small`) ahead of the candidate side (`Sign::Large`) while its grouping ignores the sign.
//! Handing those two functions to a single-key shuffle is what turns it into a merge join.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::adjacency::VertexId;

/// Largest pattern assembled by any pipeline.
pub const MAX_SLOTS: usize = 5;

/// An ordered sequence of up to five vertices: an edge, a twin-twig, or a complete pattern.
///
/// Two-slot tuples built with `pair` are canonical (smaller vertex first), so a pair
/// compares and hashes the same regardless of the order it was generated in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternTuple {
    len: u8,
    slots: [VertexId; MAX_SLOTS],
}

impl PatternTuple {
    /// The empty tuple, used as a payload carrying no vertices.
    pub const EMPTY: PatternTuple = PatternTuple { len: 0, slots: [0; MAX_SLOTS] };

    /// Copies `vertices` in order.
    ///
    /// # Panics
    ///
    /// Panics if more than `MAX_SLOTS` vertices are supplied.
    pub fn new(vertices: &[VertexId]) -> PatternTuple {
        assert!(vertices.len() <= MAX_SLOTS, "pattern tuple holds at most {} vertices", MAX_SLOTS);
        let mut slots = [0; MAX_SLOTS];
        slots[..vertices.len()].copy_from_slice(vertices);
        PatternTuple { len: vertices.len() as u8, slots }
    }

    /// A one-slot tuple.
    #[inline]
    pub fn single(vertex: VertexId) -> PatternTuple { PatternTuple::new(&[vertex]) }

    /// The canonical pair: smaller vertex first.
    #[inline]
    pub fn pair(a: VertexId, b: VertexId) -> PatternTuple {
        if a <= b { PatternTuple::new(&[a, b]) } else { PatternTuple::new(&[b, a]) }
    }

    /// `head` followed by the canonical pair of `a` and `b`.
    #[inline]
    pub fn headed_pair(head: VertexId, a: VertexId, b: VertexId) -> PatternTuple {
        let pair = PatternTuple::pair(a, b);
        PatternTuple::new(&[head, pair.first(), pair.second()])
    }

    /// Returns the canonical form of a two-slot tuple; other lengths are returned unchanged.
    pub fn canonical(self) -> PatternTuple {
        if self.len == 2 { PatternTuple::pair(self.slots[0], self.slots[1]) } else { self }
    }

    #[inline]
    pub fn len(&self) -> usize { self.len as usize }
    #[inline]
    pub fn is_empty(&self) -> bool { self.len == 0 }
    #[inline]
    pub fn as_slice(&self) -> &[VertexId] { &self.slots[..self.len as usize] }
    #[inline]
    pub fn get(&self, index: usize) -> Option<VertexId> { self.as_slice().get(index).copied() }

    // accessors for the short tuples stages shuffle; callers know the arity.
    #[inline]
    pub fn first(&self) -> VertexId { self.slots[0] }
    #[inline]
    pub fn second(&self) -> VertexId { self.slots[1] }
    #[inline]
    pub fn last(&self) -> VertexId { self.slots[(self.len as usize).saturating_sub(1)] }

    /// FNV hash of the occupied slots.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        for &vertex in self.as_slice() {
            hasher.write_u64(vertex);
        }
        hasher.finish()
    }
}

impl Ord for PatternTuple {
    fn cmp(&self, other: &Self) -> Ordering { self.as_slice().cmp(other.as_slice()) }
}

impl PartialOrd for PatternTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Debug for PatternTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_list().entries(self.as_slice()).finish() }
}

impl fmt::Display for PatternTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.as_slice()) }
}

/// Which side of a join a shuffled record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// The reference side, delivered first within a group.
    Small,
    /// The candidate side.
    Large,
}

/// A join key tagged with its side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedKey {
    pub key: PatternTuple,
    pub sign: Sign,
}

impl SignedKey {
    #[inline]
    pub fn small(key: PatternTuple) -> SignedKey { SignedKey { key, sign: Sign::Small } }
    #[inline]
    pub fn large(key: PatternTuple) -> SignedKey { SignedKey { key, sign: Sign::Large } }
}

/// Orders by key, then SMALL before LARGE.
pub fn compare_signed(a: &SignedKey, b: &SignedKey) -> Ordering {
    a.key.cmp(&b.key).then(a.sign.cmp(&b.sign))
}

/// Same reduce group iff the keys match, whatever the signs.
pub fn same_group_signed(a: &SignedKey, b: &SignedKey) -> bool { a.key == b.key }

/// Routes by key alone, so both sides of a group meet at one reducer.
pub fn partition_signed(key: &SignedKey) -> u64 { key.key.fingerprint() }

pub fn compare_tuples(a: &PatternTuple, b: &PatternTuple) -> Ordering { a.cmp(b) }

pub fn same_group_tuples(a: &PatternTuple, b: &PatternTuple) -> bool { a == b }

pub fn partition_tuples(key: &PatternTuple) -> u64 { key.fingerprint() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_canonical() {
        assert_eq!(PatternTuple::pair(7, 3), PatternTuple::pair(3, 7));
        assert_eq!(PatternTuple::pair(7, 3).as_slice(), &[3, 7]);
        assert_eq!(PatternTuple::new(&[9, 2]).canonical(), PatternTuple::pair(2, 9));
        assert_eq!(PatternTuple::pair(7, 3).fingerprint(), PatternTuple::new(&[3, 7]).fingerprint());
    }

    #[test]
    fn headed_pair_keeps_head() {
        let tuple = PatternTuple::headed_pair(5, 9, 1);
        assert_eq!(tuple.as_slice(), &[5, 1, 9]);
        assert_eq!(tuple.last(), 9);
    }

    #[test]
    fn lexicographic_order() {
        assert!(PatternTuple::pair(1, 9) < PatternTuple::pair(2, 3));
        assert!(PatternTuple::new(&[1]) < PatternTuple::new(&[1, 0]));
        assert!(PatternTuple::EMPTY < PatternTuple::single(0));
    }

    #[test]
    fn small_sorts_before_large_within_a_key() {
        let pair = PatternTuple::pair(1, 2);
        let mut keys = vec![
            SignedKey::large(pair),
            SignedKey::small(PatternTuple::pair(1, 3)),
            SignedKey::small(pair),
            SignedKey::large(PatternTuple::pair(0, 5)),
        ];
        keys.sort_by(compare_signed);
        assert_eq!(keys[0], SignedKey::large(PatternTuple::pair(0, 5)));
        assert_eq!(keys[1], SignedKey::small(pair));
        assert_eq!(keys[2], SignedKey::large(pair));
        assert!(same_group_signed(&keys[1], &keys[2]));
        assert!(!same_group_signed(&keys[2], &keys[3]));
        assert_eq!(partition_signed(&keys[1]), partition_signed(&keys[2]));
    }
}
