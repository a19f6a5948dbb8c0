//! Twin-twig generation: pairs of neighbors of one vertex, with that vertex as their center.
//!
//! A twin-twig `a - center - b` is the two-edge fragment every larger pattern is assembled from.
//! One adjacency record produces the twin-twigs its neighbor groups are responsible for:
//!
//!   1. pairs within `higher`, from the canonical record only;
//!   2. pairs of a `lower_b` neighbor with a `higher` neighbor, when `lower_a` is empty;
//!   3. pairs within `lower_b` when `lower_a` is empty, and across `lower_a` and `lower_b`
//!      otherwise.
//!
//! Over all records of a vertex, each unordered pair of its neighbors is produced exactly once.

use crate::adjacency::{AdjacencyRecord, VertexId};
use crate::bloom::BloomFilter;
use crate::tuple::PatternTuple;

/// Two outer vertices (a canonical pair) and the center adjacent to both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TwinTwig {
    pub pair: PatternTuple,
    pub center: VertexId,
}

impl TwinTwig {
    /// The twin-twig keyed as `(center, a, b)`.
    #[inline]
    pub fn centered(&self) -> PatternTuple {
        PatternTuple::headed_pair(self.center, self.pair.first(), self.pair.second())
    }
}

/// How candidates are tested against an oracle before they are emitted.
#[derive(Clone, Copy, Debug, Default)]
pub enum Pruning<'a> {
    #[default]
    None,
    /// Keep a twin-twig only if its outer pair may be in the oracle.
    Pair(&'a BloomFilter),
    /// Keep a twin-twig only if `(center, a, b)` may be in the oracle.
    Centered(&'a BloomFilter),
}

impl<'a> Pruning<'a> {
    #[inline]
    fn keep(&self, twig: &TwinTwig) -> bool {
        match self {
            Pruning::None => true,
            Pruning::Pair(oracle) => oracle.possibly_contains(&twig.pair),
            Pruning::Centered(oracle) => oracle.possibly_contains(&twig.centered()),
        }
    }
}

pub struct TwinTwigGenerator<'a> {
    record: &'a AdjacencyRecord,
    pruning: Pruning<'a>,
}

impl<'a> TwinTwigGenerator<'a> {
    pub fn new(record: &'a AdjacencyRecord) -> Self { TwinTwigGenerator { record, pruning: Pruning::None } }

    pub fn pruned(self, pruning: Pruning<'a>) -> Self { TwinTwigGenerator { pruning, ..self } }

    /// Pairs within `higher`; canonical records only.
    pub fn twin_twig_one<F: FnMut(TwinTwig)>(&self, emit: &mut F) -> usize {
        if !self.record.is_canonical() {
            return 0;
        }
        let higher = self.record.higher();
        let mut emitted = 0;
        for i in 0..higher.len() {
            for j in (i + 1)..higher.len() {
                emitted += self.offer(higher[i], higher[j], emit);
            }
        }
        emitted
    }

    /// A `lower_b` neighbor with each `higher` neighbor, when `lower_a` is empty.
    pub fn twin_twig_two<F: FnMut(TwinTwig)>(&self, emit: &mut F) -> usize {
        if !self.record.lower_a().is_empty() {
            return 0;
        }
        let mut emitted = 0;
        for &low in self.record.lower_b() {
            for &high in self.record.higher() {
                emitted += self.offer(low, high, emit);
            }
        }
        emitted
    }

    /// Pairs within `lower_b` when `lower_a` is empty, else across the two lower groups.
    pub fn twin_twig_three<F: FnMut(TwinTwig)>(&self, emit: &mut F) -> usize {
        let lower_a = self.record.lower_a();
        let lower_b = self.record.lower_b();
        let mut emitted = 0;
        if lower_a.is_empty() {
            for i in 0..lower_b.len() {
                for k in (i + 1)..lower_b.len() {
                    emitted += self.offer(lower_b[i], lower_b[k], emit);
                }
            }
        } else {
            for &a in lower_a {
                for &b in lower_b {
                    emitted += self.offer(a, b, emit);
                }
            }
        }
        emitted
    }

    /// All three cases; returns the number of twin-twigs emitted.
    pub fn generate<F: FnMut(TwinTwig)>(&self, mut emit: F) -> usize {
        self.twin_twig_one(&mut emit) + self.twin_twig_two(&mut emit) + self.twin_twig_three(&mut emit)
    }

    #[inline]
    fn offer<F: FnMut(TwinTwig)>(&self, a: VertexId, b: VertexId, emit: &mut F) -> usize {
        let twig = TwinTwig { pair: PatternTuple::pair(a, b), center: self.record.owner() };
        if self.pruning.keep(&twig) {
            emit(twig);
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn collect(record: &AdjacencyRecord, pruning: Pruning) -> Vec<TwinTwig> {
        let mut out = Vec::new();
        TwinTwigGenerator::new(record).pruned(pruning).generate(|t| out.push(t));
        out.sort();
        out
    }

    #[test]
    fn cases_follow_neighbor_groups() {
        let record = AdjacencyRecord::new(10, true, vec![20, 30], vec![], vec![1, 2]).unwrap();
        let pairs: Vec<_> = collect(&record, Pruning::None).iter().map(|t| t.pair).collect();
        assert_eq!(
            pairs,
            vec![
                PatternTuple::pair(1, 2),
                PatternTuple::pair(1, 20),
                PatternTuple::pair(1, 30),
                PatternTuple::pair(2, 20),
                PatternTuple::pair(2, 30),
                PatternTuple::pair(20, 30),
            ]
        );

        // non-canonical cross-chunk record: only pairs across the lower groups.
        let record = AdjacencyRecord::new(10, false, vec![20, 30], vec![1], vec![2, 3]).unwrap();
        let twigs = collect(&record, Pruning::None);
        assert_eq!(twigs.len(), 2);
        assert!(twigs.iter().all(|t| t.center == 10));
    }

    #[test]
    fn every_wedge_exactly_once_across_chunks() {
        // a star with 9 leaves, plus edges between leaves to raise some leaf degrees.
        let mut edges: Vec<(u64, u64)> = (1..10).map(|leaf| (0, leaf)).collect();
        edges.extend([(1, 2), (2, 3), (3, 4)]);
        let graph = Graph::from_edges(edges).unwrap();

        for max_size in [1, 2, 4, 100] {
            let mut twigs = Vec::new();
            for record in graph.adjacency_records(max_size).unwrap() {
                TwinTwigGenerator::new(&record).generate(|t| twigs.push(t));
            }
            twigs.sort();
            let total = twigs.len();
            twigs.dedup();
            assert_eq!(total, twigs.len(), "duplicates with max_size {}", max_size);

            let expected: usize = graph.vertices().iter().map(|&v| {
                let d = graph.degree(v);
                d * (d - 1) / 2
            }).sum();
            assert_eq!(total, expected, "wedges with max_size {}", max_size);
        }
    }

    #[test]
    fn pruning_discards_absent_pairs() {
        let record = AdjacencyRecord::new(10, true, vec![20, 30], vec![], vec![1]).unwrap();
        let oracle = BloomFilter::from_tuples(vec![PatternTuple::pair(20, 30)], 0.0001);
        let twigs = collect(&record, Pruning::Pair(&oracle));
        assert_eq!(twigs, vec![TwinTwig { pair: PatternTuple::pair(20, 30), center: 10 }]);

        let oracle = BloomFilter::from_tuples(vec![PatternTuple::headed_pair(10, 30, 1)], 0.0001);
        let twigs = collect(&record, Pruning::Centered(&oracle));
        assert_eq!(twigs, vec![TwinTwig { pair: PatternTuple::pair(1, 30), center: 10 }]);
    }
}
