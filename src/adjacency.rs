//! Degree-oriented adjacency records, the input of every pipeline's first stage.
//!
//! A record belongs to one `owner` and splits its neighbors by orientation rank: those ranked
//! above the owner, and two disjoint groups of those ranked below. High-degree vertices have
//! their lower-ranked neighbors cut into chunks, and one record is written per chunk and per
//! pair of chunks, so that the quadratic work of pairing neighbors is spread over many records
//! while each unordered pair of neighbors is still covered by exactly one record.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Globally unique vertex identifier.
pub type VertexId = u64;

/// Orientation rank: degree first, ties broken by identifier.
pub type Rank = (usize, VertexId);

/// Neighbors of one vertex, partitioned by orientation rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    owner: VertexId,
    canonical: bool,
    higher: Vec<VertexId>,
    lower_a: Vec<VertexId>,
    lower_b: Vec<VertexId>,
}

impl AdjacencyRecord {
    /// Validates and assembles a record.
    ///
    /// Each list must be strictly ascending, no list may contain `owner`, and no neighbor may
    /// appear in more than one list. Violations are errors rather than silent drops, as a
    /// dropped neighbor would silently change pattern counts.
    pub fn new(
        owner: VertexId,
        canonical: bool,
        higher: Vec<VertexId>,
        lower_a: Vec<VertexId>,
        lower_b: Vec<VertexId>,
    ) -> Result<Self, Error> {
        for (name, list) in [("higher", &higher), ("lower_a", &lower_a), ("lower_b", &lower_b)] {
            if list.contains(&owner) {
                return Err(invalid(owner, "self loop".to_string()));
            }
            if let Some(pair) = list.windows(2).find(|pair| pair[0] >= pair[1]) {
                let reason = if pair[0] == pair[1] {
                    format!("duplicate neighbor {} in {}", pair[0], name)
                } else {
                    format!("{} not ascending at {} > {}", name, pair[0], pair[1])
                };
                return Err(invalid(owner, reason));
            }
        }

        let mut all = Vec::with_capacity(higher.len() + lower_a.len() + lower_b.len());
        all.extend_from_slice(&higher);
        all.extend_from_slice(&lower_a);
        all.extend_from_slice(&lower_b);
        all.sort_unstable();
        if let Some(pair) = all.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(invalid(owner, format!("neighbor {} appears in two groups", pair[0])));
        }

        Ok(AdjacencyRecord { owner, canonical, higher, lower_a, lower_b })
    }

    /// Cuts the lower-ranked neighbors into chunks of at most `max_size` and writes one record
    /// per chunk and one per pair of chunks. Only the first record is canonical.
    ///
    /// `higher` and `lower` must already be oriented with respect to `owner`.
    pub fn chunked(
        owner: VertexId,
        higher: &[VertexId],
        lower: &[VertexId],
        max_size: usize,
    ) -> Result<Vec<Self>, Error> {
        if max_size == 0 {
            return Err(Error::Config("max_size must be positive".to_string()));
        }

        let chunks: Vec<&[VertexId]> = lower.chunks(max_size).collect();
        let mut records = Vec::with_capacity(1 + chunks.len() * (chunks.len() + 1) / 2);

        if chunks.is_empty() {
            records.push(AdjacencyRecord::new(owner, true, higher.to_vec(), Vec::new(), Vec::new())?);
        }
        for (index, chunk) in chunks.iter().enumerate() {
            records.push(AdjacencyRecord::new(owner, index == 0, higher.to_vec(), Vec::new(), chunk.to_vec())?);
        }
        for i in 0..chunks.len() {
            for j in (i + 1)..chunks.len() {
                records.push(AdjacencyRecord::new(owner, false, higher.to_vec(), chunks[i].to_vec(), chunks[j].to_vec())?);
            }
        }

        Ok(records)
    }

    /// Checks that every neighbor sits on the correct side of `owner` under `rank`.
    pub fn check_orientation<R>(&self, rank: R) -> Result<(), Error>
    where
        R: Fn(VertexId) -> Rank,
    {
        let own = rank(self.owner);
        if let Some(&bad) = self.higher.iter().find(|&&v| rank(v) <= own) {
            return Err(invalid(self.owner, format!("{} is not ranked above the owner", bad)));
        }
        let lower = self.lower_a.iter().chain(self.lower_b.iter());
        if let Some(&bad) = lower.into_iter().find(|&&v| rank(v) >= own) {
            return Err(invalid(self.owner, format!("{} is not ranked below the owner", bad)));
        }
        Ok(())
    }

    #[inline]
    pub fn owner(&self) -> VertexId { self.owner }
    /// True for the one record per owner allowed to pair higher-ranked neighbors.
    #[inline]
    pub fn is_canonical(&self) -> bool { self.canonical }
    #[inline]
    pub fn higher(&self) -> &[VertexId] { &self.higher }
    #[inline]
    pub fn lower_a(&self) -> &[VertexId] { &self.lower_a }
    #[inline]
    pub fn lower_b(&self) -> &[VertexId] { &self.lower_b }
}

fn invalid(owner: VertexId, reason: String) -> Error {
    Error::InvalidAdjacency { owner, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loop() {
        let err = AdjacencyRecord::new(3, true, vec![4, 5], vec![], vec![3]).unwrap_err();
        assert!(matches!(err, Error::InvalidAdjacency { owner: 3, .. }));
    }

    #[test]
    fn rejects_duplicate_neighbor() {
        assert!(AdjacencyRecord::new(1, true, vec![4, 4], vec![], vec![]).is_err());
        assert!(AdjacencyRecord::new(1, true, vec![4], vec![], vec![4]).is_err());
        assert!(AdjacencyRecord::new(1, true, vec![5, 4], vec![], vec![]).is_err());
    }

    #[test]
    fn orientation_is_checked_against_rank() {
        // rank by identifier alone.
        let records = AdjacencyRecord::chunked(5, &[7, 9], &[1, 2], 4).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].check_orientation(|v| (0, v)).is_ok());
        assert!(records[0].check_orientation(|v| (0, u64::MAX - v)).is_err());

        let swapped = AdjacencyRecord::new(5, true, vec![1], vec![], vec![7]).unwrap();
        assert!(matches!(swapped.check_orientation(|v| (0, v)), Err(Error::InvalidAdjacency { owner: 5, .. })));
    }

    #[test]
    fn chunks_cover_each_pair_once() {
        let lower: Vec<VertexId> = (0..7).collect();
        let records = AdjacencyRecord::chunked(100, &[200, 300], &lower, 3).unwrap();
        // chunks {0,1,2} {3,4,5} {6}: three single-chunk records and three cross records.
        assert_eq!(records.len(), 6);
        assert_eq!(records.iter().filter(|r| r.is_canonical()).count(), 1);

        let mut pairs = Vec::new();
        for record in &records {
            if record.lower_a().is_empty() {
                let b = record.lower_b();
                for i in 0..b.len() {
                    for j in (i + 1)..b.len() {
                        pairs.push((b[i], b[j]));
                    }
                }
            } else {
                for &a in record.lower_a() {
                    for &b in record.lower_b() {
                        pairs.push((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs.sort();
        let before = pairs.len();
        pairs.dedup();
        assert_eq!(before, pairs.len());
        assert_eq!(pairs.len(), 7 * 6 / 2);
    }

    #[test]
    fn no_lower_neighbors_still_yields_a_record() {
        let records = AdjacencyRecord::chunked(1, &[2, 3], &[], 4).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_canonical());
        assert_eq!(records[0].higher(), &[2, 3]);
    }
}
