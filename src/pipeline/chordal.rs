//! Chordal squares in two stages.
//!
//! Twin-twigs are grouped by their outer pair `(x, y)`. Every two centers `v < w` of one group
//! form a candidate square `v - x - w - y` whose chord would be `(x, y)`, so candidates stay
//! keyed by the outer pair. The second stage joins candidates with the edge set on that key: a
//! surviving candidate has the chord `x - y` and is reported as `[v, x, w, y]`.
//!
//! With pruning, twin-twigs whose outer pair fails the edge oracle are never emitted, as no
//! candidate built on them could survive the join.

use std::sync::Arc;

use tracing::info;

use crate::adjacency::VertexId;
use crate::artifact::ArtifactStore;
use crate::engine::{splits, Engine, Job, StageContext};
use crate::error::Error;
use crate::graph::Graph;
use crate::join::merge_join;
use crate::tuple::{PatternTuple, SignedKey};

use super::{as_candidates, by_tuple, edges_as_reference, twin_twigs, Output, Pipeline};

pub const CANDIDATES: &str = "chordal-square.candidates";
pub const CHORDS: &str = "chordal-square.chords";

impl<E: Engine, S: ArtifactStore> Pipeline<E, S> {
    pub(super) fn chordal_square(&self, graph: &Graph) -> Result<Output, Error> {
        let parts = self.config.reducers;
        let records = Arc::new(graph.adjacency_records(self.config.max_size)?);
        let edges = Arc::new(graph.edge_list());
        info!(records = records.len(), edges = edges.len(), "chordal square inputs ready");

        let oracle = self.edge_oracle(CANDIDATES)?;
        let candidates = self.engine.run(Job {
            name: CANDIDATES,
            context: self.context(CANDIDATES, oracle),
            inputs: splits(records, parts, twin_twigs),
            shuffle: by_tuple(),
            reduce: pair_centers,
        })?;
        info!(stage = CANDIDATES, candidates = candidates.len(), "candidate squares built");

        let mut inputs = splits(edges, parts, edges_as_reference);
        inputs.extend(splits(Arc::new(candidates), parts, as_candidates));
        self.finish(CHORDS, self.context(CHORDS, None), inputs, close_chord)
    }
}

/// For one outer pair, every two centers, still keyed by the outer pair.
pub fn pair_centers(
    _: &StageContext,
    group: &[(PatternTuple, VertexId)],
    emit: &mut Vec<(PatternTuple, PatternTuple)>,
) -> Result<(), Error> {
    let outer = match group.first() {
        Some(&(outer, _)) => outer,
        None => return Ok(()),
    };
    for (index, &(_, v)) in group.iter().enumerate() {
        for &(_, w) in &group[index + 1..] {
            emit.push((outer, PatternTuple::pair(v, w)));
        }
    }
    Ok(())
}

/// Joins the chord's edge record with each pair of centers waiting on it.
pub fn close_chord(
    _: &StageContext,
    group: &[(SignedKey, PatternTuple)],
    emit: &mut Vec<PatternTuple>,
) -> Result<(), Error> {
    let chord = match group.first() {
        Some((key, _)) => key.key,
        None => return Ok(()),
    };
    merge_join(group, |_, wings| {
        emit.push(PatternTuple::new(&[wings.first(), chord.first(), wings.second(), chord.second()]));
    })?;
    Ok(())
}
