//! Solar squares in three stages.
//!
//! 1. Twin-twigs grouped by outer pair yield every four-cycle, once, keyed by the diagonal that
//!    holds the cycle's smallest vertex: `(x, y)` with the opposite corners `(v, w)` as payload.
//! 2. Joining cycles with twin-twigs on `(x, y)` attaches every hub `h` adjacent to `x` and `y`,
//!    giving partial patterns keyed `(h, v, w)`.
//! 3. Joining partials with twin-twigs keyed `(center, a, b)` confirms the spokes `h - v` and
//!    `h - w`, and reports `[h, x, v, y, w]`.
//!
//! With pruning, stage 2 tests both remaining spokes against the edge oracle, and stage 3's
//! twin-twigs are tested against an oracle built from stage 2's keys, which lives only for the
//! duration of the run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adjacency::{AdjacencyRecord, VertexId};
use crate::artifact::{load_oracle, publish_oracle, ArtifactStore, OracleKind};
use crate::engine::{splits, Engine, Job, StageContext};
use crate::error::Error;
use crate::graph::Graph;
use crate::join::merge_join;
use crate::tuple::{PatternTuple, SignedKey};
use crate::twintwig::{Pruning, TwinTwigGenerator};

use super::{as_candidates, by_tuple, signed, twin_twigs, Output, Pipeline};

pub const CYCLES: &str = "solar-square.cycles";
pub const HUBS: &str = "solar-square.hubs";
pub const SPOKES: &str = "solar-square.spokes";

impl<E: Engine, S: ArtifactStore> Pipeline<E, S> {
    pub(super) fn solar_square(&self, graph: &Graph) -> Result<Output, Error> {
        let parts = self.config.reducers;
        let records = Arc::new(graph.adjacency_records(self.config.max_size)?);
        info!(records = records.len(), "solar square inputs ready");

        let oracle = self.edge_oracle(HUBS)?;
        let cycles = self.engine.run(Job {
            name: CYCLES,
            context: self.context(CYCLES, None),
            inputs: splits(records.clone(), parts, twin_twigs),
            shuffle: by_tuple(),
            reduce: four_cycles,
        })?;
        info!(stage = CYCLES, cycles = cycles.len(), "four-cycles built");

        let mut inputs = splits(records.clone(), parts, hubs_as_reference);
        inputs.extend(splits(Arc::new(cycles), parts, as_candidates));
        let partials = self.engine.run(Job {
            name: HUBS,
            context: self.context(HUBS, oracle),
            inputs,
            shuffle: signed(),
            reduce: attach_hubs,
        })?;
        info!(stage = HUBS, partials = partials.len(), "hubs attached");

        // the closing stage's oracle is built from validated partials only.
        let mut published = None;
        let mut oracle = None;
        if self.config.pruning.enabled {
            if partials.is_empty() {
                warn!(stage = SPOKES, "no partial patterns survived; the oracle is empty");
            }
            let name = self.config.oracle_name(OracleKind::SolarPartial);
            let keys: Vec<PatternTuple> = partials.iter().map(|partial| partial.0).collect();
            published = Some(publish_oracle(&self.store, &name, &keys).map_err(|e| e.in_stage(SPOKES))?);
            oracle = Some(Arc::new(load_oracle(&self.store, &name).map_err(|e| e.in_stage(SPOKES))?));
        }

        let mut inputs = splits(records, parts, spokes_as_reference);
        inputs.extend(splits(Arc::new(partials), parts, as_candidates));
        let output = self.finish(SPOKES, self.context(SPOKES, oracle), inputs, close_spokes);

        if let Some(handle) = published {
            let removed = self.store.remove(&handle).map_err(|e| e.in_stage(SPOKES));
            let output = output?;
            removed?;
            return Ok(output);
        }
        output
    }
}

/// For one outer pair, the four-cycle through every two centers, kept only when the pair is
/// the diagonal holding the cycle's smallest vertex.
pub fn four_cycles(
    _: &StageContext,
    group: &[(PatternTuple, VertexId)],
    emit: &mut Vec<(PatternTuple, PatternTuple)>,
) -> Result<(), Error> {
    let diagonal = match group.first() {
        Some(&(diagonal, _)) => diagonal,
        None => return Ok(()),
    };
    for (index, &(_, v)) in group.iter().enumerate() {
        for &(_, w) in &group[index + 1..] {
            let corners = PatternTuple::pair(v, w);
            if diagonal.first() < corners.first() {
                emit.push((diagonal, corners));
            }
        }
    }
    Ok(())
}

/// Twin-twigs as the reference side of the hub join, keyed by outer pair.
fn hubs_as_reference(
    _: &StageContext,
    record: &AdjacencyRecord,
    emit: &mut Vec<(SignedKey, PatternTuple)>,
) -> Result<(), Error> {
    TwinTwigGenerator::new(record)
        .generate(|twig| emit.push((SignedKey::small(twig.pair), PatternTuple::single(twig.center))));
    Ok(())
}

/// Pairs each hub adjacent to a cycle's diagonal with that cycle.
pub fn attach_hubs(
    context: &StageContext,
    group: &[(SignedKey, PatternTuple)],
    emit: &mut Vec<(PatternTuple, PatternTuple)>,
) -> Result<(), Error> {
    let diagonal = match group.first() {
        Some((key, _)) => key.key,
        None => return Ok(()),
    };
    let oracle = context.oracle();
    merge_join(group, |hub, corners| {
        let (hub, v, w) = (hub.first(), corners.first(), corners.second());
        if hub == v || hub == w {
            return;
        }
        if let Some(oracle) = oracle {
            if !oracle.possibly_contains(&PatternTuple::pair(hub, v)) || !oracle.possibly_contains(&PatternTuple::pair(hub, w)) {
                return;
            }
        }
        emit.push((PatternTuple::headed_pair(hub, v, w), diagonal));
    })?;
    Ok(())
}

/// Twin-twigs as the reference side of the closing join, keyed `(center, a, b)`.
fn spokes_as_reference(
    context: &StageContext,
    record: &AdjacencyRecord,
    emit: &mut Vec<(SignedKey, PatternTuple)>,
) -> Result<(), Error> {
    let pruning = context.oracle().map_or(Pruning::None, Pruning::Centered);
    TwinTwigGenerator::new(record)
        .pruned(pruning)
        .generate(|twig| emit.push((SignedKey::small(twig.centered()), PatternTuple::EMPTY)));
    Ok(())
}

/// Completes each partial whose spokes to `v` and `w` exist.
pub fn close_spokes(
    _: &StageContext,
    group: &[(SignedKey, PatternTuple)],
    emit: &mut Vec<PatternTuple>,
) -> Result<(), Error> {
    let spokes = match group.first() {
        Some((key, _)) => key.key,
        None => return Ok(()),
    };
    let (hub, v, w) = (spokes.first(), spokes.second(), spokes.last());
    merge_join(group, |_, diagonal| {
        emit.push(PatternTuple::new(&[hub, diagonal.first(), v, diagonal.second(), w]));
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::BloomFilter;

    #[test]
    fn each_cycle_once_through_its_smallest_vertex() {
        // the cycle 1 - 5 - 3 - 7 - 1 is seen from both diagonals.
        let mut emitted = Vec::new();
        let from_low = vec![(PatternTuple::pair(1, 3), 5), (PatternTuple::pair(1, 3), 7)];
        four_cycles(&StageContext::new("test"), &from_low, &mut emitted).unwrap();
        let from_high = vec![(PatternTuple::pair(5, 7), 1), (PatternTuple::pair(5, 7), 3)];
        four_cycles(&StageContext::new("test"), &from_high, &mut emitted).unwrap();
        assert_eq!(emitted, vec![(PatternTuple::pair(1, 3), PatternTuple::pair(5, 7))]);
    }

    #[test]
    fn hubs_skip_rim_vertices_and_missing_spokes() {
        let diagonal = PatternTuple::pair(1, 3);
        let group = vec![
            (SignedKey::small(diagonal), PatternTuple::single(0)),
            (SignedKey::small(diagonal), PatternTuple::single(5)),
            (SignedKey::large(diagonal), PatternTuple::pair(5, 7)),
        ];
        let mut emitted = Vec::new();
        attach_hubs(&StageContext::new("test"), &group, &mut emitted).unwrap();
        assert_eq!(emitted, vec![(PatternTuple::headed_pair(0, 5, 7), diagonal)]);

        let oracle = BloomFilter::from_tuples(vec![PatternTuple::pair(0, 5)], 0.0001);
        let context = StageContext::new("test").with_oracle(Some(Arc::new(oracle)));
        emitted.clear();
        attach_hubs(&context, &group, &mut emitted).unwrap();
        assert!(emitted.is_empty());
    }

    #[test]
    fn spokes_complete_the_wheel() {
        let spokes = PatternTuple::headed_pair(0, 5, 7);
        let group = vec![
            (SignedKey::small(spokes), PatternTuple::EMPTY),
            (SignedKey::large(spokes), PatternTuple::pair(1, 3)),
        ];
        let mut emitted = Vec::new();
        close_spokes(&StageContext::new("test"), &group, &mut emitted).unwrap();
        assert_eq!(emitted, vec![PatternTuple::new(&[0, 1, 5, 3, 7])]);
    }
}
