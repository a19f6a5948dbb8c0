//! Sequential generate-and-join stages assembling chordal and solar squares.
//!
//! A pipeline owns an engine, an artifact store and a validated configuration. Each stage is
//! a `Job` of plain map and reduce functions; stage k+1 is only built once stage k's output has
//! been fully materialized, since that output is its join partner.

use std::sync::Arc;
use std::time::Instant;

use timely::ExchangeData;
use tracing::{debug, info};

use crate::adjacency::{AdjacencyRecord, VertexId};
use crate::artifact::{load_oracle, publish_edge_oracle, ArtifactStore, MemoryStore, OracleKind};
use crate::bloom::BloomFilter;
use crate::config::{Pattern, PipelineConfig};
use crate::engine::{Engine, Job, LocalEngine, MapTask, ReduceFn, ShuffleContract, StageContext};
use crate::error::Error;
use crate::graph::Graph;
use crate::join::count_join;
use crate::tuple::{
    compare_signed, compare_tuples, partition_signed, partition_tuples, same_group_signed, same_group_tuples,
    PatternTuple, SignedKey,
};
use crate::twintwig::{Pruning, TwinTwigGenerator};

pub mod chordal;
pub mod solar;

/// The result of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Every instance found, sorted.
    Instances(Vec<PatternTuple>),
    /// The number of instances, from a count-only run.
    Count(u64),
}

impl Output {
    /// Number of instances, whichever way they were reported.
    pub fn len(&self) -> u64 {
        match self {
            Output::Instances(instances) => instances.len() as u64,
            Output::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn into_instances(self) -> Result<Vec<PatternTuple>, Error> {
        match self {
            Output::Instances(instances) => Ok(instances),
            Output::Count(_) => Err(Error::Config("a count-only run has no instances".to_string())),
        }
    }

    pub fn count(&self) -> Result<u64, Error> {
        match self {
            Output::Count(count) => Ok(*count),
            Output::Instances(_) => Err(Error::Config("instances were materialized, not counted".to_string())),
        }
    }
}

pub struct Pipeline<E, S> {
    config: PipelineConfig,
    engine: E,
    store: S,
}

impl<E: Engine, S: ArtifactStore> Pipeline<E, S> {
    /// Validates `config`; nothing is scheduled until `run`.
    pub fn new(config: PipelineConfig, engine: E, store: S) -> Result<Self, Error> {
        config.validate()?;
        Ok(Pipeline { config, engine, store })
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn store(&self) -> &S { &self.store }

    /// Runs every stage of the configured pattern over `graph`.
    pub fn run(&self, graph: &Graph) -> Result<Output, Error> {
        let timer = Instant::now();
        info!(
            pattern = ?self.config.pattern,
            nodes = graph.nodes(),
            pruning = self.config.pruning.enabled,
            count_only = self.config.count_only,
            "pipeline starting"
        );
        let output = match self.config.pattern {
            Pattern::ChordalSquare => self.chordal_square(graph)?,
            Pattern::SolarSquare => self.solar_square(graph)?,
        };
        info!(pattern = ?self.config.pattern, found = output.len(), elapsed = ?timer.elapsed(), "pipeline complete");
        Ok(output)
    }

    /// The edge oracle, when pruning is enabled; loaded once and shared by every worker.
    fn edge_oracle(&self, stage: &'static str) -> Result<Option<Arc<BloomFilter>>, Error> {
        if !self.config.pruning.enabled {
            return Ok(None);
        }
        let name = self.config.oracle_name(OracleKind::Edge);
        let oracle = load_oracle(&self.store, &name).map_err(|e| e.in_stage(stage))?;
        debug!(stage, artifact = %name, bits = oracle.num_bits(), "oracle loaded");
        Ok(Some(Arc::new(oracle)))
    }

    fn context(&self, stage: &'static str, oracle: Option<Arc<BloomFilter>>) -> Arc<StageContext> {
        Arc::new(StageContext::new(stage).with_oracle(oracle).counting(self.config.count_only))
    }

    /// Runs a final join stage, materializing instances or counting them.
    fn finish<V: ExchangeData>(
        &self,
        name: &'static str,
        context: Arc<StageContext>,
        inputs: Vec<Arc<dyn MapTask<SignedKey, V>>>,
        reduce: ReduceFn<SignedKey, V, PatternTuple>,
    ) -> Result<Output, Error> {
        if context.count_only {
            let counts = self.engine.run(Job { name, context, inputs, shuffle: signed(), reduce: count_matches::<V> })?;
            Ok(Output::Count(counts.into_iter().sum()))
        } else {
            let mut instances = self.engine.run(Job { name, context, inputs, shuffle: signed(), reduce })?;
            instances.sort();
            Ok(Output::Instances(instances))
        }
    }
}

/// Runs `config` in this thread against an in-memory store, publishing the edge oracle first
/// when pruning is enabled.
pub fn run(config: &PipelineConfig, graph: &Graph) -> Result<Output, Error> {
    config.validate()?;
    let store = MemoryStore::new();
    if config.pruning.enabled {
        publish_edge_oracle(&store, &graph.edge_list(), config.pruning.false_positive_rate)?;
    }
    Pipeline::new(config.clone(), LocalEngine::new(config.reducers), store)?.run(graph)
}

pub(crate) fn by_tuple() -> ShuffleContract<PatternTuple> {
    ShuffleContract { compare: compare_tuples, same_group: same_group_tuples, partition: partition_tuples }
}

pub(crate) fn signed() -> ShuffleContract<SignedKey> {
    ShuffleContract { compare: compare_signed, same_group: same_group_signed, partition: partition_signed }
}

/// Twin-twigs keyed by their outer pair, with the center as payload.
///
/// With an oracle in the context, only twin-twigs whose outer pair may be an edge are emitted.
pub fn twin_twigs(
    context: &StageContext,
    record: &AdjacencyRecord,
    emit: &mut Vec<(PatternTuple, VertexId)>,
) -> Result<(), Error> {
    let pruning = context.oracle().map_or(Pruning::None, Pruning::Pair);
    TwinTwigGenerator::new(record).pruned(pruning).generate(|twig| emit.push((twig.pair, twig.center)));
    Ok(())
}

/// The true edge set as the reference side of a join.
pub(crate) fn edges_as_reference(
    _: &StageContext,
    edge: &(VertexId, VertexId),
    emit: &mut Vec<(SignedKey, PatternTuple)>,
) -> Result<(), Error> {
    emit.push((SignedKey::small(PatternTuple::pair(edge.0, edge.1)), PatternTuple::EMPTY));
    Ok(())
}

/// Materialized `(key, payload)` records as the candidate side of a join.
pub(crate) fn as_candidates(
    _: &StageContext,
    record: &(PatternTuple, PatternTuple),
    emit: &mut Vec<(SignedKey, PatternTuple)>,
) -> Result<(), Error> {
    emit.push((SignedKey::large(record.0), record.1));
    Ok(())
}

/// One count per group that joins anything.
fn count_matches<V>(_: &StageContext, group: &[(SignedKey, V)], emit: &mut Vec<u64>) -> Result<(), Error> {
    let count = count_join(group)?;
    if count > 0 {
        emit.push(count);
    }
    Ok(())
}
