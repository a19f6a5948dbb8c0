//! The map / shuffle / reduce seam every stage is written against.
//!
//! A stage is a `Job`: map tasks over independent input splits, a `ShuffleContract` that says
//! how emitted keys are routed, sorted and grouped, and a reduce function applied to each group
//! in sorted order. Both map and reduce functions are plain `fn` values that see nothing but
//! their input, the stage's read-only `StageContext`, and the output buffer they append to, so
//! any task can be re-run from scratch with identical results.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use timely::ExchangeData;
use tracing::{debug, info};

use crate::bloom::BloomFilter;
use crate::error::Error;

/// Read-only state shared by every map and reduce invocation of one stage.
#[derive(Clone, Debug)]
pub struct StageContext {
    pub stage: &'static str,
    /// The pruning oracle, loaded once at stage setup when pruning is enabled.
    pub oracle: Option<Arc<BloomFilter>>,
    pub count_only: bool,
}

impl StageContext {
    pub fn new(stage: &'static str) -> Self { StageContext { stage, oracle: None, count_only: false } }

    pub fn with_oracle(self, oracle: Option<Arc<BloomFilter>>) -> Self { StageContext { oracle, ..self } }

    pub fn counting(self, count_only: bool) -> Self { StageContext { count_only, ..self } }

    #[inline]
    pub fn oracle(&self) -> Option<&BloomFilter> { self.oracle.as_deref() }
}

/// How the shuffle treats keys: sort order, group boundaries, and routing.
///
/// `partition` must depend only on the part of the key `same_group` compares, or a group would
/// be split across reducers.
pub struct ShuffleContract<K> {
    pub compare: fn(&K, &K) -> Ordering,
    pub same_group: fn(&K, &K) -> bool,
    pub partition: fn(&K) -> u64,
}

impl<K> Clone for ShuffleContract<K> {
    fn clone(&self) -> Self { *self }
}

impl<K> Copy for ShuffleContract<K> {}

pub type MapFn<I, K, V> = fn(&StageContext, &I, &mut Vec<(K, V)>) -> Result<(), Error>;

pub type ReduceFn<K, V, O> = fn(&StageContext, &[(K, V)], &mut Vec<O>) -> Result<(), Error>;

/// One independent unit of map work.
pub trait MapTask<K, V>: Send + Sync {
    fn run(&self, context: &StageContext, emit: &mut Vec<(K, V)>) -> Result<(), Error>;
}

/// A contiguous range of a shared input, mapped record by record.
pub struct Split<I, K, V> {
    records: Arc<Vec<I>>,
    range: Range<usize>,
    map: MapFn<I, K, V>,
}

impl<I: Send + Sync, K, V> MapTask<K, V> for Split<I, K, V> {
    fn run(&self, context: &StageContext, emit: &mut Vec<(K, V)>) -> Result<(), Error> {
        for record in &self.records[self.range.clone()] {
            (self.map)(context, record, emit)?;
        }
        Ok(())
    }
}

/// Cuts `records` into at most `parts` splits, each mapped with `map`.
pub fn splits<I, K, V>(records: Arc<Vec<I>>, parts: usize, map: MapFn<I, K, V>) -> Vec<Arc<dyn MapTask<K, V>>>
where
    I: Send + Sync + 'static,
    K: 'static,
    V: 'static,
{
    let parts = parts.max(1);
    let step = (records.len() + parts - 1) / parts;
    let mut tasks: Vec<Arc<dyn MapTask<K, V>>> = Vec::with_capacity(parts);
    let mut lower = 0;
    while lower < records.len() {
        let upper = (lower + step).min(records.len());
        tasks.push(Arc::new(Split { records: records.clone(), range: lower..upper, map }));
        lower = upper;
    }
    tasks
}

/// A stage ready to run.
pub struct Job<K, V, O> {
    pub name: &'static str,
    pub context: Arc<StageContext>,
    pub inputs: Vec<Arc<dyn MapTask<K, V>>>,
    pub shuffle: ShuffleContract<K>,
    pub reduce: ReduceFn<K, V, O>,
}

/// Something that can run a job to completion: every map task, then the shuffle barrier,
/// then every group's reduce.
pub trait Engine {
    fn run<K, V, O>(&self, job: Job<K, V, O>) -> Result<Vec<O>, Error>
    where
        K: ExchangeData,
        V: ExchangeData,
        O: Send + 'static;
}

/// Sorts one partition's records and reduces each group in order; returns the group count.
pub fn reduce_partition<K, V, O>(
    context: &StageContext,
    records: &mut [(K, V)],
    shuffle: ShuffleContract<K>,
    reduce: ReduceFn<K, V, O>,
    emit: &mut Vec<O>,
) -> Result<usize, Error> {
    records.sort_by(|x, y| (shuffle.compare)(&x.0, &y.0));

    let mut groups = 0;
    let mut lower = 0;
    while lower < records.len() {
        let head = &records[lower].0;
        let upper = lower + advance(&records[lower..], |x| (shuffle.same_group)(&x.0, head));
        reduce(context, &records[lower..upper], emit)?;
        groups += 1;
        lower = upper;
    }
    Ok(groups)
}

/// Number of leading elements of `slice` satisfying `function`, which must hold for a prefix.
pub fn advance<T, F: Fn(&T) -> bool>(slice: &[T], function: F) -> usize {
    // start with no advance
    let mut index = 0;
    if index < slice.len() && function(&slice[index]) {
        // advance in exponentially growing steps.
        let mut step = 1;
        while index + step < slice.len() && function(&slice[index + step]) {
            index += step;
            step <<= 1;
        }

        // advance in exponentially shrinking steps.
        step >>= 1;
        while step > 0 {
            if index + step < slice.len() && function(&slice[index + step]) {
                index += step;
            }
            step >>= 1;
        }

        index += 1;
    }

    index
}

/// Runs jobs in the calling thread, one reduce partition after another.
///
/// Output is deterministic: partitions in index order, groups in sorted order within each.
#[derive(Clone, Copy, Debug)]
pub struct LocalEngine {
    partitions: usize,
}

impl LocalEngine {
    pub fn new(partitions: usize) -> Self { LocalEngine { partitions: partitions.max(1) } }
}

impl Default for LocalEngine {
    fn default() -> Self { LocalEngine::new(1) }
}

impl Engine for LocalEngine {
    fn run<K, V, O>(&self, job: Job<K, V, O>) -> Result<Vec<O>, Error>
    where
        K: ExchangeData,
        V: ExchangeData,
        O: Send + 'static,
    {
        let timer = Instant::now();
        let Job { name, context, inputs, shuffle, reduce } = job;

        let mut buckets: Vec<Vec<(K, V)>> = (0..self.partitions).map(|_| Vec::new()).collect();
        let mut buffer = Vec::new();
        let mut mapped = 0;
        for task in &inputs {
            task.run(&context, &mut buffer).map_err(|e| e.in_stage(name))?;
            mapped += buffer.len();
            for record in buffer.drain(..) {
                let bucket = ((shuffle.partition)(&record.0) % self.partitions as u64) as usize;
                buckets[bucket].push(record);
            }
        }
        debug!(stage = name, tasks = inputs.len(), records = mapped, "map phase complete");

        let mut output = Vec::new();
        for (index, bucket) in buckets.iter_mut().enumerate() {
            let groups = reduce_partition(&context, bucket, shuffle, reduce, &mut output).map_err(|e| e.in_stage(name))?;
            debug!(stage = name, partition = index, records = bucket.len(), groups, "partition reduced");
        }

        info!(stage = name, mapped, output = output.len(), elapsed = ?timer.elapsed(), "stage complete");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{compare_tuples, partition_tuples, same_group_tuples, PatternTuple};

    fn explode(_: &StageContext, record: &(u64, u64), emit: &mut Vec<(PatternTuple, u64)>) -> Result<(), Error> {
        emit.push((PatternTuple::single(record.0), record.1));
        Ok(())
    }

    fn sum(_: &StageContext, group: &[(PatternTuple, u64)], emit: &mut Vec<(u64, u64)>) -> Result<(), Error> {
        emit.push((group[0].0.first(), group.iter().map(|x| x.1).sum()));
        Ok(())
    }

    fn refuse(_: &StageContext, _: &(u64, u64), _: &mut Vec<(PatternTuple, u64)>) -> Result<(), Error> {
        Err(Error::InvalidAdjacency { owner: 0, reason: "refused".to_string() })
    }

    fn contract() -> ShuffleContract<PatternTuple> {
        ShuffleContract { compare: compare_tuples, same_group: same_group_tuples, partition: partition_tuples }
    }

    #[test]
    fn advance_counts_prefix() {
        let data: Vec<u32> = (0..100).collect();
        assert_eq!(advance(&data, |&x| x < 37), 37);
        assert_eq!(advance(&data, |&x| x < 1000), 100);
        assert_eq!(advance(&data, |_| false), 0);
        assert_eq!(advance(&[] as &[u32], |_| true), 0);
    }

    #[test]
    fn splits_cover_input() {
        let records = Arc::new((0..10u64).map(|x| (x, x)).collect::<Vec<_>>());
        let tasks = splits(records, 3, explode);
        assert_eq!(tasks.len(), 3);
        let context = StageContext::new("test");
        let mut out = Vec::new();
        for task in &tasks {
            task.run(&context, &mut out).unwrap();
        }
        assert_eq!(out.len(), 10);

        assert!(splits(Arc::new(Vec::<(u64, u64)>::new()), 4, explode).is_empty());
    }

    #[test]
    fn groups_reduce_together_across_partitions() {
        let records = Arc::new(vec![(1, 10), (2, 5), (1, 1), (3, 7), (2, 2), (1, 100)]);
        for partitions in 1..5 {
            let job = Job {
                name: "sum",
                context: Arc::new(StageContext::new("sum")),
                inputs: splits(records.clone(), 2, explode),
                shuffle: contract(),
                reduce: sum,
            };
            let mut out = LocalEngine::new(partitions).run(job).unwrap();
            out.sort();
            assert_eq!(out, vec![(1, 111), (2, 7), (3, 7)]);
        }
    }

    #[test]
    fn map_errors_name_the_stage() {
        let job: Job<PatternTuple, u64, (u64, u64)> = Job {
            name: "refusing",
            context: Arc::new(StageContext::new("refusing")),
            inputs: splits(Arc::new(vec![(1, 1)]), 1, refuse),
            shuffle: contract(),
            reduce: sum,
        };
        match LocalEngine::default().run(job) {
            Err(Error::Stage { stage, source }) => {
                assert_eq!(stage, "refusing");
                assert!(matches!(*source, Error::InvalidAdjacency { .. }));
            }
            other => panic!("unexpected {:?}", other.map(|x| x.len())),
        }
    }
}
