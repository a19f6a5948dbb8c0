//! Running jobs on timely dataflow workers.
//!
//! Map tasks are dealt round-robin to workers, each of which feeds its output into a dataflow
//! input. Records are exchanged between workers by the job's `partition` function, and a
//! single operator stashes everything it receives until its input frontier has passed: that
//! notification is the shuffle barrier, after which the stash is sorted, cut into groups, and
//! reduced.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use timely::dataflow::channels::pact::Exchange;
use timely::dataflow::operators::{Input, Operator};
use timely::dataflow::Stream;
use timely::{Config, ExchangeData};
use tracing::{debug, info};

use crate::engine::{reduce_partition, Engine, Job};
use crate::error::Error;

/// Runs each job on `workers` threads of one process.
#[derive(Clone, Copy, Debug)]
pub struct TimelyEngine {
    workers: usize,
}

impl TimelyEngine {
    pub fn new(workers: usize) -> Self { TimelyEngine { workers: workers.max(1) } }
}

impl Engine for TimelyEngine {
    fn run<K, V, O>(&self, job: Job<K, V, O>) -> Result<Vec<O>, Error>
    where
        K: ExchangeData,
        V: ExchangeData,
        O: Send + 'static,
    {
        let timer = Instant::now();
        let Job { name, context, inputs, shuffle, reduce } = job;

        let inputs = Arc::new(inputs);
        let sink = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));

        let sink2 = sink.clone();
        let failures2 = failures.clone();
        let guards = timely::execute(Config::process(self.workers), move |worker| {

            let index = worker.index();
            let peers = worker.peers();
            let context = context.clone();

            let mut input = worker.dataflow::<u64, _, _>(|scope| {

                let (input, stream) = scope.new_input::<(K, V)>();

                let context = context.clone();
                let sink = sink2.clone();
                let failures = failures2.clone();
                let partition = shuffle.partition;
                let exchange = Exchange::new(move |record: &(K, V)| partition(&record.0));

                let mut stash = Vec::new();
                let mut vector = Vec::new();
                let _reduced: Stream<_, ()> = stream.unary_notify(exchange, name, Vec::new(), move |input, _output, notificator| {

                    // stash records until no more can arrive for this time.
                    input.for_each(|time, data| {
                        data.swap(&mut vector);
                        stash.append(&mut vector);
                        notificator.notify_at(time.retain());
                    });

                    notificator.for_each(|_time, _count, _notificator| {
                        let mut emitted = Vec::new();
                        match reduce_partition(&context, &mut stash, shuffle, reduce, &mut emitted) {
                            Ok(groups) => {
                                debug!(stage = name, worker = index, records = stash.len(), groups, "partition reduced");
                                sink.lock().unwrap_or_else(|e| e.into_inner()).append(&mut emitted);
                            }
                            Err(error) => {
                                failures.lock().unwrap_or_else(|e| e.into_inner()).push(error);
                            }
                        }
                        stash.clear();
                    });
                });

                input
            });

            // this worker's share of the map tasks.
            let mut buffer = Vec::new();
            let mut mapped = 0;
            for task in inputs.iter().skip(index).step_by(peers) {
                task.run(&context, &mut buffer)?;
                mapped += buffer.len();
                for record in buffer.drain(..) {
                    input.send(record);
                }
            }
            debug!(stage = name, worker = index, records = mapped, "map phase complete");
            Ok::<(), Error>(())

        }).map_err(Error::Engine)?;

        for result in guards.join() {
            result.map_err(Error::Engine)?.map_err(|e| e.in_stage(name))?;
        }
        if let Some(error) = failures.lock().unwrap_or_else(|e| e.into_inner()).pop() {
            return Err(error.in_stage(name));
        }

        let output = std::mem::take(&mut *sink.lock().unwrap_or_else(|e| e.into_inner()));
        info!(stage = name, workers = self.workers, output = output.len(), elapsed = ?timer.elapsed(), "stage complete");
        Ok(output)
    }
}
