//! Enumerates chordal and solar squares in a random graph, and checks them by brute force.
//!
//! usage: squares <nodes> <edges> <workers> [config.json]

use std::time::Instant;

use rand::prelude::*;
use tracing_subscriber::EnvFilter;

use twintwig::{
    naive, publish_edge_oracle, Graph, MemoryStore, Pattern, Pipeline, PipelineConfig, TimelyEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let nodes: u64 = std::env::args().nth(1).unwrap_or_else(|| "200".to_string()).parse()?;
    let edges: usize = std::env::args().nth(2).unwrap_or_else(|| "2000".to_string()).parse()?;
    let workers: usize = std::env::args().nth(3).unwrap_or_else(|| "2".to_string()).parse()?;
    let base = match std::env::args().nth(4) {
        Some(path) => PipelineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };

    if nodes < 2 {
        return Err("need at least two nodes".into());
    }

    let mut rng = StdRng::seed_from_u64(0);
    let mut list = Vec::with_capacity(edges);
    while list.len() < edges {
        let (src, dst) = (rng.gen_range(0..nodes), rng.gen_range(0..nodes));
        if src != dst {
            list.push((src, dst));
        }
    }
    let graph = Graph::from_edges(list)?;

    for pattern in [Pattern::ChordalSquare, Pattern::SolarSquare] {
        let config = PipelineConfig { pattern, ..base.clone() };
        let store = MemoryStore::new();
        if config.pruning.enabled {
            publish_edge_oracle(&store, &graph.edge_list(), config.pruning.false_positive_rate)?;
        }

        let timer = Instant::now();
        let output = Pipeline::new(config.clone(), TimelyEngine::new(workers), store)?.run(&graph)?;
        let elapsed = timer.elapsed();

        let expected = match pattern {
            Pattern::ChordalSquare => naive::chordal_squares(&graph).len() as u64,
            Pattern::SolarSquare => naive::solar_squares(&graph).len() as u64,
        };
        println!("{:?}\t{:?}: found {}, expected {}", elapsed, pattern, output.len(), expected);
        if output.len() != expected {
            return Err(format!("{:?}: found {} instances, expected {}", pattern, output.len(), expected).into());
        }
    }

    Ok(())
}
