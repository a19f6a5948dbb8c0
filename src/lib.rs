//! Distributed enumeration of chordal squares and solar squares by twin-twig joins.
//!
//! Every pattern is assembled from twin-twigs, the two-edge fragments `a - center - b` that one
//! vertex's adjacency record can produce on its own. A pipeline is a short sequence of
//! map / shuffle / reduce stages: the first groups twin-twigs by their outer pair, and each later
//! stage extends the previous stage's output with a merge join. The join is nothing more than a
//! shuffle whose sort order puts a group's reference records (`Sign::Small`) ahead of its candidate
//! records (`Sign::Large`). Bloom filters over the edge set, or over an earlier stage's output,
//! can discard candidates before they are shuffled without ever losing a true match.
//!
//! Stages run on any `Engine`: `LocalEngine` runs in the calling thread, and `TimelyEngine`
//! exchanges records between timely dataflow workers.
//!
//! ```ignore
//! let graph = Graph::from_edges(vec![(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)])?;
//! let config = PipelineConfig::new(Pattern::ChordalSquare);
//! let squares = twintwig::run(&config, &graph)?.into_instances()?;
//! assert_eq!(squares, vec![PatternTuple::new(&[1, 2, 4, 3])]);
//! ```

pub mod adjacency;
pub mod artifact;
pub mod bloom;
pub mod config;
pub mod dataflow;
pub mod engine;
pub mod error;
pub mod graph;
pub mod join;
pub mod naive;
pub mod pipeline;
pub mod tuple;
pub mod twintwig;

pub use adjacency::{AdjacencyRecord, VertexId};
pub use artifact::{publish_edge_oracle, ArtifactStore, DirectoryStore, MemoryStore};
pub use bloom::BloomFilter;
pub use config::{Pattern, PipelineConfig, PruningConfig};
pub use dataflow::TimelyEngine;
pub use engine::{Engine, LocalEngine};
pub use error::Error;
pub use graph::Graph;
pub use pipeline::{run, Output, Pipeline};
pub use tuple::{PatternTuple, Sign, SignedKey};
