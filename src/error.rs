//! Errors raised while preparing or running a pipeline.

use thiserror::Error;

use crate::adjacency::VertexId;

/// Error type for every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An adjacency record (or the edge list it came from) is malformed.
    #[error("invalid adjacency for vertex {owner}: {reason}")]
    InvalidAdjacency { owner: VertexId, reason: String },
    /// Pruning was requested but the oracle artifact was never published.
    #[error("missing artifact: {name}")]
    MissingArtifact { name: String },
    /// Artifact bytes could not be encoded or decoded.
    #[error("artifact codec error: {0}")]
    Artifact(#[from] bincode::Error),
    /// Artifact written by an incompatible format version.
    #[error("artifact version {found}, expected {expected}")]
    ArtifactVersion { found: u32, expected: u32 },
    /// I/O error from a directory-backed artifact store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Inconsistent or out-of-range configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// A SMALL record followed a LARGE record within one join group.
    #[error("sign order violated in group {key}")]
    SignOrder { key: String },
    /// The execution substrate failed.
    #[error("engine error: {0}")]
    Engine(String),
    /// An error raised while running the named stage.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attributes the error to `stage`, unless it already names one.
    pub fn in_stage(self, stage: &'static str) -> Error {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage { stage, source: Box::new(other) },
        }
    }
}
