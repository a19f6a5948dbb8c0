//! Distribution of Bloom oracle artifacts to the workers of a consuming stage.
//!
//! An artifact is written once, by an offline builder or by an earlier stage, and is read-only
//! for the whole of the stage that consumes it. Stores only move bytes; decoding happens once
//! per stage in `load_oracle`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bloom::BloomFilter;
use crate::error::Error;
use crate::tuple::PatternTuple;

/// Format version written into every artifact.
pub const ARTIFACT_VERSION: u32 = 1;

/// What the tuples in an oracle were drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleKind {
    /// The true edge set, as canonical pairs.
    Edge,
    /// Keys `(hub, v, w)` of validated solar-square partial patterns.
    SolarPartial,
}

impl OracleKind {
    fn label(&self) -> &'static str {
        match self {
            OracleKind::Edge => "edge",
            OracleKind::SolarPartial => "solar-partial",
        }
    }
}

/// Identifies one artifact: what it holds and the rate it was built for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArtifactName {
    pub kind: OracleKind,
    pub false_positive_rate: f64,
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bloom.{}.{}", self.kind.label(), self.false_positive_rate)
    }
}

/// Opaque reference to a published artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&ArtifactName> for ArtifactHandle {
    fn from(name: &ArtifactName) -> Self { ArtifactHandle(name.to_string()) }
}

/// Storage port for artifact bytes.
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `name`, replacing any previous version.
    fn publish(&self, name: &ArtifactName, bytes: Vec<u8>) -> Result<ArtifactHandle, Error>;
    /// Returns the bytes behind `handle`; `MissingArtifact` if none were published.
    fn fetch(&self, handle: &ArtifactHandle) -> Result<Arc<Vec<u8>>, Error>;
    /// Deletes the artifact if present.
    fn remove(&self, handle: &ArtifactHandle) -> Result<(), Error>;
}

/// In-process store, shared by every worker thread.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl ArtifactStore for MemoryStore {
    fn publish(&self, name: &ArtifactName, bytes: Vec<u8>) -> Result<ArtifactHandle, Error> {
        let handle = ArtifactHandle::from(name);
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(handle.0.clone(), Arc::new(bytes));
        Ok(handle)
    }

    fn fetch(&self, handle: &ArtifactHandle) -> Result<Arc<Vec<u8>>, Error> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.get(handle.as_str()).cloned().ok_or_else(|| Error::MissingArtifact { name: handle.0.clone() })
    }

    fn remove(&self, handle: &ArtifactHandle) -> Result<(), Error> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.remove(handle.as_str());
        Ok(())
    }
}

/// Files under `<work_dir>/bloom/`, one per artifact.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(work_dir: &Path) -> Self { DirectoryStore { root: work_dir.join("bloom") } }

    fn path(&self, handle: &ArtifactHandle) -> PathBuf { self.root.join(handle.as_str()) }
}

impl ArtifactStore for DirectoryStore {
    fn publish(&self, name: &ArtifactName, bytes: Vec<u8>) -> Result<ArtifactHandle, Error> {
        let handle = ArtifactHandle::from(name);
        fs::create_dir_all(&self.root)?;
        fs::write(self.path(&handle), bytes)?;
        Ok(handle)
    }

    fn fetch(&self, handle: &ArtifactHandle) -> Result<Arc<Vec<u8>>, Error> {
        match fs::read(self.path(handle)) {
            Ok(bytes) => Ok(Arc::new(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MissingArtifact { name: handle.0.clone() }),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, handle: &ArtifactHandle) -> Result<(), Error> {
        match fs::remove_file(self.path(handle)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    filter: BloomFilter,
}

pub fn encode(filter: &BloomFilter) -> Result<Vec<u8>, Error> {
    let envelope = Envelope { version: ARTIFACT_VERSION, filter: filter.clone() };
    Ok(bincode::serialize(&envelope)?)
}

pub fn decode(bytes: &[u8]) -> Result<BloomFilter, Error> {
    let envelope: Envelope = bincode::deserialize(bytes)?;
    if envelope.version != ARTIFACT_VERSION {
        return Err(Error::ArtifactVersion { found: envelope.version, expected: ARTIFACT_VERSION });
    }
    Ok(envelope.filter)
}

/// Builds the oracle over `tuples` and publishes it under `name`.
pub fn publish_oracle<S>(store: &S, name: &ArtifactName, tuples: &[PatternTuple]) -> Result<ArtifactHandle, Error>
where
    S: ArtifactStore + ?Sized,
{
    let filter = BloomFilter::from_tuples(tuples.iter().copied(), name.false_positive_rate);
    debug!(artifact = %name, tuples = tuples.len(), bits = filter.num_bits(), "publishing oracle");
    store.publish(name, encode(&filter)?)
}

/// Offline builder for the edge oracle, consumed by the first stages of both pipelines.
pub fn publish_edge_oracle<S>(store: &S, edges: &[(u64, u64)], false_positive_rate: f64) -> Result<ArtifactHandle, Error>
where
    S: ArtifactStore + ?Sized,
{
    let pairs: Vec<PatternTuple> = edges.iter().map(|&(a, b)| PatternTuple::pair(a, b)).collect();
    let name = ArtifactName { kind: OracleKind::Edge, false_positive_rate };
    publish_oracle(store, &name, &pairs)
}

/// Fetches and decodes the oracle named `name`.
pub fn load_oracle<S>(store: &S, name: &ArtifactName) -> Result<BloomFilter, Error>
where
    S: ArtifactStore + ?Sized,
{
    let bytes = store.fetch(&ArtifactHandle::from(name))?;
    decode(&bytes)
}
