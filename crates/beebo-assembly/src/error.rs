//! Error types for asset loading, collision probing and orchestration

use beebo_core::Slot;
use thiserror::Error;

/// Asset fetch or parse failure
///
/// Cloneable so the same failure can be reported to the progress sink,
/// logged, and carried in slot state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Asset {0} contains no scene")]
    NoScene(String),
    #[error("Loader task for {path} failed: {message}")]
    Task { path: String, message: String },
}

/// Failure while sampling or ray casting during a collision probe.
/// Never leaves the detector: it is turned into a no-collision outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryProbeError {
    #[error("Candidate model has no meshes")]
    NoMeshes,
    #[error("Mesh {0} has no vertices")]
    EmptyMesh(usize),
    #[error("Triangle index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

/// Caller errors rejected by the orchestration entry points
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("No part at index {index} for {slot} ({len} parts)")]
    IndexOutOfRange { slot: Slot, index: usize, len: usize },
    #[error("No part {name:?} for {slot}")]
    UnknownPart { slot: Slot, name: String },
}
