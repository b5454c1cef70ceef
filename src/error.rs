//! Error types for saavy_station.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Failures of a playback start attempt.
///
/// None of these is fatal: every one leaves the session idle.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("catalog is empty, nothing to play")]
    EmptyCatalog,

    #[error("output sink not initialized")]
    SinkNotReady,

    #[error("output device unavailable: {0}")]
    DeviceUnavailable(#[source] BackendError),

    #[error("could not load {source_ref}: {error}")]
    SourceUnavailable {
        source_ref: String,
        #[source]
        error: BackendError,
    },

    #[error("device resume rejected: {0}")]
    DeviceResumeFailed(#[source] BackendError),

    #[error("playback start rejected: {0}")]
    PlaybackRejected(#[source] BackendError),

    #[error("graph wiring failed: {0}")]
    Graph(#[from] GraphError),

    #[error("invalid recipe: {0}")]
    Recipe(#[from] RecipeError),
}

/// Audio graph topology errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("connecting {from} -> {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },

    /// The node has no outgoing connections left. Teardown treats this as
    /// already done.
    #[error("node {0} is not connected")]
    NotConnected(NodeId),

    #[error("invalid analyser size {0}: must be a power of two in 32..=32768")]
    InvalidFftSize(usize),
}

/// Platform audio failures (device, decoding, playback).
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no output device available")]
    NoDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device closed")]
    Closed,
}

/// Invalid recipe definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    #[error("stage {index}: probability {value} outside [0, 1]")]
    Probability { index: usize, value: f32 },

    #[error("stage {index}: range {min}..={max} is empty or not finite")]
    Range { index: usize, min: f32, max: f32 },

    #[error("stage {index}: choice set is empty")]
    EmptyChoices { index: usize },

    #[error("dry gain {0} outside [0, 1]")]
    DryGain(f32),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse {path}: {error}")]
    Parse {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },

    #[error("invalid recipe: {0}")]
    Recipe(#[from] RecipeError),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
