//! Error types for artifact streaming.

use crate::machine::ArtifactStatus;
use crate::schema::ValidationError;
use crate::types::ArtifactKey;

/// Errors that can occur in the artifact controller.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// No artifact with this key exists.
    #[error("artifact not found: {0}")]
    NotFound(ArtifactKey),

    /// An artifact with this key already exists.
    #[error("artifact already exists: {0}")]
    AlreadyExists(ArtifactKey),

    /// No schema is registered for the artifact type.
    #[error("no schema registered for artifact type: {0}")]
    UnknownType(String),

    /// The artifact is terminal and accepts no further updates.
    #[error("out-of-sequence update for {key}: artifact is {status}")]
    OutOfSequence {
        key: ArtifactKey,
        status: ArtifactStatus,
    },

    /// A data part older than the last one applied to this artifact.
    #[error("stale sequence {sequence} for {key}: last applied {last_applied}")]
    StaleSequence {
        key: ArtifactKey,
        sequence: u64,
        last_applied: u64,
    },

    /// The payload failed schema validation.
    #[error("validation failed for {key}: {source}")]
    Validation {
        key: ArtifactKey,
        #[source]
        source: ValidationError,
    },

    /// Progress must be a number.
    #[error("invalid progress value: {0}")]
    InvalidProgress(f64),

    /// A data part tagged for artifacts could not be decoded.
    #[error("malformed artifact data part {data_type}: {reason}")]
    MalformedPart { data_type: String, reason: String },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),

    /// Config file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtifactError {
    /// True for rejections caused by calling into a terminal artifact or
    /// replaying an old data part.
    pub fn is_out_of_sequence(&self) -> bool {
        matches!(self, Self::OutOfSequence { .. } | Self::StaleSequence { .. })
    }
}

/// Result type for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;
