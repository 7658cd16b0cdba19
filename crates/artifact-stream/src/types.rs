//! Core types for artifact streaming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::machine::ArtifactStatus;
use crate::schema::FieldIssue;

/// Identity of an artifact: its type plus a caller-supplied id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub artifact_type: String,
    pub id: String,
}

impl ArtifactKey {
    pub fn new(artifact_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.artifact_type, self.id)
    }
}

/// Why an artifact ended in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The producer reported a failure.
    Failed,
    /// The stream was cancelled.
    Cancelled,
    /// No update arrived within the configured timeout.
    TimedOut,
    /// The final payload did not satisfy the full schema.
    Validation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::Validation => "validation",
        }
    }
}

/// Terminal failure details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    pub kind: FailureKind,
    pub reason: String,
    /// Field-level detail for validation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FieldIssue>,
}

impl ArtifactFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            issues: Vec::new(),
        }
    }
}

/// Read-only snapshot of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub key: ArtifactKey,
    pub status: ArtifactStatus,
    /// Last validated payload. `Null` until the first update.
    pub payload: Value,
    /// In `[0, 1]` once reported.
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ArtifactFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One update call: a partial payload, a progress value, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl ArtifactUpdate {
    pub fn payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            progress: None,
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self {
            payload: None,
            progress: Some(progress),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none() && self.progress.is_none()
    }
}

/// Merges a partial payload into the current one.
///
/// Objects merge key by key, recursively; any other value replaces what was
/// there. A `null` inside a patch object removes the key.
pub fn merge_payload(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(current), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    current.remove(&key);
                } else {
                    merge_payload(current.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
