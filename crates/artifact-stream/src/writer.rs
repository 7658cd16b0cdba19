//! Producer-side handle for artifact lifecycle calls.
//!
//! Lifecycle calls travel as data parts tagged `data-artifact-<type>`, so
//! they share the store's ordering and sequence numbers with every other
//! out-of-band part. The controller picks them up with
//! [`crate::ArtifactController::sync_from`].

use std::sync::Arc;

use chat_store::{DataPartWriter, IngestOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::{ArtifactKey, ArtifactUpdate};
use crate::ArtifactResult;

/// Tag prefix of data parts that carry artifact lifecycle calls.
pub const ARTIFACT_TAG_PREFIX: &str = "data-artifact-";

/// Full data part tag for `artifact_type`.
pub fn artifact_tag(artifact_type: &str) -> String {
    format!("{ARTIFACT_TAG_PREFIX}{artifact_type}")
}

/// Artifact type carried by a data part tag, if it is an artifact tag.
pub fn parse_artifact_tag(data_type: &str) -> Option<&str> {
    data_type
        .strip_prefix(ARTIFACT_TAG_PREFIX)
        .filter(|artifact_type| !artifact_type.is_empty())
}

/// One lifecycle call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ArtifactOp {
    Create,
    Update {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
    },
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Fail {
        reason: String,
    },
    Cancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Timeout,
}

/// Data part payload: the artifact id plus the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub id: String,
    #[serde(flatten)]
    pub op: ArtifactOp,
}

/// Writes lifecycle calls for one artifact into a store.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    parts: Arc<DataPartWriter>,
    key: ArtifactKey,
}

impl ArtifactWriter {
    /// Several artifact writers may share one part writer; sequence numbers
    /// then stay increasing across all of them.
    pub fn new(parts: Arc<DataPartWriter>, key: ArtifactKey) -> Self {
        Self { parts, key }
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    pub fn create(&self) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Create)
    }

    /// Pushes a partial payload.
    pub fn push(&self, payload: Value) -> ArtifactResult<u64> {
        self.update(ArtifactUpdate::payload(payload))
    }

    pub fn progress(&self, progress: f64) -> ArtifactResult<u64> {
        self.update(ArtifactUpdate::progress(progress))
    }

    pub fn update(&self, update: ArtifactUpdate) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Update {
            payload: update.payload,
            progress: update.progress,
        })
    }

    pub fn complete(&self, payload: Option<Value>) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Complete { payload })
    }

    pub fn fail(&self, reason: impl Into<String>) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Fail {
            reason: reason.into(),
        })
    }

    pub fn cancel(&self, reason: Option<String>) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Cancel { reason })
    }

    pub fn time_out(&self) -> ArtifactResult<u64> {
        self.send(ArtifactOp::Timeout)
    }

    fn send(&self, op: ArtifactOp) -> ArtifactResult<u64> {
        let payload = serde_json::to_value(ArtifactEnvelope {
            id: self.key.id.clone(),
            op,
        })?;
        let data_type = artifact_tag(&self.key.artifact_type);
        let (sequence, outcome) = self.parts.write(&data_type, payload);
        if let IngestOutcome::Stale { latest_sequence } = outcome {
            warn!(
                artifact = %self.key,
                sequence,
                latest_sequence,
                "artifact writer sequence behind the store"
            );
        }
        Ok(sequence)
    }
}
