//! The artifact stream controller.
//!
//! The controller is the only writer of artifact state. Each artifact is an
//! independent lifecycle machine; an error on one never touches another, and
//! nothing here mutates the chat store.
//!
//! # Write Path (strict order)
//!
//! 1. Reject calls into terminal artifacts
//! 2. Validate (partial while streaming, full at completion)
//! 3. Advance the lifecycle machine and commit the payload
//! 4. Emit an [`ArtifactEvent`] once the lock is released

use std::collections::HashMap;
use std::sync::Arc;

use chat_store::{ChatStore, DataPart, DataPartCursor};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ArtifactConfig;
use crate::machine::{ArtifactMachine, ArtifactMachineInput, ArtifactStatus};
use crate::schema::ArtifactSchema;
use crate::sink::{ArtifactEvent, ArtifactSink, NullSink};
use crate::types::{
    merge_payload, Artifact, ArtifactFailure, ArtifactKey, ArtifactUpdate, FailureKind,
};
use crate::writer::{parse_artifact_tag, ArtifactEnvelope, ArtifactOp};
use crate::{ArtifactError, ArtifactResult};

/// Reason recorded when a cancel call carries none.
pub const DEFAULT_CANCEL_REASON: &str = "cancelled";

struct Entry {
    machine: ArtifactMachine,
    schema: Arc<dyn ArtifactSchema>,
    /// Every partial payload merged, before normalization.
    raw: Value,
    /// Last payload that passed validation.
    payload: Value,
    progress: Option<f64>,
    failure: Option<ArtifactFailure>,
    last_sequence: Option<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entry {
    fn new(schema: Arc<dyn ArtifactSchema>) -> Self {
        let now = Utc::now();
        Self {
            machine: ArtifactMachine::new(),
            schema,
            raw: Value::Null,
            payload: Value::Null,
            progress: None,
            failure: None,
            last_sequence: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn status(&self) -> ArtifactStatus {
        ArtifactStatus::from(self.machine.state())
    }

    fn ensure_live(&self, key: &ArtifactKey) -> ArtifactResult<()> {
        let status = self.status();
        if status.is_terminal() {
            return Err(ArtifactError::OutOfSequence {
                key: key.clone(),
                status,
            });
        }
        Ok(())
    }

    fn transition(&mut self, key: &ArtifactKey, input: ArtifactMachineInput) -> ArtifactResult<()> {
        let status = self.status();
        self.machine
            .consume(&input)
            .map_err(|_| ArtifactError::OutOfSequence {
                key: key.clone(),
                status,
            })?;
        Ok(())
    }

    fn snapshot(&self, key: &ArtifactKey) -> Artifact {
        Artifact {
            key: key.clone(),
            status: self.status(),
            payload: self.payload.clone(),
            progress: self.progress,
            failure: self.failure.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Outcome of one [`ArtifactController::sync_from`] pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Artifact parts applied.
    pub applied: usize,
    /// Parts that were not artifact parts.
    pub skipped: usize,
    /// Artifact parts that were rejected, in log order.
    pub rejected: Vec<ArtifactError>,
}

/// Tracks every artifact by identity.
pub struct ArtifactController {
    schemas: RwLock<HashMap<String, Arc<dyn ArtifactSchema>>>,
    entries: Mutex<HashMap<ArtifactKey, Entry>>,
    cursor: Mutex<DataPartCursor>,
    sink: Arc<dyn ArtifactSink>,
    config: ArtifactConfig,
}

impl ArtifactController {
    pub fn new(config: ArtifactConfig, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            entries: Mutex::new(HashMap::new()),
            cursor: Mutex::new(DataPartCursor::default()),
            sink,
            config,
        }
    }

    /// Controller that discards lifecycle events.
    pub fn without_sink(config: ArtifactConfig) -> Self {
        Self::new(config, Arc::new(NullSink))
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// Registers the validator for `artifact_type`, replacing any earlier one.
    ///
    /// Existing artifacts keep the schema they were created with.
    pub fn register_schema(&self, artifact_type: impl Into<String>, schema: impl ArtifactSchema + 'static) {
        self.register_schema_arc(artifact_type, Arc::new(schema));
    }

    pub fn register_schema_arc(&self, artifact_type: impl Into<String>, schema: Arc<dyn ArtifactSchema>) {
        let artifact_type = artifact_type.into();
        debug!(artifact_type = %artifact_type, "artifact schema registered");
        self.schemas.write().insert(artifact_type, schema);
    }

    pub fn has_schema(&self, artifact_type: &str) -> bool {
        self.schemas.read().contains_key(artifact_type)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates an idle artifact.
    pub fn create(&self, key: ArtifactKey) -> ArtifactResult<Artifact> {
        let schema = self
            .schemas
            .read()
            .get(&key.artifact_type)
            .cloned()
            .ok_or_else(|| ArtifactError::UnknownType(key.artifact_type.clone()))?;

        let snapshot = {
            let mut entries = self.entries.lock();
            if entries.contains_key(&key) {
                return Err(ArtifactError::AlreadyExists(key));
            }
            let entry = Entry::new(schema);
            let snapshot = entry.snapshot(&key);
            entries.insert(key.clone(), entry);
            snapshot
        };

        debug!(artifact = %key, "artifact created");
        self.sink.emit(ArtifactEvent::Created { key });
        Ok(snapshot)
    }

    /// Applies a partial payload and/or a progress value.
    ///
    /// The merged payload must pass partial validation; a failing update is
    /// rejected and leaves the artifact as it was.
    pub fn update(&self, key: &ArtifactKey, update: ArtifactUpdate) -> ArtifactResult<Artifact> {
        let progress = update.progress.map(normalize_progress).transpose()?;

        let snapshot = {
            let mut entries = self.entries.lock();
            let entry = entries
                .get_mut(key)
                .ok_or_else(|| ArtifactError::NotFound(key.clone()))?;
            entry.ensure_live(key)?;
            if update.is_empty() {
                return Ok(entry.snapshot(key));
            }

            match update.payload {
                Some(patch) => {
                    let mut merged = entry.raw.clone();
                    merge_payload(&mut merged, patch);
                    let validated = entry.schema.validate_partial(&merged).map_err(|source| {
                        warn!(artifact = %key, error = %source, "partial payload rejected");
                        ArtifactError::Validation {
                            key: key.clone(),
                            source,
                        }
                    })?;
                    entry.transition(key, ArtifactMachineInput::Push)?;
                    entry.raw = merged;
                    entry.payload = validated;
                }
                None => entry.transition(key, ArtifactMachineInput::Progress)?,
            }
            if progress.is_some() {
                entry.progress = progress;
            }
            entry.updated_at = Utc::now();
            entry.snapshot(key)
        };

        debug!(
            artifact = %key,
            status = %snapshot.status,
            progress = ?snapshot.progress,
            "artifact updated"
        );
        self.sink.emit(ArtifactEvent::Updated {
            key: key.clone(),
            status: snapshot.status,
            progress: snapshot.progress,
        });
        Ok(snapshot)
    }

    /// Sets progress without touching the payload. Values are clamped to `[0, 1]`.
    pub fn set_progress(&self, key: &ArtifactKey, progress: f64) -> ArtifactResult<Artifact> {
        self.update(key, ArtifactUpdate::progress(progress))
    }

    /// Completes the artifact after validating against the full schema.
    ///
    /// `payload`, if given, is merged in first. A validation failure moves
    /// the artifact to the error state and is also returned to the caller.
    pub fn complete(&self, key: &ArtifactKey, payload: Option<Value>) -> ArtifactResult<Artifact> {
        let result = {
            let mut entries = self.entries.lock();
            let entry = entries
                .get_mut(key)
                .ok_or_else(|| ArtifactError::NotFound(key.clone()))?;
            entry.ensure_live(key)?;

            let mut merged = entry.raw.clone();
            if let Some(patch) = payload {
                merge_payload(&mut merged, patch);
            }

            match entry.schema.validate_full(&merged) {
                Ok(validated) => {
                    entry.transition(key, ArtifactMachineInput::Complete)?;
                    entry.raw = merged;
                    entry.payload = validated;
                    entry.progress = Some(1.0);
                    entry.updated_at = Utc::now();
                    Ok(entry.snapshot(key))
                }
                Err(source) => {
                    entry.transition(key, ArtifactMachineInput::Fail)?;
                    entry.raw = merged;
                    entry.failure = Some(ArtifactFailure {
                        kind: FailureKind::Validation,
                        reason: source.to_string(),
                        issues: source.issues.clone(),
                    });
                    entry.updated_at = Utc::now();
                    Err(source)
                }
            }
        };

        match result {
            Ok(snapshot) => {
                info!(artifact = %key, "artifact complete");
                self.sink.emit(ArtifactEvent::Completed { key: key.clone() });
                Ok(snapshot)
            }
            Err(source) => {
                warn!(artifact = %key, error = %source, "artifact failed final validation");
                self.sink.emit(ArtifactEvent::Failed {
                    key: key.clone(),
                    kind: FailureKind::Validation,
                    reason: source.to_string(),
                });
                Err(ArtifactError::Validation {
                    key: key.clone(),
                    source,
                })
            }
        }
    }

    /// Moves the artifact to the error state with a producer-supplied reason.
    pub fn fail(&self, key: &ArtifactKey, reason: impl Into<String>) -> ArtifactResult<Artifact> {
        self.terminate(key, FailureKind::Failed, reason.into())
    }

    pub fn cancel(&self, key: &ArtifactKey, reason: Option<String>) -> ArtifactResult<Artifact> {
        let reason = reason.unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
        self.terminate(key, FailureKind::Cancelled, reason)
    }

    pub fn time_out(&self, key: &ArtifactKey) -> ArtifactResult<Artifact> {
        let reason = match self.config.timeout_ms {
            Some(ms) => format!("no update within {ms} ms"),
            None => "timed out".to_string(),
        };
        self.terminate(key, FailureKind::TimedOut, reason)
    }

    fn terminate(&self, key: &ArtifactKey, kind: FailureKind, reason: String) -> ArtifactResult<Artifact> {
        let snapshot = {
            let mut entries = self.entries.lock();
            let entry = entries
                .get_mut(key)
                .ok_or_else(|| ArtifactError::NotFound(key.clone()))?;
            entry.ensure_live(key)?;
            entry.transition(key, ArtifactMachineInput::Fail)?;
            entry.failure = Some(ArtifactFailure::new(kind, reason.clone()));
            entry.updated_at = Utc::now();
            entry.snapshot(key)
        };

        warn!(artifact = %key, kind = kind.as_str(), reason = %reason, "artifact failed");
        self.sink.emit(ArtifactEvent::Failed {
            key: key.clone(),
            kind,
            reason,
        });
        Ok(snapshot)
    }

    /// Times out every live artifact with no update for at least `timeout_ms`.
    ///
    /// Elapsed time is measured from `updated_at`, so no deadline is ever
    /// computed and very large timeouts simply never expire. Returns the keys
    /// that were timed out.
    pub fn poll_timeouts(&self, now: DateTime<Utc>) -> Vec<ArtifactKey> {
        let Some(timeout_ms) = self.config.timeout_ms else {
            return Vec::new();
        };

        let mut expired: Vec<ArtifactKey> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, entry)| !entry.status().is_terminal())
                .filter(|(_, entry)| idle_for_at_least(entry.updated_at, now, timeout_ms))
                .map(|(key, _)| key.clone())
                .collect()
        };
        expired.sort();

        // An artifact may finish between the scan and the timeout call.
        expired.retain(|key| self.time_out(key).is_ok());
        expired
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get(&self, key: &ArtifactKey) -> Option<Artifact> {
        self.entries.lock().get(key).map(|entry| entry.snapshot(key))
    }

    pub fn status(&self, key: &ArtifactKey) -> Option<ArtifactStatus> {
        self.entries.lock().get(key).map(Entry::status)
    }

    /// Every artifact, ordered by key.
    pub fn list(&self) -> Vec<Artifact> {
        let entries = self.entries.lock();
        let mut artifacts: Vec<_> = entries.iter().map(|(key, entry)| entry.snapshot(key)).collect();
        artifacts.sort_by(|a, b| a.key.cmp(&b.key));
        artifacts
    }

    pub fn list_by_type(&self, artifact_type: &str) -> Vec<Artifact> {
        let mut artifacts = self.list();
        artifacts.retain(|artifact| artifact.key.artifact_type == artifact_type);
        artifacts
    }

    /// Drops an artifact in any state.
    pub fn remove(&self, key: &ArtifactKey) -> Option<Artifact> {
        let removed = self.entries.lock().remove(key)?;
        debug!(artifact = %key, "artifact removed");
        self.sink.emit(ArtifactEvent::Removed { key: key.clone() });
        Some(removed.snapshot(key))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    // ========================================================================
    // Store sync
    // ========================================================================

    /// Applies artifact parts that reached `store` since the previous call.
    ///
    /// Only new log entries are read. A part whose sequence number is not
    /// above the last one applied to its artifact is rejected as stale.
    /// Calls for an unknown artifact create it first.
    pub fn sync_from(&self, store: &ChatStore) -> SyncReport {
        let mut cursor = self.cursor.lock();
        let (parts, next) = store.data_parts_since(*cursor);
        *cursor = next;

        let mut report = SyncReport::default();
        for part in parts {
            let Some(artifact_type) = parse_artifact_tag(&part.data_type) else {
                report.skipped += 1;
                continue;
            };
            match self.apply_part(artifact_type, &part) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(
                        data_type = %part.data_type,
                        sequence = part.sequence,
                        error = %err,
                        "artifact part rejected"
                    );
                    report.rejected.push(err);
                }
            }
        }

        if report.applied > 0 || !report.rejected.is_empty() {
            debug!(
                applied = report.applied,
                rejected = report.rejected.len(),
                "artifact sync"
            );
        }
        report
    }

    fn apply_part(&self, artifact_type: &str, part: &DataPart) -> ArtifactResult<()> {
        let envelope: ArtifactEnvelope =
            serde_json::from_value(part.payload.clone()).map_err(|err| {
                ArtifactError::MalformedPart {
                    data_type: part.data_type.clone(),
                    reason: err.to_string(),
                }
            })?;
        let key = ArtifactKey::new(artifact_type, envelope.id);

        if let Some(last_applied) = self.last_sequence(&key) {
            if part.sequence <= last_applied {
                return Err(ArtifactError::StaleSequence {
                    key,
                    sequence: part.sequence,
                    last_applied,
                });
            }
        }

        if !matches!(envelope.op, ArtifactOp::Create) && !self.entries.lock().contains_key(&key) {
            self.create(key.clone())?;
        }

        match envelope.op {
            ArtifactOp::Create => {
                self.create(key.clone())?;
            }
            ArtifactOp::Update { payload, progress } => {
                self.update(&key, ArtifactUpdate { payload, progress })?;
            }
            ArtifactOp::Complete { payload } => {
                self.complete(&key, payload)?;
            }
            ArtifactOp::Fail { reason } => {
                self.fail(&key, reason)?;
            }
            ArtifactOp::Cancel { reason } => {
                self.cancel(&key, reason)?;
            }
            ArtifactOp::Timeout => {
                self.time_out(&key)?;
            }
        }

        if let Some(entry) = self.entries.lock().get_mut(&key) {
            entry.last_sequence = Some(part.sequence);
        }
        Ok(())
    }

    fn last_sequence(&self, key: &ArtifactKey) -> Option<u64> {
        self.entries.lock().get(key).and_then(|entry| entry.last_sequence)
    }
}

impl std::fmt::Debug for ArtifactController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactController")
            .field("artifacts", &self.len())
            .field("schemas", &self.schemas.read().len())
            .field("config", &self.config)
            .finish()
    }
}

/// `now - since >= timeout_ms`, false when `now` precedes `since`.
fn idle_for_at_least(since: DateTime<Utc>, now: DateTime<Utc>, timeout_ms: u64) -> bool {
    u64::try_from(now.signed_duration_since(since).num_milliseconds())
        .map(|elapsed| elapsed >= timeout_ms)
        .unwrap_or(false)
}

fn normalize_progress(progress: f64) -> ArtifactResult<f64> {
    if progress.is_nan() {
        return Err(ArtifactError::InvalidProgress(progress));
    }
    Ok(progress.clamp(0.0, 1.0))
}
