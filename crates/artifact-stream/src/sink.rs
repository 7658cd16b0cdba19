//! Lifecycle event contracts for the artifact controller.
//!
//! Events are emitted after a transition is committed.
//!
//! # Design Principles
//!
//! - The controller emits events
//! - The sink decides what they mean
//! - Tests assert emission, not behavior
//! - Rejected calls emit nothing

use parking_lot::Mutex;

use crate::machine::ArtifactStatus;
use crate::types::{ArtifactKey, FailureKind};

/// An event emitted after an artifact transition is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactEvent {
    /// An artifact was created.
    Created { key: ArtifactKey },
    /// Payload or progress changed.
    Updated {
        key: ArtifactKey,
        status: ArtifactStatus,
        progress: Option<f64>,
    },
    /// The artifact completed with a fully validated payload.
    Completed { key: ArtifactKey },
    /// The artifact entered the error state.
    Failed {
        key: ArtifactKey,
        kind: FailureKind,
        reason: String,
    },
    /// The artifact was removed from the controller.
    Removed { key: ArtifactKey },
}

impl ArtifactEvent {
    pub fn key(&self) -> &ArtifactKey {
        match self {
            Self::Created { key }
            | Self::Updated { key, .. }
            | Self::Completed { key }
            | Self::Failed { key, .. }
            | Self::Removed { key } => key,
        }
    }
}

/// A sink that receives artifact events.
pub trait ArtifactSink: Send + Sync {
    /// Called after the corresponding transition has been committed.
    fn emit(&self, event: ArtifactEvent);
}

/// A no-op sink that discards all events.
#[derive(Debug, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn emit(&self, _event: ArtifactEvent) {}
}

/// A sink that records all events for testing.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ArtifactEvent>>,
}

impl RecordingSink {
    /// Creates a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    pub fn events(&self) -> Vec<ArtifactEvent> {
        self.events.lock().clone()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactSink for RecordingSink {
    fn emit(&self, event: ArtifactEvent) {
        self.events.lock().push(event);
    }
}
