//! # Artifact Stream
//!
//! Typed, schema-validated artifacts streamed alongside a chat log.
//!
//! ## Non-negotiable Principles
//!
//! - **The controller is the only writer** - Readers get snapshots
//! - **Terminal means terminal** - Complete and error accept no further calls
//! - **Partial while streaming, full at completion** - Producers may stream incomplete payloads
//! - **Isolation by identity** - One artifact's failure never touches another, or the store
//!
//! ## Architecture
//!
//! ```text
//! WRITE (direct):
//!   controller call → validate → lifecycle machine → event
//!
//! WRITE (via store):
//!   ArtifactWriter → data-artifact-<type> part → sync_from → controller call
//!
//! TIMEOUT:
//!   watchdog tick → poll_timeouts → error (timed out)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use artifact_stream::{
//!     ArtifactConfig, ArtifactController, ArtifactKey, ArtifactStatus, ArtifactUpdate,
//!     FieldSchema, ObjectSchema,
//! };
//! use serde_json::json;
//!
//! let controller = ArtifactController::without_sink(ArtifactConfig::default());
//! controller.register_schema(
//!     "document",
//!     ObjectSchema::new().field("title", FieldSchema::string().required()),
//! );
//!
//! let key = ArtifactKey::new("document", "d1");
//! controller.create(key.clone()).unwrap();
//! controller.update(&key, ArtifactUpdate::payload(json!({"title": "Draft"}))).unwrap();
//! let artifact = controller.complete(&key, None).unwrap();
//!
//! assert_eq!(artifact.status, ArtifactStatus::Complete);
//! assert!(controller.update(&key, ArtifactUpdate::progress(0.5)).is_err());
//! ```
//!
//! ## Crate Structure
//!
//! - [`controller`] - The artifact controller
//! - [`machine`] - Lifecycle state machine
//! - [`schema`] - Partial and full validators
//! - [`writer`] - Producer handle and wire format
//! - [`sink`] - Lifecycle event contracts
//! - [`watchdog`] - Timeout task
//! - [`types`] - Core types
//! - [`config`] - Configuration

pub mod config;
pub mod controller;
mod error;
pub mod machine;
pub mod schema;
pub mod sink;
pub mod types;
pub mod watchdog;
pub mod writer;

#[cfg(test)]
mod tests;

pub use config::ArtifactConfig;
pub use controller::{ArtifactController, SyncReport};
pub use error::{ArtifactError, ArtifactResult};
pub use machine::ArtifactStatus;
pub use schema::{
    AnySchema, ArtifactSchema, FieldIssue, FieldKind, FieldSchema, ObjectSchema, ValidationError,
    ValidationMode,
};
pub use sink::{ArtifactEvent, ArtifactSink, NullSink, RecordingSink};
pub use types::{Artifact, ArtifactFailure, ArtifactKey, ArtifactUpdate, FailureKind};
pub use watchdog::spawn_timeout_watchdog;
pub use writer::{artifact_tag, ArtifactEnvelope, ArtifactOp, ArtifactWriter, ARTIFACT_TAG_PREFIX};
