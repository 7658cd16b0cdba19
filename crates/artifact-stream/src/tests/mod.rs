//! Behavioural tests for artifact streaming.
//!
//! Test organization, by concern:
//!
//! - `lifecycle.rs` - Status transitions, validation modes, terminal states
//! - `sync.rs`      - Artifacts driven through chat store data parts
//! - `isolation.rs` - Failures stay local to one artifact


use std::sync::Arc;

use serde_json::json;

use crate::{
    ArtifactConfig, ArtifactController, FieldSchema, ObjectSchema, RecordingSink,
};

/// Schema used across the suites: a document with a required title and
/// sections, each of which needs a heading.
pub(crate) fn document_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field("title", FieldSchema::string().required())
        .field(
            "status",
            FieldSchema::enumeration(["draft", "final"]).with_default(json!("draft")),
        )
        .field(
            "sections",
            FieldSchema::array(FieldSchema::object(
                ObjectSchema::new()
                    .field("heading", FieldSchema::string().required())
                    .field("body", FieldSchema::string()),
            ))
            .required(),
        )
}

pub(crate) fn controller() -> (Arc<ArtifactController>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let controller = Arc::new(ArtifactController::new(
        ArtifactConfig::default(),
        sink.clone(),
    ));
    controller.register_schema("document", document_schema());
    (controller, sink)
}
