//! Structural validators for artifact payloads.
//!
//! A schema validates in one of two modes:
//!
//! - [`ValidationMode::Partial`] while the artifact streams: missing fields
//!   are allowed and defaults are filled in where the schema declares them.
//! - [`ValidationMode::Full`] at completion: every required field must
//!   resolve, either from the payload or from a default.
//!
//! Type mismatches are reported in both modes. Validation never throws for
//! bad input; it returns the normalized payload or a [`ValidationError`]
//! listing every issue found, each with a JSON pointer to the field.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Partial,
    Full,
}

/// One problem found in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// JSON pointer to the offending field; empty for the root.
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation issue(s): ", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldIssue::new(path, message)])
    }

    /// True if any issue points at `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

/// A validator for one artifact type.
pub trait ArtifactSchema: Send + Sync {
    /// Validates `value` and returns the normalized payload.
    fn validate(&self, value: &Value, mode: ValidationMode) -> Result<Value, ValidationError>;

    fn validate_partial(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate(value, ValidationMode::Partial)
    }

    fn validate_full(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate(value, ValidationMode::Full)
    }
}

/// Accepts any payload unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnySchema;

impl ArtifactSchema for AnySchema {
    fn validate(&self, value: &Value, _mode: ValidationMode) -> Result<Value, ValidationError> {
        Ok(value.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<FieldSchema>),
    Object(ObjectSchema),
    Enumeration(Vec<String>),
    Any,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Enumeration(_) => "enumeration value",
            Self::Any => "any value",
        }
    }
}

/// Schema for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSchema {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self::of(FieldKind::Array(Box::new(items)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(FieldKind::Enumeration(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn any() -> Self {
        Self::of(FieldKind::Any)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the field is absent. Satisfies `required`.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self, value: &Value, path: &str, mode: ValidationMode, issues: &mut Vec<FieldIssue>) -> Value {
        match (&self.kind, value) {
            (FieldKind::Any, _) => value.clone(),
            (FieldKind::String, Value::String(_)) => value.clone(),
            (FieldKind::Boolean, Value::Bool(_)) => value.clone(),
            (FieldKind::Number, Value::Number(_)) => value.clone(),
            (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => value.clone(),
            (FieldKind::Enumeration(allowed), Value::String(s)) => {
                if !allowed.iter().any(|candidate| candidate == s) {
                    issues.push(FieldIssue::new(
                        path,
                        format!("expected one of [{}], got {s:?}", allowed.join(", ")),
                    ));
                }
                value.clone()
            }
            (FieldKind::Array(items), Value::Array(elements)) => Value::Array(
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| items.check(element, &format!("{path}/{i}"), mode, issues))
                    .collect(),
            ),
            (FieldKind::Object(schema), Value::Object(map)) => {
                Value::Object(schema.check_map(map, path, mode, issues))
            }
            (kind, other) => {
                issues.push(FieldIssue::new(
                    path,
                    format!("expected {}, got {}", kind.describe(), type_name(other)),
                ));
                value.clone()
            }
        }
    }
}

/// Object schema built field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<(String, FieldSchema)>,
    deny_unknown: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    /// Reports fields the schema does not declare.
    pub fn deny_unknown_fields(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    fn check_map(
        &self,
        map: &Map<String, Value>,
        path: &str,
        mode: ValidationMode,
        issues: &mut Vec<FieldIssue>,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for (name, field) in &self.fields {
            let field_path = format!("{path}/{}", escape_pointer(name));
            match map.get(name).filter(|value| !value.is_null()) {
                Some(value) => {
                    out.insert(name.clone(), field.check(value, &field_path, mode, issues));
                }
                None => {
                    if let Some(default) = &field.default {
                        out.insert(name.clone(), default.clone());
                    } else if field.required && mode == ValidationMode::Full {
                        issues.push(FieldIssue::new(field_path, "required field is missing"));
                    }
                }
            }
        }

        let declared: HashSet<&str> = self.field_names().collect();
        for (name, value) in map {
            if declared.contains(name.as_str()) {
                continue;
            }
            if self.deny_unknown {
                issues.push(FieldIssue::new(
                    format!("{path}/{}", escape_pointer(name)),
                    "unknown field",
                ));
            } else {
                out.insert(name.clone(), value.clone());
            }
        }
        out
    }
}

impl ArtifactSchema for ObjectSchema {
    fn validate(&self, value: &Value, mode: ValidationMode) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let normalized = match value {
            Value::Object(map) => Value::Object(self.check_map(map, "", mode, &mut issues)),
            // A stream that has not produced anything yet.
            Value::Null if mode == ValidationMode::Partial => {
                Value::Object(self.check_map(&Map::new(), "", mode, &mut issues))
            }
            other => {
                issues.push(FieldIssue::new(
                    "",
                    format!("expected object, got {}", type_name(other)),
                ));
                Value::Null
            }
        };

        if issues.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("title", FieldSchema::string().required())
            .field("kind", FieldSchema::enumeration(["text", "code"]).with_default(json!("text")))
            .field("words", FieldSchema::integer())
            .field(
                "sections",
                FieldSchema::array(FieldSchema::object(
                    ObjectSchema::new().field("heading", FieldSchema::string().required()),
                ))
                .required(),
            )
    }

    #[test]
    fn partial_allows_missing_required_fields() {
        let schema = document_schema();
        let value = schema.validate_partial(&json!({"title": "Draft"})).unwrap();
        assert_eq!(value, json!({"title": "Draft", "kind": "text"}));
    }

    #[test]
    fn partial_still_rejects_wrong_types() {
        let schema = document_schema();
        let err = schema.validate_partial(&json!({"title": 42})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("/title", "expected string, got number")]);
    }

    #[test]
    fn partial_accepts_null_as_empty_stream() {
        let schema = document_schema();
        assert_eq!(schema.validate_partial(&Value::Null).unwrap(), json!({"kind": "text"}));
        assert!(schema.validate_full(&Value::Null).is_err());
    }

    #[test]
    fn full_requires_every_required_field() {
        let schema = document_schema();
        let err = schema.validate_full(&json!({"words": 3})).unwrap_err();
        assert!(err.has_issue_at("/title"));
        assert!(err.has_issue_at("/sections"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn full_validates_nested_items_with_paths() {
        let schema = document_schema();
        let err = schema
            .validate_full(&json!({
                "title": "Doc",
                "sections": [{"heading": "One"}, {"body": "no heading"}]
            }))
            .unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("/sections/1/heading", "required field is missing")]);
    }

    #[test]
    fn full_accepts_complete_payload_and_fills_defaults() {
        let schema = document_schema();
        let value = schema
            .validate_full(&json!({
                "title": "Doc",
                "words": 120,
                "sections": [],
                "extra": true
            }))
            .unwrap();
        assert_eq!(value["kind"], json!("text"));
        assert_eq!(value["extra"], json!(true));
    }

    #[test]
    fn integer_rejects_fractions() {
        let schema = ObjectSchema::new().field("n", FieldSchema::integer());
        assert!(schema.validate_full(&json!({"n": 1.5})).is_err());
        assert!(schema.validate_full(&json!({"n": -3})).is_ok());
    }

    #[test]
    fn enumeration_reports_allowed_values() {
        let schema = document_schema();
        let err = schema
            .validate_partial(&json!({"kind": "video"}))
            .unwrap_err();
        assert_eq!(err.issues[0].path, "/kind");
        assert!(err.issues[0].message.contains("text, code"));
    }

    #[test]
    fn unknown_fields_can_be_denied() {
        let schema = ObjectSchema::new()
            .field("a", FieldSchema::any())
            .deny_unknown_fields();
        let err = schema.validate_partial(&json!({"a": 1, "b/c": 2})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("/b~1c", "unknown field")]);
    }

    #[test]
    fn root_must_be_an_object() {
        let err = document_schema().validate_full(&json!([1, 2])).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("", "expected object, got array")]);
        assert_eq!(err.to_string(), "1 validation issue(s): (root): expected object, got array");
    }
}
