//! Strict Validator: best-effort specification-compliance checking.
//!
//! Two layers, both non-fatal to the pipeline:
//!
//! 1. A structural compliance walk over the raw tree, producing discrete
//!    violations with JSON-pointer paths (empty `required`/`enum` arrays,
//!    operations without responses, malformed parameters, unknown schema
//!    types, duplicate operation ids, paths not starting with `/`).
//! 2. Typed deserialization into [`openapiv3::OpenAPI`] as the strictness
//!    boundary for everything the walk does not model; its error is
//!    unstructured and is truncated for display.
//!
//! Violations are summarized for humans: the first few formatted as
//! `"<path>: <message>"` joined with `", "`, with `" (and N more)"`
//! appended when the list was elided. The summary is a display concern:
//! callers get one string plus the raw count, never a structured error
//! list. Nothing in this module can fail the pipeline; every outcome is
//! data.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::config::IngestConfig;

/// The eight operation keys a path item may carry.
pub(crate) const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMA_TYPES: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];
const PARAMETER_LOCATIONS: [&str; 4] = ["query", "header", "path", "cookie"];

/// Outcome of the strict validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// True when the document is fully specification-compliant.
    pub is_valid: bool,
    /// Human-presentable summary of the violations, absent when valid.
    pub summary: Option<String>,
    /// Total number of violations found (may exceed what the summary
    /// spells out).
    pub total: usize,
}

impl Validation {
    fn valid() -> Self {
        Validation {
            is_valid: true,
            summary: None,
            total: 0,
        }
    }
}

/// A single structural violation: a JSON-pointer-like path and a message.
struct Violation {
    path: String,
    message: String,
}

/// Run the strict compliance check against a parsed document.
///
/// Never fails; any error from the underlying typed model is converted
/// into an invalid-with-summary outcome.
pub fn check_compliance(root: &Value, cfg: &IngestConfig) -> Validation {
    let mut violations = Vec::new();
    check_info(root, &mut violations);
    check_paths(root, &mut violations);
    check_schemas(root, &mut String::new(), &mut violations);

    if !violations.is_empty() {
        debug!(total = violations.len(), "strict_validation_failed");
        return summarize(&violations, cfg);
    }

    // Structured checks passed; let the typed model judge the rest.
    match serde_json::from_value::<openapiv3::OpenAPI>(root.clone()) {
        Ok(_) => Validation::valid(),
        Err(err) => {
            debug!(error = %err, "typed_model_rejected_document");
            let mut message: String = err.to_string();
            if message.chars().count() > cfg.max_issue_message_chars {
                message = message.chars().take(cfg.max_issue_message_chars).collect();
            }
            Validation {
                is_valid: false,
                summary: Some(message),
                total: 1,
            }
        }
    }
}

fn summarize(violations: &[Violation], cfg: &IngestConfig) -> Validation {
    let shown = cfg.max_reported_issues.min(violations.len());
    let mut summary = violations[..shown]
        .iter()
        .map(|v| format!("{}: {}", v.path, v.message))
        .collect::<Vec<_>>()
        .join(", ");
    if violations.len() > shown {
        summary.push_str(&format!(" (and {} more)", violations.len() - shown));
    }
    Validation {
        is_valid: false,
        summary: Some(summary),
        total: violations.len(),
    }
}

fn check_info(root: &Value, out: &mut Vec<Violation>) {
    let title = root.pointer("/info/title").and_then(Value::as_str);
    if title.map_or(true, str::is_empty) {
        out.push(Violation {
            path: "/info/title".into(),
            message: "a non-empty title is required".into(),
        });
    }
    if root.pointer("/info/version").and_then(Value::as_str).is_none() {
        out.push(Violation {
            path: "/info/version".into(),
            message: "a version string is required".into(),
        });
    }
}

fn check_paths(root: &Value, out: &mut Vec<Violation>) {
    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        out.push(Violation {
            path: "/paths".into(),
            message: "a paths object is required".into(),
        });
        return;
    };

    let mut operation_ids: HashSet<&str> = HashSet::new();
    for (path, item) in paths {
        let item_ptr = format!("/paths/{}", escape(path));
        if !path.starts_with('/') {
            out.push(Violation {
                path: item_ptr.clone(),
                message: "path must begin with '/'".into(),
            });
        }
        let Some(item) = item.as_object() else {
            continue;
        };
        for method in HTTP_METHODS {
            let Some(op) = item.get(method) else {
                continue;
            };
            let op_ptr = format!("{item_ptr}/{method}");
            let has_ref = op.get("$ref").is_some();
            let responses = op.get("responses").and_then(Value::as_object);
            if !has_ref && responses.map_or(true, |r| r.is_empty()) {
                out.push(Violation {
                    path: format!("{op_ptr}/responses"),
                    message: "operation must define at least one response".into(),
                });
            }
            if let Some(id) = op.get("operationId").and_then(Value::as_str) {
                if !operation_ids.insert(id) {
                    out.push(Violation {
                        path: format!("{op_ptr}/operationId"),
                        message: format!("duplicate operationId '{id}'"),
                    });
                }
            }
            if let Some(params) = op.get("parameters").and_then(Value::as_array) {
                for (i, param) in params.iter().enumerate() {
                    check_parameter(param, &format!("{op_ptr}/parameters/{i}"), out);
                }
            }
        }
        // Path-item level parameters, shared by every operation.
        if let Some(params) = item.get("parameters").and_then(Value::as_array) {
            for (i, param) in params.iter().enumerate() {
                check_parameter(param, &format!("{item_ptr}/parameters/{i}"), out);
            }
        }
    }
}

fn check_parameter(param: &Value, ptr: &str, out: &mut Vec<Violation>) {
    let Some(map) = param.as_object() else {
        return;
    };
    if map.get("$ref").is_some() {
        return;
    }
    if map.get("name").and_then(Value::as_str).is_none() {
        out.push(Violation {
            path: ptr.to_string(),
            message: "parameter must define 'name'".into(),
        });
    }
    match map.get("in").and_then(Value::as_str) {
        None => out.push(Violation {
            path: ptr.to_string(),
            message: "parameter must define 'in'".into(),
        }),
        Some(location) if !PARAMETER_LOCATIONS.contains(&location) => out.push(Violation {
            path: format!("{ptr}/in"),
            message: format!("'{location}' is not a valid parameter location"),
        }),
        Some(_) => {}
    }
}

/// Schema-level checks applied everywhere in the tree: empty `required`
/// and `enum` arrays, unknown `type` values, array schemas without
/// `items`. Recursion depth is bounded by the syntax parser's own limits.
fn check_schemas(node: &Value, ptr: &mut String, out: &mut Vec<Violation>) {
    match node {
        Value::Object(map) => {
            let schema_like = map.contains_key("type")
                || map.contains_key("properties")
                || map.contains_key("required")
                || map.contains_key("enum");
            if schema_like {
                if let Some(required) = map.get("required").and_then(Value::as_array) {
                    if required.is_empty() {
                        out.push(Violation {
                            path: format!("{ptr}/required"),
                            message: "`required` must be a non-empty array".into(),
                        });
                    }
                }
                if let Some(variants) = map.get("enum").and_then(Value::as_array) {
                    if variants.is_empty() {
                        out.push(Violation {
                            path: format!("{ptr}/enum"),
                            message: "`enum` must be a non-empty array".into(),
                        });
                    }
                }
                if let Some(ty) = map.get("type").and_then(Value::as_str) {
                    if !SCHEMA_TYPES.contains(&ty) {
                        out.push(Violation {
                            path: format!("{ptr}/type"),
                            message: format!("unknown schema type '{ty}'"),
                        });
                    }
                    if ty == "array" && map.get("items").is_none() {
                        out.push(Violation {
                            path: ptr.clone(),
                            message: "array schema must define 'items'".into(),
                        });
                    }
                }
            }
            for (key, value) in map {
                // Security schemes carry a `type` field with its own value
                // set; vendor extensions may contain anything.
                if key == "securitySchemes" || key.starts_with("x-") {
                    continue;
                }
                let saved = ptr.len();
                ptr.push('/');
                ptr.push_str(&escape(key));
                check_schemas(value, ptr, out);
                ptr.truncate(saved);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.iter().enumerate() {
                let saved = ptr.len();
                ptr.push('/');
                ptr.push_str(&i.to_string());
                check_schemas(value, ptr, out);
                ptr.truncate(saved);
            }
        }
        _ => {}
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
