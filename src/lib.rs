//! OpenAPI Schema Ingestion Pipeline
//!
//! This is where API schemas enter the system. We take a source descriptor
//! (URL or file path), fetch the raw document, and run it through a staged
//! pipeline that turns an arbitrary, possibly non-compliant OpenAPI
//! document into a stable, serializable, queryable tree annotated with a
//! detected platform profile.
//!
//! ## Stages
//!
//! - **Fetch** - URL with a configurable timeout, or local file
//! - **Lenient parse** - JSON-first-then-YAML syntax, OpenAPI major
//!   version 3 gate, `$ref` resolvability check. The only fatal stage
//!   past fetching.
//! - **Strict validate (best-effort)** - spec-compliance findings are
//!   summarized for display, never fatal
//! - **Platform detect** - classify into a known backend profile (Kibana,
//!   Elasticsearch, generic) for request-code generation defaults
//! - **Sanitize** - dereference every `$ref`, cutting reference cycles
//!   with inert placeholders so the result is a tree
//! - **Serialization guard** - verify the tree serializes; degrade to a
//!   minimal metadata-only document if it does not
//! - **Info extraction** - title/version/endpoint-count summary for
//!   display
//!
//! ## Main entry point
//!
//! Call [`ingest`] with a descriptor and a [`SourceKind`], get back an
//! [`IngestionResult`]. Only fetch and parse failures are errors; every
//! other condition is reported as data (`is_valid`, `validation_issues`).
//!
//! ## Example
//!
//! ```
//! use openapi_ingest::{ingest_text, IngestConfig};
//!
//! let text = r#"{
//!     "openapi": "3.0.3",
//!     "info": {"title": "Pet Store", "version": "1.0.0"},
//!     "paths": {
//!         "/pets": {"get": {"responses": {"200": {"description": "ok"}}}}
//!     }
//! }"#;
//!
//! let result = ingest_text(text, "petstore.json", &IngestConfig::default()).unwrap();
//! assert!(result.is_valid);
//! assert_eq!(result.info.title, "Pet Store");
//! assert_eq!(result.info.endpoint_count, 1);
//! assert_eq!(result.platform.id, "generic");
//! ```

use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn, Level};

mod config;
mod error;
mod fetch;
mod info;
mod parse;
mod platform;
mod sanitize;
mod types;
mod validate;

pub use crate::config::{ConfigError, FormatHint, IngestConfig};
pub use crate::error::{FetchError, IngestError, ParseError};
pub use crate::info::SchemaInfo;
pub use crate::parse::{parse_document, ParsedDocument};
pub use crate::platform::{detect as detect_platform, PlatformProfile};
pub use crate::sanitize::{
    is_placeholder, sanitize, SanitizeOutcome, CYCLE_MARKER, ERROR_MARKER,
};
pub use crate::types::{IngestionResult, SourceKind};
pub use crate::validate::{check_compliance, Validation};

/// Issue string appended when the serialization guard degrades the
/// document to minimal metadata. Callers should treat its presence as a
/// stronger warning than ordinary validation issues, since API content
/// was lost.
pub const SERIALIZATION_FALLBACK_ISSUE: &str =
    "schema too complex to preserve fully; reduced to minimal metadata";

/// Ingest a schema from a URL or file with the default configuration.
///
/// # Errors
///
/// Fails only with [`IngestError::Fetch`] or [`IngestError::Parse`];
/// everything else is absorbed into the returned [`IngestionResult`].
pub async fn ingest(descriptor: &str, kind: SourceKind) -> Result<IngestionResult, IngestError> {
    ingest_with_config(descriptor, kind, &IngestConfig::default()).await
}

/// [`ingest`] with explicit configuration.
pub async fn ingest_with_config(
    descriptor: &str,
    kind: SourceKind,
    cfg: &IngestConfig,
) -> Result<IngestionResult, IngestError> {
    let start = Instant::now();

    let text = match fetch::fetch(descriptor, kind, cfg).await {
        Ok(text) => text,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(descriptor, error = %err, elapsed_micros, "ingest_failure");
            return Err(err.into());
        }
    };

    let span = tracing::span!(Level::INFO, "ingest.schema", descriptor, kind = ?kind);
    let _guard = span.enter();

    match ingest_text(&text, descriptor, cfg) {
        Ok(result) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                title = %result.info.title,
                endpoints = result.info.endpoint_count,
                is_valid = result.is_valid,
                platform = %result.platform.id,
                elapsed_micros,
                "ingest_success"
            );
            Ok(result)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(descriptor, error = %err, elapsed_micros, "ingest_failure");
            Err(err.into())
        }
    }
}

/// The synchronous post-fetch pipeline: parse, validate, detect,
/// sanitize, guard, extract. Useful when the caller already holds the
/// document text.
///
/// # Errors
///
/// Fails only with [`ParseError`].
pub fn ingest_text(
    text: &str,
    descriptor: &str,
    cfg: &IngestConfig,
) -> Result<IngestionResult, ParseError> {
    let parsed = parse::parse_document(text, descriptor, cfg)?;
    let validation = validate::check_compliance(&parsed.root, cfg);
    let platform = platform::detect(&parsed.root);
    let outcome = sanitize::sanitize(&parsed.root, cfg);

    let mut issues = Vec::new();
    if let Some(summary) = validation.summary {
        issues.push(summary);
    }
    if !outcome.cycles_cut.is_empty() {
        issues.push(format!(
            "replaced {} circular reference(s) with placeholders",
            outcome.cycles_cut.len()
        ));
    }
    if outcome.subtree_errors > 0 {
        issues.push(format!(
            "{} subtree(s) could not be sanitized and were replaced",
            outcome.subtree_errors
        ));
    }

    let document = guard_serializable(outcome.document, &mut issues);
    let info = info::extract(&document);

    Ok(IngestionResult {
        document,
        is_valid: validation.is_valid,
        validation_issues: issues,
        platform,
        info,
        source: descriptor.to_string(),
        ingested_at: Utc::now(),
    })
}

/// Serialization Guard: verify the sanitized tree actually serializes.
///
/// The serialized text is discarded; only success matters. On failure the
/// document degrades to minimal metadata and the fixed diagnostic string
/// is appended, so the pipeline's output is serializable without
/// exception.
fn guard_serializable(document: Value, issues: &mut Vec<String>) -> Value {
    match serde_json::to_string(&document) {
        Ok(_) => document,
        Err(err) => {
            warn!(error = %err, "serialization_guard_fallback");
            issues.push(SERIALIZATION_FALLBACK_ISSUE.to_string());
            minimal_fallback(&document)
        }
    }
}

/// Metadata-only skeleton retaining `openapi` and `info` with empty
/// `paths` and `components`.
fn minimal_fallback(document: &Value) -> Value {
    json!({
        "openapi": document
            .get("openapi")
            .cloned()
            .unwrap_or_else(|| json!("3.0.0")),
        "info": document
            .get("info")
            .cloned()
            .unwrap_or_else(|| json!({"title": "Unknown", "version": "1.0.0"})),
        "paths": {},
        "components": {},
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cfg() -> IngestConfig {
        IngestConfig::default()
    }

    #[test]
    fn valid_document_ingests_cleanly() {
        let text = json!({
            "openapi": "3.0.3",
            "info": {"title": "Pet Store", "version": "1.0.0"},
            "paths": {
                "/pets": {
                    "get": {"responses": {"200": {"description": "ok"}}},
                    "post": {"responses": {"201": {"description": "created"}}}
                },
                "/stores": {
                    "get": {"responses": {"200": {"description": "ok"}}}
                }
            }
        })
        .to_string();

        let result = ingest_text(&text, "petstore.json", &cfg()).expect("ingest");
        assert!(result.is_valid);
        assert!(result.validation_issues.is_empty());
        assert_eq!(result.info.endpoint_count, 3);
        assert_eq!(result.platform.id, "generic");
        assert_eq!(result.source, "petstore.json");
    }

    #[test]
    fn invalid_enum_value_is_non_fatal() {
        let text = json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/a": {
                    "get": {
                        "parameters": [{"name": "q", "in": "qwery"}],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        })
        .to_string();

        let result = ingest_text(&text, "spec.json", &cfg()).expect("must not fail");
        assert!(!result.is_valid);
        assert!(!result.validation_issues.is_empty());
        assert_eq!(result.info.endpoint_count, 1);
    }

    #[test]
    fn cyclic_document_produces_serializable_result() {
        let text = json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        })
        .to_string();

        let result = ingest_text(&text, "cyclic.json", &cfg()).expect("ingest");
        // Cycles do not flip validity; they are a structural fact of the
        // source, noted as an issue for visibility.
        assert!(result
            .validation_issues
            .iter()
            .any(|i| i.contains("circular reference")));
        assert!(serde_json::to_string(&result.document).is_ok());
        assert!(serde_json::to_string(&result).is_ok());
    }

    #[test]
    fn unsupported_version_is_fatal() {
        let text = r#"{"swagger": "2.0", "info": {"title": "t", "version": "1"}}"#;
        let result = ingest_text(text, "old.json", &cfg());
        assert!(matches!(
            result,
            Err(ParseError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn minimal_fallback_retains_metadata_only() {
        let doc = json!({
            "openapi": "3.0.3",
            "info": {"title": "Big", "version": "9"},
            "paths": {"/a": {"get": {}}},
            "components": {"schemas": {"X": {}}}
        });
        let fallback = minimal_fallback(&doc);
        assert_eq!(fallback["openapi"], "3.0.3");
        assert_eq!(fallback["info"]["title"], "Big");
        assert_eq!(fallback["paths"], json!({}));
        assert_eq!(fallback["components"], json!({}));
    }

    #[test]
    fn minimal_fallback_defaults_when_fields_absent() {
        let fallback = minimal_fallback(&json!({}));
        assert_eq!(fallback["openapi"], "3.0.0");
        assert_eq!(fallback["info"]["title"], "Unknown");
    }

    #[test]
    fn guard_passes_well_formed_documents_through() {
        let doc = json!({"openapi": "3.0.3", "paths": {}});
        let mut issues = Vec::new();
        let out = guard_serializable(doc.clone(), &mut issues);
        assert_eq!(out, doc);
        assert!(issues.is_empty());
    }

    #[test]
    fn kibana_document_gets_kibana_profile_end_to_end() {
        let text = json!({
            "openapi": "3.0.3",
            "info": {"title": "Kibana APIs", "version": "8.x"},
            "paths": {
                "/api/spaces": {"get": {"responses": {"200": {"description": "ok"}}}}
            }
        })
        .to_string();

        let result = ingest_text(&text, "kibana.json", &cfg()).expect("ingest");
        assert_eq!(result.platform.id, "kibana");
        assert!(result.platform.required_headers.contains_key("kbn-xsrf"));
    }
}
