//! Schema Info Extractor: display summary for the final document.
//!
//! Computed once per ingestion from the sanitized (or minimal fallback)
//! document and handed to the caller alongside it, so tree views and
//! warning banners never need a second pass over the tree. A summary with
//! `endpoint_count == 0` is the caller's signal that the schema is not
//! actionable, which it should surface distinctly from "loaded with
//! warnings".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validate::HTTP_METHODS;

/// Read-only summary statistics of an ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// `info.title`, or `"Unknown"` when absent.
    pub title: String,
    /// `info.version`, or `"1.0.0"` when absent.
    pub version: String,
    /// `info.description`, when present.
    pub description: Option<String>,
    /// Number of entries in `servers`.
    pub server_count: usize,
    /// Total operations: the sum over every path item of how many of the
    /// eight standard HTTP method keys are present.
    pub endpoint_count: usize,
    /// Operation tags in first-seen order, deduplicated.
    pub tags: Vec<String>,
}

/// Extract a [`SchemaInfo`] from a final document. Total; degenerate
/// documents produce the defaults.
pub fn extract(document: &Value) -> SchemaInfo {
    let title = document
        .pointer("/info/title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let version = document
        .pointer("/info/version")
        .and_then(Value::as_str)
        .unwrap_or("1.0.0")
        .to_string();
    let description = document
        .pointer("/info/description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let server_count = document
        .get("servers")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    let mut endpoint_count = 0;
    let mut tags = Vec::new();
    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for item in paths.values() {
            let Some(item) = item.as_object() else {
                continue;
            };
            for method in HTTP_METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                endpoint_count += 1;
                if let Some(op_tags) = op.get("tags").and_then(Value::as_array) {
                    for tag in op_tags.iter().filter_map(Value::as_str) {
                        if !tags.iter().any(|t| t == tag) {
                            tags.push(tag.to_string());
                        }
                    }
                }
            }
        }
    }

    SchemaInfo {
        title,
        version,
        description,
        server_count,
        endpoint_count,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn counts_methods_across_paths() {
        let doc = json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "2.1"},
            "paths": {
                "/a": {"get": {}, "post": {}},
                "/b": {"get": {}}
            }
        });
        let info = extract(&doc);
        assert_eq!(info.endpoint_count, 3);
        assert_eq!(info.version, "2.1");
    }

    #[test]
    fn non_method_path_item_keys_are_ignored() {
        let doc = json!({
            "paths": {
                "/a": {
                    "get": {},
                    "summary": "not an operation",
                    "parameters": []
                }
            }
        });
        assert_eq!(extract(&doc).endpoint_count, 1);
    }

    #[test]
    fn defaults_applied_for_degenerate_documents() {
        let info = extract(&json!({}));
        assert_eq!(info.title, "Unknown");
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.description, None);
        assert_eq!(info.server_count, 0);
        assert_eq!(info.endpoint_count, 0);
        assert!(info.tags.is_empty());
    }

    #[test]
    fn tags_deduplicated_in_first_seen_order() {
        let doc = json!({
            "paths": {
                "/a": {"get": {"tags": ["pets", "store"]}},
                "/b": {"post": {"tags": ["store", "users"]}}
            }
        });
        assert_eq!(extract(&doc).tags, ["pets", "store", "users"]);
    }

    #[test]
    fn servers_counted() {
        let doc = json!({
            "servers": [{"url": "https://a"}, {"url": "https://b"}]
        });
        assert_eq!(extract(&doc).server_count, 2);
    }
}
