//! Lenient Parser: raw text to a usable OpenAPI tree.
//!
//! "Lenient" means the parser enforces syntax, the OpenAPI major version,
//! and `$ref` resolvability, and nothing else. Spec-compliance is the strict
//! validator's job and is never fatal. The three failures here are the only
//! unrecoverable outcomes past fetching:
//!
//! - the text is neither valid JSON nor valid YAML
//! - the `openapi` field is absent or its major version is not 3
//! - a `$ref` pointer does not locate a node in the document
//!
//! Reference *expansion* is deliberately not performed here. A dereferenced
//! OpenAPI graph may be cyclic, which a [`serde_json::Value`] tree cannot
//! represent; expansion happens in the sanitizer where back-edges are cut.
//! This stage only guarantees that every reference target exists, so that
//! an unresolvable pointer is a fatal parse error rather than a silent
//! placeholder later.

use serde_json::Value;

use crate::config::{FormatHint, IngestConfig};
use crate::error::ParseError;

/// A syntactically valid OpenAPI 3.x document with all `$ref` targets
/// verified to exist. References are still in place; the tree is exactly
/// what the source text declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Document root. Always a JSON object with an `openapi` field whose
    /// major version is 3.
    pub root: Value,
}

/// Parse raw schema text into a [`ParsedDocument`].
///
/// # Errors
///
/// Returns [`ParseError::Syntax`], [`ParseError::UnsupportedVersion`], or
/// [`ParseError::Resolution`]; all are fatal to the pipeline.
pub fn parse_document(
    text: &str,
    descriptor: &str,
    cfg: &IngestConfig,
) -> Result<ParsedDocument, ParseError> {
    let root = parse_syntax(text, descriptor, cfg.format)?;
    check_version(&root, descriptor)?;
    check_references(&root, descriptor)?;
    Ok(ParsedDocument { root })
}

fn parse_syntax(text: &str, descriptor: &str, format: FormatHint) -> Result<Value, ParseError> {
    let syntax_error = |detail: String| ParseError::Syntax {
        descriptor: descriptor.to_string(),
        detail,
    };

    match format {
        FormatHint::Json => {
            serde_json::from_str(text).map_err(|e| syntax_error(format!("JSON: {e}")))
        }
        FormatHint::Yaml => {
            serde_yaml::from_str(text).map_err(|e| syntax_error(format!("YAML: {e}")))
        }
        FormatHint::Auto => serde_json::from_str(text).or_else(|json_err| {
            serde_yaml::from_str(text)
                .map_err(|yaml_err| syntax_error(format!("JSON: {json_err}; YAML: {yaml_err}")))
        }),
    }
}

fn check_version(root: &Value, descriptor: &str) -> Result<(), ParseError> {
    // Swagger 2.0 documents declare `swagger` instead of `openapi`; report
    // the version they declared rather than "<missing>".
    let declared = root
        .get("openapi")
        .or_else(|| root.get("swagger"))
        .and_then(Value::as_str);

    match declared {
        Some(version) if version.split('.').next() == Some("3") => Ok(()),
        found => Err(ParseError::UnsupportedVersion {
            descriptor: descriptor.to_string(),
            found: found.map(str::to_string),
        }),
    }
}

fn check_references(root: &Value, descriptor: &str) -> Result<(), ParseError> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    let pointer = ref_to_pointer(reference).ok_or_else(|| {
                        ParseError::Resolution {
                            descriptor: descriptor.to_string(),
                            reference: reference.clone(),
                        }
                    })?;
                    if root.pointer(&pointer).is_none() {
                        return Err(ParseError::Resolution {
                            descriptor: descriptor.to_string(),
                            reference: reference.clone(),
                        });
                    }
                }
                stack.extend(map.values());
            }
            Value::Array(items) => stack.extend(items.iter()),
            _ => {}
        }
    }
    Ok(())
}

/// Convert a local `$ref` string into a JSON pointer.
///
/// Returns `None` for external references (anything not rooted at `#`),
/// which this pipeline does not resolve. `"#"` alone maps to the empty
/// pointer (the document root).
pub(crate) fn ref_to_pointer(reference: &str) -> Option<String> {
    let fragment = reference.strip_prefix('#')?;
    if fragment.is_empty() || fragment.starts_with('/') {
        Some(fragment.to_string())
    } else {
        None
    }
}
