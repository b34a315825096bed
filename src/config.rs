//! Configuration for the ingestion pipeline.
//!
//! [`IngestConfig`] controls fetch timeouts, sanitizer budgets, and how
//! strict-validation findings are summarized for display. It is cheap to
//! clone and serializes cleanly so it can be loaded from external
//! configuration formats such as JSON, TOML, or YAML.
//!
//! # Quick Start
//!
//! ```rust
//! use openapi_ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("invalid configuration");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared syntax of a fetched document.
///
/// `Auto` attempts JSON first and falls back to YAML, which matches how
/// most registries serve OpenAPI documents with loose content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FormatHint {
    /// Try JSON, then YAML.
    #[default]
    Auto,
    /// Parse as JSON only.
    Json,
    /// Parse as YAML only.
    Yaml,
}

/// Runtime configuration for ingestion behavior.
///
/// # Fields
///
/// - `fetch_timeout_ms`: upper bound on network fetches (file reads are not
///   time-bounded beyond the host's I/O defaults)
/// - `format`: syntax hint for the lenient parser
/// - `max_node_visits`: sanitizer walk budget; documents with extreme
///   `$ref` fan-out degrade to error placeholders instead of running away
/// - `max_depth`: maximum expansion depth during sanitization
/// - `max_reported_issues`: how many validation violations are spelled out
///   before eliding the rest as `(and N more)`
/// - `max_issue_message_chars`: truncation bound for unstructured validator
///   messages
///
/// The summarization thresholds are presentation defaults, not correctness
/// properties; they may be raised or lowered, but never to zero, since the
/// summary must always record that issues exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Network fetch timeout in milliseconds.
    ///
    /// Default: `30_000`
    pub fetch_timeout_ms: u64,

    /// Syntax hint for the fetched document.
    ///
    /// Default: [`FormatHint::Auto`]
    #[serde(default)]
    pub format: FormatHint,

    /// Maximum number of nodes the sanitizer will materialize in one walk.
    ///
    /// Exceeding the budget replaces the remaining subtree with an error
    /// placeholder rather than aborting the document.
    ///
    /// Default: `1_000_000`
    pub max_node_visits: usize,

    /// Maximum `$ref` expansion depth during sanitization.
    ///
    /// Default: `128`
    pub max_depth: usize,

    /// Number of discrete validation violations included verbatim in the
    /// issue summary.
    ///
    /// Default: `3`
    pub max_reported_issues: usize,

    /// Character bound applied to unstructured validator error messages.
    ///
    /// Default: `150`
    pub max_issue_message_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 30_000,
            format: FormatHint::Auto,
            max_node_visits: 1_000_000,
            max_depth: 128,
            max_reported_issues: 3,
            max_issue_message_chars: 150,
        }
    }
}

/// Errors that can occur when validating an [`IngestConfig`].
///
/// These are configuration-time issues intended to be surfaced at startup
/// rather than per request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A limit that must be at least 1 was configured as 0.
    ///
    /// Zero budgets would make every document degrade (`max_node_visits`,
    /// `max_depth`) or silently drop the existence of validation issues
    /// (`max_reported_issues`, `max_issue_message_chars`).
    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Inexpensive; call once at process startup.
    ///
    /// ```rust
    /// use openapi_ingest::IngestConfig;
    ///
    /// let bad = IngestConfig {
    ///     max_reported_issues: 0,
    ///     ..Default::default()
    /// };
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_node_visits", self.max_node_visits),
            ("max_depth", self.max_depth),
            ("max_reported_issues", self.max_reported_issues),
            ("max_issue_message_chars", self.max_issue_message_chars),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "fetch_timeout_ms",
            });
        }
        Ok(())
    }
}
