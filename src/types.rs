//! Core data model types for the ingestion pipeline.
//!
//! These types represent the shape of ingest requests and the sanitized
//! results that flow to the caller (and from there into whatever
//! persistence layer owns schema records). They are designed to be:
//!
//! - **Serializable**: the whole [`IngestionResult`] round-trips through
//!   JSON, which is the pipeline's contract with storage
//! - **Cloneable**: cheap to hand across UI/persistence boundaries
//! - **Comparable**: equality checks for testing
//!
//! # Type Hierarchy
//!
//! ```text
//! ingest(descriptor, SourceKind)
//!        ↓
//! IngestionResult
//! ├── document: Value            (sanitized, acyclic, serializable)
//! ├── is_valid: bool             (strict-validation outcome, non-fatal)
//! ├── validation_issues: Vec<String>
//! ├── platform: PlatformProfile  (detected backend defaults)
//! ├── info: SchemaInfo           (display summary)
//! ├── source: String             (original URL or path)
//! └── ingested_at: DateTime<Utc>
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::info::SchemaInfo;
use crate::platform::PlatformProfile;

/// Where a schema document is loaded from.
///
/// Determines which fetch primitive is used and how transport errors are
/// classified; it does not affect parsing, which always auto-detects or
/// follows the configured [`FormatHint`](crate::FormatHint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Fetch over HTTP(S) with the configured timeout.
    Url,
    /// Read from the local filesystem.
    File,
}

/// The value returned to callers for every successful ingestion.
///
/// `is_valid = false` signals "usable with caveats", never "unusable":
/// the document still parsed, every `$ref` resolved, and the sanitized
/// tree is serializable. Callers are expected to display
/// `validation_issues` as a non-blocking warning, persist `document` as an
/// opaque blob, and use `platform` to parameterize request-code
/// generation. A result whose [`SchemaInfo::endpoint_count`] is zero is
/// not actionable and should be treated by the caller as a hard failure
/// even though ingestion itself succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    /// The sanitized (or minimal fallback) document. Guaranteed acyclic
    /// and JSON-serializable.
    pub document: Value,

    /// Whether the document passed strict specification validation.
    pub is_valid: bool,

    /// Human-presentable issue summaries: validation findings, cycle-cut
    /// notes, and the serialization-fallback diagnostic when it applies.
    pub validation_issues: Vec<String>,

    /// The detected platform profile; the generic profile when no
    /// signature matched.
    pub platform: PlatformProfile,

    /// Display summary computed from the final document.
    pub info: SchemaInfo,

    /// The original source descriptor (URL or path) this result was
    /// ingested from.
    pub source: String,

    /// When this result was produced.
    pub ingested_at: DateTime<Utc>,
}
