//! Error types produced by the ingestion pipeline.
//!
//! Only two failure families are fatal and surface as `Err` from the
//! pipeline entry points: [`FetchError`] (the document could not be
//! retrieved) and [`ParseError`] (the document could not be turned into a
//! usable OpenAPI tree). Everything downstream of the lenient parser
//! (strict-validation violations, cycle cuts, serialization fallback) is
//! absorbed into the returned [`IngestionResult`](crate::IngestionResult)
//! as data, never as an error.
//!
//! All errors are typed, cloneable, and comparable to enable precise error
//! handling and testing.
//!
//! # Fatal vs non-fatal
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Network failure, 404, 403, timeout | `Err(IngestError::Fetch(..))` |
//! | Invalid JSON and YAML syntax | `Err(IngestError::Parse(Syntax))` |
//! | Missing/unsupported `openapi` version | `Err(IngestError::Parse(UnsupportedVersion))` |
//! | Unresolvable `$ref` | `Err(IngestError::Parse(Resolution))` |
//! | Spec-compliance violations | `Ok` with `is_valid = false` |
//! | Circular references | `Ok`, cycles cut with placeholders |
//! | Serialization failure | `Ok`, minimal fallback document |

use thiserror::Error;

/// Errors raised while retrieving raw schema bytes from a URL or file path.
///
/// The variant set is fixed: callers branch on these four kinds to choose
/// user messaging (retry hints for timeouts, credential prompts for
/// permission failures). No retries happen at this layer; retry policy
/// belongs to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// Transport-level failure: DNS, connection refused, TLS, non-auth HTTP
    /// error status, or any file I/O error without a more specific mapping.
    #[error("network failure fetching '{descriptor}': {detail}")]
    Network { descriptor: String, detail: String },

    /// The document does not exist (HTTP 404/410, or a missing file).
    #[error("schema source not found: '{descriptor}'")]
    NotFound { descriptor: String },

    /// Access was denied (HTTP 401/403, or filesystem permissions).
    #[error("permission denied fetching '{descriptor}'")]
    PermissionDenied { descriptor: String },

    /// The configured fetch timeout elapsed before the response completed.
    #[error("timed out after {timeout_ms}ms fetching '{descriptor}'")]
    Timeout { descriptor: String, timeout_ms: u64 },
}

impl FetchError {
    /// Returns true when retrying the same fetch may succeed (transient
    /// transport conditions). `NotFound` and `PermissionDenied` are
    /// deterministic and not worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network { .. } | FetchError::Timeout { .. })
    }
}

/// Errors raised by the lenient parser.
///
/// This is the only stage past fetching that can stop the pipeline
/// outright: a document that is not syntactically JSON or YAML, declares an
/// unsupported OpenAPI major version, or contains a `$ref` whose target
/// cannot be located is not usable downstream in any degraded form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The text is neither valid JSON nor valid YAML.
    #[error("'{descriptor}' is not valid JSON or YAML: {detail}")]
    Syntax { descriptor: String, detail: String },

    /// The `openapi` field is absent or its major version is not 3.
    ///
    /// Swagger 2.0 documents land here; the pipeline does not attempt
    /// version migration.
    #[error("'{descriptor}' has unsupported OpenAPI version {}", found.as_deref().unwrap_or("<missing>"))]
    UnsupportedVersion {
        descriptor: String,
        /// The declared version string, if any was present.
        found: Option<String>,
    },

    /// A `$ref` pointer does not resolve to a node in the document.
    ///
    /// External (non-`#`) references also land here: the resolver is
    /// local-only and never fetches referenced documents over the network.
    #[error("'{descriptor}' contains unresolvable $ref '{reference}'")]
    Resolution { descriptor: String, reference: String },
}

/// Top-level error returned by [`ingest`](crate::ingest).
///
/// Wraps the two fatal stage errors; see the module docs for the full
/// fatal-vs-non-fatal boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}
