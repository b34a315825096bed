//! Platform Detector: classify a document into a known backend profile.
//!
//! Some API backends need fixed request defaults that the OpenAPI document
//! itself does not declare: Kibana rejects requests without its CSRF
//! header, Elastic deployments commonly run behind self-signed
//! certificates. Detection is a pure, deterministic substring match of a
//! small ordered signature table against the document's title,
//! description, and server URLs; the first matching signature wins and the
//! generic profile is the universal fallback. The table order is part of
//! the contract and must stay stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A named bundle of request defaults for a recognized backend family.
///
/// Attached to every [`IngestionResult`](crate::IngestionResult); code
/// generators use it to emit required headers, format the authorization
/// header, and decide whether to relax TLS verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Stable identifier (`"kibana"`, `"elasticsearch"`, `"generic"`).
    pub id: String,

    /// Headers every request against this backend must carry.
    pub required_headers: BTreeMap<String, String>,

    /// Authorization header template with a `{credentials}` placeholder.
    pub auth_header_format: String,

    /// Whether generated clients should accept self-signed certificates.
    pub allow_self_signed_certificates: bool,
}

impl PlatformProfile {
    /// The universal fallback profile: no required headers, bearer auth,
    /// strict TLS.
    pub fn generic() -> Self {
        PlatformProfile {
            id: "generic".into(),
            required_headers: BTreeMap::new(),
            auth_header_format: "Bearer {credentials}".into(),
            allow_self_signed_certificates: false,
        }
    }

    fn kibana() -> Self {
        PlatformProfile {
            id: "kibana".into(),
            required_headers: BTreeMap::from([
                ("kbn-xsrf".to_string(), "true".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]),
            auth_header_format: "ApiKey {credentials}".into(),
            allow_self_signed_certificates: true,
        }
    }

    fn elasticsearch() -> Self {
        PlatformProfile {
            id: "elasticsearch".into(),
            required_headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            auth_header_format: "ApiKey {credentials}".into(),
            allow_self_signed_certificates: true,
        }
    }

    /// Render the authorization header value for the given credentials.
    pub fn authorization_header(&self, credentials: &str) -> String {
        self.auth_header_format.replace("{credentials}", credentials)
    }
}

/// Signature table, in match priority order. Kibana outranks
/// Elasticsearch because Kibana documents frequently mention Elastic in
/// their descriptions; the generic profile is not listed because it is the
/// fallback when nothing matches.
const SIGNATURES: &[(&str, &[&str])] = &[
    ("kibana", &["kibana", "kbn"]),
    ("elasticsearch", &["elasticsearch", "elastic cloud"]),
];

fn profile_for(id: &str) -> PlatformProfile {
    match id {
        "kibana" => PlatformProfile::kibana(),
        "elasticsearch" => PlatformProfile::elasticsearch(),
        _ => PlatformProfile::generic(),
    }
}

/// Detect the platform profile for a parsed document.
///
/// Candidates are the lowercased `info.title`, `info.description`, and
/// every `servers[].url`. Never fails; unrecognized documents get the
/// generic profile.
pub fn detect(root: &Value) -> PlatformProfile {
    let mut candidates: Vec<String> = Vec::new();
    for pointer in ["/info/title", "/info/description"] {
        if let Some(text) = root.pointer(pointer).and_then(Value::as_str) {
            candidates.push(text.to_lowercase());
        }
    }
    if let Some(servers) = root.get("servers").and_then(Value::as_array) {
        for server in servers {
            if let Some(url) = server.get("url").and_then(Value::as_str) {
                candidates.push(url.to_lowercase());
            }
        }
    }

    for (id, keywords) in SIGNATURES {
        let matched = keywords
            .iter()
            .any(|kw| candidates.iter().any(|c| c.contains(kw)));
        if matched {
            debug!(platform = id, "platform_detected");
            return profile_for(id);
        }
    }
    PlatformProfile::generic()
}
