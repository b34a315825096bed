//! Document Fetcher: retrieves raw schema text from a URL or file path.
//!
//! The fetcher is the only stage that performs I/O. URL fetches are bounded
//! by [`IngestConfig::fetch_timeout_ms`](crate::IngestConfig); file reads
//! are not time-bounded beyond the host's I/O defaults. No retries happen
//! here; retry policy belongs to the caller. Cancellation is cooperative:
//! dropping the returned future aborts an in-flight request, and no
//! downstream stage runs.

use std::io;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::FetchError;
use crate::types::SourceKind;

/// Fetch the raw document text for `descriptor`.
///
/// # Errors
///
/// Returns a [`FetchError`] classifying the failure as `Network`,
/// `NotFound`, `PermissionDenied`, or `Timeout`.
pub async fn fetch(
    descriptor: &str,
    kind: SourceKind,
    cfg: &IngestConfig,
) -> Result<String, FetchError> {
    let text = match kind {
        SourceKind::Url => fetch_url(descriptor, cfg).await?,
        SourceKind::File => fetch_file(descriptor).await?,
    };
    debug!(descriptor, bytes = text.len(), "schema_fetched");
    Ok(text)
}

async fn fetch_url(descriptor: &str, cfg: &IngestConfig) -> Result<String, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(cfg.fetch_timeout_ms))
        .build()
        .map_err(|e| FetchError::Network {
            descriptor: descriptor.to_string(),
            detail: e.to_string(),
        })?;

    let response = client
        .get(descriptor)
        .send()
        .await
        .map_err(|e| classify_reqwest(descriptor, cfg, &e))?;

    let status = response.status();
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            return Err(FetchError::NotFound {
                descriptor: descriptor.to_string(),
            });
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(FetchError::PermissionDenied {
                descriptor: descriptor.to_string(),
            });
        }
        s if !s.is_success() => {
            return Err(FetchError::Network {
                descriptor: descriptor.to_string(),
                detail: format!("unexpected HTTP status {s}"),
            });
        }
        _ => {}
    }

    response
        .text()
        .await
        .map_err(|e| classify_reqwest(descriptor, cfg, &e))
}

async fn fetch_file(descriptor: &str) -> Result<String, FetchError> {
    tokio::fs::read_to_string(descriptor)
        .await
        .map_err(|e| classify_io(descriptor, &e))
}

fn classify_reqwest(descriptor: &str, cfg: &IngestConfig, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            descriptor: descriptor.to_string(),
            timeout_ms: cfg.fetch_timeout_ms,
        }
    } else {
        FetchError::Network {
            descriptor: descriptor.to_string(),
            detail: error.to_string(),
        }
    }
}

fn classify_io(descriptor: &str, error: &io::Error) -> FetchError {
    match error.kind() {
        io::ErrorKind::NotFound => FetchError::NotFound {
            descriptor: descriptor.to_string(),
        },
        io::ErrorKind::PermissionDenied => FetchError::PermissionDenied {
            descriptor: descriptor.to_string(),
        },
        _ => FetchError::Network {
            descriptor: descriptor.to_string(),
            detail: error.to_string(),
        },
    }
}
