//! HTTP implementation of the `RemoteFetch` port.

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use stepflow_core::service::fetch::{FetchedFile, RemoteFetch};
use stepflow_types::error::FetchError;

/// Downloads remote files over HTTP(S) with a bounded timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("failed to create reqwest client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteFetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?
            .to_vec();

        let filename = filename_from_url(url)
            .unwrap_or_else(|| format!("download-{}", Uuid::now_v7()));

        debug!(url, bytes = bytes.len(), filename = %filename, "fetched remote file");

        Ok(FetchedFile {
            bytes,
            filename,
            content_type,
        })
    }
}

/// The last path segment of the URL, if it looks like a filename.
fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let segment = path.rsplit('/').next()?;
    if segment.contains('.') {
        Some(segment.to_string())
    } else {
        None
    }
}
