//! RemoteFetch trait for downloading files referenced by pipeline input.

use std::future::Future;
use std::pin::Pin;

use stepflow_types::error::FetchError;

/// A file retrieved from a remote URL.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Trait for fetching remote files (invoice PDFs, source documents).
pub trait RemoteFetch: Send + Sync {
    /// Download the file at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedFile, FetchError>> + Send;
}

/// Object-safe version of [`RemoteFetch`] with boxed futures.
pub trait RemoteFetchDyn: Send + Sync {
    fn fetch_boxed<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedFile, FetchError>> + Send + 'a>>;
}

impl<T: RemoteFetch> RemoteFetchDyn for T {
    fn fetch_boxed<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedFile, FetchError>> + Send + 'a>> {
        Box::pin(self.fetch(url))
    }
}

/// Type-erased fetcher for runtime backend selection.
pub struct BoxRemoteFetch {
    inner: Box<dyn RemoteFetchDyn + Send + Sync>,
}

impl BoxRemoteFetch {
    pub fn new<T: RemoteFetch + 'static>(fetcher: T) -> Self {
        Self {
            inner: Box::new(fetcher),
        }
    }

    /// Download the file at `url`.
    pub async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        self.inner.fetch_boxed(url).await
    }
}
