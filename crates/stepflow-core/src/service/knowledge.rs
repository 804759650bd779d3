//! KnowledgeStore trait for semantic retrieval over indexed content.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use stepflow_types::error::RepositoryError;
use stepflow_types::knowledge::{ContentEntry, ContentSource, ContentStatus, ScoredDocument};

/// Trait for semantic search and content management over a knowledge base.
pub trait KnowledgeStore: Send + Sync {
    /// Search the knowledge base, returning documents ranked by relevance.
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ScoredDocument>, RepositoryError>> + Send;

    /// List the metadata of all indexed content.
    fn list_contents(
        &self,
    ) -> impl Future<Output = Result<Vec<ContentEntry>, RepositoryError>> + Send;

    /// Index new content, reporting whether it was added or already present.
    fn add_content(
        &self,
        source: ContentSource,
        name: Option<String>,
        description: Option<String>,
        metadata: Option<HashMap<String, String>>,
    ) -> impl Future<Output = Result<ContentStatus, RepositoryError>> + Send;
}

/// Object-safe version of [`KnowledgeStore`] with boxed futures.
pub trait KnowledgeStoreDyn: Send + Sync {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredDocument>, RepositoryError>> + Send + 'a>>;

    fn list_contents_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ContentEntry>, RepositoryError>> + Send + 'a>>;

    fn add_content_boxed<'a>(
        &'a self,
        source: ContentSource,
        name: Option<String>,
        description: Option<String>,
        metadata: Option<HashMap<String, String>>,
    ) -> Pin<Box<dyn Future<Output = Result<ContentStatus, RepositoryError>> + Send + 'a>>;
}

impl<T: KnowledgeStore> KnowledgeStoreDyn for T {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredDocument>, RepositoryError>> + Send + 'a>>
    {
        Box::pin(self.search(query))
    }

    fn list_contents_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ContentEntry>, RepositoryError>> + Send + 'a>>
    {
        Box::pin(self.list_contents())
    }

    fn add_content_boxed<'a>(
        &'a self,
        source: ContentSource,
        name: Option<String>,
        description: Option<String>,
        metadata: Option<HashMap<String, String>>,
    ) -> Pin<Box<dyn Future<Output = Result<ContentStatus, RepositoryError>> + Send + 'a>> {
        Box::pin(self.add_content(source, name, description, metadata))
    }
}

/// Type-erased knowledge store for runtime backend selection.
pub struct BoxKnowledgeStore {
    inner: Box<dyn KnowledgeStoreDyn + Send + Sync>,
}

impl BoxKnowledgeStore {
    pub fn new<T: KnowledgeStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ScoredDocument>, RepositoryError> {
        self.inner.search_boxed(query).await
    }

    pub async fn list_contents(&self) -> Result<Vec<ContentEntry>, RepositoryError> {
        self.inner.list_contents_boxed().await
    }

    pub async fn add_content(
        &self,
        source: ContentSource,
        name: Option<String>,
        description: Option<String>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<ContentStatus, RepositoryError> {
        self.inner
            .add_content_boxed(source, name, description, metadata)
            .await
    }
}
