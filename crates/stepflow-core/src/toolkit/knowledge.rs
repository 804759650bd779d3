//! Knowledge toolkit: a capability-gated set of tools over a knowledge
//! store, plus scratch space for reasoning traces.
//!
//! Capabilities are fixed at construction; the tool list a service sees
//! never changes mid-conversation. The scratch state (thoughts, analyses)
//! is owned by the caller so one toolkit can serve many concurrent
//! conversations.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use stepflow_types::error::PipelineError;
use stepflow_types::knowledge::ContentSource;

use crate::service::knowledge::BoxKnowledgeStore;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Which tools the toolkit exposes. All enabled by default.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeCapabilities {
    pub think: bool,
    pub search: bool,
    pub analyze: bool,
    pub list_content: bool,
    pub add_url_content: bool,
}

impl Default for KnowledgeCapabilities {
    fn default() -> Self {
        Self {
            think: true,
            search: true,
            analyze: true,
            list_content: true,
            add_url_content: true,
        }
    }
}

/// Name and description of one exposed tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Per-conversation scratch state accumulated by the reasoning tools.
#[derive(Debug, Clone, Default)]
pub struct ToolkitState {
    pub thoughts: Vec<String>,
    pub analyses: Vec<String>,
}

// ---------------------------------------------------------------------------
// KnowledgeToolkit
// ---------------------------------------------------------------------------

/// Dispatches tool invocations against a knowledge store.
pub struct KnowledgeToolkit {
    store: Arc<BoxKnowledgeStore>,
    specs: Vec<ToolSpec>,
    capabilities: KnowledgeCapabilities,
}

impl KnowledgeToolkit {
    pub fn new(store: Arc<BoxKnowledgeStore>, capabilities: KnowledgeCapabilities) -> Self {
        let mut specs = Vec::new();
        if capabilities.think {
            specs.push(ToolSpec {
                name: "think",
                description: "Record a reasoning step before acting",
            });
        }
        if capabilities.search {
            specs.push(ToolSpec {
                name: "search",
                description: "Search the knowledge base for relevant documents",
            });
        }
        if capabilities.analyze {
            specs.push(ToolSpec {
                name: "analyze",
                description: "Record an evaluation of gathered results",
            });
        }
        if capabilities.list_content {
            specs.push(ToolSpec {
                name: "list_content",
                description: "List the content indexed in the knowledge base",
            });
        }
        if capabilities.add_url_content {
            specs.push(ToolSpec {
                name: "add_url_content",
                description: "Index the content of a URL into the knowledge base",
            });
        }
        Self {
            store,
            specs,
            capabilities,
        }
    }

    /// The exposed tools, in a fixed order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Invoke a tool by name with JSON arguments.
    pub async fn invoke(
        &self,
        name: &str,
        args: &Value,
        state: &mut ToolkitState,
    ) -> Result<Value, PipelineError> {
        debug!(tool = name, "toolkit invocation");
        match name {
            "think" if self.capabilities.think => {
                let thought = required_str(args, "thought")?;
                state.thoughts.push(thought.to_string());
                Ok(json!(state.thoughts))
            }
            "search" if self.capabilities.search => {
                let query = required_str(args, "query")?;
                let documents = self
                    .store
                    .search(query)
                    .await
                    .map_err(|e| PipelineError::Service(e.to_string()))?;
                serde_json::to_value(documents)
                    .map_err(|e| PipelineError::Execution(e.to_string()))
            }
            "analyze" if self.capabilities.analyze => {
                let analysis = required_str(args, "analysis")?;
                state.analyses.push(analysis.to_string());
                Ok(json!(state.analyses))
            }
            "list_content" if self.capabilities.list_content => {
                let entries = self
                    .store
                    .list_contents()
                    .await
                    .map_err(|e| PipelineError::Service(e.to_string()))?;
                serde_json::to_value(entries).map_err(|e| PipelineError::Execution(e.to_string()))
            }
            "add_url_content" if self.capabilities.add_url_content => {
                let url = required_str(args, "url")?;
                let name = args.get("name").and_then(Value::as_str).map(str::to_string);
                let status = self
                    .store
                    .add_content(
                        ContentSource::Url {
                            url: url.to_string(),
                        },
                        name,
                        None,
                        None,
                    )
                    .await
                    .map_err(|e| PipelineError::Service(e.to_string()))?;
                serde_json::to_value(status).map_err(|e| PipelineError::Execution(e.to_string()))
            }
            other => Err(PipelineError::Execution(format!(
                "unknown or disabled tool '{other}'"
            ))),
        }
    }
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, PipelineError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::Execution(format!("tool argument '{field}' missing")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use stepflow_types::error::RepositoryError;
    use stepflow_types::knowledge::{ContentEntry, ContentStatus, ScoredDocument};

    use crate::service::knowledge::KnowledgeStore;

    struct FakeStore;

    impl KnowledgeStore for FakeStore {
        async fn search(&self, query: &str) -> Result<Vec<ScoredDocument>, RepositoryError> {
            Ok(vec![ScoredDocument {
                name: format!("doc-for-{query}"),
                content: "body".to_string(),
                score: 0.5,
                metadata: HashMap::new(),
            }])
        }

        async fn list_contents(&self) -> Result<Vec<ContentEntry>, RepositoryError> {
            Ok(vec![])
        }

        async fn add_content(
            &self,
            source: ContentSource,
            _name: Option<String>,
            _description: Option<String>,
            _metadata: Option<HashMap<String, String>>,
        ) -> Result<ContentStatus, RepositoryError> {
            match source {
                ContentSource::Url { .. } => Ok(ContentStatus::Added),
                ContentSource::Inline { .. } => Ok(ContentStatus::Duplicate),
            }
        }
    }

    fn toolkit(capabilities: KnowledgeCapabilities) -> KnowledgeToolkit {
        KnowledgeToolkit::new(Arc::new(BoxKnowledgeStore::new(FakeStore)), capabilities)
    }

    #[tokio::test]
    async fn think_accumulates_in_caller_state() {
        let kit = toolkit(KnowledgeCapabilities::default());
        let mut state = ToolkitState::default();

        kit.invoke("think", &json!({"thought": "first"}), &mut state)
            .await
            .unwrap();
        let log = kit
            .invoke("think", &json!({"thought": "second"}), &mut state)
            .await
            .unwrap();

        assert_eq!(log, json!(["first", "second"]));
        assert_eq!(state.thoughts.len(), 2);
    }

    #[tokio::test]
    async fn search_returns_scored_documents() {
        let kit = toolkit(KnowledgeCapabilities::default());
        let mut state = ToolkitState::default();

        let hits = kit
            .invoke("search", &json!({"query": "rust"}), &mut state)
            .await
            .unwrap();
        assert_eq!(hits[0]["name"], "doc-for-rust");
    }

    #[tokio::test]
    async fn disabled_capability_is_not_exposed_or_invocable() {
        let kit = toolkit(KnowledgeCapabilities {
            add_url_content: false,
            ..KnowledgeCapabilities::default()
        });
        assert!(kit.specs().iter().all(|s| s.name != "add_url_content"));

        let mut state = ToolkitState::default();
        let err = kit
            .invoke("add_url_content", &json!({"url": "https://x"}), &mut state)
            .await;
        assert!(matches!(err, Err(PipelineError::Execution(_))));
    }

    #[tokio::test]
    async fn missing_argument_is_reported() {
        let kit = toolkit(KnowledgeCapabilities::default());
        let mut state = ToolkitState::default();

        let err = kit.invoke("search", &json!({}), &mut state).await;
        assert!(matches!(err, Err(PipelineError::Execution(m)) if m.contains("query")));
    }

    #[test]
    fn spec_order_is_fixed() {
        let kit = toolkit(KnowledgeCapabilities::default());
        let names: Vec<&str> = kit.specs().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["think", "search", "analyze", "list_content", "add_url_content"]
        );
    }
}
