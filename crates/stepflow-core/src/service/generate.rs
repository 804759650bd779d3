//! GenerationService trait definition and its type-erased wrapper.
//!
//! The core abstraction for LLM-backed steps. Uses RPITIT (native async fn
//! in traits, Rust 2024 edition); since RPITIT traits are not object-safe,
//! `BoxGenerationService` provides dynamic dispatch via the same
//! blanket-impl pattern used throughout the workspace:
//!
//! 1. Define an object-safe `GenerationServiceDyn` trait with boxed futures
//! 2. Blanket-impl `GenerationServiceDyn` for all `T: GenerationService`
//! 3. `BoxGenerationService` wraps `Box<dyn GenerationServiceDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use stepflow_types::generate::{GenerationError, GenerationRequest, GenerationResponse};

/// Trait for external generation service backends.
///
/// Must support both free-text and schema-constrained structured output:
/// when `request.output_schema` is set, the returned `content` is the
/// structured value conforming to that schema.
pub trait GenerationService: Send + Sync {
    /// Human-readable service name (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Send a generation request and receive the full response.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<GenerationResponse, GenerationError>> + Send;
}

/// Object-safe version of [`GenerationService`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch; a blanket
/// implementation is provided for all types implementing `GenerationService`.
pub trait GenerationServiceDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, GenerationError>> + Send + 'a>>;
}

impl<T: GenerationService> GenerationServiceDyn for T {
    fn name(&self) -> &str {
        GenerationService::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, GenerationError>> + Send + 'a>>
    {
        Box::pin(self.generate(request))
    }
}

/// Type-erased generation service for runtime backend selection.
pub struct BoxGenerationService {
    inner: Box<dyn GenerationServiceDyn + Send + Sync>,
}

impl BoxGenerationService {
    /// Wrap a concrete `GenerationService` in a type-erased box.
    pub fn new<T: GenerationService + 'static>(service: T) -> Self {
        Self {
            inner: Box::new(service),
        }
    }

    /// Human-readable service name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Send a generation request and receive the full response.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.inner.generate_boxed(request).await
    }
}
