//! Step kinds: service-backed steps, custom function steps, and nested
//! sequences.
//!
//! Every step kind resolves to the same contract: given a `StepContext`,
//! produce a `StepOutput`. Failures inside a step never escape as errors;
//! they are captured into a fatal output so the runner can halt and record
//! them uniformly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::Value;
use tracing::{debug, warn};

use stepflow_types::error::PipelineError;
use stepflow_types::generate::{Attachment, GenerationRequest};
use stepflow_types::pipeline::StepOutput;

use super::context::StepContext;
use super::parallel::ParallelGroup;
use crate::service::generate::BoxGenerationService;

const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// JSON schema for a type, in the form generation services accept as a
/// structured-output constraint.
pub fn schema_for_type<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Runnable
// ---------------------------------------------------------------------------

/// A named unit of pipeline work.
#[derive(Clone)]
pub enum Runnable {
    /// Delegates to an external generation service.
    Service(ServiceStep),
    /// Runs arbitrary async code.
    Function(FunctionStep),
    /// Runs members concurrently.
    Parallel(ParallelGroup),
    /// Runs members in order, as one step of the outer pipeline.
    Sequence(SequenceGroup),
}

impl Runnable {
    pub fn name(&self) -> &str {
        match self {
            Runnable::Service(s) => &s.name,
            Runnable::Function(f) => &f.name,
            Runnable::Parallel(p) => p.name(),
            Runnable::Sequence(s) => &s.name,
        }
    }

    /// Execute this step against the context. Boxed because groups recurse.
    pub fn execute<'a>(
        &'a self,
        ctx: &'a StepContext,
    ) -> Pin<Box<dyn Future<Output = StepOutput> + Send + 'a>> {
        Box::pin(async move {
            match self {
                Runnable::Service(s) => s.execute(ctx).await,
                Runnable::Function(f) => f.execute(ctx).await,
                Runnable::Parallel(p) => p.execute(ctx).await,
                Runnable::Sequence(s) => s.execute(ctx).await,
            }
        })
    }

    /// Collect this step's name and, for groups, every member name.
    pub(crate) fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        names.push(self.name());
        match self {
            Runnable::Parallel(p) => {
                for member in p.members() {
                    member.collect_names(names);
                }
            }
            Runnable::Sequence(s) => {
                for member in &s.members {
                    member.collect_names(names);
                }
            }
            _ => {}
        }
    }
}

impl From<ServiceStep> for Runnable {
    fn from(step: ServiceStep) -> Self {
        Runnable::Service(step)
    }
}

impl From<FunctionStep> for Runnable {
    fn from(step: FunctionStep) -> Self {
        Runnable::Function(step)
    }
}

impl From<ParallelGroup> for Runnable {
    fn from(group: ParallelGroup) -> Self {
        Runnable::Parallel(group)
    }
}

impl From<SequenceGroup> for Runnable {
    fn from(group: SequenceGroup) -> Self {
        Runnable::Sequence(group)
    }
}

// ---------------------------------------------------------------------------
// ServiceStep
// ---------------------------------------------------------------------------

/// A step that renders a prompt template and calls a generation service.
#[derive(Clone)]
pub struct ServiceStep {
    pub(crate) name: String,
    service: Arc<BoxGenerationService>,
    model: String,
    model_field: Option<String>,
    instructions: Option<String>,
    prompt: String,
    output_schema: Option<Value>,
    schema_name: Option<String>,
    attachment_steps: Vec<String>,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl ServiceStep {
    pub fn new(name: impl Into<String>, service: Arc<BoxGenerationService>) -> Self {
        Self {
            name: name.into(),
            service,
            model: DEFAULT_MODEL.to_string(),
            model_field: None,
            instructions: None,
            prompt: String::new(),
            output_schema: None,
            schema_name: None,
            attachment_steps: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Resolve the model per run from a string field of the pipeline input,
    /// falling back to the configured model when the field is absent.
    pub fn model_from_input(mut self, field: impl Into<String>) -> Self {
        self.model_field = Some(field.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Prompt template; `{{ steps.<name>.output }}` and `{{ input.<field> }}`
    /// placeholders are expanded at execution time.
    pub fn prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt = template.into();
        self
    }

    /// Constrain the response to the JSON schema of `T`.
    pub fn output_schema<T: JsonSchema>(mut self, schema_name: impl Into<String>) -> Self {
        self.output_schema = Some(schema_for_type::<T>());
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Attach the file recorded by a prior step. The step's content must
    /// carry `filename`, `content_type`, and `base64` fields.
    pub fn attachment_from_step(mut self, step_name: impl Into<String>) -> Self {
        self.attachment_steps.push(step_name.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    async fn execute(&self, ctx: &StepContext) -> StepOutput {
        let mut attachments = Vec::with_capacity(self.attachment_steps.len());
        for step_name in &self.attachment_steps {
            match self.attachment_from(ctx, step_name) {
                Ok(attachment) => attachments.push(attachment),
                Err(message) => return StepOutput::fatal(message),
            }
        }

        let model = self.resolve_model(ctx);
        let request = GenerationRequest {
            model: model.clone(),
            instructions: self.instructions.clone(),
            input: ctx.render(&self.prompt),
            attachments,
            output_schema: self.output_schema.clone(),
            schema_name: self.schema_name.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            step = %self.name,
            model = %model,
            service = self.service.name(),
            structured = self.output_schema.is_some(),
            "calling generation service"
        );

        match self.service.generate(&request).await {
            Ok(response) => {
                debug!(
                    step = %self.name,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "generation complete"
                );
                StepOutput::success(response.content)
            }
            Err(err) => {
                warn!(step = %self.name, error = %err, "generation failed");
                StepOutput::fatal(err.to_string())
            }
        }
    }

    fn resolve_model(&self, ctx: &StepContext) -> String {
        self.model_field
            .as_deref()
            .and_then(|field| ctx.input.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.model.clone())
    }

    fn attachment_from(&self, ctx: &StepContext, step_name: &str) -> Result<Attachment, String> {
        let content = ctx
            .step_content(step_name)
            .map_err(|e| e.to_string())?;
        let data = content
            .get("base64")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                format!("step '{step_name}' did not record an attachable file")
            })?;
        let filename = content
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or("attachment");
        let content_type = content
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream");
        Ok(Attachment {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: data.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FunctionStep
// ---------------------------------------------------------------------------

type StepFn = dyn Fn(StepContext) -> Pin<Box<dyn Future<Output = Result<StepOutput, PipelineError>> + Send>>
    + Send
    + Sync;

/// A step that runs a custom async function.
///
/// The function receives a clone of the context. Both returned `Err`s and
/// panics are converted into a fatal output with the message captured; the
/// function runs on its own task so a panic never unwinds past the engine.
#[derive(Clone)]
pub struct FunctionStep {
    pub(crate) name: String,
    func: Arc<StepFn>,
}

impl FunctionStep {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutput, PipelineError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |ctx| Box::pin(func(ctx))),
        }
    }

    async fn execute(&self, ctx: &StepContext) -> StepOutput {
        let func = Arc::clone(&self.func);
        let ctx = ctx.clone();
        // Own task: a panicking function must not unwind past the engine.
        match tokio::spawn(async move { func(ctx).await }).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(step = %self.name, error = %err, "function step failed");
                StepOutput::fatal(err.to_string())
            }
            Err(err) => {
                let message = panic_message(err);
                warn!(step = %self.name, error = %message, "function step panicked");
                StepOutput::fatal(message)
            }
        }
    }
}

/// Extract the payload of a panicked step task.
fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "step panicked".to_string()
        }
    } else {
        "step task cancelled".to_string()
    }
}

// ---------------------------------------------------------------------------
// SequenceGroup
// ---------------------------------------------------------------------------

/// An ordered group of steps that runs as a single step of the outer
/// pipeline.
///
/// Members see the outer outputs plus their earlier siblings through a local
/// overlay of the store; sibling outputs do not leak into the outer store
/// except through the group's aggregate output. A fatal member halts the
/// remaining members.
#[derive(Clone)]
pub struct SequenceGroup {
    pub(crate) name: String,
    pub(crate) members: Vec<Runnable>,
}

impl SequenceGroup {
    pub fn new(name: impl Into<String>, members: Vec<Runnable>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    async fn execute(&self, ctx: &StepContext) -> StepOutput {
        let mut local = ctx.clone();
        let mut results = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let output = member.execute(&local).await.named(member.name());
            let halt = output.stop;
            if let Err(err) = local.store.insert(member.name(), output.clone()) {
                results.push(StepOutput::fatal(err.to_string()).named(member.name()));
                break;
            }
            results.push(output);
            if halt {
                debug!(group = %self.name, member = member.name(), "sequence halted");
                break;
            }
        }
        StepOutput::group(results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    use stepflow_types::generate::{
        GenerationError, GenerationRequest, GenerationResponse, Usage,
    };

    use crate::service::generate::GenerationService;

    fn ctx() -> StepContext {
        StepContext::new(json!({"topic": "rust"}), Uuid::now_v7(), "test")
    }

    struct CapturingService;

    impl GenerationService for CapturingService {
        fn name(&self) -> &str {
            "capture"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            Ok(GenerationResponse {
                id: "r1".to_string(),
                content: json!({
                    "input": request.input,
                    "model": request.model,
                    "attachments": request.attachments.len(),
                }),
                model: request.model.clone(),
                usage: Usage::default(),
            })
        }
    }

    struct FailingService;

    impl GenerationService for FailingService {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            Err(GenerationError::Api {
                status: 500,
                message: "upstream down".to_string(),
            })
        }
    }

    // -----------------------------------------------------------------------
    // ServiceStep
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn service_step_renders_prompt_and_succeeds() {
        let service = Arc::new(BoxGenerationService::new(CapturingService));
        let step = ServiceStep::new("research", service)
            .model("gpt-4.1-mini")
            .prompt("Research {{ input.topic }}");

        let out = step.execute(&ctx()).await;
        assert!(out.success);
        assert_eq!(out.content["input"], "Research rust");
        assert_eq!(out.content["model"], "gpt-4.1-mini");
    }

    #[tokio::test]
    async fn model_resolves_from_input_with_fallback() {
        let service = Arc::new(BoxGenerationService::new(CapturingService));
        let step = ServiceStep::new("extract", Arc::clone(&service))
            .model("configured-model")
            .model_from_input("model_id")
            .prompt("x");

        let mut context = StepContext::new(
            json!({"model_id": "per-run-model"}),
            Uuid::now_v7(),
            "test",
        );
        let out = step.execute(&context).await;
        assert_eq!(out.content["model"], "per-run-model");

        // Field absent: configured model applies.
        context.input = json!({});
        let out = step.execute(&context).await;
        assert_eq!(out.content["model"], "configured-model");
    }

    #[tokio::test]
    async fn service_step_failure_is_fatal() {
        let service = Arc::new(BoxGenerationService::new(FailingService));
        let step = ServiceStep::new("research", service).prompt("x");

        let out = step.execute(&ctx()).await;
        assert!(!out.success);
        assert!(out.stop);
        assert!(out.error_message().unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn service_step_forwards_attachments() {
        let mut context = ctx();
        context
            .store
            .insert(
                "download",
                StepOutput::success(json!({
                    "filename": "inv.pdf",
                    "content_type": "application/pdf",
                    "base64": "JVBERg==",
                })),
            )
            .unwrap();

        let service = Arc::new(BoxGenerationService::new(CapturingService));
        let step = ServiceStep::new("extract", service)
            .prompt("extract")
            .attachment_from_step("download");

        let out = step.execute(&context).await;
        assert!(out.success);
        assert_eq!(out.content["attachments"], 1);
    }

    #[tokio::test]
    async fn missing_attachment_step_is_fatal() {
        let service = Arc::new(BoxGenerationService::new(CapturingService));
        let step = ServiceStep::new("extract", service)
            .prompt("extract")
            .attachment_from_step("download");

        let out = step.execute(&ctx()).await;
        assert!(out.stop);
        assert!(out.error_message().unwrap().contains("download"));
    }

    // -----------------------------------------------------------------------
    // FunctionStep
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn function_step_runs_and_reads_input() {
        let step = FunctionStep::new("shout", |ctx: StepContext| async move {
            let topic = ctx.input["topic"].as_str().unwrap_or_default();
            Ok(StepOutput::success(json!(topic.to_uppercase())))
        });

        let out = step.execute(&ctx()).await;
        assert!(out.success);
        assert_eq!(out.content, json!("RUST"));
    }

    #[tokio::test]
    async fn function_step_panic_becomes_fatal_output() {
        let step = FunctionStep::new("oob", |_ctx: StepContext| async move {
            let empty: Vec<i64> = Vec::new();
            Ok(StepOutput::success(json!(empty[0])))
        });

        let out = step.execute(&ctx()).await;
        assert!(!out.success);
        assert!(out.stop);
        assert!(
            out.error_message()
                .unwrap()
                .contains("index out of bounds")
        );
    }

    #[tokio::test]
    async fn function_step_error_becomes_fatal_output() {
        let step = FunctionStep::new("boom", |_ctx: StepContext| async move {
            Err(PipelineError::Execution("bad state".to_string()))
        });

        let out = step.execute(&ctx()).await;
        assert!(out.stop);
        assert!(out.error_message().unwrap().contains("bad state"));
    }

    // -----------------------------------------------------------------------
    // SequenceGroup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sequence_members_see_earlier_siblings() {
        let first = FunctionStep::new("first", |_ctx: StepContext| async move {
            Ok(StepOutput::success(json!("alpha")))
        });
        let second = FunctionStep::new("second", |ctx: StepContext| async move {
            let prior = ctx.step_content("first")?.clone();
            Ok(StepOutput::success(json!({"saw": prior})))
        });

        let group = SequenceGroup::new("seq", vec![first.into(), second.into()]);
        let out = group.execute(&ctx()).await;
        assert!(out.success);
        assert_eq!(out.member("second").unwrap().content["saw"], "alpha");
    }

    #[tokio::test]
    async fn sequence_halts_after_fatal_member() {
        let first = FunctionStep::new("first", |_ctx: StepContext| async move {
            Ok(StepOutput::fatal("cannot continue"))
        });
        let second = FunctionStep::new("second", |_ctx: StepContext| async move {
            Ok(StepOutput::success(json!("never")))
        });

        let group = SequenceGroup::new("seq", vec![first.into(), second.into()]);
        let out = group.execute(&ctx()).await;
        assert!(out.stop);
        assert_eq!(out.members.as_ref().unwrap().len(), 1);
        assert!(out.member("second").is_none());
    }

    #[tokio::test]
    async fn sequence_outputs_stay_local() {
        let only = FunctionStep::new("inner", |_ctx: StepContext| async move {
            Ok(StepOutput::success(json!("x")))
        });
        let group = SequenceGroup::new("seq", vec![only.into()]);

        let context = ctx();
        let _ = group.execute(&context).await;
        // Outer store untouched
        assert!(context.store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Name collection
    // -----------------------------------------------------------------------

    #[test]
    fn collect_names_recurses_into_groups() {
        let inner = FunctionStep::new("inner", |_ctx: StepContext| async move {
            Ok(StepOutput::success(json!(1)))
        });
        let group: Runnable = SequenceGroup::new("group", vec![inner.into()]).into();

        let mut names = Vec::new();
        group.collect_names(&mut names);
        assert_eq!(names, vec!["group", "inner"]);
    }
}
