//! Step context: the read view a step gets of the run so far.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use stepflow_types::error::PipelineError;
use stepflow_types::pipeline::StepOutput;

use super::store::StepOutputStore;

// ---------------------------------------------------------------------------
// StepContext
// ---------------------------------------------------------------------------

/// Snapshot handed to each executing step: the validated pipeline input plus
/// every prior step's output. Steps read from the context; only the runner
/// writes to the store.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub input: Value,
    pub store: StepOutputStore,
    pub run_id: Uuid,
    pub pipeline_name: String,
}

impl StepContext {
    pub fn new(input: Value, run_id: Uuid, pipeline_name: impl Into<String>) -> Self {
        Self {
            input,
            store: StepOutputStore::new(),
            run_id,
            pipeline_name: pipeline_name.into(),
        }
    }

    /// Deserialize the pipeline input into a typed record.
    pub fn typed_input<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| PipelineError::InputValidation(e.to_string()))
    }

    /// A prior step's full output.
    pub fn step_output(&self, name: &str) -> Result<&StepOutput, PipelineError> {
        self.store.output(name)
    }

    /// A prior step's content payload.
    pub fn step_content(&self, name: &str) -> Result<&Value, PipelineError> {
        self.store.content(name)
    }

    /// Expand `{{ steps.<name>.output }}` and `{{ input.<field> }}`
    /// placeholders in a prompt template.
    ///
    /// String values are substituted raw; other JSON values are serialized.
    /// Placeholders that do not resolve are left verbatim so the failure is
    /// visible in the rendered prompt.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let token = after[..close].trim();
                    match self.resolve(token) {
                        Some(value) => rendered.push_str(&value),
                        None => {
                            rendered.push_str("{{");
                            rendered.push_str(&after[..close]);
                            rendered.push_str("}}");
                        }
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    rendered.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }

    fn resolve(&self, token: &str) -> Option<String> {
        if let Some(path) = token.strip_prefix("steps.") {
            let name = path.strip_suffix(".output")?;
            let content = self.store.content(name).ok()?;
            Some(render_value(content))
        } else if let Some(field) = token.strip_prefix("input.") {
            self.input.get(field).map(render_value)
        } else {
            None
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn context_with(step: &str, content: Value) -> StepContext {
        let mut ctx = StepContext::new(
            json!({"file_link": "https://x/inv.pdf", "count": 3}),
            Uuid::now_v7(),
            "test-pipeline",
        );
        ctx.store.insert(step, StepOutput::success(content)).unwrap();
        ctx
    }

    #[test]
    fn typed_input_deserializes() {
        #[derive(Deserialize)]
        struct Input {
            file_link: String,
            count: u32,
        }

        let ctx = context_with("download", json!("ok"));
        let input: Input = ctx.typed_input().unwrap();
        assert_eq!(input.file_link, "https://x/inv.pdf");
        assert_eq!(input.count, 3);
    }

    #[test]
    fn typed_input_rejects_mismatched_shape() {
        #[derive(Deserialize)]
        struct Input {
            #[allow(dead_code)]
            missing_field: String,
        }

        let ctx = context_with("download", json!("ok"));
        let err = ctx.typed_input::<Input>();
        assert!(matches!(err, Err(PipelineError::InputValidation(_))));
    }

    #[test]
    fn render_substitutes_step_output_and_input() {
        let ctx = context_with("research", json!("Acme builds rockets"));
        let prompt = ctx.render(
            "Summarize {{ steps.research.output }} for {{ input.file_link }}.",
        );
        assert_eq!(
            prompt,
            "Summarize Acme builds rockets for https://x/inv.pdf."
        );
    }

    #[test]
    fn render_serializes_non_string_values() {
        let ctx = context_with("counts", json!({"a": 1}));
        assert_eq!(ctx.render("got {{ input.count }}"), "got 3");
        assert_eq!(ctx.render("data: {{ steps.counts.output }}"), "data: {\"a\":1}");
    }

    #[test]
    fn unresolved_placeholders_stay_verbatim() {
        let ctx = context_with("research", json!("x"));
        let prompt = ctx.render("see {{ steps.nope.output }} and {{ garbage }}");
        assert_eq!(prompt, "see {{ steps.nope.output }} and {{ garbage }}");
    }
}
