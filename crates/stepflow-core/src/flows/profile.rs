//! Business profile pipeline: parallel research fan-out, consolidation,
//! then a structured profile write-up.

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{Value, json};

use stepflow_types::pipeline::StepOutput;
use stepflow_types::profile::{BusinessProfileInput, BusinessProfileOutput};

use crate::pipeline::{FunctionStep, ParallelGroup, Pipeline, ServiceStep, StepContext};
use crate::service::generate::BoxGenerationService;

const RESEARCH_INSTRUCTIONS: &str = "You are a business research analyst. Gather factual, \
verifiable information about the company. Report only what you find; never invent details.";

const WRITER_INSTRUCTIONS: &str = "You are a business profile writer. Fill in the profile \
from the research provided. Leave fields null when the research does not cover them.";

/// Build the business profile pipeline.
///
/// Steps: `search-phase` (a parallel group running `web-research` and
/// `semantic-search`), `consolidate-results` (merges successful member
/// outputs into one research document), and `write-profile` (structured
/// output against the [`BusinessProfileOutput`] schema).
pub fn business_profile_pipeline(
    service: Arc<BoxGenerationService>,
    model: impl Into<String>,
) -> Pipeline {
    let model = model.into();

    let web_research = ServiceStep::new("web-research", Arc::clone(&service))
        .model(model.clone())
        .instructions(RESEARCH_INSTRUCTIONS)
        .prompt(
            "Research the company {{ input.name }} ({{ input.website }}). Cover industry, \
             founding, size, revenue, locations, leadership, and competitors.",
        );

    let semantic_search = ServiceStep::new("semantic-search", Arc::clone(&service))
        .model(model.clone())
        .instructions(RESEARCH_INSTRUCTIONS)
        .prompt(
            "Search indexed sources for prior knowledge about {{ input.name }}: filings, \
             press coverage, social profiles, and contact details.",
        );

    let search_phase = ParallelGroup::new(
        "search-phase",
        vec![web_research.into(), semantic_search.into()],
    );

    // Deliberately fatal (not a soft failure) when every research branch
    // came back empty: the writer step must not run without grounding.
    let consolidate = FunctionStep::new("consolidate-results", |ctx: StepContext| async move {
        let group = ctx.step_output("search-phase")?;
        let members = group.members.as_deref().unwrap_or_default();
        match merge_research(members) {
            Some(merged) => Ok(StepOutput::success(json!(merged))),
            None => Ok(StepOutput::fatal("no research results to consolidate")),
        }
    });

    let write = ServiceStep::new("write-profile", service)
        .model(model)
        .instructions(WRITER_INSTRUCTIONS)
        .prompt(
            "Write the complete business profile for {{ input.name }} using this research:\n\n\
             {{ steps.consolidate-results.output }}",
        )
        .output_schema::<BusinessProfileOutput>("business_profile");

    Pipeline::new("business-profile")
        .input_schema::<BusinessProfileInput>()
        .step(search_phase)
        .step(consolidate)
        .step(write)
}

/// Merge the successful research members into one markdown document,
/// one `## <step>` section per member in declaration order.
///
/// Returns `None` when no member succeeded; the consolidation step turns
/// that into a fatal output that halts the run before the writer step.
fn merge_research(members: &[StepOutput]) -> Option<String> {
    let mut merged = String::new();
    for member in members.iter().filter(|m| m.success) {
        let body = match &member.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(merged, "## {}\n\n{}\n", member.step_name, body);
    }
    if merged.is_empty() { None } else { Some(merged) }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
