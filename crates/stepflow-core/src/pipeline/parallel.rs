//! Parallel groups: concurrent fan-out over independent steps.

use tokio::task::JoinSet;
use tracing::{debug, error};

use stepflow_types::pipeline::StepOutput;

use super::context::StepContext;
use super::step::Runnable;

// ---------------------------------------------------------------------------
// ParallelGroup
// ---------------------------------------------------------------------------

/// Runs its members concurrently and aggregates their outputs into a single
/// group output.
///
/// Every member gets its own clone of the context, so no member sees a
/// sibling's output. All members run to completion even when one fails;
/// member outputs are aggregated in declaration order regardless of
/// completion order.
#[derive(Clone)]
pub struct ParallelGroup {
    name: String,
    members: Vec<Runnable>,
}

impl ParallelGroup {
    pub fn new(name: impl Into<String>, members: Vec<Runnable>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Runnable] {
        &self.members
    }

    pub(crate) async fn execute(&self, ctx: &StepContext) -> StepOutput {
        debug!(group = %self.name, members = self.members.len(), "starting parallel group");

        let mut set = JoinSet::new();
        for (index, member) in self.members.iter().enumerate() {
            let member = member.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                let output = member.execute(&ctx).await.named(member.name());
                (index, output)
            });
        }

        // Slots keep declaration order no matter which member finishes first.
        let mut slots: Vec<Option<StepOutput>> = vec![None; self.members.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, output)) => slots[index] = Some(output),
                Err(err) => {
                    error!(group = %self.name, error = %err, "parallel member task failed");
                }
            }
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(output) => output,
                // Slot left empty by a panicked or cancelled task.
                None => StepOutput::fatal("member task aborted")
                    .named(self.members[index].name()),
            })
            .collect();

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
    use std::time::Duration;
    use uuid::Uuid;

    use stepflow_types::error::PipelineError;

    use crate::pipeline::step::FunctionStep;

    fn ctx() -> StepContext {
        StepContext::new(json!({}), Uuid::now_v7(), "test")
    }

    fn delayed(name: &str, delay_ms: u64, payload: &str) -> Runnable {
        let payload = payload.to_string();
        FunctionStep::new(name, move |_ctx: StepContext| {
            let payload = payload.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(StepOutput::success(json!(payload)))
            }
        })
        .into()
    }

    #[tokio::test]
    async fn declaration_order_survives_reversed_completion() {
        // "a" finishes last, "c" first.
        let group = ParallelGroup::new(
            "fanout",
            vec![
                delayed("a", 30, "slowest"),
                delayed("b", 15, "middle"),
                delayed("c", 1, "fastest"),
            ],
        );

        let out = group.execute(&ctx()).await;
        assert!(out.success);
        let members = out.members.as_ref().unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.step_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(members[0].content, json!("slowest"));
    }

    #[tokio::test]
    async fn failed_member_does_not_cancel_siblings() {
        let failing = FunctionStep::new("bad", |_ctx: StepContext| async move {
            Err(PipelineError::Execution("no results".to_string()))
        });
        let group = ParallelGroup::new(
            "fanout",
            vec![failing.into(), delayed("good", 10, "done")],
        );

        let out = group.execute(&ctx()).await;
        assert!(!out.success);
        assert!(out.stop);
        // The healthy sibling still ran to completion.
        let good = out.member("good").unwrap();
        assert!(good.success);
        assert_eq!(good.content, json!("done"));
    }

    #[tokio::test]
    async fn members_do_not_see_each_other() {
        let reader = FunctionStep::new("reader", |ctx: StepContext| async move {
            match ctx.step_content("writer") {
                Ok(_) => Ok(StepOutput::success(json!("leaked"))),
                Err(_) => Ok(StepOutput::success(json!("isolated"))),
            }
        });
        let group = ParallelGroup::new(
            "fanout",
            vec![delayed("writer", 1, "w"), reader.into()],
        );

        let out = group.execute(&ctx()).await;
        assert_eq!(out.member("reader").unwrap().content, json!("isolated"));
    }

    #[tokio::test]
    async fn group_content_is_ordered_array() {
        let group = ParallelGroup::new(
            "fanout",
            vec![delayed("x", 5, "one"), delayed("y", 1, "two")],
        );

        let out = group.execute(&ctx()).await;
        let arr = out.content.as_array().unwrap();
        assert_eq!(arr[0]["step"], "x");
        assert_eq!(arr[1]["step"], "y");
        assert_eq!(arr[1]["content"], "two");
    }
}
