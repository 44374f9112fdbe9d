//! Layout ideation: turns a [`BrandProfile`] into an ordered list of
//! [`LayoutIdea`]s. The array order is each idea's concept index.

use crate::backend::GenerateRequest;
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::parsing;
use crate::prompt;
use crate::types::{BrandProfile, LayoutIdea, Stage, CONCEPT_COUNT};
use serde_json::{json, Value};

pub fn ideas_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "description": { "type": "STRING" }
            },
            "required": ["title", "description"]
        }
    })
}

/// Ask for [`CONCEPT_COUNT`] layout concepts.
///
/// A different count is logged and accepted. An empty list is a
/// [`PipelineError::StageFatal`] when `ctx.strict_profiles` is set.
pub async fn ideate(ctx: &ExecCtx, profile: &BrandProfile) -> Result<Vec<LayoutIdea>> {
    let request = GenerateRequest::json(
        ctx.text_model.clone(),
        prompt::ideation(profile),
        ideas_schema(),
    );

    let response = ctx.call("ideate", &request).await?;
    let value = parsing::parse_array_lenient(&response.text());
    let ideas: Vec<LayoutIdea> = parsing::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "layout ideas did not match schema");
        Vec::new()
    });

    if ideas.is_empty() && ctx.strict_profiles {
        return Err(PipelineError::StageFatal {
            stage: Stage::Ideation,
            message: "the model returned no layout concepts".to_string(),
        });
    }
    if ideas.len() != CONCEPT_COUNT {
        tracing::warn!(
            expected = CONCEPT_COUNT,
            got = ideas.len(),
            "unexpected number of layout concepts"
        );
    }

    tracing::info!(count = ideas.len(), "layout ideation complete");
    Ok(ideas)
}
