//! Brand research: one structured query that returns a [`BrandProfile`].

use crate::backend::GenerateRequest;
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::parsing;
use crate::prompt;
use crate::types::{BrandProfile, Stage};
use serde_json::{json, Value};

/// Response schema: all seven attributes required, `colors` a list of strings.
pub fn profile_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "industry": { "type": "STRING" },
            "personality": { "type": "STRING" },
            "targetAudience": { "type": "STRING" },
            "colors": { "type": "ARRAY", "items": { "type": "STRING" } },
            "designStyle": { "type": "STRING" },
            "typography": { "type": "STRING" },
            "marketingTone": { "type": "STRING" }
        },
        "required": [
            "industry",
            "personality",
            "targetAudience",
            "colors",
            "designStyle",
            "typography",
            "marketingTone"
        ]
    })
}

/// Research `company_name` and return its brand profile.
///
/// An empty or unparseable reply becomes an empty profile. With
/// `ctx.strict_profiles` set, an empty profile is a
/// [`PipelineError::StageFatal`]; remote errors are returned as-is for the
/// caller to classify.
pub async fn research_brand(ctx: &ExecCtx, company_name: &str) -> Result<BrandProfile> {
    let request = GenerateRequest::json(
        ctx.text_model.clone(),
        prompt::research(company_name, ctx.web_search),
        profile_schema(),
    )
    .with_web_search(ctx.web_search);

    let response = ctx.call("research", &request).await?;
    let value = parsing::parse_object_lenient(&response.text());
    let profile: BrandProfile = parsing::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(company = company_name, error = %e, "brand profile did not match schema");
        BrandProfile::default()
    });

    if profile.is_empty() {
        if ctx.strict_profiles {
            return Err(PipelineError::StageFatal {
                stage: Stage::Research,
                message: "the model returned an empty brand profile".to_string(),
            });
        }
        tracing::warn!(company = company_name, "continuing with an empty brand profile");
    }

    tracing::info!(
        company = company_name,
        industry = %profile.industry,
        colors = profile.colors.len(),
        "brand research complete"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply, OutputKind};
    use std::sync::Arc;

    fn ctx(mock: Arc<MockBackend>) -> ExecCtx {
        ExecCtx::builder(mock).build()
    }

    fn full_profile() -> Value {
        json!({
            "industry": "Coffee",
            "personality": "Warm",
            "targetAudience": "Commuters",
            "colors": ["#3B2F2F", "cream"],
            "designStyle": "Rustic",
            "typography": "Serif",
            "marketingTone": "Friendly"
        })
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = profile_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 7);
        assert_eq!(schema["properties"]["colors"]["items"]["type"], "STRING");
    }

    #[tokio::test]
    async fn test_research_parses_profile() {
        let mock = Arc::new(MockBackend::fixed(MockReply::json(&full_profile())));
        let profile = research_brand(&ctx(mock.clone()), "Acme Coffee").await.unwrap();
        assert_eq!(profile.industry, "Coffee");
        assert_eq!(profile.colors, vec!["#3B2F2F", "cream"]);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let req = &calls[0].request;
        assert_eq!(req.output, OutputKind::Json);
        assert!(req.response_schema.is_some());
        assert!(!req.web_search);
        assert!(req.prompt_text().contains("Acme Coffee"));
    }

    #[tokio::test]
    async fn test_research_with_web_search_reads_prose() {
        let mock = Arc::new(MockBackend::fixed(MockReply::text(format!(
            "Here is what I found:\n```json\n{}\n```",
            full_profile()
        ))));
        let ctx = ExecCtx::builder(mock.clone()).web_search(true).build();
        let profile = research_brand(&ctx, "Acme").await.unwrap();
        assert_eq!(profile.typography, "Serif");
        assert!(mock.calls()[0].request.web_search);
        assert!(mock.calls()[0].request.prompt_text().contains("exact shape"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_fatal_when_strict() {
        let mock = Arc::new(MockBackend::fixed(MockReply::empty()));
        let err = research_brand(&ctx(mock), "Acme").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFatal { stage: Stage::Research, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_reply_tolerated_when_lenient() {
        let mock = Arc::new(MockBackend::fixed(MockReply::text("not json")));
        let ctx = ExecCtx::builder(mock).lenient_profiles().build();
        let profile = research_brand(&ctx, "Acme").await.unwrap();
        assert!(profile.is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_non_ascii_profile_falls_back() {
        let industry = format!("{}{}", "a".repeat(151), "é".repeat(40));
        let reply = serde_json::json!({"industry": industry, "colors": "red"});
        let mock = Arc::new(MockBackend::fixed(MockReply::json(&reply)));
        let ctx = ExecCtx::builder(mock).lenient_profiles().build();
        let profile = research_brand(&ctx, "Café Ünïcode").await.unwrap();
        assert!(profile.is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_propagates_unchanged() {
        let mock = Arc::new(MockBackend::fixed(MockReply::server_error("boom")));
        let err = research_brand(&ctx(mock), "Acme").await.unwrap_err();
        assert!(matches!(err, PipelineError::Api { status: 500, .. }));
    }
}
