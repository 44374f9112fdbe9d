//! Frame synthesis for one layout concept.

use crate::backend::{GenerateRequest, Part};
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::prompt::{self, FrameOptions};
use crate::types::{BrandProfile, GeneratedFrame, LayoutIdea, RunRequest};

/// Aspect ratio of every generated frame.
pub const FRAME_ASPECT_RATIO: &str = "16:9";

/// Generate the frame image for concept `index`.
///
/// Fails with [`PipelineError::NoImage`] when the response carries no inline
/// image; the detail holds whatever text the model sent instead.
pub async fn generate_frame(
    ctx: &ExecCtx,
    index: usize,
    idea: &LayoutIdea,
    profile: &BrandProfile,
    run: &RunRequest,
) -> Result<GeneratedFrame> {
    let options = FrameOptions {
        photo_size: run.photo_size,
        has_logo: run.has_logo,
        event_title: run.event_title.as_deref(),
    };
    let text = prompt::frame(idea, profile, options);
    let request = GenerateRequest::image(ctx.image_model.clone(), vec![Part::Text(text)])
        .with_aspect_ratio(FRAME_ASPECT_RATIO);

    let response = ctx.call("frame", &request).await?;
    let image = response
        .first_image()
        .cloned()
        .ok_or_else(|| PipelineError::NoImage {
            detail: response.text_detail(),
        })?;

    tracing::debug!(index, mime = %image.mime_type, bytes = image.data.len(), "frame generated");
    Ok(GeneratedFrame::new(index, idea, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply, OutputKind};
    use crate::types::PhotoSize;
    use std::sync::Arc;

    fn idea() -> LayoutIdea {
        LayoutIdea {
            title: "Bean Border".into(),
            description: "Beans along every border".into(),
        }
    }

    #[tokio::test]
    async fn test_generate_frame_takes_first_image() {
        let mock = Arc::new(MockBackend::fixed(MockReply::Parts(vec![
            Part::Text("Here is your frame".into()),
            Part::Image(crate::image::ImagePayload::new("image/png", vec![1, 2, 3])),
            Part::Image(crate::image::ImagePayload::new("image/png", vec![9])),
        ])));
        let ctx = ExecCtx::builder(mock.clone()).build();
        let run = RunRequest::new("Acme")
            .with_photo_size(PhotoSize { width: 800, height: 600 })
            .with_logo(true);

        let frame = generate_frame(&ctx, 2, &idea(), &BrandProfile::default(), &run)
            .await
            .unwrap();
        assert_eq!(frame.index, 2);
        assert_eq!(frame.title, "Bean Border");
        assert_eq!(frame.image.data, vec![1, 2, 3]);
        assert_eq!(frame.data_uri(), "data:image/png;base64,AQID");

        let req = &mock.calls()[0].request;
        assert_eq!(req.output, OutputKind::Image);
        assert_eq!(req.aspect_ratio.as_deref(), Some(FRAME_ASPECT_RATIO));
        assert_eq!(req.model, ctx.image_model);
        let text = req.prompt_text();
        assert!(text.contains("800x600"));
        assert!(text.contains("logo tab completely blank"));
    }

    #[tokio::test]
    async fn test_missing_image_is_no_image() {
        let mock = Arc::new(MockBackend::fixed(MockReply::text("I cannot draw that.")));
        let ctx = ExecCtx::builder(mock).build();
        let request = RunRequest::new("Acme");
        let err = generate_frame(&ctx, 0, &idea(), &BrandProfile::default(), &request)
            .await
            .unwrap_err();
        match err {
            PipelineError::NoImage { detail } => {
                assert_eq!(detail.as_deref(), Some("I cannot draw that."))
            }
            other => panic!("expected NoImage, got {:?}", other),
        }
    }
}
