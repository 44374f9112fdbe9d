//! Image editing: the existing image plus a free-text instruction in, a
//! replacement image out. Nothing here touches stored frames.

use crate::backend::{GenerateRequest, Part};
use crate::error::{PipelineError, Result};
use crate::exec_ctx::ExecCtx;
use crate::image::ImagePayload;
use crate::prompt;

/// Apply `instruction` to `image` and return the edited image.
pub async fn edit_image(
    ctx: &ExecCtx,
    image: &ImagePayload,
    instruction: &str,
) -> Result<ImagePayload> {
    let request = GenerateRequest::image(
        ctx.image_model.clone(),
        vec![
            Part::Image(image.clone()),
            Part::Text(prompt::edit(instruction)),
        ],
    );

    let response = ctx.call("edit", &request).await?;
    response
        .first_image()
        .cloned()
        .ok_or_else(|| PipelineError::NoEditedImage {
            detail: response.text_detail(),
        })
}
