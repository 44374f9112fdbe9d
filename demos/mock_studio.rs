//! Drive a full run and an edit against scripted replies, no API key needed.

use brand_frames::{BackoffConfig, ExecCtx, MockBackend, MockReply, RunRequest, Studio};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("brand_frames=debug").init();

    let mock = Arc::new(MockBackend::new(vec![
        MockReply::json(&json!({
            "industry": "Specialty coffee",
            "personality": "Warm and crafted",
            "targetAudience": "Urban professionals",
            "colors": ["#3B2F2F", "#C8A27A", "cream"],
            "designStyle": "Rustic minimal",
            "typography": "Humanist serif",
            "marketingTone": "Friendly"
        })),
        MockReply::json(&json!([
            {"title": "Bean Border", "description": "Roasted beans scattered along the borders"},
            {
                "title": "Steam Lines",
                "description": "Soft steam curls rising from the bottom border"
            },
            {"title": "Burlap", "description": "Burlap sack texture with stamped edges"}
        ])),
        MockReply::image("image/png", vec![0x89, 0x50, 0x4e, 0x47]),
        // Second concept gets throttled once, then refuses.
        MockReply::rate_limited(),
        MockReply::text("I can't create that image."),
        MockReply::image("image/png", vec![0x89, 0x50, 0x4e, 0x47, 0x02]),
        // Edit
        MockReply::image("image/jpeg", vec![0xff, 0xd8, 0xff]),
    ]));

    let ctx = ExecCtx::builder(mock.clone())
        .backoff(BackoffConfig::standard().with_base_delay(Duration::from_millis(100)))
        .pacing_delay(Duration::from_millis(200))
        .build();
    let studio = Studio::new(ctx);

    let mut updates = studio.subscribe();
    let run_id = studio
        .start_run(RunRequest::new("Acme Coffee").with_event_title("Roastery Open Day"))
        .await?;

    while updates.changed().await.is_ok() {
        let snap = updates.borrow_and_update().clone();
        println!(
            "state={:<11} generated={}/{} frames={}",
            snap.state,
            snap.generated_count,
            snap.total_concepts,
            snap.frames.len()
        );
        if snap.run_id == run_id && snap.state.is_terminal() {
            break;
        }
    }

    let first = studio.snapshot().frames.first().map(|f| f.index);
    if let Some(index) = first {
        studio.edit(index, "make the border gold").await?;
        let frame = studio.snapshot().frame(index).cloned();
        if let Some(frame) = frame {
            println!("edited frame {} is now {}", frame.index, frame.image.mime_type);
        }
    }

    println!("{} remote calls", mock.call_count());
    Ok(())
}
