//! Generate branded frames for a company against the live API.
//!
//! ```text
//! GEMINI_API_KEY=... cargo run --example generate_frames -- \
//!     "Acme Coffee" 1440x700 "Roastery Open Day"
//! ```
//!
//! Frames are written to `./frames/`.

use brand_frames::{
    Event, ExecCtx, FnEventHandler, PhotoSize, RunRequest, RunState, Settings, Studio,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brand_frames=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let company = args.next().ok_or("usage: generate_frames <company> [WxH] [event title]")?;
    let mut request = RunRequest::new(company);
    if let Some(size) = args.next() {
        request = request.with_photo_size(PhotoSize::parse(&size)?);
    }
    if let Some(title) = args.next() {
        request = request.with_event_title(title);
    }

    let settings = Settings::from_env()?;
    let ctx = ExecCtx::from_settings(&settings)?
        .event_handler(Arc::new(FnEventHandler(|event: Event| match event {
            Event::ConceptStarted { index, title, .. } => println!("  [{}] {}...", index, title),
            Event::ConceptFinished { index, ok: false, .. } => println!("  [{}] failed", index),
            Event::TransportRetry { operation, attempt, delay_ms, .. } => {
                println!("  {} rate limited, retry {} in {}ms", operation, attempt, delay_ms)
            }
            _ => {}
        })))
        .build();
    let studio = Studio::new(ctx);

    println!("Researching {}...", request.company_name);
    let run_id = studio.start_run(request).await?;
    let snapshot = studio.wait_for_run(run_id).await?;

    if snapshot.state == RunState::Error {
        eprintln!("{}", snapshot.error.unwrap_or_default());
        std::process::exit(1);
    }

    if let Some(profile) = &snapshot.profile {
        println!("\nIndustry: {}", profile.industry);
        println!("Colors:   {}", profile.color_list());
    }

    std::fs::create_dir_all("frames")?;
    for frame in &snapshot.frames {
        let ext = frame.image.mime_type.rsplit('/').next().unwrap_or("png");
        let path = format!("frames/frame_{}.{}", frame.index, ext);
        std::fs::write(&path, &frame.image.data)?;
        println!("{} -> {}", frame.title, path);
    }
    println!(
        "\n{} of {} concepts produced a frame",
        snapshot.frames.len(),
        snapshot.total_concepts
    );

    Ok(())
}
