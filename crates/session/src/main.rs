//! `scrub-session` -- headless annotation session.
//!
//! Loads the configured frame sequence and match, logs per-track
//! statistics, then plays the clip to its last frame on the playback clock,
//! rendering each frame. Configuration comes from the environment (see
//! [`SessionConfig::from_env`]); there are no command-line arguments.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrub_core::frame::FrameSequence;
use scrub_core::review::{find_match, load_matches, status_counts};
use scrub_events::EventBus;
use scrub_session::runner::play_through;
use scrub_session::{AnnotationSession, SessionConfig, SessionOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrub_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        fps = config.fps.fps(),
        native_width = config.space.width,
        native_height = config.space.height,
        frames_path = %config.frames_path.display(),
        speed = %config.playback_speed,
        "Starting scrub-session",
    );

    let frames = FrameSequence::load(&config.frames_path)
        .with_context(|| format!("loading {}", config.frames_path.display()))?;
    let matches = load_matches(&config.matches_path)
        .with_context(|| format!("loading {}", config.matches_path.display()))?;
    let record = find_match(&matches, config.match_id)?.clone();

    for (status, count) in status_counts(&matches) {
        tracing::debug!(status = %status, count, "Match status count");
    }

    let bus = Arc::new(EventBus::default());
    let options = SessionOptions {
        fps: config.fps,
        space: config.space,
        speed: config.playback_speed,
    };
    let mut session = AnnotationSession::new(frames, options, bus).with_match(record);

    if let Some(m) = session.match_record() {
        tracing::info!(match_id = m.id, title = %m.title, status = %m.status, "Match opened");
    }
    for (id, s) in session.stats() {
        tracing::info!(
            track_id = %id,
            class = %s.class,
            occurrences = s.occurrence_count,
            start = s.start_time,
            end = s.end_time(),
            "Track",
        );
    }
    for (class, count) in session.class_counts() {
        tracing::info!(class = %class, count, "Class total");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let summary = play_through(&mut session, config.output_dir.as_deref(), cancel).await?;

    tracing::info!(
        frames_rendered = summary.frames_rendered,
        boxes_drawn = summary.boxes_drawn,
        final_frame = summary.final_frame,
        saved = summary.saved.len(),
        cancelled = summary.cancelled,
        "Playback finished",
    );
    Ok(())
}
