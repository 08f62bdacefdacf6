//! Headless playback: play a session from its current frame to the end,
//! rendering every frame it lands on.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use scrub_core::playback::TickOutcome;
use scrub_core::render::RasterSurface;
use scrub_core::types::FrameIndex;
use scrub_core::CoreError;

use crate::session::AnnotationSession;

/// What a headless run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames_rendered: usize,
    pub boxes_drawn: usize,
    pub final_frame: FrameIndex,
    /// PNG files written, in frame order.
    pub saved: Vec<PathBuf>,
    /// Whether the run was cut short by `cancel`.
    pub cancelled: bool,
}

/// Play `session` to its last frame on the playback clock.
///
/// The starting frame is rendered too. With `output_dir` set every
/// rendered frame is saved there as `frame_NNNN.png`. Triggering `cancel`
/// pauses the session and returns what was rendered so far.
pub async fn play_through(
    session: &mut AnnotationSession,
    output_dir: Option<&Path>,
    cancel: CancellationToken,
) -> Result<PlaybackSummary, CoreError> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let (width, height) = session.canvas_size();
    let mut surface = RasterSurface::new(width, height)?;
    let mut summary = PlaybackSummary::default();

    render_into(session, &mut surface, output_dir, &mut summary)?;

    if !session.play() {
        tracing::info!(
            frame_index = session.frame_index(),
            "Nothing to play from the current frame"
        );
    }

    while session.playback().is_playing() {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = session.next_tick() => Some(outcome),
        };
        let Some(outcome) = next else {
            tracing::info!(frame_index = session.frame_index(), "Headless playback cancelled");
            session.pause();
            summary.cancelled = true;
            break;
        };

        match outcome {
            Some(TickOutcome::Advanced(_)) | Some(TickOutcome::ReachedEnd(_)) => {
                render_into(session, &mut surface, output_dir, &mut summary)?;
            }
            Some(TickOutcome::Ignored) => {}
            None => break,
        }
    }

    summary.final_frame = session.frame_index();
    Ok(summary)
}

fn render_into(
    session: &AnnotationSession,
    surface: &mut RasterSurface,
    output_dir: Option<&Path>,
    summary: &mut PlaybackSummary,
) -> Result<(), CoreError> {
    let index = session.frame_index();
    let drawn = session.render(surface);
    summary.frames_rendered += 1;
    summary.boxes_drawn += drawn;
    tracing::debug!(frame_index = index, boxes = drawn, "Frame rendered");

    if let Some(dir) = output_dir {
        let path = dir.join(format!("frame_{index:04}.png"));
        surface.save_png(&path)?;
        summary.saved.push(path);
    }
    Ok(())
}
