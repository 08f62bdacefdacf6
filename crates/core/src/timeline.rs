//! Gantt-style timeline geometry.
//!
//! Maps each track's `[start_time, end_time]` interval onto pixel offsets.
//! Pure geometry; drawing is left to the view.

use serde::Serialize;

use crate::frame::FrameSequence;
use crate::stats::TrackStatsMap;
use crate::types::{FrameRate, TrackClass, TrackId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Vertical distance between consecutive bar rows, in pixels.
pub const ROW_HEIGHT: f64 = 24.0;

/// Height of a single bar, in pixels.
pub const BAR_HEIGHT: f64 = 20.0;

/// Axis tick positions as fractions of the total duration.
pub const AXIS_TICK_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Timeline zoom bounds.
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 5.0;

/// Canvas scale bounds. The timeline width follows the canvas scale.
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;

/// Clamp a timeline zoom factor into [`MIN_ZOOM`]..=[`MAX_ZOOM`].
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Clamp a canvas scale factor into [`MIN_SCALE`]..=[`MAX_SCALE`].
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

// ---------------------------------------------------------------------------
// Layout types
// ---------------------------------------------------------------------------

/// Inputs that fix the pixel scale of the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineParams {
    /// Reference width at scale 1 and zoom 1.
    pub native_width: f64,
    pub scale: f64,
    pub zoom: f64,
    pub fps: FrameRate,
    pub row_height: f64,
}

impl TimelineParams {
    pub fn new(native_width: f64, fps: FrameRate) -> Self {
        Self {
            native_width,
            scale: 1.0,
            zoom: 1.0,
            fps,
            row_height: ROW_HEIGHT,
        }
    }

    pub fn timeline_width(&self) -> f64 {
        self.native_width * self.scale * self.zoom
    }
}

/// One track's bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub track_id: TrackId,
    pub class: TrackClass,
    pub row: usize,
    pub start: f64,
    pub end: f64,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub selected: bool,
}

impl TimelineBar {
    /// Hover text, e.g. `Track 4: 0.5–1.7s`.
    pub fn label(&self) -> String {
        format!("Track {}: {:.1}–{:.1}s", self.track_id, self.start, self.end)
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + BAR_HEIGHT
    }
}

/// A labelled position on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub seconds: f64,
    pub left: f64,
    pub label: String,
}

/// Full timeline geometry for one frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub timeline_width: f64,
    pub total_duration: f64,
    pub px_per_sec: f64,
    pub content_height: f64,
    pub bars: Vec<TimelineBar>,
    pub ticks: Vec<AxisTick>,
}

impl TimelineLayout {
    /// Track whose bar covers the point, if any.
    pub fn bar_at(&self, x: f64, y: f64) -> Option<&TrackId> {
        self.bars.iter().find(|b| b.contains(x, y)).map(|b| &b.track_id)
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Length of the clip in seconds.
///
/// The last frame's timestamp when positive, otherwise `frames / fps`.
/// Never zero: an empty or instantaneous clip counts as one frame.
pub fn total_duration(frames: &FrameSequence, fps: FrameRate) -> f64 {
    let candidate = match frames.last_timestamp() {
        Some(ts) if ts > 0.0 => ts,
        _ => fps.seconds_for(frames.len()),
    };
    if candidate > 0.0 {
        candidate
    } else {
        fps.seconds_for(1)
    }
}

/// Compute bar and tick geometry. Rows follow the iteration order of `stats`.
pub fn compute_timeline(
    frames: &FrameSequence,
    stats: &TrackStatsMap,
    params: &TimelineParams,
    selected: Option<&TrackId>,
) -> TimelineLayout {
    let timeline_width = params.timeline_width();
    let total_duration = total_duration(frames, params.fps);
    let px_per_sec = timeline_width / total_duration;

    let bars = stats
        .iter()
        .enumerate()
        .map(|(row, (id, s))| {
            let start = s.start_time;
            let end = s.end_time();
            TimelineBar {
                track_id: id.clone(),
                class: s.class,
                row,
                start,
                end,
                left: start * px_per_sec,
                width: (end - start) * px_per_sec,
                top: row as f64 * params.row_height,
                selected: selected == Some(id),
            }
        })
        .collect::<Vec<_>>();

    let ticks = AXIS_TICK_FRACTIONS
        .iter()
        .map(|frac| {
            let seconds = total_duration * frac;
            AxisTick {
                seconds,
                left: seconds * px_per_sec,
                label: format!("{}s", seconds.round()),
            }
        })
        .collect();

    TimelineLayout {
        timeline_width,
        total_duration,
        px_per_sec,
        content_height: bars.len() as f64 * params.row_height,
        bars,
        ticks,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{BBox, Detection, Frame};
    use crate::stats::compute_track_stats;

    fn det(id: &str) -> Detection {
        Detection {
            track_id: TrackId::from(id),
            class: TrackClass::TeamA,
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
        }
    }

    fn fps(v: f64) -> FrameRate {
        FrameRate::new(v).unwrap()
    }

    fn three_frames() -> FrameSequence {
        FrameSequence::new(vec![
            Frame::new(0.0, vec![det("1"), det("2")]),
            Frame::new(0.5, vec![det("1")]),
            Frame::new(1.0, vec![det("1"), det("3")]),
        ])
        .unwrap()
    }

    // -- total_duration ----------------------------------------------------

    #[test]
    fn duration_uses_last_timestamp() {
        assert_eq!(total_duration(&three_frames(), fps(6.0)), 1.0);
    }

    #[test]
    fn duration_falls_back_to_frame_count() {
        let seq = FrameSequence::new(vec![
            Frame::new(0.0, vec![]),
            Frame::new(0.0, vec![]),
            Frame::new(0.0, vec![]),
        ])
        .unwrap();
        assert_eq!(total_duration(&seq, fps(6.0)), 0.5);
    }

    #[test]
    fn duration_never_zero() {
        assert_eq!(total_duration(&FrameSequence::default(), fps(4.0)), 0.25);
    }

    // -- compute_timeline --------------------------------------------------

    #[test]
    fn full_span_track_fills_timeline() {
        let seq = three_frames();
        let params = TimelineParams::new(560.0, fps(3.0));
        let stats = compute_track_stats(&seq, params.fps);
        let layout = compute_timeline(&seq, &stats, &params, None);

        assert_eq!(layout.timeline_width, 560.0);
        let bar = &layout.bars[0];
        assert_eq!(bar.track_id.as_str(), "1");
        assert_eq!(bar.left, 0.0);
        assert!((bar.width - layout.timeline_width).abs() < 1e-9);
    }

    #[test]
    fn width_scales_with_scale_and_zoom() {
        let seq = three_frames();
        let mut params = TimelineParams::new(560.0, fps(6.0));
        params.scale = 1.5;
        params.zoom = 2.0;
        let stats = compute_track_stats(&seq, params.fps);
        let layout = compute_timeline(&seq, &stats, &params, None);
        assert_eq!(layout.timeline_width, 1680.0);
        assert_eq!(layout.px_per_sec, 1680.0);
    }

    #[test]
    fn bars_positioned_by_start_and_row() {
        let seq = three_frames();
        let params = TimelineParams::new(100.0, fps(2.0));
        let stats = compute_track_stats(&seq, params.fps);
        let layout = compute_timeline(&seq, &stats, &params, Some(&TrackId::from("3")));

        let three = layout.bars.iter().find(|b| b.track_id.as_str() == "3").unwrap();
        assert_eq!(three.row, 2);
        assert_eq!(three.top, 48.0);
        assert_eq!(three.left, 100.0);
        assert_eq!(three.width, 50.0);
        assert!(three.selected);
        assert!(!layout.bars[0].selected);
        assert_eq!(layout.content_height, 72.0);
    }

    #[test]
    fn ticks_at_quarter_fractions() {
        let seq = three_frames();
        let params = TimelineParams::new(200.0, fps(6.0));
        let stats = compute_track_stats(&seq, params.fps);
        let layout = compute_timeline(&seq, &stats, &params, None);
        let lefts: Vec<f64> = layout.ticks.iter().map(|t| t.left).collect();
        assert_eq!(lefts, vec![0.0, 50.0, 100.0, 150.0, 200.0]);
        assert_eq!(layout.ticks[4].label, "1s");
    }

    #[test]
    fn bar_label_and_hit_test() {
        let seq = three_frames();
        let params = TimelineParams::new(100.0, fps(2.0));
        let stats = compute_track_stats(&seq, params.fps);
        let layout = compute_timeline(&seq, &stats, &params, None);
        assert_eq!(layout.bars[1].label(), "Track 2: 0.0–0.5s");
        assert_eq!(layout.bar_at(10.0, 30.0).map(TrackId::as_str), Some("2"));
        assert_eq!(layout.bar_at(90.0, 30.0), None);
    }

    // -- clamping ----------------------------------------------------------

    #[test]
    fn zoom_and_scale_clamped() {
        assert_eq!(clamp_zoom(10.0), MAX_ZOOM);
        assert_eq!(clamp_zoom(0.1), MIN_ZOOM);
        assert_eq!(clamp_scale(3.0), MAX_SCALE);
        assert_eq!(clamp_scale(f64::NAN), 1.0);
    }
}
