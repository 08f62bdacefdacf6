//! The annotation session: single owner of the frame sequence and of every
//! piece of state derived from it.
//!
//! All edits go through [`AnnotationSession`]. After each sequence
//! replacement the statistics, the filtered track list and the playback
//! bounds are recomputed from scratch, stale selections are dropped, and a
//! [`SessionEvent`] is published for each visible change.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use scrub_core::activity::ActivityLog;
use scrub_core::filter::{filter_track_ids, TrackFilter};
use scrub_core::frame::{BBox, Frame, FrameSequence};
use scrub_core::mutation::{
    delete_track, merge_tracks, split_track, IdAllocator, MutationOutcome,
};
use scrub_core::playback::{PlaybackController, PlaybackSpeed, PlaybackState, TickOutcome};
use scrub_core::render::{canvas_to_native, pick_detection, FrameRenderer, Surface};
use scrub_core::review::MatchRecord;
use scrub_core::stats::{class_counts, compute_track_stats, first_appearance, TrackStatsMap};
use scrub_core::timeline::{
    clamp_scale, clamp_zoom, compute_timeline, TimelineLayout, TimelineParams,
};
use scrub_core::types::{CoordinateSpace, FrameIndex, FrameRate, TrackClass, TrackId};
use scrub_core::CoreError;
use scrub_events::{EventBus, SessionEvent, SessionEventKind};

use crate::clock::{PlaybackClock, PlaybackTick};

// ---------------------------------------------------------------------------
// Read-only views
// ---------------------------------------------------------------------------

/// The selected track as seen on the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedDetail {
    pub track_id: TrackId,
    pub class: TrackClass,
    pub bbox: BBox,
    pub frame_index: FrameIndex,
    pub timestamp: f64,
}

/// Fixed parameters of a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub fps: FrameRate,
    pub space: CoordinateSpace,
    pub speed: PlaybackSpeed,
}

// ---------------------------------------------------------------------------
// AnnotationSession
// ---------------------------------------------------------------------------

pub struct AnnotationSession {
    id: Uuid,
    options: SessionOptions,
    match_record: Option<MatchRecord>,

    frames: FrameSequence,
    stats: TrackStatsMap,
    filtered: Vec<TrackId>,

    selected: Option<TrackId>,
    /// Checked ids in check order; the first one is the merge base.
    checked: Vec<TrackId>,
    filter: TrackFilter,

    allocator: IdAllocator,
    activity: ActivityLog,

    playback: PlaybackController,
    clock: Option<PlaybackClock>,
    tick_tx: mpsc::UnboundedSender<PlaybackTick>,
    tick_rx: mpsc::UnboundedReceiver<PlaybackTick>,

    scale: f64,
    zoom: f64,
    renderer: FrameRenderer,

    bus: Arc<EventBus>,
}

impl AnnotationSession {
    pub fn new(frames: FrameSequence, options: SessionOptions, bus: Arc<EventBus>) -> Self {
        let allocator = IdAllocator::seeded_from(&frames);
        let mut playback = PlaybackController::new(frames.len());
        playback.set_speed(options.speed);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let mut session = Self {
            id: Uuid::new_v4(),
            options,
            match_record: None,
            frames,
            stats: TrackStatsMap::new(),
            filtered: Vec::new(),
            selected: None,
            checked: Vec::new(),
            filter: TrackFilter::default(),
            allocator,
            activity: ActivityLog::new(),
            playback,
            clock: None,
            tick_tx,
            tick_rx,
            scale: 1.0,
            zoom: 1.0,
            renderer: FrameRenderer::new(options.space),
            bus,
        };
        session.recompute();

        tracing::info!(
            session_id = %session.id,
            frames = session.frames.len(),
            tracks = session.stats.len(),
            next_id = session.allocator.peek_next_id(),
            "Annotation session opened"
        );
        session
    }

    pub fn with_match(mut self, record: MatchRecord) -> Self {
        self.match_record = Some(record);
        self
    }

    // -- accessors ---------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn match_record(&self) -> Option<&MatchRecord> {
        self.match_record.as_ref()
    }

    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    pub fn stats(&self) -> &TrackStatsMap {
        &self.stats
    }

    /// Track ids passing the current filter, in natural id order.
    pub fn filtered_track_ids(&self) -> &[TrackId] {
        &self.filtered
    }

    pub fn class_counts(&self) -> BTreeMap<TrackClass, usize> {
        class_counts(&self.stats)
    }

    pub fn selected(&self) -> Option<&TrackId> {
        self.selected.as_ref()
    }

    pub fn checked(&self) -> &[TrackId] {
        &self.checked
    }

    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn frame_index(&self) -> FrameIndex {
        self.playback.frame_index()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.playback.frame_index())
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn has_running_clock(&self) -> bool {
        self.clock.as_ref().is_some_and(|c| !c.is_finished())
    }

    // -- derived state -----------------------------------------------------

    fn recompute(&mut self) {
        self.stats = compute_track_stats(&self.frames, self.options.fps);
        self.filtered = filter_track_ids(&self.stats, &self.filter);
        tracing::debug!(
            tracks = self.stats.len(),
            visible = self.filtered.len(),
            "Derived state recomputed"
        );
    }

    fn refilter(&mut self) {
        self.filtered = filter_track_ids(&self.stats, &self.filter);
        tracing::debug!(visible = self.filtered.len(), "Track list refiltered");
    }

    fn publish(&self, kind: SessionEventKind) {
        self.bus.publish(SessionEvent::new(self.id, kind));
    }

    fn log_activity(&mut self, message: String) {
        self.activity.append(message.clone());
        self.publish(SessionEventKind::ActivityAppended { message });
    }

    // -- selection ---------------------------------------------------------

    /// Select `id`, or clear the selection with `None`.
    ///
    /// Ids not present in the sequence are ignored.
    pub fn select_track(&mut self, id: Option<TrackId>) -> bool {
        if let Some(ref id) = id {
            if !self.stats.contains_key(id) {
                tracing::warn!(track_id = %id, "Ignoring selection of unknown track");
                return false;
            }
        }
        self.set_selected(id)
    }

    fn set_selected(&mut self, id: Option<TrackId>) -> bool {
        if self.selected == id {
            return false;
        }
        self.selected = id;
        self.publish(SessionEventKind::SelectionChanged {
            track_id: self.selected.clone(),
        });
        true
    }

    /// Select `id` from the track list and seek to its first appearance.
    pub fn select_track_and_seek(&mut self, id: &TrackId) -> Option<FrameIndex> {
        let index = first_appearance(&self.frames, id)?;
        self.select_track(Some(id.clone()));
        self.seek(index);
        Some(index)
    }

    /// Select the first detection under a canvas pixel.
    ///
    /// `(x, y)` is in canvas pixels of a canvas `canvas_width` by
    /// `canvas_height` in size. Empty space leaves the selection alone.
    pub fn click_canvas(
        &mut self,
        x: f64,
        y: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) -> Option<TrackId> {
        let (nx, ny) = canvas_to_native(self.options.space, canvas_width, canvas_height, x, y);
        let hit = self
            .current_frame()
            .and_then(|frame| pick_detection(frame, nx, ny))
            .map(|d| d.track_id.clone())?;
        self.set_selected(Some(hit.clone()));
        Some(hit)
    }

    /// Check or uncheck `id` as a merge candidate. Returns whether it is
    /// now checked.
    pub fn toggle_checked(&mut self, id: &TrackId) -> bool {
        if let Some(pos) = self.checked.iter().position(|c| c == id) {
            self.checked.remove(pos);
            false
        } else if self.stats.contains_key(id) {
            self.checked.push(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_checked(&mut self) {
        self.checked.clear();
    }

    /// The selected track's detection in the current frame, if it has one.
    pub fn selected_detail(&self) -> Option<SelectedDetail> {
        let id = self.selected.as_ref()?;
        let frame = self.current_frame()?;
        let detection = frame.detection(id)?;
        Some(SelectedDetail {
            track_id: id.clone(),
            class: detection.class,
            bbox: detection.bbox,
            frame_index: self.playback.frame_index(),
            timestamp: frame.timestamp,
        })
    }

    // -- filter ------------------------------------------------------------

    /// Flip one class's visibility and return its new state.
    pub fn toggle_class(&mut self, class: TrackClass) -> bool {
        let visible = self.filter.visibility.toggle(class);
        self.refilter();
        visible
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.filter.search_term = term.into();
        self.refilter();
    }

    // -- view scale --------------------------------------------------------

    pub fn set_scale(&mut self, scale: f64) -> f64 {
        self.scale = clamp_scale(scale);
        self.scale
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    /// Canvas size in pixels at the current scale.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            (self.options.space.width * self.scale).round().max(1.0) as u32,
            (self.options.space.height * self.scale).round().max(1.0) as u32,
        )
    }

    pub fn timeline(&self) -> TimelineLayout {
        let mut params = TimelineParams::new(self.options.space.width, self.options.fps);
        params.scale = self.scale;
        params.zoom = self.zoom;
        compute_timeline(&self.frames, &self.stats, &params, self.selected.as_ref())
    }

    /// Draw the current frame. Returns the number of boxes drawn.
    pub fn render<S: Surface>(&self, surface: &mut S) -> usize {
        self.renderer
            .render(surface, self.current_frame(), self.selected.as_ref())
    }

    // -- mutations ---------------------------------------------------------

    /// Merge every checked track into a new one, taking boxes from the
    /// first checked track.
    pub fn merge_checked(&mut self) -> Result<TrackId, CoreError> {
        let Some(base) = self.checked.first().cloned() else {
            let err = CoreError::InvalidOperation(
                "merge needs at least 2 distinct tracks, got 0".into(),
            );
            tracing::warn!(error = %err, "Merge rejected");
            return Err(err);
        };

        let outcome = match merge_tracks(&self.frames, &self.checked, &base, &mut self.allocator)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, checked = self.checked.len(), "Merge rejected");
                return Err(e);
            }
        };

        self.checked.clear();
        Ok(self.apply(outcome))
    }

    /// Split the selected track at the current frame.
    ///
    /// Does nothing without a selection.
    pub fn split_selected(&mut self) -> Option<(TrackId, TrackId)> {
        let id = self.selected.clone()?;
        let at = self.playback.frame_index();
        let outcome = split_track(&self.frames, &id, at, &mut self.allocator)?;
        self.set_selected(None);
        Some(self.apply(outcome))
    }

    /// Delete the selected track once `confirm` agrees.
    ///
    /// Does nothing without a selection or when `confirm` declines.
    pub fn delete_selected(&mut self, confirm: impl FnOnce(&TrackId) -> bool) -> Option<TrackId> {
        let id = self.selected.clone()?;
        if !confirm(&id) {
            tracing::info!(track_id = %id, "Delete cancelled");
            return None;
        }
        let outcome = delete_track(&self.frames, &id)?;
        self.set_selected(None);
        self.apply(outcome);
        Some(id)
    }

    /// Install a mutation's sequence and bring everything downstream in line.
    ///
    /// Hands back the ids the mutation created.
    fn apply<T>(&mut self, outcome: MutationOutcome<T>) -> T {
        let message = outcome.activity_message();
        tracing::info!(
            session_id = %self.id,
            change = %message,
            detections = outcome.frames.detection_count(),
            "Frame sequence replaced"
        );

        self.frames = outcome.frames;
        self.recompute();

        // Merged, split or deleted ids cannot stay selected or checked.
        if self
            .selected
            .as_ref()
            .is_some_and(|id| !self.stats.contains_key(id))
        {
            self.set_selected(None);
        }
        let stats = &self.stats;
        self.checked.retain(|id| stats.contains_key(id));

        let was_playing = self.playback.is_playing();
        self.playback.set_total_frames(self.frames.len());
        if was_playing && !self.playback.is_playing() {
            self.clock = None;
            self.publish_playback_state();
        }

        self.publish(SessionEventKind::FramesReplaced {
            total_frames: self.frames.len(),
            track_count: self.stats.len(),
        });
        self.log_activity(message);
        outcome.created
    }

    // -- playback ----------------------------------------------------------

    fn publish_playback_state(&self) {
        self.publish(SessionEventKind::PlaybackStateChanged {
            state: self.playback.state(),
            speed: self.playback.speed(),
        });
    }

    fn publish_frame(&self) {
        self.publish(SessionEventKind::FrameChanged {
            frame_index: self.playback.frame_index(),
        });
    }

    fn restart_clock(&mut self) {
        self.clock = if self.playback.is_playing() {
            Some(PlaybackClock::start(
                self.playback.generation(),
                self.playback.speed().tick_interval(),
                self.tick_tx.clone(),
            ))
        } else {
            None
        };
    }

    /// Start playing from the current frame.
    ///
    /// Spawns the playback clock, so it must run inside a Tokio runtime.
    pub fn play(&mut self) -> bool {
        if !self.playback.play() {
            return false;
        }
        self.restart_clock();
        tracing::info!(
            frame_index = self.playback.frame_index(),
            speed = %self.playback.speed(),
            "Playback started"
        );
        self.publish_playback_state();
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.playback.pause() {
            return false;
        }
        self.clock = None;
        tracing::info!(frame_index = self.playback.frame_index(), "Playback paused");
        self.publish_playback_state();
        true
    }

    pub fn stop(&mut self) {
        let was_playing = self.playback.is_playing();
        let before = self.playback.frame_index();
        self.playback.stop();
        self.clock = None;
        if was_playing {
            tracing::info!("Playback stopped");
            self.publish_playback_state();
        }
        if before != 0 {
            self.publish_frame();
        }
    }

    /// Change speed; a running clock is replaced at the new rate.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> bool {
        if !self.playback.set_speed(speed) {
            return false;
        }
        if self.playback.is_playing() {
            self.restart_clock();
        }
        tracing::info!(speed = %speed, "Playback speed changed");
        self.publish_playback_state();
        true
    }

    pub fn step_forward(&mut self) -> FrameIndex {
        let was_playing = self.pause();
        let before = self.playback.frame_index();
        let index = self.playback.step_forward();
        if was_playing || index != before {
            self.publish_frame();
        }
        index
    }

    pub fn step_backward(&mut self) -> FrameIndex {
        self.pause();
        let before = self.playback.frame_index();
        let index = self.playback.step_backward();
        if index != before {
            self.publish_frame();
        }
        index
    }

    pub fn seek(&mut self, index: FrameIndex) -> FrameIndex {
        let before = self.playback.frame_index();
        let index = self.playback.seek(index);
        if index != before {
            self.publish_frame();
        }
        index
    }

    /// Seek to a 1-based frame number typed by the user.
    pub fn jump_to_frame_number(&mut self, number: i64) -> FrameIndex {
        let before = self.playback.frame_index();
        let index = self.playback.jump_to_frame_number(number);
        if index != before {
            self.publish_frame();
        }
        index
    }

    /// Apply one clock tick.
    pub fn handle_tick(&mut self, tick: PlaybackTick) -> TickOutcome {
        let outcome = self.playback.tick(tick.generation);
        match outcome {
            TickOutcome::Advanced(_) => self.publish_frame(),
            TickOutcome::ReachedEnd(index) => {
                self.clock = None;
                tracing::info!(frame_index = index, "Playback reached the last frame");
                self.publish_frame();
                self.publish_playback_state();
            }
            TickOutcome::Ignored => {
                tracing::debug!(generation = tick.generation, "Stale playback tick ignored");
            }
        }
        outcome
    }

    /// Wait for the next clock tick and apply it.
    ///
    /// Returns `None` when paused, since no tick can arrive then.
    pub async fn next_tick(&mut self) -> Option<TickOutcome> {
        if !self.playback.is_playing() {
            return None;
        }
        let tick = self.tick_rx.recv().await?;
        Some(self.handle_tick(tick))
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }
}

impl Drop for AnnotationSession {
    fn drop(&mut self) {
        if self.clock.take().is_some() {
            tracing::debug!(session_id = %self.id, "Playback clock cancelled on close");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
