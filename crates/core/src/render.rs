//! Frame rendering onto a raster surface, plus canvas hit-testing.
//!
//! [`FrameRenderer`] draws through the [`Surface`] trait so the same code
//! paints into an in-memory [`RasterSurface`] or any other backend.

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::CoreError;
use crate::frame::{Detection, Frame};
use crate::types::{CoordinateSpace, TrackClass, TrackId};

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

pub const TEAM_A_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const TEAM_B_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const REFEREE_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
pub const SELECTED_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);

/// Fully transparent; what `clear` paints.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Stroke width of a bounding box, in pixels.
pub const LINE_WIDTH: u32 = 2;

pub fn class_color(class: TrackClass) -> Rgba<u8> {
    match class {
        TrackClass::TeamA => TEAM_A_COLOR,
        TrackClass::TeamB => TEAM_B_COLOR,
        TrackClass::Referee => REFEREE_COLOR,
    }
}

/// Stroke colour for `detection`, highlighting the selected track.
pub fn stroke_color(detection: &Detection, selected: Option<&TrackId>) -> Rgba<u8> {
    if selected == Some(&detection.track_id) {
        SELECTED_COLOR
    } else {
        class_color(detection.class)
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// Rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Clip to a `width`x`height` surface grown by `margin` on every side.
    ///
    /// Edges cut off by the clip land in the margin, off the surface, so a
    /// stroke no wider than `margin` only paints the visible part of the
    /// outline. `None` when the rectangle misses the surface entirely.
    pub fn clipped(self, width: u32, height: u32, margin: u32) -> Option<PixelRect> {
        let (x, width) = clip_span(
            i64::from(self.x),
            i64::from(self.width),
            width,
            margin,
        )?;
        let (y, height) = clip_span(
            i64::from(self.y),
            i64::from(self.height),
            height,
            margin,
        )?;
        Some(PixelRect {
            x,
            y,
            width,
            height,
        })
    }
}

/// Clip `[start, start + len)` to `[-margin, limit + margin)`.
///
/// `None` when the span is empty or does not overlap `[0, limit)`.
fn clip_span(start: i64, len: i64, limit: u32, margin: u32) -> Option<(i32, u32)> {
    let end = start.saturating_add(len);
    let limit = i64::from(limit);
    if len <= 0 || end <= 0 || start >= limit {
        return None;
    }
    let margin = i64::from(margin);
    let lo = i32::try_from(start.max(-margin)).ok()?;
    let hi = i32::try_from(end.min(limit + margin)).ok()?;
    // Keeps `lo + len - 1` inside i32 for the drawing code.
    let len = i32::try_from(i64::from(hi) - i64::from(lo)).ok()?;
    Some((lo, len.unsigned_abs()))
}

/// A drawable raster target.
pub trait Surface {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Erase everything previously drawn.
    fn clear(&mut self);

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba<u8>, line_width: u32);
}

/// In-memory RGBA surface.
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::Render(format!(
                "surface must have non-zero size, got {width}x{height}"
            )));
        }
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, BACKGROUND),
        })
    }

    /// Surface sized for `space` at `scale`, e.g. 560x280 at 1.5 gives 840x420.
    pub fn for_space(space: CoordinateSpace, scale: f64) -> Result<Self, CoreError> {
        let width = (space.width * scale).round();
        let height = (space.height * scale).round();
        if !(width >= 1.0 && height >= 1.0) {
            return Err(CoreError::Render(format!(
                "scale {scale} gives an empty surface"
            )));
        }
        Self::new(width as u32, height as u32)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| CoreError::Render(e.to_string()))
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = BACKGROUND;
        }
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba<u8>, line_width: u32) {
        let (width, height) = self.image.dimensions();
        let line_width = line_width.max(1);
        let Some(rect) = rect.clipped(width, height, line_width) else {
            return;
        };

        // Strokes grow inward, one ring per pixel of width.
        for inset in 0..line_width {
            let w = rect.width.saturating_sub(inset.saturating_mul(2));
            let h = rect.height.saturating_sub(inset.saturating_mul(2));
            if w == 0 || h == 0 {
                break;
            }
            let (Ok(x), Ok(y)) = (
                i32::try_from(i64::from(rect.x) + i64::from(inset)),
                i32::try_from(i64::from(rect.y) + i64::from(inset)),
            ) else {
                break;
            };
            draw_hollow_rect_mut(&mut self.image, Rect::at(x, y).of_size(w, h), color);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameRenderer
// ---------------------------------------------------------------------------

/// Draws a frame's boxes scaled from native coordinates to the surface.
#[derive(Debug, Clone, Copy)]
pub struct FrameRenderer {
    pub space: CoordinateSpace,
    pub line_width: u32,
}

impl FrameRenderer {
    pub fn new(space: CoordinateSpace) -> Self {
        Self {
            space,
            line_width: LINE_WIDTH,
        }
    }

    /// Clear `surface` and draw every detection of `frame`.
    ///
    /// Boxes crossing the surface edge are clipped to it and boxes lying
    /// wholly outside are skipped. Returns the number of boxes drawn. A
    /// missing frame only clears.
    pub fn render<S: Surface>(
        &self,
        surface: &mut S,
        frame: Option<&Frame>,
        selected: Option<&TrackId>,
    ) -> usize {
        surface.clear();
        let Some(frame) = frame else {
            return 0;
        };

        let (width, height) = surface.dimensions();
        let scale_x = f64::from(width) / self.space.width;
        let scale_y = f64::from(height) / self.space.height;
        let margin = self.line_width.max(1);

        let mut drawn = 0;
        for detection in &frame.detections {
            let b = &detection.bbox;
            // Float to i64 saturates, and clip_span never overflows on it.
            let x = clip_span(
                (b.x1 * scale_x).round() as i64,
                ((b.width() * scale_x).round() as i64).max(1),
                width,
                margin,
            );
            let y = clip_span(
                (b.y1 * scale_y).round() as i64,
                ((b.height() * scale_y).round() as i64).max(1),
                height,
                margin,
            );
            let (Some((x, w)), Some((y, h))) = (x, y) else {
                continue;
            };
            let rect = PixelRect {
                x,
                y,
                width: w,
                height: h,
            };
            surface.stroke_rect(rect, stroke_color(detection, selected), self.line_width);
            drawn += 1;
        }

        drawn
    }
}

// ---------------------------------------------------------------------------
// Hit-testing
// ---------------------------------------------------------------------------

/// Map a canvas pixel back to native coordinates.
pub fn canvas_to_native(
    space: CoordinateSpace,
    canvas_width: f64,
    canvas_height: f64,
    x: f64,
    y: f64,
) -> (f64, f64) {
    (
        x / (canvas_width / space.width),
        y / (canvas_height / space.height),
    )
}

/// First detection in `frame` whose box contains the native point.
pub fn pick_detection(frame: &Frame, x: f64, y: f64) -> Option<&Detection> {
    frame.detections.iter().find(|d| d.bbox.contains(x, y))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
