// ============================================================================
// INK CANVAS — owned RGBA pixel buffer with stroke rasterization
// ============================================================================
//
// The buffer starts fully transparent; the UI paints a dark backdrop behind
// it.  Strokes are rasterized on the CPU as a dense chain of round stamps,
// which gives round caps and joins for free.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use egui::{Color32, ColorImage, Pos2};
use image::{ImageOutputFormat, Rgba, RgbaImage};

use crate::error::CalcError;

/// Value of every pixel on a freshly cleared canvas.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Default stroke width in pixels.
pub const DEFAULT_LINE_WIDTH: f32 = 3.0;

/// Minimal rectangle enclosing all non-background pixels.
///
/// Coordinates are inclusive.  A blank canvas leaves the scan's starting
/// values in place: `min = (width, height)`, `max = (0, 0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl InkBounds {
    /// True when no ink was found (the bounds are inverted).
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Midpoint of the box.  For empty bounds this is the canvas center,
    /// since the inverted corners are `(w, h)` and `(0, 0)`.
    pub fn center(&self) -> Pos2 {
        Pos2::new(
            (self.min_x as f32 + self.max_x as f32) / 2.0,
            (self.min_y as f32 + self.max_y as f32) / 2.0,
        )
    }
}

pub struct InkCanvas {
    pixels: RgbaImage,
    line_width: f32,
    /// Last pen position while a stroke is in progress.
    pen: Option<Pos2>,
    /// Set on every pixel mutation; the UI clears it after re-uploading.
    dirty: bool,
}

impl InkCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, BACKGROUND),
            line_width: DEFAULT_LINE_WIDTH,
            pen: None,
            dirty: true,
        }
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.set_line_width(width);
        self
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width.max(0.5);
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // ------------------------------------------------------------------
    // Strokes
    // ------------------------------------------------------------------

    pub fn begin_stroke(&mut self, pos: Pos2) {
        self.pen = Some(pos);
    }

    /// Draw from the previous pen position to `pos`.  No-op when no stroke
    /// is in progress.
    pub fn extend_stroke(&mut self, pos: Pos2, color: Color32) {
        let Some(from) = self.pen else { return };
        self.draw_line(from, pos, color);
        self.pen = Some(pos);
    }

    pub fn end_stroke(&mut self) {
        self.pen = None;
    }

    /// A single round stamp, used when the pointer is pressed and released
    /// without moving.
    pub fn dot(&mut self, pos: Pos2, color: Color32) {
        self.stamp(pos, color);
        self.dirty = true;
    }

    fn draw_line(&mut self, start: Pos2, end: Pos2, color: Color32) {
        let delta = end - start;
        let distance = delta.length();
        if distance < 0.1 {
            self.dot(start, color);
            return;
        }
        // Dense per-pixel stepping keeps the stamp chain gap-free
        let steps = distance.ceil() as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(start + delta * t, color);
        }
        self.dirty = true;
    }

    fn stamp(&mut self, center: Pos2, color: Color32) {
        let radius = self.line_width / 2.0;
        let radius_sq = radius * radius;
        let (w, h) = (self.width() as f32, self.height() as f32);
        if w == 0.0 || h == 0.0 {
            return;
        }

        let min_x = (center.x - radius).floor().clamp(0.0, w - 1.0) as u32;
        let max_x = (center.x + radius).ceil().clamp(0.0, w - 1.0) as u32;
        let min_y = (center.y - radius).floor().clamp(0.0, h - 1.0) as u32;
        let max_y = (center.y + radius).ceil().clamp(0.0, h - 1.0) as u32;

        let ink = Rgba([color.r(), color.g(), color.b(), 255]);
        for y in min_y..=max_y {
            let dy = y as f32 + 0.5 - center.y;
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                if dx * dx + dy * dy <= radius_sq {
                    self.pixels.put_pixel(x, y, ink);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Whole-canvas operations
    // ------------------------------------------------------------------

    pub fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = BACKGROUND;
        }
        self.pen = None;
        self.dirty = true;
    }

    /// Change dimensions, keeping whatever ink fits in the new area.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width() && height == self.height() {
            return;
        }
        let mut next = RgbaImage::from_pixel(width, height, BACKGROUND);
        image::imageops::replace(&mut next, &self.pixels, 0, 0);
        self.pixels = next;
        self.dirty = true;
    }

    /// Linear scan for the ink bounding box.
    pub fn ink_bounds(&self) -> InkBounds {
        let mut bounds = InkBounds {
            min_x: self.width(),
            min_y: self.height(),
            max_x: 0,
            max_y: 0,
        };
        for (x, y, p) in self.pixels.enumerate_pixels() {
            if *p != BACKGROUND {
                bounds.min_x = bounds.min_x.min(x);
                bounds.min_y = bounds.min_y.min(y);
                bounds.max_x = bounds.max_x.max(x);
                bounds.max_y = bounds.max_y.max(y);
            }
        }
        bounds
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    pub fn to_png(&self) -> Result<Vec<u8>, CalcError> {
        encode_png(&self.pixels)
    }

    /// `data:image/png;base64,...` of the full canvas.
    pub fn to_data_url(&self) -> Result<String, CalcError> {
        Ok(png_data_url(&self.to_png()?))
    }

    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixels.as_raw(),
        )
    }

    /// Upload the buffer into `texture` (creating it on first use) when dirty.
    pub fn sync_texture(&mut self, ctx: &egui::Context, texture: &mut Option<egui::TextureHandle>) {
        if !self.is_dirty() && texture.is_some() {
            return;
        }
        let image = self.to_color_image();
        match texture {
            Some(handle) => handle.set(image, egui::TextureOptions::LINEAR),
            None => {
                *texture = Some(ctx.load_texture("ink_canvas", image, egui::TextureOptions::LINEAR));
            }
        }
        self.mark_clean();
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, CalcError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .map_err(|e| CalcError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}
