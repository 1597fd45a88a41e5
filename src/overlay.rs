//! Placement of rendered `expr = result` lines on top of the canvas.
//!
//! Lines are horizontally centered in a band that starts at 20% of the
//! viewport width, clamped to stay on the canvas, and stacked downward from
//! an anchor that wraps back near the top once it would leave the canvas.

use egui::Pos2;

/// Anchor used before any response has been placed.
pub const INITIAL_ANCHOR: Pos2 = Pos2 { x: 10.0, y: 200.0 };
/// Vertical distance between consecutive lines.
pub const LINE_ADVANCE: f32 = 50.0;
/// `y` the anchor wraps back to.
pub const WRAP_Y: f32 = 50.0;

const RIGHT_PADDING: f32 = 10.0;
const BOTTOM_PADDING: f32 = 20.0;

/// Shown when the service recognized nothing.
pub const FALLBACK_TEXT: &str = "Sorry can't guess what you have drawn. Please try again..";

/// Dimensions the placement depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub viewport_width: f32,
}

impl Layout {
    /// Where a line of measured `text_width` goes for the given anchor.
    pub fn place(&self, text_width: f32, anchor: Pos2) -> Pos2 {
        let left_margin = self.viewport_width * 0.2;
        let max_width = self.viewport_width * 0.7;
        let x = left_margin.max(
            (self.canvas_width - text_width - RIGHT_PADDING)
                .min(left_margin + (max_width - text_width) / 2.0),
        );
        let y = (self.canvas_height - BOTTOM_PADDING).min(anchor.y);
        Pos2::new(x, y)
    }

    /// Anchor for the line after one placed at `placed`.
    pub fn advance(&self, placed: Pos2) -> Pos2 {
        let next_y = placed.y + LINE_ADVANCE;
        let y = if next_y > self.canvas_height - LINE_ADVANCE {
            WRAP_Y
        } else {
            next_y
        };
        Pos2::new(placed.x, y)
    }
}

/// A rendered line and where it sits (baseline-left).
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayEntry {
    pub text: String,
    pub pos: Pos2,
}

/// Ordered rendered lines plus the anchor for the next one.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultOverlay {
    entries: Vec<OverlayEntry>,
    anchor: Pos2,
}

impl Default for ResultOverlay {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            anchor: INITIAL_ANCHOR,
        }
    }
}

impl ResultOverlay {
    pub fn entries(&self) -> &[OverlayEntry] {
        &self.entries
    }

    pub fn anchor(&self) -> Pos2 {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Pos2) {
        self.anchor = anchor;
    }

    /// Place `text` at the current anchor and move the anchor down.
    pub fn push(&mut self, text: String, text_width: f32, layout: &Layout) -> Pos2 {
        let pos = layout.place(text_width, self.anchor);
        self.anchor = layout.advance(pos);
        self.entries.push(OverlayEntry { text, pos });
        pos
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout {
            canvas_width: 1000.0,
            canvas_height: 400.0,
            viewport_width: 1000.0,
        }
    }

    #[test]
    fn short_text_is_centered_in_band() {
        // left 200, band 700: 200 + (700 - 100) / 2 = 500
        let p = layout().place(100.0, Pos2::new(0.0, 120.0));
        assert_eq!(p, Pos2::new(500.0, 120.0));
    }

    #[test]
    fn wide_text_never_starts_left_of_margin() {
        let p = layout().place(2000.0, Pos2::new(0.0, 100.0));
        assert_eq!(p.x, 200.0);
    }

    #[test]
    fn text_is_pulled_left_to_fit_canvas() {
        let l = Layout {
            canvas_width: 600.0,
            ..layout()
        };
        // 600 - 300 - 10 = 290 beats 200 + (700 - 300) / 2 = 400
        assert_eq!(l.place(300.0, Pos2::new(0.0, 10.0)).x, 290.0);
    }

    #[test]
    fn anchor_below_canvas_is_clamped() {
        let p = layout().place(10.0, Pos2::new(0.0, 900.0));
        assert_eq!(p.y, 380.0);
    }

    #[test]
    fn successive_lines_move_down_then_wrap() {
        let l = layout();
        let mut overlay = ResultOverlay::default();
        overlay.set_anchor(Pos2::new(0.0, 200.0));
        let ys: Vec<f32> = (0..5)
            .map(|i| overlay.push(format!("line {i}"), 80.0, &l).y)
            .collect();
        // 400 > 400 - 50 wraps to 50
        assert_eq!(ys, vec![200.0, 250.0, 300.0, 350.0, 50.0]);
        assert_eq!(overlay.entries().len(), 5);
        assert_eq!(overlay.entries()[4].text, "line 4");
    }

    #[test]
    fn clear_restores_initial_anchor() {
        let mut overlay = ResultOverlay::default();
        overlay.push("a = 1".into(), 50.0, &layout());
        overlay.clear();
        assert!(overlay.entries().is_empty());
        assert_eq!(overlay.anchor(), INITIAL_ANCHOR);
    }
}
