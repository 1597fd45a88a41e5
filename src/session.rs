// ============================================================================
// SESSION — state accumulated between Clear presses
// ============================================================================

use crate::calculate::{CalculateRequest, CalculateResponse, VarDict};
use crate::canvas::InkBounds;
use crate::overlay::{FALLBACK_TEXT, Layout, ResultOverlay};

/// The most recent expression/answer pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateResult {
    pub expression: String,
    pub answer: String,
}

#[derive(Default)]
pub struct Session {
    vars: VarDict,
    overlay: ResultOverlay,
    last_result: Option<GenerateResult>,
    /// True while a request is in flight; Generate is disabled meanwhile.
    pub loading: bool,
    /// Message of the last failed request, cleared by the next success.
    pub last_error: Option<String>,
}

impl Session {
    pub fn vars(&self) -> &VarDict {
        &self.vars
    }

    pub fn overlay(&self) -> &ResultOverlay {
        &self.overlay
    }

    pub fn last_result(&self) -> Option<&GenerateResult> {
        self.last_result.as_ref()
    }

    /// Forget everything: variables, rendered lines, last result.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.overlay.clear();
        self.last_result = None;
        self.last_error = None;
    }

    /// Request body for `image` carrying the current variables.
    pub fn request(&self, image: String) -> CalculateRequest {
        CalculateRequest {
            image,
            dict_of_vars: self.vars.clone(),
        }
    }

    /// Fold a service response into the session.
    ///
    /// Assignments are merged into the variable dictionary, the overlay anchor
    /// jumps to the center of the ink, and every evaluation becomes one
    /// `expr = result` line stacked below the previous one.  `measure` returns
    /// the rendered width of a line.
    pub fn apply_response(
        &mut self,
        response: &CalculateResponse,
        bounds: InkBounds,
        layout: &Layout,
        measure: impl Fn(&str) -> f32,
    ) {
        self.last_error = None;
        for eval in response.data.iter().filter(|e| e.assign) {
            self.vars.insert(eval.expr.clone(), eval.result.clone());
        }

        self.overlay.set_anchor(bounds.center());

        if response.data.is_empty() {
            let text = FALLBACK_TEXT.to_string();
            let width = measure(&text);
            self.overlay.push(text, width, layout);
            return;
        }

        for eval in &response.data {
            let text = format!("{} = {}", eval.expr, eval.result);
            let width = measure(&text);
            self.overlay.push(text, width, layout);
            self.last_result = Some(GenerateResult {
                expression: eval.expr.clone(),
                answer: eval.result.clone(),
            });
        }
    }

    pub fn record_failure(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::Evaluation;
    use crate::calculate::tests::eval;
    use crate::overlay::INITIAL_ANCHOR;

    fn layout() -> Layout {
        Layout {
            canvas_width: 800.0,
            canvas_height: 600.0,
            viewport_width: 800.0,
        }
    }

    fn bounds_around(x: u32, y: u32) -> InkBounds {
        InkBounds {
            min_x: x - 10,
            min_y: y - 10,
            max_x: x + 10,
            max_y: y + 10,
        }
    }

    fn measure(s: &str) -> f32 {
        s.chars().count() as f32 * 15.0
    }

    fn respond(data: Vec<Evaluation>) -> CalculateResponse {
        CalculateResponse { data }
    }

    #[test]
    fn assignment_updates_variables() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![eval("x", "5", true)]), bounds_around(100, 100), &layout(), measure);
        assert_eq!(s.vars().get("x").map(String::as_str), Some("5"));
    }

    #[test]
    fn plain_result_leaves_variables_alone() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![eval("2 + 3", "5", false)]), bounds_around(100, 100), &layout(), measure);
        assert!(s.vars().is_empty());
        assert_eq!(
            s.last_result(),
            Some(&GenerateResult {
                expression: "2 + 3".into(),
                answer: "5".into()
            })
        );
    }

    #[test]
    fn every_assignment_in_one_response_is_kept() {
        let mut s = Session::default();
        let resp = respond(vec![eval("x", "2", true), eval("y", "3", true), eval("x + y", "5", false)]);
        s.apply_response(&resp, bounds_around(100, 100), &layout(), measure);
        assert_eq!(s.vars().len(), 2);
        assert_eq!(s.vars()["y"], "3");
    }

    #[test]
    fn later_assignment_overwrites_earlier_value() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![eval("x", "2", true)]), bounds_around(100, 100), &layout(), measure);
        s.apply_response(&respond(vec![eval("x", "7", true)]), bounds_around(100, 100), &layout(), measure);
        assert_eq!(s.vars()["x"], "7");
    }

    #[test]
    fn request_carries_variables() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![eval("a", "1", true)]), bounds_around(50, 50), &layout(), measure);
        let req = s.request("data:image/png;base64,".into());
        assert_eq!(req.dict_of_vars.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn results_stack_downward_from_ink_center() {
        let mut s = Session::default();
        let resp = respond(vec![eval("1+1", "2", false), eval("2+2", "4", false), eval("3+3", "6", false)]);
        s.apply_response(&resp, bounds_around(300, 150), &layout(), measure);
        let entries = s.overlay().entries();
        let ys: Vec<f32> = entries.iter().map(|e| e.pos.y).collect();
        assert_eq!(ys, vec![150.0, 200.0, 250.0]);
        assert_eq!(entries[0].text, "1+1 = 2");
        assert_eq!(entries[2].text, "3+3 = 6");
    }

    #[test]
    fn results_wrap_near_bottom() {
        let mut s = Session::default();
        let resp = respond(vec![eval("a", "1", false), eval("b", "2", false)]);
        // first line at 540; 590 > 600 - 50 wraps to the top
        s.apply_response(&resp, bounds_around(300, 540), &layout(), measure);
        let ys: Vec<f32> = s.overlay().entries().iter().map(|e| e.pos.y).collect();
        assert_eq!(ys, vec![540.0, 50.0]);
    }

    #[test]
    fn empty_response_renders_fallback() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![]), bounds_around(100, 100), &layout(), measure);
        assert_eq!(s.overlay().entries().len(), 1);
        assert_eq!(s.overlay().entries()[0].text, FALLBACK_TEXT);
        assert!(s.last_result().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = Session::default();
        s.apply_response(&respond(vec![eval("x", "5", true), eval("x*2", "10", false)]), bounds_around(100, 100), &layout(), measure);
        s.record_failure("timeout".into());
        s.reset();
        assert!(s.vars().is_empty());
        assert!(s.overlay().entries().is_empty());
        assert!(s.last_result().is_none());
        assert!(s.last_error.is_none());
        assert_eq!(s.overlay().anchor(), INITIAL_ANCHOR);
    }

    #[test]
    fn success_clears_previous_error() {
        let mut s = Session::default();
        s.record_failure("refused".into());
        s.apply_response(&respond(vec![eval("1", "1", false)]), bounds_around(100, 100), &layout(), measure);
        assert!(s.last_error.is_none());
    }
}
