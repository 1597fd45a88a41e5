use crate::calculate::{CalcOutcome, Evaluator, HttpEvaluator, spawn_calculation};
use crate::canvas::InkCanvas;
use crate::config::Settings;
use crate::overlay::Layout;
use crate::palette::{CANVAS_BACKDROP, DEFAULT_PEN, swatches};
use crate::session::Session;
use crate::{log_err, log_info, log_warn};
use egui::{Color32, FontId, Pos2, Rect, Sense, Vec2};
use std::sync::Arc;
use std::sync::mpsc;

const PANEL_FILL: Color32 = Color32::from_rgb(0x52, 0x52, 0x5b);
const CLEAR_FILL: Color32 = Color32::from_rgb(0xe1, 0x1d, 0x48);
const GENERATE_FILL: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
const HIGHLIGHT: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
const SWATCH_SIZE: f32 = 28.0;

// ============================================================================
// InkCalcApp — canvas, controls and the calculate pipeline
// ============================================================================

pub struct InkCalcApp {
    canvas: InkCanvas,
    texture: Option<egui::TextureHandle>,
    pen_color: Color32,
    swatches: Vec<Color32>,
    session: Session,
    settings: Settings,

    // Async calculate pipeline
    evaluator: Arc<dyn Evaluator>,
    calc_sender: mpsc::Sender<CalcOutcome>,
    calc_receiver: mpsc::Receiver<CalcOutcome>,

    /// Window width the overlay margins are computed from.
    viewport_width: f32,
    /// False until the first frame has sized the canvas to its panel.
    canvas_sized: bool,
}

impl InkCalcApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let evaluator = Arc::new(HttpEvaluator::new(&settings.api_url, settings.timeout()));
        log_info!("Evaluation endpoint: {}", evaluator.endpoint());
        Self::with_evaluator(settings, evaluator)
    }

    /// Build around any evaluator.  The canvas starts empty and takes its
    /// real size on the first frame.
    pub fn with_evaluator(settings: Settings, evaluator: Arc<dyn Evaluator>) -> Self {
        let (calc_sender, calc_receiver) = mpsc::channel();
        Self {
            canvas: InkCanvas::new(1, 1).with_line_width(settings.line_width),
            texture: None,
            pen_color: DEFAULT_PEN,
            swatches: swatches(),
            session: Session::default(),
            settings,
            evaluator,
            calc_sender,
            calc_receiver,
            viewport_width: 1.0,
            canvas_sized: false,
        }
    }

    fn layout(&self) -> Layout {
        Layout {
            canvas_width: self.canvas.width() as f32,
            canvas_height: self.canvas.height() as f32,
            viewport_width: self.viewport_width,
        }
    }

    /// Export the canvas and send it off.  Ignored while a request is in flight.
    fn submit(&mut self, ctx: Option<egui::Context>) {
        if self.session.loading {
            return;
        }
        if !self.canvas_sized {
            log_warn!("Canvas not laid out yet, nothing to submit");
            return;
        }
        let image = match self.canvas.to_data_url() {
            Ok(url) => url,
            Err(e) => {
                log_err!("Error sending data: {}", e);
                self.session.record_failure(e.to_string());
                return;
            }
        };
        let request = self.session.request(image);
        log_info!(
            "Submitting {}x{} canvas with {} known variable(s)",
            self.canvas.width(),
            self.canvas.height(),
            request.dict_of_vars.len()
        );
        self.session.loading = true;
        spawn_calculation(
            Arc::clone(&self.evaluator),
            request,
            self.calc_sender.clone(),
            ctx,
        );
    }

    /// Drain finished requests.  On success the answers replace the sketch.
    fn poll(&mut self, measure: impl Fn(&str) -> f32) {
        while let Ok(outcome) = self.calc_receiver.try_recv() {
            self.session.loading = false;
            match outcome {
                CalcOutcome::Completed { response, .. } => {
                    let bounds = self.canvas.ink_bounds();
                    let layout = self.layout();
                    self.session.apply_response(&response, bounds, &layout, &measure);
                    self.canvas.clear();
                }
                CalcOutcome::Failed(e) => {
                    self.session.record_failure(e.to_string());
                }
            }
        }
    }

    fn reset(&mut self) {
        self.canvas.clear();
        self.session.reset();
    }

    // ------------------------------------------------------------------
    // UI
    // ------------------------------------------------------------------

    fn show_controls(&mut self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        let width = (screen.width() * 0.2).max(180.0);
        let height = screen.height() * 0.96;

        egui::Area::new(egui::Id::new("controls"))
            .fixed_pos(Pos2::new(10.0, screen.height() * 0.02))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(PANEL_FILL)
                    .rounding(24.0)
                    .inner_margin(20.0)
                    .show(ui, |ui| {
                        ui.set_width(width - 40.0);
                        ui.set_min_height(height - 40.0);
                        ui.vertical_centered(|ui| {
                            self.show_swatches(ui);
                            ui.add_space(40.0);
                            self.show_buttons(ui, ctx);
                            self.show_status(ui);
                        });
                    });
            });
    }

    fn show_swatches(&mut self, ui: &mut egui::Ui) {
        let per_row = ((ui.available_width() / (SWATCH_SIZE + 6.0)) as usize).max(1);
        for row in self.swatches.chunks(per_row) {
            ui.horizontal(|ui| {
                for &color in row {
                    let (rect, resp) =
                        ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), Sense::click());
                    let painter = ui.painter();
                    painter.circle_filled(rect.center(), SWATCH_SIZE / 2.0 - 2.0, color);
                    if color == self.pen_color || resp.hovered() {
                        painter.circle_stroke(
                            rect.center(),
                            SWATCH_SIZE / 2.0,
                            egui::Stroke::new(2.0, HIGHLIGHT),
                        );
                    }
                    if resp.clicked() {
                        self.pen_color = color;
                    }
                }
            });
        }
    }

    fn show_buttons(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            let clear = egui::Button::new(egui::RichText::new("Clear").strong().color(Color32::WHITE))
                .fill(CLEAR_FILL);
            if ui.add(clear).on_hover_text("Delete").clicked() {
                self.reset();
            }
            let generate = egui::Button::new(egui::RichText::new("Generate").color(Color32::BLACK))
                .fill(GENERATE_FILL);
            if ui
                .add_enabled(!self.session.loading, generate)
                .on_hover_text("Ctrl+Enter")
                .clicked()
            {
                self.submit(Some(ctx.clone()));
            }
        });
    }

    fn show_status(&self, ui: &mut egui::Ui) {
        if self.session.loading {
            ui.add_space(12.0);
            ui.add(egui::Spinner::new().color(Color32::YELLOW));
        }
        if let Some(err) = &self.session.last_error {
            ui.add_space(12.0);
            ui.colored_label(Color32::from_rgb(0xfc, 0xa5, 0xa5), err);
        }
        if let Some(last) = self.session.last_result() {
            ui.add_space(24.0);
            ui.label(
                egui::RichText::new(format!("{} = {}", last.expression, last.answer))
                    .color(Color32::WHITE),
            );
        }
        if !self.session.vars().is_empty() {
            ui.add_space(24.0);
            ui.label(egui::RichText::new("Variables").strong().color(Color32::WHITE));
            for (name, value) in self.session.vars() {
                ui.label(egui::RichText::new(format!("{} = {}", name, value)).monospace());
            }
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let size = ui.available_size();
        let (w, h) = (size.x.max(1.0) as u32, size.y.max(1.0) as u32);
        self.canvas.resize(w, h);
        self.canvas_sized = true;

        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        let to_canvas = |p: Pos2| (p - rect.min).to_pos2();

        if response.drag_started()
            && let Some(p) = response.interact_pointer_pos()
        {
            self.canvas.begin_stroke(to_canvas(p));
        }
        if response.dragged()
            && let Some(p) = response.interact_pointer_pos()
        {
            self.canvas.extend_stroke(to_canvas(p), self.pen_color);
        }
        if response.drag_released() {
            self.canvas.end_stroke();
        }
        if response.clicked()
            && let Some(p) = response.interact_pointer_pos()
        {
            self.canvas.dot(to_canvas(p), self.pen_color);
        }

        self.canvas.sync_texture(ui.ctx(), &mut self.texture);
        if let Some(texture) = &self.texture {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }

        let font = FontId::proportional(self.settings.font_size);
        for entry in self.session.overlay().entries() {
            painter.text(
                rect.min + entry.pos.to_vec2(),
                egui::Align2::LEFT_BOTTOM,
                &entry.text,
                font.clone(),
                Color32::WHITE,
            );
        }
    }
}

impl eframe::App for InkCalcApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::from(CANVAS_BACKDROP).to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.viewport_width = ctx.screen_rect().width();

        let font = FontId::proportional(self.settings.font_size);
        self.poll(|text| {
            ctx.fonts(|f| f.layout_no_wrap(text.to_owned(), font.clone(), Color32::WHITE).size().x)
        });
        if self.session.loading {
            ctx.request_repaint();
        }

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Enter)) {
            self.submit(Some(ctx.clone()));
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            self.reset();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame {
                fill: CANVAS_BACKDROP,
                ..Default::default()
            })
            .show(ctx, |ui| self.show_canvas(ui));

        self.show_controls(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::{CalculateRequest, CalculateResponse};
    use crate::calculate::tests::{FakeEvaluator, eval};
    use crate::error::CalcError;
    use std::time::Duration;

    fn measure(s: &str) -> f32 {
        s.len() as f32 * 12.0
    }

    fn app_with(fake: Arc<FakeEvaluator>) -> InkCalcApp {
        let mut app = InkCalcApp::with_evaluator(Settings::default(), fake);
        app.canvas.resize(400, 300);
        app.viewport_width = 400.0;
        app.canvas_sized = true;
        app
    }

    fn wait_for_outcome(app: &mut InkCalcApp) {
        for _ in 0..400 {
            app.poll(measure);
            if !app.session.loading {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("request never completed");
    }

    fn sketch(app: &mut InkCalcApp) {
        app.canvas.begin_stroke(Pos2::new(100.0, 100.0));
        app.canvas.extend_stroke(Pos2::new(200.0, 120.0), Color32::WHITE);
        app.canvas.end_stroke();
    }

    #[test]
    fn generate_applies_results_and_replaces_sketch() {
        let fake = Arc::new(FakeEvaluator::answering(CalculateResponse {
            data: vec![eval("y", "3", true), eval("y + 1", "4", false)],
        }));
        let mut app = app_with(fake.clone());
        sketch(&mut app);

        app.submit(None);
        assert!(app.session.loading);
        wait_for_outcome(&mut app);

        assert_eq!(app.session.vars()["y"], "3");
        let entries = app.session.overlay().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].pos.y > entries[0].pos.y);
        assert!(app.canvas.ink_bounds().is_empty());

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].image.starts_with("data:image/png;base64,"));
        assert!(seen[0].dict_of_vars.is_empty());
    }

    #[test]
    fn overlay_starts_at_ink_center() {
        let fake = Arc::new(FakeEvaluator::answering(CalculateResponse {
            data: vec![eval("1+1", "2", false)],
        }));
        let mut app = app_with(fake);
        sketch(&mut app);
        let center = app.canvas.ink_bounds().center();

        app.submit(None);
        wait_for_outcome(&mut app);
        assert_eq!(app.session.overlay().entries()[0].pos.y, center.y);
    }

    #[test]
    fn failure_keeps_sketch_and_reports() {
        let fake = Arc::new(FakeEvaluator::failing(CalcError::Transport(
            "connection refused".into(),
        )));
        let mut app = app_with(fake);
        sketch(&mut app);

        app.submit(None);
        wait_for_outcome(&mut app);

        assert!(!app.canvas.ink_bounds().is_empty());
        assert!(app.session.overlay().entries().is_empty());
        assert!(app.session.last_error.as_deref().unwrap_or("").contains("connection refused"));
    }

    #[test]
    fn second_submit_while_loading_is_ignored() {
        let fake = Arc::new(FakeEvaluator::answering(CalculateResponse::default()));
        let mut app = app_with(fake.clone());
        app.session.loading = true;
        app.submit(None);
        std::thread::sleep(Duration::from_millis(20));
        assert!(fake.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn submit_before_first_layout_is_ignored() {
        let fake = Arc::new(FakeEvaluator::answering(CalculateResponse::default()));
        let mut app = InkCalcApp::with_evaluator(Settings::default(), fake.clone());
        app.submit(None);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!app.session.loading);
        assert!(fake.seen.lock().unwrap().is_empty());
    }

    struct CrashingEvaluator;

    impl Evaluator for CrashingEvaluator {
        fn calculate(&self, _request: &CalculateRequest) -> Result<CalculateResponse, CalcError> {
            panic!("backend client bug");
        }
    }

    #[test]
    fn crashing_evaluator_clears_loading() {
        let mut app = InkCalcApp::with_evaluator(Settings::default(), Arc::new(CrashingEvaluator));
        app.canvas.resize(400, 300);
        app.canvas_sized = true;
        sketch(&mut app);

        app.submit(None);
        wait_for_outcome(&mut app);

        assert!(!app.canvas.ink_bounds().is_empty());
        assert!(app.session.last_error.as_deref().unwrap_or("").contains("backend client bug"));
    }

    #[test]
    fn clear_resets_canvas_and_session() {
        let fake = Arc::new(FakeEvaluator::answering(CalculateResponse {
            data: vec![eval("x", "9", true)],
        }));
        let mut app = app_with(fake);
        sketch(&mut app);
        app.submit(None);
        wait_for_outcome(&mut app);
        sketch(&mut app);

        app.reset();
        assert!(app.canvas.ink_bounds().is_empty());
        assert!(app.session.vars().is_empty());
        assert!(app.session.overlay().entries().is_empty());
        assert!(app.session.last_result().is_none());
    }
}
