use clap::Parser;
use inkcalc::app::InkCalcApp;
use inkcalc::cli::{self, CliArgs};
use inkcalc::config::Settings;
use inkcalc::logger;

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init();

    // -- Headless mode ---------------------------------------------------
    if args.is_headless() {
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------
    let settings = Settings::resolve(args.api_url.as_deref());
    inkcalc::log_info!("Starting GUI against {}", settings.api_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([480.0, 360.0])
            .with_title("InkCalc"),
        ..Default::default()
    };

    eframe::run_native(
        "InkCalc",
        options,
        Box::new(move |cc| Box::new(InkCalcApp::new(cc, settings))),
    )
}
