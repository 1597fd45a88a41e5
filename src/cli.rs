// ============================================================================
// InkCalc CLI — headless evaluation of a sketch saved as an image file
// ============================================================================
//
// Usage examples:
//   inkcalc --input sketch.png
//   inkcalc -i sketch.png --var x=5 --var y=2 --api-url http://calc.local:8900
//   inkcalc -i sketch.png --json
//
// No window is opened in this mode. The request runs synchronously on the
// current thread.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::calculate::{CalculateRequest, CalculateResponse, Evaluator, HttpEvaluator, VarDict};
use crate::canvas::{encode_png, png_data_url};
use crate::config::Settings;
use crate::error::CalcError;
use crate::log_info;

/// InkCalc — sketch a math expression, get the answer.
///
/// Without `--input` the drawing window opens. With it, the image is
/// submitted directly and the results are printed.
#[derive(Parser, Debug, Default)]
#[command(name = "inkcalc", about = "Handwritten math evaluator")]
pub struct CliArgs {
    /// Image to evaluate headlessly (PNG).
    #[arg(short, long, value_name = "IMAGE")]
    pub input: Option<PathBuf>,

    /// Known variable, repeatable: --var x=5
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Base URL of the evaluation service (overrides settings and INKCALC_API_URL).
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Print the raw response as JSON instead of `expr = result` lines.
    #[arg(long)]
    pub json: bool,

    /// Print timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn is_headless(&self) -> bool {
        self.input.is_some()
    }
}

/// `name=value` → pair; whitespace around either side is trimmed.
pub fn parse_var(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Run headless evaluation and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = Settings::resolve(args.api_url.as_deref());
    let evaluator = HttpEvaluator::new(&settings.api_url, settings.timeout());

    match evaluate(&args, &evaluator) {
        Ok(response) => {
            if args.json {
                match serde_json::to_string_pretty(&response) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                for line in format_lines(&response) {
                    println!("{}", line);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn evaluate(args: &CliArgs, evaluator: &dyn Evaluator) -> Result<CalculateResponse, CalcError> {
    let request = build_request(args)?;
    let start = Instant::now();
    let response = evaluator.calculate(&request)?;
    if args.verbose {
        eprintln!(
            "{} result(s) in {:.1} ms",
            response.data.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    log_info!("headless: {} result(s)", response.data.len());
    Ok(response)
}

fn build_request(args: &CliArgs) -> Result<CalculateRequest, CalcError> {
    let Some(path) = &args.input else {
        return Err(CalcError::Io("no input image given".into()));
    };
    let bytes = std::fs::read(path)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| CalcError::Io(format!("cannot decode {}: {}", path.display(), e)))?
        .into_rgba8();
    let png = encode_png(&img)?;
    Ok(CalculateRequest {
        image: png_data_url(&png),
        dict_of_vars: args.vars.iter().cloned().collect::<VarDict>(),
    })
}

fn format_lines(response: &CalculateResponse) -> Vec<String> {
    response
        .data
        .iter()
        .map(|e| {
            if e.assign {
                format!("{} = {}  (assigned)", e.expr, e.result)
            } else {
                format!("{} = {}", e.expr, e.result)
            }
        })
        .collect()
}
