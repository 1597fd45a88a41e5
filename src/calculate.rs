// ============================================================================
// CALCULATE — client for the remote recognition/evaluation service
// ============================================================================
//
// POST <base>/calculate  { image: <data URL>, dict_of_vars: { name: value } }
//   →                    { data: [ { expr, result, assign } ] }
//
// The call is blocking and runs on a worker thread; the outcome comes back
// to the UI over an mpsc channel, the same way background IO jobs do.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CalcError;
use crate::{log_err, log_info};

/// Name → value map of previously assigned symbols.
pub type VarDict = BTreeMap<String, String>;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CalculateRequest {
    /// `data:image/png;base64,...`
    pub image: String,
    pub dict_of_vars: VarDict,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CalculateResponse {
    #[serde(default)]
    pub data: Vec<Evaluation>,
}

/// One recognized expression and its value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub expr: String,
    #[serde(deserialize_with = "value_as_text")]
    pub result: String,
    /// True when `expr` is a symbol being assigned (`x = 5`).
    #[serde(default)]
    pub assign: bool,
}

/// Accept a JSON string, number or bool and keep its textual form.
fn value_as_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

pub fn parse_response(body: &str) -> Result<CalculateResponse, CalcError> {
    serde_json::from_str(body).map_err(|e| CalcError::Decode(e.to_string()))
}

/// Anything that can turn a sketch into evaluations.
pub trait Evaluator: Send + Sync {
    fn calculate(&self, request: &CalculateRequest) -> Result<CalculateResponse, CalcError>;
}

/// Talks to the real service over HTTP.
pub struct HttpEvaluator {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpEvaluator {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint_url(base_url),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `<base>/calculate`, tolerating a trailing slash on the base.
pub fn endpoint_url(base_url: &str) -> String {
    format!("{}/calculate", base_url.trim().trim_end_matches('/'))
}

impl Evaluator for HttpEvaluator {
    fn calculate(&self, request: &CalculateRequest) -> Result<CalculateResponse, CalcError> {
        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(request)
        {
            Ok(r) => r,
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                return Err(CalcError::Status { code, body });
            }
            Err(e) => return Err(CalcError::Transport(e.to_string())),
        };
        let body = response
            .into_string()
            .map_err(|e| CalcError::Transport(e.to_string()))?;
        parse_response(&body)
    }
}

/// Result delivered from the calculation worker.
#[derive(Debug)]
pub enum CalcOutcome {
    Completed {
        response: CalculateResponse,
        elapsed_ms: u128,
    },
    Failed(CalcError),
}

/// Run `request` on a worker thread.  The outcome is sent on `sender` and a
/// repaint is requested so the UI picks it up without waiting for input.
pub fn spawn_calculation(
    evaluator: Arc<dyn Evaluator>,
    request: CalculateRequest,
    sender: mpsc::Sender<CalcOutcome>,
    ctx: Option<egui::Context>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let start = Instant::now();
        // A panicking evaluator must still produce an outcome, or the UI
        // would wait on the loading flag forever
        let result = panic::catch_unwind(AssertUnwindSafe(|| evaluator.calculate(&request)))
            .unwrap_or_else(|payload| Err(CalcError::Worker(panic_message(payload.as_ref()))));
        let outcome = match result {
            Ok(response) => {
                let elapsed_ms = start.elapsed().as_millis();
                log_info!(
                    "calculate: {} result(s) in {} ms",
                    response.data.len(),
                    elapsed_ms
                );
                CalcOutcome::Completed { response, elapsed_ms }
            }
            Err(e) => {
                log_err!("Error sending data: {}", e);
                CalcOutcome::Failed(e)
            }
        };
        // Receiver gone means the window closed mid-request
        let _ = sender.send(outcome);
        if let Some(ctx) = ctx {
            ctx.request_repaint();
        }
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
