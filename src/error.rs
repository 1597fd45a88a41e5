/// Errors that can occur while submitting a sketch for evaluation.
#[derive(Debug)]
pub enum CalcError {
    /// Connection refused, DNS failure, timeout, ...
    Transport(String),
    /// The service answered with a non-success status code.
    Status { code: u16, body: String },
    /// The response body was not the expected JSON shape.
    Decode(String),
    /// The canvas (or an input image) could not be encoded as PNG.
    Encode(String),
    /// Reading an input file in headless mode failed.
    Io(String),
    /// The evaluator panicked on the worker thread.
    Worker(String),
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcError::Transport(e) => write!(f, "Request failed: {}", e),
            CalcError::Status { code, body } => {
                if body.is_empty() {
                    write!(f, "Service returned HTTP {}", code)
                } else {
                    write!(f, "Service returned HTTP {}: {}", code, body)
                }
            }
            CalcError::Decode(e) => write!(f, "Malformed response: {}", e),
            CalcError::Encode(e) => write!(f, "Failed to encode image: {}", e),
            CalcError::Io(e) => write!(f, "I/O error: {}", e),
            CalcError::Worker(e) => write!(f, "Calculation worker crashed: {}", e),
        }
    }
}

impl std::error::Error for CalcError {}

impl From<std::io::Error> for CalcError {
    fn from(e: std::io::Error) -> Self {
        CalcError::Io(e.to_string())
    }
}
