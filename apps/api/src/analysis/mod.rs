// Resume analysis: the Gemini-backed analyzer, its local fallback heuristic,
// the sequential batch coordinator and the configuration probes.
// All LLM calls go through llm_client; no direct HTTP calls here.

pub mod analyzer;
pub mod batch;
pub mod environment;
pub mod fallback;
pub mod handlers;
pub mod normalize;
pub mod prompts;
pub mod types;

use thiserror::Error;

use crate::llm_client::LlmError;

pub const MISSING_API_KEY_MESSAGE: &str =
    "GEMINI_API_KEY is not configured. Set it in the environment or .env file.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    /// Non-success, non-overload response, or a response missing expected fields.
    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// The model answered but its text held no parseable JSON object.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("No connectivity to the analysis service: {0}")]
    Connectivity(String),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => {
                AnalysisError::Configuration(MISSING_API_KEY_MESSAGE.to_string())
            }
            LlmError::Overloaded { status, message } | LlmError::Api { status, message } => {
                AnalysisError::Upstream { status, message }
            }
            LlmError::Transport(e) => AnalysisError::Connectivity(e.to_string()),
            LlmError::Decode(message) => AnalysisError::Upstream {
                status: 200,
                message,
            },
            LlmError::EmptyContent => AnalysisError::Upstream {
                status: 200,
                message: "response contained no candidate text".to_string(),
            },
        }
    }
}
