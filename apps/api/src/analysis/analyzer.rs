//! Scores one resume against one job description via the generative model,
//! with bounded exponential backoff on overload and a local heuristic once
//! the retries run out.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::fallback::fallback_analyze;
use crate::analysis::normalize::normalize_analysis;
use crate::analysis::prompts::build_analysis_prompt;
use crate::analysis::types::AnalysisResult;
use crate::analysis::{AnalysisError, MISSING_API_KEY_MESSAGE};
use crate::llm_client::{extract_json_object, GenerativeModel};

/// Overload retry schedule: attempt `n` (0-based) waits
/// `2^n · base_delay + jitter`, for at most `max_retries` retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt`. `jitter` is capped
    /// at `max_jitter`; the exponential term saturates instead of overflowing.
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .saturating_add(jitter.min(self.max_jitter))
    }

    /// Uniform jitter in `0..=max_jitter` milliseconds, drawn from a v4 UUID.
    fn random_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = (Uuid::new_v4().as_u128() % (u128::from(max_ms) + 1)) as u64;
        Duration::from_millis(ms)
    }
}

/// Shared, cheaply clonable handle over a `GenerativeModel`.
#[derive(Clone)]
pub struct ResumeAnalyzer {
    model: Arc<dyn GenerativeModel>,
    retry: RetryPolicy,
}

impl ResumeAnalyzer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    pub fn ensure_configured(&self) -> Result<(), AnalysisError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(AnalysisError::Configuration(MISSING_API_KEY_MESSAGE.to_string()))
        }
    }

    /// Analyzes one resume.
    ///
    /// - overload (429/503/"overloaded") is retried up to `max_retries` times;
    ///   if it persists, the heuristic result is returned instead of an error
    /// - any other upstream failure is returned immediately
    /// - a reply without a parseable JSON object is `MalformedResponse`, never retried
    ///
    /// `processing_time` is left at 0; callers that time the call stamp it.
    pub async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.ensure_configured()?;

        if resume_text.trim().is_empty() {
            return Err(AnalysisError::Validation("Resume text is required".to_string()));
        }
        if job_description.trim().is_empty() {
            return Err(AnalysisError::Validation(
                "Job description is required".to_string(),
            ));
        }

        let prompt = build_analysis_prompt(resume_text, job_description);
        let mut attempt: u32 = 0;

        loop {
            match self.model.generate(&prompt).await {
                Ok(text) => return parse_model_output(&text),
                Err(err) if err.is_overloaded() => {
                    if attempt >= self.retry.max_retries {
                        warn!(
                            "{} after {} retries, using fallback analysis",
                            err, self.retry.max_retries
                        );
                        return Ok(fallback_analyze(resume_text, job_description));
                    }
                    let delay = self.retry.delay_for(attempt, self.retry.random_jitter());
                    warn!(
                        "Analysis attempt {} failed: {}. Retrying after {}ms",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}

/// Pulls the first JSON object out of the model text and normalizes it.
fn parse_model_output(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let json = extract_json_object(text).ok_or_else(|| {
        AnalysisError::MalformedResponse("model output contained no JSON object".to_string())
    })?;
    let raw: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid JSON in model output: {e}")))?;

    let result = normalize_analysis(&raw, Utc::now());
    info!(
        "Analysis parsed: match={}%, ats_overall={}",
        result.match_percentage, result.ats_score.overall
    );
    Ok(result)
}
