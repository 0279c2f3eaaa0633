//! Batch Coordinator: runs the analyzer over many resumes strictly one at a
//! time, reporting progress after every item and throttling between calls.
//!
//! A per-item failure never aborts the batch. The only errors `run_batch`
//! returns are precondition failures raised before the first item.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::fallback::fallback_analyze;
use crate::analysis::types::{AnalysisResult, AtsScore, Recommendations};
use crate::analysis::AnalysisError;

pub const FAILED_ITEM_RECOMMENDATION: &str = "Analysis failed - please try again";

/// One resume as submitted to a batch. Missing or null fields deserialize as
/// empty and are reported as a failed item rather than rejecting the whole
/// batch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub current_file: String,
    pub estimated_time_remaining: String,
}

/// Placeholder recorded for an item that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    pub match_percentage: u8,
    pub ats_score: AtsScore,
    pub confidence_score: u8,
    pub error: String,
    pub recommendations: Recommendations,
    pub processing_time: u64,
    pub analysis_timestamp: DateTime<Utc>,
}

impl FailureInfo {
    fn new(error: String, processing_time: u64) -> Self {
        Self {
            match_percentage: 0,
            ats_score: AtsScore::default(),
            confidence_score: 0,
            error,
            recommendations: Recommendations {
                for_candidate: vec![FAILED_ITEM_RECOMMENDATION.to_string()],
                for_recruiter: Vec::new(),
            },
            processing_time,
            analysis_timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    Success(AnalysisResult),
    #[serde(rename = "error")]
    Failed(FailureInfo),
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success(_))
    }

    pub fn processing_time(&self) -> u64 {
        match self {
            ItemOutcome::Success(result) => result.processing_time,
            ItemOutcome::Failed(failure) => failure.processing_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub file_name: String,
    /// Character count of the submitted text.
    pub file_size: usize,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Sum of per-item processing times, ms.
    pub total_processing_time: u64,
    pub average_processing_time: u64,
    /// Percentage of successful items, one decimal place.
    pub success_rate: f64,
    /// Wall-clock duration of the whole batch including throttle sleeps, ms.
    pub batch_duration: u64,
}

impl BatchSummary {
    fn from_results(results: &[BatchItemResult], batch_duration: Duration) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.outcome.is_success()).count();
        let total_processing_time: u64 = results.iter().map(|r| r.outcome.processing_time()).sum();

        let (average_processing_time, success_rate) = if total == 0 {
            (0, 0.0)
        } else {
            let rate = successful as f64 / total as f64 * 100.0;
            (total_processing_time / total as u64, (rate * 10.0).round() / 10.0)
        };

        Self {
            total,
            successful,
            failed: total - successful,
            total_processing_time,
            average_processing_time,
            success_rate,
            batch_duration: batch_duration.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchItemResult>,
    pub summary: BatchSummary,
}

#[derive(Clone)]
pub struct BatchCoordinator {
    analyzer: ResumeAnalyzer,
    rate_limit_delay: Duration,
}

impl BatchCoordinator {
    pub fn new(analyzer: ResumeAnalyzer, rate_limit_delay: Duration) -> Self {
        Self {
            analyzer,
            rate_limit_delay,
        }
    }

    pub fn check_preconditions(
        &self,
        resumes: &[ResumeInput],
        job_description: &str,
    ) -> Result<(), AnalysisError> {
        if resumes.is_empty() {
            return Err(AnalysisError::Validation(
                "At least one resume is required".to_string(),
            ));
        }
        if job_description.trim().is_empty() {
            return Err(AnalysisError::Validation(
                "Job description is required".to_string(),
            ));
        }
        self.analyzer.ensure_configured()
    }

    /// Analyzes `resumes` in input order. `on_progress` runs after every item
    /// and before the throttle sleep; the next item does not start until it
    /// returns.
    pub async fn run_batch<F>(
        &self,
        resumes: &[ResumeInput],
        job_description: &str,
        mut on_progress: F,
    ) -> Result<BatchReport, AnalysisError>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        self.check_preconditions(resumes, job_description)?;

        let total = resumes.len();
        info!("Batch analysis started: {} resumes", total);

        let batch_started = Instant::now();
        let mut results = Vec::with_capacity(total);
        let mut success_count = 0;
        let mut error_count = 0;

        for (index, resume) in resumes.iter().enumerate() {
            let item_started = Instant::now();
            let analyzed = self.analyze_item(resume, job_description).await;
            let processing_time = item_started.elapsed().as_millis() as u64;

            let outcome = match analyzed {
                Ok(mut analysis) => {
                    analysis.processing_time = processing_time;
                    success_count += 1;
                    ItemOutcome::Success(analysis)
                }
                Err(message) => {
                    error_count += 1;
                    ItemOutcome::Failed(FailureInfo::new(message, processing_time))
                }
            };
            let succeeded = outcome.is_success();
            info!(
                "Batch item {}/{} '{}' finished in {}ms ({})",
                index + 1,
                total,
                resume.file_name,
                processing_time,
                if succeeded { "success" } else { "error" }
            );

            results.push(BatchItemResult {
                file_name: resume.file_name.clone(),
                file_size: resume.text.chars().count(),
                outcome,
            });

            let processed = index + 1;
            on_progress(&BatchProgress {
                processed,
                total,
                success_count,
                error_count,
                current_file: resume.file_name.clone(),
                estimated_time_remaining: format_eta(estimate_remaining(
                    batch_started.elapsed(),
                    processed,
                    total,
                )),
            });

            if processed < total {
                tokio::time::sleep(throttle_delay(
                    self.rate_limit_delay,
                    succeeded,
                    processing_time,
                ))
                .await;
            }
        }

        let summary = BatchSummary::from_results(&results, batch_started.elapsed());
        info!(
            "Batch analysis complete: {}/{} successful in {}ms",
            summary.successful, summary.total, summary.batch_duration
        );

        Ok(BatchReport { results, summary })
    }

    /// `Err` carries the message recorded on the failed item.
    async fn analyze_item(
        &self,
        resume: &ResumeInput,
        job_description: &str,
    ) -> Result<AnalysisResult, String> {
        if resume.file_name.trim().is_empty() {
            return Err("Resume is missing a file name".to_string());
        }
        if resume.text.trim().is_empty() {
            return Err(format!("No text could be read from {}", resume.file_name));
        }

        match self.analyzer.analyze(&resume.text, job_description).await {
            Ok(analysis) => Ok(analysis),
            Err(err @ AnalysisError::Upstream { .. }) => {
                warn!("Batch item '{}' failed: {}", resume.file_name, err);
                Err(err.to_string())
            }
            Err(err) => {
                warn!(
                    "Batch item '{}' using fallback analysis after: {}",
                    resume.file_name, err
                );
                Ok(fallback_analyze(&resume.text, job_description))
            }
        }
    }
}

/// Pause before the next item: the base delay, stretched to a tenth of a slow
/// item's processing time, and halved after a failure.
pub fn throttle_delay(base: Duration, succeeded: bool, processing_time_ms: u64) -> Duration {
    if succeeded {
        base.max(Duration::from_millis(processing_time_ms).mul_f64(0.1))
    } else {
        base / 2
    }
}

pub fn estimate_remaining(elapsed: Duration, processed: usize, total: usize) -> Duration {
    if processed == 0 {
        return Duration::ZERO;
    }
    let per_item = elapsed / processed as u32;
    per_item * total.saturating_sub(processed) as u32
}

/// `"{m}m {s}s"` from one minute up, `"{s}s"` below.
pub fn format_eta(remaining: Duration) -> String {
    let seconds = (remaining.as_millis() as f64 / 1000.0).round() as u64;
    let minutes = seconds / 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}
