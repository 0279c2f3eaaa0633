//! Strict output schema for resume analysis.
//!
//! Every field is always present on the wire. Loose upstream JSON is mapped
//! onto these types by `normalize::normalize_analysis` and nowhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input to a single analysis. Both texts must be non-blank.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub match_percentage: u8,
    pub extracted_info: ExtractedInfo,
    pub ats_score: AtsScore,
    pub keyword_analysis: KeywordAnalysis,
    pub skills_analysis: SkillsAnalysis,
    pub experience_analysis: ExperienceAnalysis,
    pub education_analysis: EducationAnalysis,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub interview_questions: Vec<String>,
    pub recommendations: Recommendations,
    pub salary_expectation: String,
    pub overall_assessment: String,
    pub interview_readiness: String,
    pub hiring_recommendation: String,
    pub confidence_score: u8,
    pub analysis_timestamp: DateTime<Utc>,
    /// Milliseconds; stamped by whoever timed the call (handler or batch).
    pub processing_time: u64,
    /// Only serialized when the heuristic path produced the result.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback_analysis: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub current_role: String,
    pub current_company: String,
    pub experience: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub languages: Vec<String>,
    pub graduation_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsScore {
    pub overall: u8,
    pub keyword_match: u8,
    pub skills_alignment: u8,
    pub experience_relevance: u8,
    pub education_fit: u8,
    pub format_compatibility: u8,
}

impl AtsScore {
    /// 25% keyword, 30% skills, 25% experience, 15% education, 5% format.
    pub fn weighted_overall(&self) -> u8 {
        let weighted = 0.25 * f64::from(self.keyword_match)
            + 0.30 * f64::from(self.skills_alignment)
            + 0.25 * f64::from(self.experience_relevance)
            + 0.15 * f64::from(self.education_fit)
            + 0.05 * f64::from(self.format_compatibility);
        weighted.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordAnalysis {
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub critical_keywords: Vec<String>,
    pub keyword_density: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsAnalysis {
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub transferable_skills: Vec<String>,
    pub skill_gap_severity: GapSeverity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceAnalysis {
    pub experience_level: ExperienceLevel,
    pub years_of_experience: u32,
    pub relevant_experience: Vec<String>,
    pub career_progression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationAnalysis {
    pub highest_degree: String,
    pub degree_relevance: Relevance,
    pub relevant_coursework: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub for_candidate: Vec<String>,
    pub for_recruiter: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    #[default]
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    /// Lenient parse of whatever label the model chose.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "entry" | "entry-level" | "entry level" | "junior" | "intern" | "graduate" => {
                Some(Self::Entry)
            }
            "mid" | "mid-level" | "mid level" | "intermediate" => Some(Self::Mid),
            "senior" | "senior-level" | "senior level" => Some(Self::Senior),
            "lead" | "principal" | "staff" | "executive" | "manager" => Some(Self::Lead),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Entry => "Entry level",
            Self::Mid => "Mid level",
            Self::Senior => "Senior level",
            Self::Lead => "Lead level",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Low,
    #[default]
    Medium,
    High,
}

impl GapSeverity {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "minor" | "none" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" | "major" | "critical" | "severe" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    #[default]
    Medium,
    Low,
}

impl Relevance {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "strong" | "very relevant" => Some(Self::High),
            "medium" | "moderate" | "partial" => Some(Self::Medium),
            "low" | "weak" | "none" | "not relevant" => Some(Self::Low),
            _ => None,
        }
    }
}
