//! Maps the loosely-typed JSON returned by the model onto `AnalysisResult`.
//!
//! Rules applied to every field:
//! - scores accept numbers or numeric strings, are rounded, then clamped to [0, 100]
//! - sequences accept arrays (non-string scalars are stringified) or a single
//!   string; anything else becomes an empty sequence
//! - strings fall back to the defaults below
//! - `atsScore.overall` is recomputed with the weighted formula when absent

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::analysis::types::{
    AnalysisResult, AtsScore, EducationAnalysis, ExperienceAnalysis, ExperienceLevel,
    ExtractedInfo, GapSeverity, KeywordAnalysis, Recommendations, Relevance, SkillsAnalysis,
};

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_CONFIDENCE: u8 = 75;
pub const DEFAULT_SALARY_EXPECTATION: &str = "Not specified";
pub const DEFAULT_OVERALL_ASSESSMENT: &str = "No overall assessment provided";
pub const DEFAULT_INTERVIEW_READINESS: &str = "Needs evaluation";
pub const DEFAULT_HIRING_RECOMMENDATION: &str = "Further review required";
pub const DEFAULT_CAREER_PROGRESSION: &str = "Not assessed";
pub const DEFAULT_HIGHEST_DEGREE: &str = "Not specified";

/// Builds a fully-populated `AnalysisResult` from raw model JSON.
/// `processing_time` is left at 0 for the caller to stamp.
pub fn normalize_analysis(raw: &Value, timestamp: DateTime<Utc>) -> AnalysisResult {
    let match_percentage = score_or(raw.get("matchPercentage"), 0);

    AnalysisResult {
        match_percentage,
        extracted_info: normalize_extracted_info(raw.get("extractedInfo")),
        ats_score: normalize_ats_score(raw.get("atsScore"), match_percentage),
        keyword_analysis: normalize_keyword_analysis(raw.get("keywordAnalysis")),
        skills_analysis: normalize_skills_analysis(raw.get("skillsAnalysis")),
        experience_analysis: normalize_experience_analysis(raw.get("experienceAnalysis")),
        education_analysis: normalize_education_analysis(raw.get("educationAnalysis")),
        strengths: string_list(raw.get("strengths")),
        weaknesses: string_list(raw.get("weaknesses")),
        red_flags: string_list(raw.get("redFlags")),
        interview_questions: string_list(raw.get("interviewQuestions")),
        recommendations: normalize_recommendations(raw.get("recommendations")),
        salary_expectation: string_or(raw.get("salaryExpectation"), DEFAULT_SALARY_EXPECTATION),
        overall_assessment: string_or(raw.get("overallAssessment"), DEFAULT_OVERALL_ASSESSMENT),
        interview_readiness: string_or(
            raw.get("interviewReadiness"),
            DEFAULT_INTERVIEW_READINESS,
        ),
        hiring_recommendation: string_or(
            raw.get("hiringRecommendation"),
            DEFAULT_HIRING_RECOMMENDATION,
        ),
        confidence_score: score_or(raw.get("confidenceScore"), DEFAULT_CONFIDENCE),
        analysis_timestamp: timestamp,
        processing_time: 0,
        fallback_analysis: false,
    }
}

fn normalize_extracted_info(raw: Option<&Value>) -> ExtractedInfo {
    let field = |key: &str| raw.and_then(|v| v.get(key));

    let name = string_or(field("name"), DEFAULT_NAME);
    let mut first_name = string_or(field("firstName"), "");
    let mut last_name = string_or(field("lastName"), "");
    if first_name.is_empty() && last_name.is_empty() && name != DEFAULT_NAME {
        (first_name, last_name) = split_name(&name);
    }

    ExtractedInfo {
        name,
        first_name,
        last_name,
        email: string_or(field("email"), ""),
        phone: string_or(field("phone"), ""),
        location: string_or(field("location"), ""),
        current_role: string_or(field("currentRole"), ""),
        current_company: string_or(field("currentCompany"), ""),
        experience: string_or(field("experience"), ""),
        skills: string_list(field("skills")),
        certifications: string_list(field("certifications")),
        languages: string_list(field("languages")),
        graduation_year: year(field("graduationYear")),
    }
}

fn normalize_ats_score(raw: Option<&Value>, match_percentage: u8) -> AtsScore {
    let field = |key: &str| raw.and_then(|v| v.get(key));

    // Missing components inherit the headline match percentage.
    let mut score = AtsScore {
        overall: 0,
        keyword_match: score_or(field("keywordMatch"), match_percentage),
        skills_alignment: score_or(field("skillsAlignment"), match_percentage),
        experience_relevance: score_or(field("experienceRelevance"), match_percentage),
        education_fit: score_or(field("educationFit"), match_percentage),
        format_compatibility: score_or(field("formatCompatibility"), match_percentage),
    };
    let weighted = score.weighted_overall();
    score.overall = score_value(field("overall")).unwrap_or(weighted);
    score
}

fn normalize_keyword_analysis(raw: Option<&Value>) -> KeywordAnalysis {
    let field = |key: &str| raw.and_then(|v| v.get(key));
    KeywordAnalysis {
        matched_keywords: string_list(field("matchedKeywords")),
        missing_keywords: string_list(field("missingKeywords")),
        critical_keywords: string_list(field("criticalKeywords")),
        keyword_density: score_or(field("keywordDensity"), 0),
    }
}

fn normalize_skills_analysis(raw: Option<&Value>) -> SkillsAnalysis {
    let field = |key: &str| raw.and_then(|v| v.get(key));
    SkillsAnalysis {
        matching_skills: string_list(field("matchingSkills")),
        missing_skills: string_list(field("missingSkills")),
        transferable_skills: string_list(field("transferableSkills")),
        skill_gap_severity: field("skillGapSeverity")
            .and_then(Value::as_str)
            .and_then(GapSeverity::parse)
            .unwrap_or_default(),
    }
}

fn normalize_experience_analysis(raw: Option<&Value>) -> ExperienceAnalysis {
    let field = |key: &str| raw.and_then(|v| v.get(key));
    ExperienceAnalysis {
        experience_level: field("experienceLevel")
            .and_then(Value::as_str)
            .and_then(ExperienceLevel::parse)
            .unwrap_or_default(),
        years_of_experience: number(field("yearsOfExperience"))
            .map(|n| n.round().clamp(0.0, 60.0) as u32)
            .unwrap_or(0),
        relevant_experience: string_list(field("relevantExperience")),
        career_progression: string_or(field("careerProgression"), DEFAULT_CAREER_PROGRESSION),
    }
}

fn normalize_education_analysis(raw: Option<&Value>) -> EducationAnalysis {
    let field = |key: &str| raw.and_then(|v| v.get(key));
    EducationAnalysis {
        highest_degree: string_or(field("highestDegree"), DEFAULT_HIGHEST_DEGREE),
        degree_relevance: field("degreeRelevance")
            .and_then(Value::as_str)
            .and_then(Relevance::parse)
            .unwrap_or_default(),
        relevant_coursework: string_list(field("relevantCoursework")),
    }
}

fn normalize_recommendations(raw: Option<&Value>) -> Recommendations {
    let field = |key: &str| raw.and_then(|v| v.get(key));
    Recommendations {
        for_candidate: string_list(field("forCandidate")),
        for_recruiter: string_list(field("forRecruiter")),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scalar helpers
// ────────────────────────────────────────────────────────────────────────────

/// Number or numeric string (a trailing `%` is tolerated).
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn score_value(value: Option<&Value>) -> Option<u8> {
    number(value).map(clamp_score)
}

fn score_or(value: Option<&Value>, default: u8) -> u8 {
    score_value(value).unwrap_or(default)
}

pub fn clamp_score(n: f64) -> u8 {
    n.round().clamp(0.0, 100.0) as u8
}

fn year(value: Option<&Value>) -> Option<i32> {
    number(value)
        .map(|n| n.round() as i32)
        .filter(|y| (1900..=2100).contains(y))
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
