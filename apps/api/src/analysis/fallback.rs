//! Fallback analysis: the local, network-free heuristic used when the
//! generative model stays unavailable.
//!
//! Deterministic apart from `analysisTimestamp`, never fails, and populates
//! every field of `AnalysisResult` with `fallbackAnalysis = true`.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

use crate::analysis::normalize::{DEFAULT_NAME, DEFAULT_SALARY_EXPECTATION};
use crate::analysis::types::{
    AnalysisResult, AtsScore, EducationAnalysis, ExperienceAnalysis, ExperienceLevel,
    ExtractedInfo, GapSeverity, KeywordAnalysis, Recommendations, Relevance, SkillsAnalysis,
};

/// Reference technical skills, matched as lower-case substrings, in report order.
pub const REFERENCE_SKILLS: &[&str] = &[
    "javascript",
    "python",
    "java",
    "react",
    "node",
    "sql",
    "html",
    "css",
    "git",
    "aws",
    "docker",
    "mongodb",
    "express",
    "angular",
    "vue",
];

const MIN_MATCH: u32 = 30;
const MAX_MATCH: u32 = 95;
const POINTS_PER_SKILL: u32 = 10;
const EXPERIENCE_BONUS: u32 = 20;
const DEGREE_BONUS: u32 = 15;
const FALLBACK_CONFIDENCE: u8 = 40;
const PLAIN_TEXT_FORMAT_SCORE: u8 = 70;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
            .expect("phone pattern is valid")
    })
}

fn years_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})\+?\s*(?:years?|yrs?)\b").expect("years pattern is valid")
    })
}

/// Highest degree signalled by the resume, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DegreeSignal {
    Master,
    Bachelor,
    Unspecified,
}

impl DegreeSignal {
    fn detect(resume_lower: &str) -> Option<Self> {
        if resume_lower.contains("master") {
            Some(Self::Master)
        } else if resume_lower.contains("bachelor") {
            Some(Self::Bachelor)
        } else if resume_lower.contains("degree") {
            Some(Self::Unspecified)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Master => "Master's degree",
            Self::Bachelor => "Bachelor's degree",
            Self::Unspecified => "Degree (level not stated)",
        }
    }

    fn education_fit(self) -> u8 {
        match self {
            Self::Master => 85,
            Self::Bachelor => 75,
            Self::Unspecified => 65,
        }
    }
}

/// `clamp(30, 95, matching·10 + 20·experience + 15·degree)`.
pub fn heuristic_match_percentage(matching_skills: usize, has_experience: bool, has_degree: bool) -> u8 {
    let mut score = matching_skills as u32 * POINTS_PER_SKILL;
    if has_experience {
        score += EXPERIENCE_BONUS;
    }
    if has_degree {
        score += DEGREE_BONUS;
    }
    score.clamp(MIN_MATCH, MAX_MATCH) as u8
}

/// "senior"/"lead" → senior, "junior" → entry, otherwise mid.
pub fn detect_experience_level(resume_lower: &str) -> ExperienceLevel {
    if resume_lower.contains("senior") || resume_lower.contains("lead") {
        ExperienceLevel::Senior
    } else if resume_lower.contains("junior") {
        ExperienceLevel::Entry
    } else {
        ExperienceLevel::Mid
    }
}

pub fn fallback_analyze(resume_text: &str, job_description: &str) -> AnalysisResult {
    let resume = resume_text.to_lowercase();
    let job = job_description.to_lowercase();

    let skills_in = |text: &str| -> Vec<&'static str> {
        REFERENCE_SKILLS
            .iter()
            .copied()
            .filter(|skill| text.contains(skill))
            .collect()
    };
    let resume_skills = skills_in(&resume);
    let job_skills = skills_in(&job);

    let matching_skills: Vec<String> = job_skills
        .iter()
        .filter(|skill| resume_skills.contains(*skill))
        .map(|skill| skill.to_string())
        .collect();
    let missing_skills: Vec<String> = job_skills
        .iter()
        .filter(|skill| !resume_skills.contains(*skill))
        .map(|skill| skill.to_string())
        .collect();

    let experience_level = detect_experience_level(&resume);
    let has_experience = resume.contains("experience");
    let degree = DegreeSignal::detect(&resume);

    let match_percentage =
        heuristic_match_percentage(matching_skills.len(), has_experience, degree.is_some());

    let skills_alignment = if job_skills.is_empty() {
        50
    } else {
        (matching_skills.len() * 100 / job_skills.len()) as u8
    };

    let mut ats_score = AtsScore {
        overall: 0,
        keyword_match: match_percentage,
        skills_alignment,
        experience_relevance: match experience_level {
            ExperienceLevel::Entry => 40,
            ExperienceLevel::Mid => 60,
            ExperienceLevel::Senior | ExperienceLevel::Lead => 80,
        },
        education_fit: degree.map(DegreeSignal::education_fit).unwrap_or(40),
        format_compatibility: PLAIN_TEXT_FORMAT_SCORE,
    };
    ats_score.overall = ats_score.weighted_overall();

    let years_of_experience = years_regex()
        .captures_iter(&resume)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let extracted_info = extract_contact_info(
        resume_text,
        resume_skills.iter().map(|s| s.to_string()).collect(),
        if years_of_experience > 0 {
            format!("{years_of_experience}+ years")
        } else {
            experience_level.label().to_string()
        },
    );

    let skill_gap_severity = match missing_skills.len() {
        0 => GapSeverity::Low,
        1..=2 => GapSeverity::Medium,
        _ => GapSeverity::High,
    };

    let mut strengths = Vec::new();
    if !matching_skills.is_empty() {
        strengths.push(format!(
            "Has {} of the technical skills named in the job description: {}",
            matching_skills.len(),
            matching_skills.join(", ")
        ));
    }
    if has_experience {
        strengths.push("Resume describes relevant work experience".to_string());
    }
    if let Some(degree) = degree {
        strengths.push(format!("Holds a {}", degree.label()));
    }

    let mut weaknesses = Vec::new();
    if !missing_skills.is_empty() {
        weaknesses.push(format!(
            "Missing skills named in the job description: {}",
            missing_skills.join(", ")
        ));
    }
    if !has_experience {
        weaknesses.push("Work experience is not clearly described".to_string());
    }
    if extracted_info.email.is_empty() {
        weaknesses.push("No contact email found".to_string());
    }

    let mut interview_questions: Vec<String> = missing_skills
        .iter()
        .take(3)
        .map(|skill| format!("How would you get up to speed with {skill}?"))
        .collect();
    if let Some(skill) = matching_skills.first() {
        interview_questions.push(format!("Describe a recent project where you used {skill}."));
    }
    interview_questions
        .push("Walk us through the experience most relevant to this role.".to_string());

    let mut for_candidate = Vec::new();
    if !missing_skills.is_empty() {
        for_candidate.push(format!(
            "Consider building experience with: {}",
            missing_skills.join(", ")
        ));
    }
    for_candidate.push("Quantify achievements with concrete metrics".to_string());

    let recommendations = Recommendations {
        for_candidate,
        for_recruiter: vec![
            "AI analysis was unavailable; scores come from a keyword heuristic".to_string(),
            "Review the resume manually before making a decision".to_string(),
        ],
    };

    AnalysisResult {
        match_percentage,
        extracted_info,
        ats_score,
        keyword_analysis: KeywordAnalysis {
            matched_keywords: matching_skills.clone(),
            missing_keywords: missing_skills.clone(),
            critical_keywords: missing_skills.clone(),
            keyword_density: skills_alignment,
        },
        skills_analysis: SkillsAnalysis {
            matching_skills: matching_skills.clone(),
            missing_skills: missing_skills.clone(),
            transferable_skills: Vec::new(),
            skill_gap_severity,
        },
        experience_analysis: ExperienceAnalysis {
            experience_level,
            years_of_experience,
            relevant_experience: Vec::new(),
            career_progression: "Not assessed (heuristic analysis)".to_string(),
        },
        education_analysis: EducationAnalysis {
            highest_degree: degree
                .map(|d| d.label().to_string())
                .unwrap_or_else(|| "Not specified".to_string()),
            degree_relevance: if degree.is_some() {
                Relevance::Medium
            } else {
                Relevance::Low
            },
            relevant_coursework: Vec::new(),
        },
        strengths,
        weaknesses,
        red_flags: Vec::new(),
        interview_questions,
        recommendations,
        salary_expectation: DEFAULT_SALARY_EXPECTATION.to_string(),
        overall_assessment: format!(
            "Heuristic keyword analysis: {match_percentage}% match with {} of {} detected technical skills",
            matching_skills.len(),
            job_skills.len()
        ),
        interview_readiness: match match_percentage {
            70.. => "Ready for screening",
            50..=69 => "Needs preparation",
            _ => "Not ready",
        }
        .to_string(),
        hiring_recommendation: match match_percentage {
            75.. => "Recommend for interview",
            50..=74 => "Consider with reservations",
            _ => "Not recommended at this time",
        }
        .to_string(),
        confidence_score: FALLBACK_CONFIDENCE,
        analysis_timestamp: Utc::now(),
        processing_time: 0,
        fallback_analysis: true,
    }
}

fn extract_contact_info(resume_text: &str, skills: Vec<String>, experience: String) -> ExtractedInfo {
    let name = resume_text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_NAME.to_string());

    let mut parts = name.split_whitespace();
    let first_name = parts.next().unwrap_or_default().to_string();
    let last_name = parts.collect::<Vec<_>>().join(" ");

    ExtractedInfo {
        name,
        first_name,
        last_name,
        email: email_regex()
            .find(resume_text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        phone: phone_regex()
            .find(resume_text)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        experience,
        skills,
        ..ExtractedInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JANE_RESUME: &str = "Jane Doe\njane.doe@example.com | (555) 123-4567\nBuilt web apps with React and Node.";

    #[test]
    fn test_react_node_against_react_node_aws() {
        let result = fallback_analyze(JANE_RESUME, "React, Node, AWS");

        assert_eq!(result.skills_analysis.matching_skills, vec!["react", "node"]);
        assert_eq!(result.skills_analysis.missing_skills, vec!["aws"]);
        // 2 skills * 10 = 20, no "experience", no degree → raised to the 30 floor
        assert_eq!(result.match_percentage, 30);
        assert!(result.fallback_analysis);
    }

    #[test]
    fn test_experience_bonus_arithmetic() {
        let resume = "Jane Doe\n5 years of experience shipping React and Node services";
        let result = fallback_analyze(resume, "React, Node, AWS");
        // 2 * 10 + 20
        assert_eq!(result.match_percentage, 40);
        assert_eq!(result.experience_analysis.years_of_experience, 5);
    }

    #[test]
    fn test_experience_and_degree_bonus_arithmetic() {
        let resume = "Jane Doe\nBachelor of Science. 5 years of experience with React and Node";
        let result = fallback_analyze(resume, "React, Node, AWS");
        // 2 * 10 + 20 + 15
        assert_eq!(result.match_percentage, 55);
        assert_eq!(result.education_analysis.highest_degree, "Bachelor's degree");
    }

    #[test]
    fn test_match_percentage_capped_at_95() {
        let everything = REFERENCE_SKILLS.join(" ");
        let resume = format!("Alex Smith\nMaster of Science, experience in {everything}");
        let result = fallback_analyze(&resume, &everything);
        assert_eq!(result.match_percentage, 95);
        assert!(result.skills_analysis.missing_skills.is_empty());
        assert_eq!(result.skills_analysis.skill_gap_severity, GapSeverity::Low);
    }

    #[test]
    fn test_heuristic_bounds() {
        assert_eq!(heuristic_match_percentage(0, false, false), 30);
        assert_eq!(heuristic_match_percentage(5, true, true), 85);
        assert_eq!(heuristic_match_percentage(20, true, true), 95);
    }

    #[test]
    fn test_is_deterministic_apart_from_timestamp() {
        let jd = "Senior engineer: Python, Docker, AWS, SQL";
        let resume = "Sam Lee\nSenior developer. Python and SQL experience. Bachelor degree.";
        let mut first = fallback_analyze(resume, jd);
        let second = fallback_analyze(resume, jd);
        first.analysis_timestamp = second.analysis_timestamp;
        assert_eq!(first, second);
    }

    #[test]
    fn test_contact_details_extracted() {
        let result = fallback_analyze(JANE_RESUME, "React");
        let info = &result.extracted_info;
        assert_eq!(info.name, "Jane Doe");
        assert_eq!(info.first_name, "Jane");
        assert_eq!(info.last_name, "Doe");
        assert_eq!(info.email, "jane.doe@example.com");
        assert_eq!(info.phone, "(555) 123-4567");
    }

    #[test]
    fn test_missing_contact_details_default() {
        let result = fallback_analyze("   \n\n", "Python");
        assert_eq!(result.extracted_info.name, DEFAULT_NAME);
        assert!(result.extracted_info.email.is_empty());
        assert!(result.extracted_info.phone.is_empty());
    }

    #[test]
    fn test_experience_level_keywords() {
        assert_eq!(detect_experience_level("senior backend engineer"), ExperienceLevel::Senior);
        assert_eq!(detect_experience_level("tech lead"), ExperienceLevel::Senior);
        assert_eq!(detect_experience_level("junior developer"), ExperienceLevel::Entry);
        assert_eq!(detect_experience_level("software developer"), ExperienceLevel::Mid);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let result = fallback_analyze(JANE_RESUME, "Java, Vue, Angular, MongoDB, Express");
        let ats = result.ats_score;
        for score in [
            result.match_percentage,
            ats.overall,
            ats.keyword_match,
            ats.skills_alignment,
            ats.experience_relevance,
            ats.education_fit,
            ats.format_compatibility,
        ] {
            assert!(score <= 100);
        }
        assert_eq!(ats.overall, ats.weighted_overall());
        assert_eq!(result.skills_analysis.skill_gap_severity, GapSeverity::High);
    }
}
