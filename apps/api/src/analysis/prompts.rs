// All LLM prompt constants for the Analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_INSTRUCTION};

/// Role and task framing placed before the documents.
pub const ANALYSIS_PREAMBLE: &str = "You are an expert technical recruiter and ATS \
    (applicant tracking system) specialist. Compare the candidate resume against the job \
    description, extract the candidate's details and score the match on every dimension below. \
    All scores are integers from 0 to 100.";

/// Expected response shape. Field names are part of the contract with
/// `normalize::normalize_analysis`.
pub const ANALYSIS_RESPONSE_SCHEMA: &str = r#"Return a JSON object with this EXACT schema:
{
  "matchPercentage": 0,
  "extractedInfo": {
    "name": "", "firstName": "", "lastName": "", "email": "", "phone": "",
    "location": "", "currentRole": "", "currentCompany": "", "experience": "",
    "skills": [], "certifications": [], "languages": [], "graduationYear": null
  },
  "atsScore": {
    "overall": 0, "keywordMatch": 0, "skillsAlignment": 0,
    "experienceRelevance": 0, "educationFit": 0, "formatCompatibility": 0
  },
  "keywordAnalysis": {
    "matchedKeywords": [], "missingKeywords": [], "criticalKeywords": [], "keywordDensity": 0
  },
  "skillsAnalysis": {
    "matchingSkills": [], "missingSkills": [], "transferableSkills": [],
    "skillGapSeverity": "low | medium | high"
  },
  "experienceAnalysis": {
    "experienceLevel": "entry | mid | senior | lead", "yearsOfExperience": 0,
    "relevantExperience": [], "careerProgression": ""
  },
  "educationAnalysis": {
    "highestDegree": "", "degreeRelevance": "high | medium | low", "relevantCoursework": []
  },
  "strengths": [],
  "weaknesses": [],
  "redFlags": [],
  "interviewQuestions": [],
  "recommendations": { "forCandidate": [], "forRecruiter": [] },
  "salaryExpectation": "",
  "overallAssessment": "",
  "interviewReadiness": "",
  "hiringRecommendation": "",
  "confidenceScore": 0
}"#;

/// Builds the full analysis prompt. Documents are appended verbatim rather
/// than substituted into a template, so braces in user text stay inert.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "{ANALYSIS_PREAMBLE}\n\n{GROUNDING_INSTRUCTION}\n\n\
        JOB DESCRIPTION:\n{job}\n\n\
        RESUME:\n{resume}\n\n\
        {ANALYSIS_RESPONSE_SCHEMA}\n\n{JSON_ONLY_INSTRUCTION}",
        job = job_description.trim(),
        resume = resume_text.trim(),
    )
}
