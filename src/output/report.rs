//! Report structures shared by every output format

use crate::processing::analyzer::{AnalysisReport, FeedbackStatus};
use crate::processing::scoring::ScoreWeights;
use crate::storage::StoredAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presentation view of one analysis, fresh or read back from history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceReport {
    pub summary: ReportSummary,

    /// Absent for results read back from storage, which only keep the final score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,

    pub skills: SkillsSummary,
    pub feedback: FeedbackSection,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    /// 0-100
    pub final_score: f64,
    pub verdict: String,
    pub verdict_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub hard_match_score: f64,
    pub semantic_score: f64,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsSummary {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SkillsSummary {
    /// Share of job skills the resume covers, in percent
    pub fn coverage(&self) -> f64 {
        let total = self.matched.len() + self.missing.len();
        if total == 0 {
            0.0
        } else {
            100.0 * self.matched.len() as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSection {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FeedbackStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub resume_name: String,
    pub job_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_vocabulary_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_id: Option<i64>,
}

impl RelevanceReport {
    pub fn from_analysis(report: &AnalysisReport, weights: ScoreWeights) -> Self {
        let result = &report.result;
        Self {
            summary: ReportSummary {
                final_score: result.final_score,
                verdict: result.verdict.label().to_string(),
                verdict_reason: result.verdict.reason().to_string(),
            },
            score_breakdown: Some(ScoreBreakdown {
                hard_match_score: report.hard_match_score,
                semantic_score: report.semantic_score,
                weights,
            }),
            skills: SkillsSummary {
                matched: result.matched_skills.iter().cloned().collect(),
                missing: result.missing_skills.iter().cloned().collect(),
            },
            feedback: FeedbackSection {
                text: result.feedback.clone(),
                status: Some(report.feedback_status),
                model: report.model_info.feedback_model.clone(),
                error: report.feedback_error.clone(),
            },
            metadata: ReportMetadata {
                generated_at: result.created_at,
                resume_name: result.resume_name.clone(),
                job_name: result.job_name.clone(),
                embedding_model: Some(report.model_info.embedding_model.clone()),
                skill_vocabulary_size: Some(report.model_info.skill_count),
                processing_time_ms: Some(report.processing_time_ms),
                stored_id: None,
            },
        }
    }

    pub fn from_stored(stored: &StoredAnalysis) -> Self {
        let result = &stored.result;
        Self {
            summary: ReportSummary {
                final_score: result.final_score,
                verdict: result.verdict.label().to_string(),
                verdict_reason: result.verdict.reason().to_string(),
            },
            score_breakdown: None,
            skills: SkillsSummary {
                matched: result.matched_skills.iter().cloned().collect(),
                missing: result.missing_skills.iter().cloned().collect(),
            },
            feedback: FeedbackSection {
                text: result.feedback.clone(),
                status: None,
                model: None,
                error: None,
            },
            metadata: ReportMetadata {
                generated_at: result.created_at,
                resume_name: result.resume_name.clone(),
                job_name: result.job_name.clone(),
                embedding_model: None,
                skill_vocabulary_size: None,
                processing_time_ms: None,
                stored_id: Some(stored.id),
            },
        }
    }

    pub fn with_stored_id(mut self, id: i64) -> Self {
        self.metadata.stored_id = Some(id);
        self
    }
}
