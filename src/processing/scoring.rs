//! Hard-match scoring, score fusion, and verdicts

use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const HIGH_SUITABILITY_THRESHOLD: f64 = 75.0;
pub const MEDIUM_SUITABILITY_THRESHOLD: f64 = 50.0;

/// Keyword overlap between job-description skills and resume skills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardMatch {
    pub score: f64,
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

pub fn hard_match(jd_skills: &BTreeSet<String>, resume_skills: &BTreeSet<String>) -> HardMatch {
    if jd_skills.is_empty() {
        return HardMatch {
            score: 0.0,
            matched: BTreeSet::new(),
            missing: BTreeSet::new(),
        };
    }

    let matched: BTreeSet<String> = jd_skills.intersection(resume_skills).cloned().collect();
    let missing: BTreeSet<String> = jd_skills.difference(resume_skills).cloned().collect();
    let score = 100.0 * matched.len() as f64 / jd_skills.len() as f64;

    HardMatch {
        score,
        matched,
        missing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub hard_match: f64,
    pub semantic: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            hard_match: 0.6,
            semantic: 0.4,
        }
    }
}

impl From<&ScoringConfig> for ScoreWeights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            hard_match: config.hard_match_weight,
            semantic: config.semantic_weight,
        }
    }
}

pub fn fuse(weights: ScoreWeights, hard_match_score: f64, semantic_score: f64) -> f64 {
    weights.hard_match * hard_match_score + weights.semantic * semantic_score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    High,
    Medium,
    Low,
}

impl Verdict {
    /// Lower bounds are inclusive; NaN falls through to Low
    pub fn from_score(final_score: f64) -> Self {
        if final_score >= HIGH_SUITABILITY_THRESHOLD {
            Verdict::High
        } else if final_score >= MEDIUM_SUITABILITY_THRESHOLD {
            Verdict::Medium
        } else {
            Verdict::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::High => "High Suitability",
            Verdict::Medium => "Medium Suitability",
            Verdict::Low => "Low Suitability",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::High => "This resume is a strong match for the job description.",
            Verdict::Medium => "This resume shows potential but has some gaps.",
            Verdict::Low => "This resume has significant gaps with the job description.",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Verdict::High, Verdict::Medium, Verdict::Low]
            .into_iter()
            .find(|v| v.label() == label)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
