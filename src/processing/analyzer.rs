//! Analysis engine combining skill matching, embeddings, and generated feedback

use crate::config::Config;
use crate::error::{RelevanceError, Result};
use crate::feedback::FeedbackGenerator;
use crate::input::{validate_document_text, InputManager};
use crate::processing::embeddings::{EmbeddingEngine, EmbeddingModelHandle};
use crate::processing::scoring::{fuse, hard_match, ScoreWeights, Verdict};
use crate::processing::skill_matcher::SkillMatcher;
use crate::processing::text_processor::normalize;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const FEEDBACK_UNAVAILABLE: &str =
    "Feedback could not be generated for this analysis. The scores above are complete.";
pub const FEEDBACK_SKIPPED: &str = "Feedback generation was skipped for this analysis.";

/// Scores for one job description / resume pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCard {
    pub final_score: f64,
    pub hard_match_score: f64,
    pub semantic_score: f64,
    pub cosine: f64,
    pub verdict: Verdict,
    pub job_skills: BTreeSet<String>,
    pub resume_skills: BTreeSet<String>,
    pub matched_skills: BTreeSet<String>,
    pub missing_skills: BTreeSet<String>,
    pub embedding_dim: usize,
}

/// The record handed to persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub resume_name: String,
    pub job_name: String,
    pub final_score: f64,
    pub verdict: Verdict,
    pub matched_skills: BTreeSet<String>,
    pub missing_skills: BTreeSet<String>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackStatus {
    Generated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub embedding_model: String,
    pub skill_count: usize,
    pub feedback_model: Option<String>,
}

/// Everything a report shows for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub hard_match_score: f64,
    pub semantic_score: f64,
    pub feedback_status: FeedbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_error: Option<String>,
    pub model_info: ModelInfo,
    pub processing_time_ms: u64,
}

/// A named document whose text has already been extracted
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Scoring core: skill extraction, hard match, semantic similarity, fusion
pub struct AnalysisEngine {
    skill_matcher: Arc<SkillMatcher>,
    embeddings: EmbeddingEngine,
    weights: ScoreWeights,
}

impl AnalysisEngine {
    pub fn new(
        skill_matcher: Arc<SkillMatcher>,
        embeddings: EmbeddingEngine,
        weights: ScoreWeights,
    ) -> Self {
        Self {
            skill_matcher,
            embeddings,
            weights,
        }
    }

    pub fn from_config(config: &Config, model: Arc<EmbeddingModelHandle>) -> Result<Self> {
        let skill_matcher = Arc::new(SkillMatcher::new(&config.effective_vocabulary())?);
        let embeddings = EmbeddingEngine::new(
            model,
            Duration::from_secs(config.embedding.timeout_secs),
            config.scoring.clamp_semantic_to_100,
        );

        Ok(Self::new(
            skill_matcher,
            embeddings,
            ScoreWeights::from(&config.scoring),
        ))
    }

    /// Skills found in raw document text
    pub fn extract_skills(&self, text: &str) -> BTreeSet<String> {
        self.skill_matcher.extract_skills(&normalize(text))
    }

    pub async fn score(&self, job_text: &str, resume_text: &str) -> Result<ScoreCard> {
        let job_skills = self.extract_skills(job_text);
        let resume_skills = self.extract_skills(resume_text);
        let keyword = hard_match(&job_skills, &resume_skills);
        debug!(
            "Hard match {:.2}%: {} of {} job skills present",
            keyword.score,
            keyword.matched.len(),
            job_skills.len()
        );

        // Embeddings see the raw text, not the normalized form
        let similarity = self
            .embeddings
            .semantic_similarity(job_text, resume_text)
            .await?;

        let final_score = fuse(self.weights, keyword.score, similarity.score);
        let verdict = Verdict::from_score(final_score);

        Ok(ScoreCard {
            final_score,
            hard_match_score: keyword.score,
            semantic_score: similarity.score,
            cosine: similarity.cosine,
            verdict,
            job_skills,
            resume_skills,
            matched_skills: keyword.matched,
            missing_skills: keyword.missing,
            embedding_dim: similarity.embedding_dim,
        })
    }

    pub fn model_name(&self) -> &str {
        self.embeddings.model_name()
    }

    pub fn skill_count(&self) -> usize {
        self.skill_matcher.skill_count()
    }
}

/// A full run: validate, score, then ask for feedback
pub struct AnalysisPipeline {
    engine: AnalysisEngine,
    feedback: Option<Arc<dyn FeedbackGenerator>>,
}

impl AnalysisPipeline {
    pub fn new(engine: AnalysisEngine, feedback: Option<Arc<dyn FeedbackGenerator>>) -> Self {
        Self { engine, feedback }
    }

    pub async fn analyze_files(
        &self,
        input: &InputManager,
        job_path: &Path,
        resume_path: &Path,
    ) -> Result<AnalysisReport> {
        let job = Document::new(display_name(job_path), input.extract_text(job_path).await?);
        let resume = Document::new(
            display_name(resume_path),
            input.extract_text(resume_path).await?,
        );
        self.analyze(&job, &resume).await
    }

    pub async fn analyze(&self, job: &Document, resume: &Document) -> Result<AnalysisReport> {
        let start_time = Instant::now();

        validate_document_text(&job.text).map_err(|e| with_document(e, &job.name))?;
        validate_document_text(&resume.text).map_err(|e| with_document(e, &resume.name))?;

        info!("Analyzing {} against {}", resume.name, job.name);
        let card = self.engine.score(&job.text, &resume.text).await?;
        info!(
            "Final score {:.2}% ({})",
            card.final_score,
            card.verdict.label()
        );

        let missing: Vec<String> = card.missing_skills.iter().cloned().collect();
        let (feedback, feedback_status, feedback_error) = match &self.feedback {
            None => (FEEDBACK_SKIPPED.to_string(), FeedbackStatus::Skipped, None),
            Some(generator) => match generator.generate(&job.text, &resume.text, &missing).await {
                Ok(text) => (text, FeedbackStatus::Generated, None),
                Err(e) => {
                    warn!("Feedback generation failed: {}", e);
                    (
                        FEEDBACK_UNAVAILABLE.to_string(),
                        FeedbackStatus::Failed,
                        Some(e.to_string()),
                    )
                }
            },
        };

        let result = AnalysisResult {
            resume_name: resume.name.clone(),
            job_name: job.name.clone(),
            final_score: card.final_score,
            verdict: card.verdict,
            matched_skills: card.matched_skills,
            missing_skills: card.missing_skills,
            feedback,
            created_at: Utc::now(),
        };

        Ok(AnalysisReport {
            result,
            hard_match_score: card.hard_match_score,
            semantic_score: card.semantic_score,
            feedback_status,
            feedback_error,
            model_info: ModelInfo {
                embedding_model: self.engine.model_name().to_string(),
                skill_count: self.engine.skill_count(),
                feedback_model: self.feedback.as_ref().map(|g| g.name().to_string()),
            },
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn with_document(err: RelevanceError, name: &str) -> RelevanceError {
    match err {
        RelevanceError::DocumentExtraction(msg) => {
            RelevanceError::DocumentExtraction(format!("{}: {}", name, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::Embedder;
    use crate::input::manager::UNSUPPORTED_FORMAT_SENTINEL;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and embeds by letter frequency
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(v)
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct FixedFeedback(&'static str);

    #[async_trait]
    impl FeedbackGenerator for FixedFeedback {
        async fn generate(&self, _job: &str, _resume: &str, missing: &[String]) -> Result<String> {
            Ok(format!("{} {}", self.0, missing.join(",")))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenFeedback;

    #[async_trait]
    impl FeedbackGenerator for BrokenFeedback {
        async fn generate(&self, _job: &str, _resume: &str, _missing: &[String]) -> Result<String> {
            Err(RelevanceError::FeedbackGeneration("HTTP 401".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn engine(embedder: Arc<CountingEmbedder>) -> AnalysisEngine {
        let handle = Arc::new(EmbeddingModelHandle::preloaded(embedder));
        AnalysisEngine::new(
            Arc::new(SkillMatcher::with_default_vocabulary().unwrap()),
            EmbeddingEngine::new(handle, Duration::from_secs(5), true),
            ScoreWeights::default(),
        )
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_sentinel_text_never_reaches_scorers() {
        let embedder = counting();
        let pipeline = AnalysisPipeline::new(engine(embedder.clone()), None);

        let job = Document::new("job.txt", "Python and SQL developer");
        let resume = Document::new("resume.doc", UNSUPPORTED_FORMAT_SENTINEL);
        let result = pipeline.analyze(&job, &resume).await;

        match result {
            Err(RelevanceError::DocumentExtraction(msg)) => assert!(msg.contains("resume.doc")),
            other => panic!("expected extraction error, got {:?}", other.map(|r| r.result)),
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_score_reports_partial_skill_overlap() {
        let engine = engine(counting());
        let card = engine
            .score(
                "We need Python, SQL and AWS experience.",
                "Built ETL jobs in python with sql.",
            )
            .await
            .unwrap();

        assert!((card.hard_match_score - 66.67).abs() < 0.01);
        assert_eq!(
            card.matched_skills.iter().cloned().collect::<Vec<_>>(),
            vec!["python", "sql"]
        );
        assert_eq!(
            card.missing_skills.iter().cloned().collect::<Vec<_>>(),
            vec!["aws"]
        );
        assert!(card.semantic_score >= 0.0 && card.semantic_score <= 100.0);
        let expected = 0.6 * card.hard_match_score + 0.4 * card.semantic_score;
        assert!((card.final_score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_identical_documents_are_high_suitability() {
        let engine = engine(counting());
        let text = "Data scientist: python, pandas, numpy, machine learning";
        let card = engine.score(text, text).await.unwrap();
        assert_eq!(card.hard_match_score, 100.0);
        assert!(card.final_score > 99.0);
        assert_eq!(card.verdict, Verdict::High);
    }

    #[tokio::test]
    async fn test_empty_resume_text_fails_before_feedback() {
        let embedder = counting();
        let pipeline = AnalysisPipeline::new(
            engine(embedder.clone()),
            Some(Arc::new(FixedFeedback("tips"))),
        );
        let result = pipeline
            .analyze(&Document::new("jd", "python"), &Document::new("cv", "  \n "))
            .await;
        assert!(matches!(result, Err(RelevanceError::DocumentExtraction(_))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_feedback_receives_missing_skills() {
        let pipeline = AnalysisPipeline::new(
            engine(counting()),
            Some(Arc::new(FixedFeedback("Learn:"))),
        );
        let report = pipeline
            .analyze(
                &Document::new("jd.txt", "python aws gcp"),
                &Document::new("cv.txt", "python developer"),
            )
            .await
            .unwrap();

        assert_eq!(report.feedback_status, FeedbackStatus::Generated);
        assert_eq!(report.result.feedback, "Learn: aws,gcp");
        assert_eq!(report.model_info.feedback_model.as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn test_feedback_failure_keeps_scores() {
        let pipeline = AnalysisPipeline::new(engine(counting()), Some(Arc::new(BrokenFeedback)));
        let report = pipeline
            .analyze(
                &Document::new("jd.txt", "python sql"),
                &Document::new("cv.txt", "python sql"),
            )
            .await
            .unwrap();

        assert_eq!(report.feedback_status, FeedbackStatus::Failed);
        assert_eq!(report.result.feedback, FEEDBACK_UNAVAILABLE);
        assert!(report.feedback_error.unwrap().contains("401"));
        assert_eq!(report.hard_match_score, 100.0);
        assert_eq!(report.result.verdict, Verdict::High);
    }

    #[tokio::test]
    async fn test_no_feedback_generator_is_skipped() {
        let pipeline = AnalysisPipeline::new(engine(counting()), None);
        let report = pipeline
            .analyze(
                &Document::new("jd.txt", "react css html"),
                &Document::new("cv.txt", "gardening"),
            )
            .await
            .unwrap();

        assert_eq!(report.feedback_status, FeedbackStatus::Skipped);
        assert_eq!(report.result.feedback, FEEDBACK_SKIPPED);
        assert_eq!(report.hard_match_score, 0.0);
        assert_eq!(report.result.missing_skills.len(), 3);
        assert!(report.model_info.feedback_model.is_none());
    }

    #[test]
    fn test_display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/tmp/cv/alice.pdf")), "alice.pdf");
    }
}
