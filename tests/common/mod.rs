//! Shared helpers for integration tests

use resume_relevance::processing::analyzer::{AnalysisEngine, AnalysisPipeline};
use resume_relevance::processing::embeddings::{Embedder, EmbeddingEngine, EmbeddingModelHandle};
use resume_relevance::processing::scoring::ScoreWeights;
use resume_relevance::processing::skill_matcher::SkillMatcher;
use resume_relevance::feedback::FeedbackGenerator;
use resume_relevance::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BUCKETS: usize = 128;

/// Deterministic stand-in for a real model: hashed bag of words
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    calls: AtomicUsize,
}

impl BagOfWordsEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let hash = word
        .bytes()
        .fold(0xcbf29ce484222325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100000001b3));
    (hash % BUCKETS as u64) as usize
}

impl Embedder for BagOfWordsEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; BUCKETS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(word)] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

pub fn pipeline_with(
    embedder: Arc<BagOfWordsEmbedder>,
    feedback: Option<Arc<dyn FeedbackGenerator>>,
) -> AnalysisPipeline {
    let handle = Arc::new(EmbeddingModelHandle::preloaded(embedder));
    let engine = AnalysisEngine::new(
        Arc::new(SkillMatcher::with_default_vocabulary().unwrap()),
        EmbeddingEngine::new(handle, Duration::from_secs(10), true),
        ScoreWeights::default(),
    );
    AnalysisPipeline::new(engine, feedback)
}
