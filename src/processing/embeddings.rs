//! Semantic similarity using Model2Vec static embeddings

use crate::error::{RelevanceError, Result};
use crate::processing::embedding_manager::EmbeddingModelManager;
use anyhow::Context;
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// Anything that turns text into a fixed-length dense vector
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn model_name(&self) -> &str;
}

/// Model2Vec-backed embedder
pub struct StaticModelEmbedder {
    model: StaticModel,
    model_name: String,
}

impl StaticModelEmbedder {
    pub fn load(model_path: &Path, model_name: &str) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading Model2Vec embedding model from: {}", model_path.display());

        let model = StaticModel::from_pretrained(
            model_path,
            None, // token
            None, // normalize
            None, // subfolder
        )
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        info!("Model loaded successfully in {:.2?}", start_time.elapsed());

        Ok(Self {
            model,
            model_name: model_name.to_string(),
        })
    }
}

impl Embedder for StaticModelEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.model.encode_single(text))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Process-wide embedding model: loaded at most once, then shared read-only.
///
/// A failed load leaves the handle empty, so the next caller retries it.
pub struct EmbeddingModelHandle {
    cell: OnceCell<Arc<dyn Embedder>>,
    models_dir: PathBuf,
    model_spec: String,
}

impl EmbeddingModelHandle {
    /// `model_spec` is a local model directory, a catalog id, or a Hub repo id
    pub fn new(models_dir: PathBuf, model_spec: impl Into<String>) -> Self {
        Self {
            cell: OnceCell::new(),
            models_dir,
            model_spec: model_spec.into(),
        }
    }

    pub fn preloaded(embedder: Arc<dyn Embedder>) -> Self {
        let model_spec = embedder.model_name().to_string();
        Self {
            cell: OnceCell::new_with(Some(embedder)),
            models_dir: PathBuf::new(),
            model_spec,
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn Embedder>> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub fn model_name(&self) -> &str {
        &self.model_spec
    }

    /// Release the model; a later `get` loads it again
    pub fn dispose(&mut self) {
        if self.cell.take().is_some() {
            info!("Released embedding model {}", self.model_spec);
        }
    }

    async fn load(&self) -> Result<Arc<dyn Embedder>> {
        let model_path = self.resolve_model_path().await.map_err(|e| match e {
            RelevanceError::Embedding(_) => e,
            other => RelevanceError::Embedding(format!("embedding model unavailable: {}", other)),
        })?;

        let model_name = self.model_spec.clone();
        let embedder = tokio::task::spawn_blocking(move || {
            StaticModelEmbedder::load(&model_path, &model_name)
        })
        .await
        .map_err(|e| RelevanceError::Embedding(format!("Model loading task failed: {}", e)))??;

        Ok(Arc::new(embedder))
    }

    async fn resolve_model_path(&self) -> Result<PathBuf> {
        let local = Path::new(&self.model_spec);
        if local.is_dir() {
            return Ok(local.to_path_buf());
        }

        let mut manager = EmbeddingModelManager::new(self.models_dir.clone()).await?;
        match manager.resolve_model_id(&self.model_spec) {
            Some(model_id) => manager.ensure_model_available(&model_id).await,
            // Not in the catalog: let Model2Vec fetch it from the Hub by repo id
            None => Ok(PathBuf::from(&self.model_spec)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Cosine similarity rescaled to a percentage
    pub score: f64,
    pub cosine: f64,
    pub embedding_dim: usize,
}

pub struct EmbeddingEngine {
    model: Arc<EmbeddingModelHandle>,
    timeout: Duration,
    clamp_upper: bool,
}

impl EmbeddingEngine {
    pub fn new(model: Arc<EmbeddingModelHandle>, timeout: Duration, clamp_upper: bool) -> Self {
        Self {
            model,
            timeout,
            clamp_upper,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Embed both texts and compare them. Empty input, an unavailable model, an
    /// invalid vector, or a timeout is an `Embedding` error, never a default score.
    pub async fn semantic_similarity(&self, text_a: &str, text_b: &str) -> Result<SimilarityScore> {
        if text_a.trim().is_empty() || text_b.trim().is_empty() {
            return Err(RelevanceError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }

        let start_time = Instant::now();

        // Loading the model (and a first-run download) counts against the same deadline
        let (embedding_a, embedding_b) =
            tokio::time::timeout(self.timeout, self.embed_pair(text_a, text_b))
                .await
                .map_err(|_| {
                    RelevanceError::Embedding(format!(
                        "embedding timed out after {:?}",
                        self.timeout
                    ))
                })??;

        let cosine = cosine_similarity(&embedding_a, &embedding_b)?;
        let score = to_percentage(cosine, self.clamp_upper);

        debug!(
            "Semantic similarity {:.2}% (cosine {:.4}) in {:.2?}",
            score,
            cosine,
            start_time.elapsed()
        );

        Ok(SimilarityScore {
            score,
            cosine,
            embedding_dim: embedding_a.len(),
        })
    }

    async fn embed_pair(&self, text_a: &str, text_b: &str) -> Result<(Vec<f32>, Vec<f32>)> {
        let embedder = self.model.get().await?;
        let (a, b) = (text_a.to_string(), text_b.to_string());

        tokio::task::spawn_blocking(move || -> Result<(Vec<f32>, Vec<f32>)> {
            Ok((embedder.embed(&a)?, embedder.embed(&b)?))
        })
        .await
        .map_err(|e| RelevanceError::Embedding(format!("embedding task failed: {}", e)))?
    }
}

/// `cos × 100`, floored at 0 and optionally capped at 100
pub fn to_percentage(cosine: f64, clamp_upper: bool) -> f64 {
    let score = (cosine * 100.0).max(0.0);
    if clamp_upper {
        score.min(100.0)
    } else {
        score
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(RelevanceError::Embedding(
            "model produced an empty embedding".to_string(),
        ));
    }
    if a.len() != b.len() {
        return Err(RelevanceError::Embedding(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(RelevanceError::Embedding(
            "embedding has zero norm (no tokens known to the model)".to_string(),
        ));
    }

    Ok(dot_product / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for LetterEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(v)
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0])
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn engine_with(embedder: Arc<dyn Embedder>, timeout: Duration) -> EmbeddingEngine {
        EmbeddingEngine::new(
            Arc::new(EmbeddingModelHandle::preloaded(embedder)),
            timeout,
            true,
        )
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_rejects_invalid_vectors() {
        assert!(cosine_similarity(&[], &[]).is_err());
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_percentage_clamping() {
        assert_eq!(to_percentage(-0.3, true), 0.0);
        assert_eq!(to_percentage(1.0000001, true), 100.0);
        assert!(to_percentage(1.0000001, false) > 100.0);
        assert!((to_percentage(0.5, true) - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_identical_texts_score_near_maximum() {
        let engine = engine_with(
            Arc::new(LetterEmbedder { calls: AtomicUsize::new(0) }),
            Duration::from_secs(5),
        );
        let text = "Senior data engineer with Python and SQL";
        let similarity = engine.semantic_similarity(text, text).await.unwrap();
        assert!(similarity.score > 99.99);
        assert!(similarity.score <= 100.0);
        assert_eq!(similarity.embedding_dim, 26);
    }

    #[tokio::test]
    async fn test_empty_text_is_embedding_error() {
        let embedder = Arc::new(LetterEmbedder { calls: AtomicUsize::new(0) });
        let engine = engine_with(embedder.clone(), Duration::from_secs(5));

        let result = engine.semantic_similarity("python", "   ").await;
        assert!(matches!(result, Err(RelevanceError::Embedding(_))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tokens_are_embedding_error() {
        let engine = engine_with(
            Arc::new(LetterEmbedder { calls: AtomicUsize::new(0) }),
            Duration::from_secs(5),
        );
        let result = engine.semantic_similarity("12345", "python").await;
        assert!(matches!(result, Err(RelevanceError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let engine = engine_with(Arc::new(SlowEmbedder), Duration::from_millis(50));
        let result = engine.semantic_similarity("a", "b").await;
        match result {
            Err(RelevanceError::Embedding(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other.map(|s| s.score)),
        }
    }

    #[tokio::test]
    async fn test_slow_model_load_times_out() {
        let handle = Arc::new(EmbeddingModelHandle::new(PathBuf::new(), "slow"));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let loading = Arc::clone(&handle);
        tokio::spawn(async move {
            loading
                .cell
                .get_or_init(|| async move {
                    let _ = started_tx.send(());
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Arc::new(SlowEmbedder) as Arc<dyn Embedder>
                })
                .await;
        });
        started_rx.await.unwrap();

        let engine = EmbeddingEngine::new(Arc::clone(&handle), Duration::from_millis(50), true);
        match engine.semantic_similarity("a", "b").await {
            Err(RelevanceError::Embedding(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other.map(|s| s.score)),
        }
        assert!(!handle.is_loaded());
    }

    #[tokio::test]
    async fn test_handle_dispose_releases_model() {
        let mut handle = EmbeddingModelHandle::preloaded(Arc::new(SlowEmbedder));
        assert!(handle.is_loaded());
        assert_eq!(handle.model_name(), "slow");
        handle.dispose();
        assert!(!handle.is_loaded());
    }
}
