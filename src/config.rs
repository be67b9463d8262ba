//! Configuration management for the resume relevance checker

use crate::error::{RelevanceError, Result};
use crate::processing::skill_matcher::DEFAULT_SKILLS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound on feedback retries; backoff doubles per attempt
pub const MAX_FEEDBACK_RETRIES: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: ModelConfig,
    pub skills: SkillsConfig,
    pub scoring: ScoringConfig,
    pub embedding: EmbeddingConfig,
    pub feedback: FeedbackConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    /// Catalog id, HuggingFace repo id, or local model directory
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub vocabulary: Vec<String>,
    pub extra_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub hard_match_weight: f64,
    pub semantic_weight: f64,
    pub clamp_semantic_to_100: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resume-relevance")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: app_dir(dirs::data_dir()).join("models"),
            embedding_model: "potion-base-8M".to_string(),
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            vocabulary: DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect(),
            extra_skills: Vec::new(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hard_match_weight: 0.6,
            semantic_weight: 0.4,
            clamp_semantic_to_100: true,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-1.5-flash-latest".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: app_dir(dirs::data_dir()).join("analysis_results.db"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Console,
            color_output: true,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location (created on first run)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content).map_err(|e| {
                RelevanceError::Configuration(format!("Failed to parse config: {}", e))
            })?;
            config.validate()?;
            Ok(config)
        } else if path.is_some() {
            Err(RelevanceError::Configuration(format!(
                "Config file not found: {}",
                config_path.display()
            )))
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            RelevanceError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        app_dir(dirs::config_dir()).join("config.toml")
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    /// Configured vocabulary plus extra skills, in declaration order
    pub fn effective_vocabulary(&self) -> Vec<String> {
        self.skills
            .vocabulary
            .iter()
            .chain(self.skills.extra_skills.iter())
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if !scoring.hard_match_weight.is_finite() || !scoring.semantic_weight.is_finite() {
            return Err(RelevanceError::Configuration(
                "Scoring weights must be finite numbers".to_string(),
            ));
        }
        if scoring.hard_match_weight < 0.0 || scoring.semantic_weight < 0.0 {
            return Err(RelevanceError::Configuration(
                "Scoring weights must not be negative".to_string(),
            ));
        }
        let total = scoring.hard_match_weight + scoring.semantic_weight;
        if (total - 1.0).abs() > 0.001 {
            return Err(RelevanceError::Configuration(format!(
                "Scoring weights must sum to 1.0, got {:.3}",
                total
            )));
        }
        if self.embedding.timeout_secs == 0 || self.feedback.timeout_secs == 0 {
            return Err(RelevanceError::Configuration(
                "Timeouts must be at least one second".to_string(),
            ));
        }
        if self.feedback.max_retries > MAX_FEEDBACK_RETRIES {
            return Err(RelevanceError::Configuration(format!(
                "feedback.max_retries must be at most {}",
                MAX_FEEDBACK_RETRIES
            )));
        }
        if self
            .effective_vocabulary()
            .iter()
            .all(|skill| skill.trim().is_empty())
        {
            return Err(RelevanceError::Configuration(
                "Skill vocabulary is empty".to_string(),
            ));
        }
        Ok(())
    }
}
