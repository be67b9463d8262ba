//! Error handling for the resume relevance checker

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelevanceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document extraction error: {0}")]
    DocumentExtraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Feedback generation error: {0}")]
    FeedbackGeneration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

impl RelevanceError {
    /// Short, stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RelevanceError::Io(_) => "io",
            RelevanceError::DocumentExtraction(_) => "document_extraction",
            RelevanceError::Embedding(_) => "embedding",
            RelevanceError::FeedbackGeneration(_) => "feedback_generation",
            RelevanceError::Persistence(_) => "persistence",
            RelevanceError::Configuration(_) => "configuration",
            RelevanceError::Serialization(_) => "serialization",
            RelevanceError::InvalidInput(_) => "invalid_input",
            RelevanceError::ModelNotFound(_) => "model_not_found",
            RelevanceError::OutputFormatting(_) => "output_formatting",
        }
    }

    /// Scoring failures abort the analysis; everything else can degrade
    pub fn is_scoring_failure(&self) -> bool {
        matches!(
            self,
            RelevanceError::DocumentExtraction(_) | RelevanceError::Embedding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RelevanceError>;

/// Model2Vec loader errors surface as embedding failures
impl From<anyhow::Error> for RelevanceError {
    fn from(err: anyhow::Error) -> Self {
        RelevanceError::Embedding(format!("{:#}", err))
    }
}

impl From<rusqlite::Error> for RelevanceError {
    fn from(err: rusqlite::Error) -> Self {
        RelevanceError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for RelevanceError {
    fn from(err: reqwest::Error) -> Self {
        RelevanceError::FeedbackGeneration(err.to_string())
    }
}

impl From<zip::result::ZipError> for RelevanceError {
    fn from(err: zip::result::ZipError) -> Self {
        RelevanceError::DocumentExtraction(err.to_string())
    }
}
