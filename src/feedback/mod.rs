//! Generated natural-language feedback for an analysis

pub mod client;
pub mod prompts;

use crate::error::Result;
use async_trait::async_trait;

pub use client::GeminiClient;

/// Produces coaching feedback for a resume against a job description
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(
        &self,
        job_text: &str,
        resume_text: &str,
        missing_skills: &[String],
    ) -> Result<String>;

    /// Model or service name shown in reports
    fn name(&self) -> &str;
}
