//! Google Generative Language (Gemini) REST client

use crate::config::FeedbackConfig;
use crate::error::{RelevanceError, Result};
use crate::feedback::prompts::render_feedback_prompt;
use crate::feedback::FeedbackGenerator;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Calls `generateContent`, retrying 429, 5xx and transport failures with exponential backoff
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl GeminiClient {
    pub fn new(config: &FeedbackConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RelevanceError::FeedbackGeneration(
                "API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(1000),
        })
    }

    /// Use an explicit key, falling back to the configured environment variable
    pub fn from_config(config: &FeedbackConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => std::env::var(&config.api_key_env).map_err(|_| {
                RelevanceError::FeedbackGeneration(format!(
                    "No API key: pass --api-key or set {}",
                    config.api_key_env
                ))
            })?,
        };
        Self::new(config, api_key)
    }

    pub fn with_backoff(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let mut last_error: Option<RelevanceError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt - 1));
                warn!(
                    "Feedback request attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.url())
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!("Feedback service returned {}: {}", status, text);
                last_error = Some(RelevanceError::FeedbackGeneration(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    text
                )));
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(RelevanceError::FeedbackGeneration(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    message
                )));
            }

            let parsed: GenerateContentResponse = response.json().await?;
            debug!("Feedback generated by {}", self.model);

            return parsed.text().ok_or_else(|| {
                RelevanceError::FeedbackGeneration("response contained no text".to_string())
            });
        }

        Err(last_error.unwrap_or_else(|| {
            RelevanceError::FeedbackGeneration(format!(
                "gave up after {} retries",
                self.max_retries
            ))
        }))
    }
}

#[async_trait]
impl FeedbackGenerator for GeminiClient {
    async fn generate(
        &self,
        job_text: &str,
        resume_text: &str,
        missing_skills: &[String],
    ) -> Result<String> {
        let prompt = render_feedback_prompt(job_text, resume_text, missing_skills);
        self.generate_text(&prompt).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, max_retries: u32) -> GeminiClient {
        let config = FeedbackConfig {
            endpoint: server.base_url(),
            model: "gemini-test".to_string(),
            max_retries,
            timeout_secs: 5,
            ..FeedbackConfig::default()
        };
        GeminiClient::new(&config, "secret".to_string())
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .query_param("key", "secret")
                    .body_includes("missing the following key skills required for the job: aws");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "- Learn AWS\n"}, {"text": "- Show SQL work"}]}
                    }]
                }));
            })
            .await;

        let client = client_for(&server, 0);
        let text = client
            .generate("Cloud role", "Python dev", &["aws".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "- Learn AWS\n- Show SQL work");
        assert_eq!(client.name(), "gemini-test");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400)
                    .json_body(json!({"error": {"message": "API key not valid"}}));
            })
            .await;

        let result = client_for(&server, 3).generate("jd", "cv", &[]).await;

        mock.assert_calls_async(1).await;
        match result {
            Err(RelevanceError::FeedbackGeneration(msg)) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("API key not valid"));
            }
            other => panic!("expected feedback error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_fail() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("overloaded");
            })
            .await;

        let result = client_for(&server, 2).generate("jd", "cv", &[]).await;

        mock.assert_calls_async(3).await;
        assert!(matches!(result, Err(RelevanceError::FeedbackGeneration(_))));
    }

    #[tokio::test]
    async fn test_many_retries_do_not_overflow_backoff() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("overloaded");
            })
            .await;

        let client = client_for(&server, 40).with_backoff(Duration::ZERO);
        let result = client.generate("jd", "cv", &[]).await;

        mock.assert_calls_async(41).await;
        assert!(matches!(result, Err(RelevanceError::FeedbackGeneration(_))));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"candidates": []}));
            })
            .await;

        let result = client_for(&server, 0).generate("jd", "cv", &[]).await;
        assert!(matches!(result, Err(RelevanceError::FeedbackGeneration(_))));
    }

    #[test]
    fn test_missing_api_key_env() {
        let config = FeedbackConfig {
            api_key_env: "RESUME_RELEVANCE_TEST_UNSET_KEY".to_string(),
            ..FeedbackConfig::default()
        };
        assert!(GeminiClient::from_config(&config, None).is_err());
        assert!(GeminiClient::from_config(&config, Some("k".to_string())).is_ok());
    }
}
