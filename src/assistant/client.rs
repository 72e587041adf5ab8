use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::{
    CoachingSuggestion, SuggestionKind, SuggestionPriority, SuggestionSource, SuggestionTiming,
};

use super::{AssistantError, AssistantService};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct CompanionConfig {
    pub base_url: String,
    pub api_key: String,
    /// Assistant domain the coach's history lives under
    pub domain: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CompanionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client for the companion-assistant service.
///
/// Transient failures are retried with exponential backoff; 4xx responses
/// are permanent and returned immediately.
pub struct CompanionClient {
    config: CompanionConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    #[serde(default)]
    suggestions: Vec<AssistantSuggestion>,
}

#[derive(Debug, Deserialize)]
struct AssistantSuggestion {
    category: Option<String>,
    suggestion: String,
    rationale: Option<String>,
}

impl CompanionClient {
    pub fn new(config: CompanionConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    async fn with_retry<T, F, Fut>(&self, mut request: F) -> Result<T, AssistantError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AssistantError>>,
    {
        let mut attempt = 0;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < MAX_RETRIES && error.is_transient() => {
                    let delay = BASE_BACKOFF * 2u32.pow(attempt);
                    debug!(attempt, ?delay, %error, "retrying assistant request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, AssistantError> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AssistantService for CompanionClient {
    async fn client_context(&self, client_id: &str) -> Result<Option<String>, AssistantError> {
        let payload = json!({
            "client_id": client_id,
            "domain": self.config.domain,
        });

        let response: ContextResponse = self
            .with_retry(|| self.send("/coaching/context", &payload))
            .await?;

        // Empty context is a normal "no history" result.
        Ok(response.context.filter(|c| !c.trim().is_empty()))
    }

    async fn supplementary_suggestions(
        &self,
        recent: &str,
        full: &str,
    ) -> Result<Vec<CoachingSuggestion>, AssistantError> {
        let payload = json!({
            "domain": self.config.domain,
            "recent_conversation": recent,
            "full_conversation": full,
        });

        let response: SuggestionsResponse = self
            .with_retry(|| self.send("/coaching/suggestions", &payload))
            .await?;

        let now = Utc::now();
        Ok(response
            .suggestions
            .into_iter()
            .map(|s| CoachingSuggestion {
                id: format!("assistant-{}", Uuid::new_v4()),
                kind: SuggestionKind::Immediate,
                priority: SuggestionPriority::Medium,
                category: s.category.unwrap_or_else(|| "general".to_string()),
                text: s.suggestion,
                rationale: s.rationale.unwrap_or_default(),
                timing: SuggestionTiming::Now,
                triggered_by: None,
                source: SuggestionSource::HistoricalAssistant,
                created_at: now,
            })
            .collect())
    }
}
