//! HTTP client for the AI column mapping assistant.
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint using
//! [`reqwest`]. One assistant is created per import job: [`prime`] asks for
//! a mapping from a handful of sample rows and every row is then renamed
//! locally, so the service sees at most one request per job.
//!
//! [`prime`]: RowEnhancer::prime

use async_trait::async_trait;
use formflow_core::import::mapping::{mapping_messages, parse_suggestion};
use formflow_core::import::{apply_mapping, MappingSuggestion, Row};
use formflow_core::records::TargetCollection;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::capabilities::RowEnhancer;
use crate::error::EnhanceError;

pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Connection details for the assistant service.
#[derive(Debug, Clone)]
pub struct AiMappingConfig {
    pub api_key: String,
    /// Base URL without the trailing `/chat/completions`.
    pub base_url: String,
    pub model: String,
}

impl AiMappingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            model: DEFAULT_AI_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// AI column mapping for a single import job.
pub struct AiMappingAssistant {
    client: reqwest::Client,
    config: AiMappingConfig,
    suggestion: RwLock<Option<MappingSuggestion>>,
}

impl AiMappingAssistant {
    pub fn new(config: AiMappingConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, config: AiMappingConfig) -> Self {
        Self {
            client,
            config,
            suggestion: RwLock::new(None),
        }
    }

    /// Ask the service for a mapping of `sample`.
    pub async fn suggest_mapping(
        &self,
        sample: &[Row],
        target: TargetCollection,
    ) -> Result<MappingSuggestion, EnhanceError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": mapping_messages(sample, target),
            "temperature": 0,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let completion: ChatCompletion = Self::parse_response(response).await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EnhanceError::InvalidResponse("completion has no content".into()))?;

        parse_suggestion(&content).map_err(EnhanceError::InvalidResponse)
    }

    /// The mapping obtained by the last successful [`RowEnhancer::prime`].
    pub async fn current_suggestion(&self) -> Option<MappingSuggestion> {
        self.suggestion.read().await.clone()
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EnhanceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EnhanceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EnhanceError> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| EnhanceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RowEnhancer for AiMappingAssistant {
    async fn prime(&self, sample: &[Row], target: TargetCollection) -> Result<(), EnhanceError> {
        let suggestion = self.suggest_mapping(sample, target).await?;

        if let Some(suggested) = suggestion.suggested_collection() {
            if suggested != target {
                tracing::info!(
                    target = %target,
                    suggested = %suggested,
                    confidence = suggestion.confidence,
                    "AI suggests a different collection; keeping the job's target",
                );
            }
        }
        tracing::debug!(
            mappings = suggestion.field_mappings.len(),
            confidence = suggestion.confidence,
            "AI column mapping ready",
        );

        *self.suggestion.write().await = Some(suggestion);
        Ok(())
    }

    async fn enhance_row(&self, row: &Row, _target: TargetCollection) -> Result<Row, EnhanceError> {
        let guard = self.suggestion.read().await;
        let suggestion = guard.as_ref().ok_or(EnhanceError::NotPrimed)?;
        Ok(apply_mapping(row, suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn assistant(base_url: String) -> AiMappingAssistant {
        AiMappingAssistant::new(AiMappingConfig {
            api_key: "test-key".into(),
            base_url,
            model: "test-model".into(),
        })
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn primes_and_renames_rows() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "test-model");
                let content = json!({
                    "collectionType": "lead",
                    "fieldMappings": {"Naam": "name", "Mob": "phone"},
                    "confidence": 0.8
                })
                .to_string();
                Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
            }),
        );
        let assistant = assistant(serve(app).await);

        let sample = vec![row(json!({"Naam": "Asha", "Mob": "98200"}))];
        assistant.prime(&sample, TargetCollection::Lead).await.unwrap();

        let mapped = assistant
            .enhance_row(&sample[0], TargetCollection::Lead)
            .await
            .unwrap();
        assert_eq!(mapped["name"], "Asha");
        assert_eq!(mapped["phone"], "98200");
        assert_eq!(
            assistant.current_suggestion().await.unwrap().confidence,
            0.8
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let assistant = assistant(serve(app).await);

        let err = assistant
            .prime(&[], TargetCollection::Generic)
            .await
            .unwrap_err();
        assert_matches!(err, EnhanceError::Api { status: 429, ref body } if body == "slow down");
    }

    #[tokio::test]
    async fn unparseable_content_is_invalid() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(json!({"choices": [{"message": {"content": "I cannot help with that"}}]}))
            }),
        );
        let assistant = assistant(serve(app).await);

        let err = assistant
            .prime(&[], TargetCollection::Lead)
            .await
            .unwrap_err();
        assert_matches!(err, EnhanceError::InvalidResponse(_));
    }

    #[tokio::test]
    async fn enhancing_before_priming_fails() {
        let assistant = assistant("http://127.0.0.1:9".into());
        let err = assistant
            .enhance_row(&row(json!({"a": 1})), TargetCollection::Lead)
            .await
            .unwrap_err();
        assert_matches!(err, EnhanceError::NotPrimed);
    }
}
