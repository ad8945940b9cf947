use async_trait::async_trait;
use chatguard_config::ApiConfig;
use chatguard_core::ClassificationResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::handler::{ClassifyError, Classifier};

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    threshold: f64,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    is_offensive: bool,
    #[serde(default)]
    offensive_words: Option<Vec<String>>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Classifier backed by `POST {endpoint}/analyze`
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: String,
    threshold: f64,
}

impl RemoteClassifier {
    pub fn new(config: &ApiConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .user_agent("chatguard/1.0 (text moderation)")
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            threshold: config.threshold,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query `GET {endpoint}/health`
    pub async fn health(&self) -> Result<HealthStatus, ClassifyError> {
        let response = self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifyError::Status(response.status().as_u16()));
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| ClassifyError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        let response = self
            .client
            .post(format!("{}/analyze", self.endpoint))
            .json(&AnalyzeRequest {
                text,
                threshold: self.threshold,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifyError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<AnalyzeResponse>()
            .await
            .map_err(|e| ClassifyError::Decode(e.to_string()))?;

        debug!(
            label = body.label.as_deref().unwrap_or("-"),
            probability = body.probability.unwrap_or_default(),
            is_offensive = body.is_offensive,
            "remote verdict"
        );

        Ok(ClassificationResult {
            is_offensive: body.is_offensive,
            offending_tokens: body.offensive_words.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
    use serde_json::{Value, json};

    /// Serve `router` on an ephemeral port, returning the API base URL
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    /// A base URL nothing is listening on
    pub(crate) async fn unreachable() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/api", addr)
    }

    fn config(endpoint: String) -> ApiConfig {
        ApiConfig {
            endpoint,
            ..ApiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_remote_verdict_and_request_body() {
        let router = Router::new().route(
            "/api/analyze",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["threshold"], json!(0.5));
                let offensive = body["text"].as_str().unwrap_or_default().contains("idiot");
                let (label, words) = if offensive {
                    ("offensive", json!(["idiot"]))
                } else {
                    ("not offensive", json!([]))
                };
                Json(json!({
                    "text": body["text"],
                    "label": label,
                    "probability": 1.0,
                    "is_offensive": offensive,
                    "offensive_words": words,
                }))
            }),
        );
        let classifier = RemoteClassifier::new(&config(serve(router).await)).unwrap();

        let result = classifier.classify("you are an idiot").await.unwrap();
        assert_eq!(result, ClassificationResult::offensive(vec!["idiot".into()]));

        let result = classifier.classify("have a nice day").await.unwrap();
        assert_eq!(result, ClassificationResult::clean());
    }

    #[tokio::test]
    async fn test_null_words_tolerated() {
        let router = Router::new().route(
            "/api/analyze",
            post(|| async { Json(json!({"is_offensive": true, "offensive_words": null})) }),
        );
        let classifier = RemoteClassifier::new(&config(serve(router).await)).unwrap();

        let result = classifier.classify("whatever").await.unwrap();
        assert!(result.masks_whole_text());
    }

    #[tokio::test]
    async fn test_error_status() {
        let router = Router::new().route(
            "/api/analyze",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let classifier = RemoteClassifier::new(&config(serve(router).await)).unwrap();

        let err = classifier.classify("whatever").await.unwrap_err();
        assert!(matches!(err, ClassifyError::Status(500)));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let classifier = RemoteClassifier::new(&config(unreachable().await)).unwrap();
        let err = classifier.classify("whatever").await.unwrap_err();
        assert!(matches!(err, ClassifyError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let router = Router::new().route("/api/health", get(|| async { Json(json!({"status": "ok"})) }));
        let classifier = RemoteClassifier::new(&config(serve(router).await)).unwrap();

        assert!(classifier.health().await.unwrap().is_ok());
    }
}
