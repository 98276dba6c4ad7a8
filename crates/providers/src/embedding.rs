//! OpenAI-compatible embedding provider.
//!
//! Implements the `Embedder` capability against `/v1/embeddings`. Failures
//! collapse into `EmbedError::Unavailable` — the memory manager treats a
//! failed embed as "skip semantic recall / defer the index write", never as
//! a request failure.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use stratachat_config::AppConfig;
use stratachat_core::error::EmbedError;
use stratachat_core::provider::Embedder;
use tracing::{debug, info};

/// An embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::Unavailable(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

/// Builds the configured embedder, or `None` when embeddings are disabled
/// (`embedding.provider = "none"` or no API key is available). Without an
/// embedder the cold tier is inert: no index writes, no semantic recall.
pub fn build_embedder(config: &AppConfig) -> Option<Arc<dyn Embedder>> {
    if config.embedding.provider == "none" {
        info!("Embeddings disabled; cold-tier recall is off");
        return None;
    }

    let api_key = config
        .embedding
        .api_key
        .clone()
        .or_else(|| config.api_key.clone())?;

    let base_url = config
        .embedding
        .api_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

    let timeout = std::time::Duration::from_secs(config.embedding.timeout_secs);
    match OpenAiEmbedder::new(base_url, api_key, config.embedding.model.clone(), timeout) {
        Ok(embedder) => Some(Arc::new(embedder)),
        Err(e) => {
            info!("Embedder unavailable ({e}); cold-tier recall is off");
            None
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(EmbedError::Unavailable(format!(
                "embedding endpoint returned HTTP {status}"
            )));
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Unavailable(format!("unparsable embedding response: {e}")))?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::Unavailable("empty embedding response".into()))
    }
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_response_parses() {
        let json = r#"{"data": [{"embedding": [0.1, -0.2, 0.3]}]}"#;
        let resp: EmbeddingApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let e = OpenAiEmbedder::new(
            "https://api.openai.com/v1/",
            "sk",
            "text-embedding-3-small",
            std::time::Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(e.base_url, "https://api.openai.com/v1");
    }
}
