//! Embedding capability abstraction and implementations.
//!
//! The embedding model is an external capability: the pipeline only sees
//! `text -> fixed-length f64 vector`. Two implementations ship here:
//! - **[`DisabledEmbedder`]** — returns errors; used when embeddings are
//!   not configured.
//! - **[`RemoteEmbedder`]** — calls an OpenAI-compatible embeddings
//!   endpoint with retry and backoff.
//!
//! Also provides vector utilities used by the persisted index:
//! [`vec_to_blob`] / [`blob_to_vec`] for little-endian serialization and
//! [`l2_distance_sq`] for nearest-neighbor ranking.
//!
//! # Retry Strategy
//!
//! The remote embedder retries transient failures with exponential
//! backoff: HTTP 429 and 5xx → retry; other 4xx → fail immediately;
//! network errors → retry. Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped).

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::EmbedError;

/// Trait for the external embedding capability.
///
/// Implementations must be deterministic for identical input so a stored
/// text can later match itself.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dimension(&self) -> usize;
    /// Embed one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError>;
}

/// A no-op embedder that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dimension(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f64>, EmbedError> {
        Err(EmbedError::Disabled)
    }
}

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct RemoteEmbedder {
    model: String,
    dims: usize,
    endpoint: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| EmbedError::Config("embedding.model is required".to_string()))?;
        let dims = config
            .dims
            .ok_or_else(|| EmbedError::Config("embedding.dims is required".to_string()))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(EmbedError::Config(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Http(e.to_string()))?;

        Ok(Self {
            model,
            dims,
            endpoint: config.endpoint.clone(),
            client,
            max_retries: config.max_retries,
        })
    }

    async fn request(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EmbedError::Config("OPENAI_API_KEY not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| EmbedError::BadResponse(e.to_string()))?;
                        return parse_embedding_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(EmbedError::Http(format!(
                            "embeddings API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(EmbedError::Http(format!(
                        "embeddings API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(EmbedError::Http(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| EmbedError::Http("embedding failed after retries".to_string())))
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dimension(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        let vector = self.request(text).await?;
        if vector.len() != self.dims {
            return Err(EmbedError::Dimension {
                expected: self.dims,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Extract the first `data[].embedding` array from an embeddings response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f64>, EmbedError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbedError::BadResponse("missing data[0].embedding".to_string()))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0))
        .collect())
}

/// Create the appropriate [`Embedder`] based on configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(RemoteEmbedder::new(config)?)),
        other => Err(EmbedError::Config(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

/// Encode a float vector as little-endian f64 bytes, `vec.len() × 8` total.
pub fn vec_to_blob(vec: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 8);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a blob back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 8-byte little-endian `f64` values.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f64> {
    blob.chunks_exact(8)
        .map(|chunk| {
            f64::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ])
        })
        .collect()
}

/// Squared Euclidean distance between two vectors.
///
/// Returns `f64::INFINITY` for vectors of different lengths so mismatched
/// entries rank last instead of poisoning the ordering.
pub fn l2_distance_sq(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f64, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 40);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_l2_identical_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(l2_distance_sq(&v, &v), 0.0);
    }

    #[test]
    fn test_l2_known_distance() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert_eq!(l2_distance_sq(&a, &b), 25.0);
    }

    #[test]
    fn test_l2_different_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0];
        assert_eq!(l2_distance_sq(&a, &b), f64::INFINITY);
    }

    #[test]
    fn parses_embedding_response() {
        let json = serde_json::json!({
            "data": [{"embedding": [0.5, -0.25, 1.0]}]
        });
        let vec = parse_embedding_response(&json).unwrap();
        assert_eq!(vec, vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn rejects_malformed_response() {
        let json = serde_json::json!({"data": []});
        assert!(parse_embedding_response(&json).is_err());
    }

    #[tokio::test]
    async fn disabled_embedder_errors() {
        let err = DisabledEmbedder.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbedError::Disabled));
    }
}
