// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Embedding sidecar client.
//!
//! The embedder is a capability interface injected at construction; the
//! kernel works without it and tests use scorers with no embedder at all.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::sidecar;
use crate::errors::GatewayError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fetch the vector representation of a prompt.
    async fn embed(&self, prompt: &str) -> Result<Vec<f64>, GatewayError>;
}

/// HTTP client for an Ollama-compatible embedding endpoint.
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(sidecar::TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Sidecar(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, prompt: &str) -> Result<Vec<f64>, GatewayError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": self.model, "prompt": prompt }))
            .send()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::Sidecar(format!(
                "embedding api error: {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("embedding decode failed: {}", e)))?;

        debug!(dims = body.embedding.len(), "embedding fetched");
        Ok(body.embedding)
    }
}

/// Cosine similarity between two vectors; 0.0 on dimension mismatch or
/// zero-norm input.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.5, 0.25, -0.75];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_mismatched_dims() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_http_embedder_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .create_async()
            .await;

        let embedder = HttpEmbedder::new(server.url(), "embedding-gemma").unwrap();
        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_embedder_non_200_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .create_async()
            .await;

        let embedder = HttpEmbedder::new(server.url(), "embedding-gemma").unwrap();
        assert!(embedder.embed("hello").await.is_err());
    }
}
