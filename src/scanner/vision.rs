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

//! Vision/PII sidecar client.
//!
//! OCR extraction and PII analysis run in a separate service; this module
//! only knows its request/response shapes. The scanner is a capability
//! interface so the kernel stays testable without network.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::sidecar;
use crate::errors::GatewayError;

#[derive(Debug, Clone, Deserialize)]
pub struct PiiFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanResponse {
    pub text: String,
    pub confidence: f64,
    pub segments: u32,
}

#[async_trait]
pub trait VisionScanner: Send + Sync {
    /// OCR a data-URI or raw base64 image payload into text.
    async fn extract_text(&self, data_uri: &str) -> Result<String, GatewayError>;

    /// Flag sensitive categories (PII, secrets) in free text.
    async fn analyze_text(&self, text: &str) -> Result<Vec<PiiFinding>, GatewayError>;
}

/// Null scanner: no OCR text, no PII findings.
pub struct NoopVision;

#[async_trait]
impl VisionScanner for NoopVision {
    async fn extract_text(&self, _data_uri: &str) -> Result<String, GatewayError> {
        Ok(String::new())
    }

    async fn analyze_text(&self, _text: &str) -> Result<Vec<PiiFinding>, GatewayError> {
        Ok(Vec::new())
    }
}

/// HTTP client for the FastAPI vision sidecar.
pub struct HttpVisionClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpVisionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(sidecar::TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Sidecar(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Send image bytes to `/scan` for OCR.
    pub async fn scan_image(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<ScanResponse, GatewayError> {
        let part = reqwest::multipart::Part::bytes(image).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/scan", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("vision sidecar unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::Sidecar(format!(
                "vision error: {}",
                response.status()
            )));
        }

        response
            .json::<ScanResponse>()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("vision decode failed: {}", e)))
    }
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    pii: Vec<PiiFinding>,
}

#[async_trait]
impl VisionScanner for HttpVisionClient {
    async fn extract_text(&self, data_uri: &str) -> Result<String, GatewayError> {
        if data_uri.is_empty() {
            return Ok(String::new());
        }

        // Strip a "data:image/png;base64," style prefix if present.
        let payload = match data_uri.find(',') {
            Some(idx) => &data_uri[idx + 1..],
            None => data_uri,
        };
        if payload.len() <= 20 {
            return Ok(String::new());
        }

        let image = BASE64_STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| GatewayError::Sidecar(format!("image payload not base64: {}", e)))?;

        let scan = self.scan_image(image, "upload.png").await?;
        debug!(
            confidence = scan.confidence,
            segments = scan.segments,
            "OCR extraction complete"
        );
        Ok(scan.text)
    }

    async fn analyze_text(&self, text: &str) -> Result<Vec<PiiFinding>, GatewayError> {
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("analysis request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::Sidecar(format!(
                "analysis failed: {}",
                response.status()
            )));
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Sidecar(format!("analysis decode failed: {}", e)))?;
        Ok(body.pii)
    }
}
