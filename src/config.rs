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

use crate::constants::{config as env_keys, policy};
use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};
use std::env;

/// A token that must never appear in tool output. Its presence proves
/// exfiltration of seeded upstream data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryRule {
    pub token: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub listen_addr: String,
    pub risk_threshold: i64,
    pub lockdown_threshold: i64,
    pub session_max_score: i64,
    pub session_max_violations: u32,
    pub redaction_trigger: f64,
    /// Base URL of the embedding sidecar; absent disables the vector path
    pub embedding_url: Option<String>,
    pub embedding_model: String,
    /// Base URL of the vision/PII sidecar; absent disables OCR enrichment
    pub vision_url: Option<String>,
    pub canaries: Vec<CanaryRule>,
}

impl Config {
    pub fn from_env() -> Result<Self, GatewayError> {
        let mut config = Self::default();

        if let Ok(v) = env::var(env_keys::ENV_LOG_LEVEL) {
            config.log_level = v;
        }
        if let Ok(v) = env::var(env_keys::ENV_LOG_FORMAT) {
            config.log_format = v;
        }
        if let Ok(v) = env::var(env_keys::ENV_LISTEN_ADDR) {
            config.listen_addr = v;
        }
        if let Ok(v) = env::var(env_keys::ENV_RISK_THRESHOLD) {
            config.risk_threshold = v.parse().map_err(|_| {
                GatewayError::Configuration(format!("invalid {}: {}", env_keys::ENV_RISK_THRESHOLD, v))
            })?;
        }
        if let Ok(v) = env::var(env_keys::ENV_SESSION_MAX_SCORE) {
            config.session_max_score = v.parse().map_err(|_| {
                GatewayError::Configuration(format!(
                    "invalid {}: {}",
                    env_keys::ENV_SESSION_MAX_SCORE,
                    v
                ))
            })?;
        }
        if let Ok(v) = env::var(env_keys::ENV_SESSION_MAX_VIOLATIONS) {
            config.session_max_violations = v.parse().map_err(|_| {
                GatewayError::Configuration(format!(
                    "invalid {}: {}",
                    env_keys::ENV_SESSION_MAX_VIOLATIONS,
                    v
                ))
            })?;
        }
        if let Ok(v) = env::var(env_keys::ENV_EMBEDDING_URL) {
            config.embedding_url = Some(v);
        }
        if let Ok(v) = env::var(env_keys::ENV_EMBEDDING_MODEL) {
            config.embedding_model = v;
        }
        if let Ok(v) = env::var(env_keys::ENV_VISION_URL) {
            config.vision_url = Some(v);
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            listen_addr: "127.0.0.1:5005".to_string(),
            risk_threshold: policy::RISK_THRESHOLD,
            lockdown_threshold: policy::LOCKDOWN_THRESHOLD,
            session_max_score: policy::SESSION_MAX_SCORE,
            session_max_violations: policy::SESSION_MAX_VIOLATIONS,
            redaction_trigger: policy::REDACTION_TRIGGER,
            embedding_url: None,
            embedding_model: "embedding-gemma".to_string(),
            vision_url: None,
            canaries: vec![
                CanaryRule {
                    token: "canary-secret-123".to_string(),
                    description: "Database honey token (user table)".to_string(),
                },
                CanaryRule {
                    token: "canary-api-key-999".to_string(),
                    description: "Fake API key seeded in logs".to_string(),
                },
            ],
        }
    }
}
