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

//! The unified security kernel.
//!
//! One pass per request: resolve the session, extract features, evaluate
//! policy, record side effects. The kernel holds the only shared mutable
//! state (the session store) and keeps its critical sections short; the
//! scorer and sidecar calls run outside the lock.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::config::Config;
use crate::constants::{policy as policy_defaults, session as session_consts};
use crate::engine::policy;
use crate::engine::session::SessionStore;
use crate::engine::types::{AnalysisContext, Decision, FeatureSet, SessionSnapshot};
use crate::errors::GatewayError;
use crate::mcp::types::{stringify_id, JsonRpcRequest};
use crate::ml::embedding::HttpEmbedder;
use crate::ml::scorer::ThreatScorer;
use crate::scanner::vision::{HttpVisionClient, NoopVision, VisionScanner};
use crate::utils::time;

/// Scarcity pressure: attackers force models to skip checks by creating
/// panic.
static URGENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(urgent|immediate|deadline|critical|consequence|failed|suspended)\b")
        .expect("urgency regex")
});

/// Authority bias: "I am the developer", "act as system admin".
static IMPERSONATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(i am|role:?|act as|system admin|ceo|developer|debug mode)\b")
        .expect("impersonation regex")
});

/// Maps a request to its behavioral session key.
pub type SessionKeyFn = dyn Fn(&JsonRpcRequest) -> String + Send + Sync;

/// Default key derivation: ids starting with "10" share one bucket so
/// multi-turn behavior can be exercised without an auth layer; everything
/// else gets a per-id session. Deployments with a real identity source
/// inject their own function.
pub fn default_session_key(req: &JsonRpcRequest) -> String {
    let id = stringify_id(req.id.as_ref());
    if id.len() >= 2 && id.starts_with("10") {
        session_consts::BEHAVIORAL_BUCKET.to_string()
    } else {
        format!("{}{}", session_consts::SESSION_PREFIX, id)
    }
}

pub struct Kernel {
    scorer: Arc<ThreatScorer>,
    pub sessions: SessionStore,
    vision: Arc<dyn VisionScanner>,
    session_key: Box<SessionKeyFn>,
    base_threshold: i64,
    lockdown_threshold: i64,
}

impl Kernel {
    /// Build a kernel from configuration, wiring HTTP sidecar clients
    /// where URLs are present and null capabilities where they are not.
    pub fn new(config: &Config) -> Self {
        let scorer = match &config.embedding_url {
            Some(url) => match HttpEmbedder::new(url, &config.embedding_model) {
                Ok(embedder) => Arc::new(ThreatScorer::with_embedder(Arc::new(embedder))),
                Err(e) => {
                    tracing::warn!("embedding client unavailable, heuristics only: {}", e);
                    Arc::new(ThreatScorer::new())
                }
            },
            None => Arc::new(ThreatScorer::new()),
        };

        let vision: Arc<dyn VisionScanner> = match &config.vision_url {
            Some(url) => match HttpVisionClient::new(url) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!("vision client unavailable, OCR disabled: {}", e);
                    Arc::new(NoopVision)
                }
            },
            None => Arc::new(NoopVision),
        };

        Self::with_parts(scorer, vision, config)
    }

    /// Assemble a kernel from explicit capabilities. The seam tests use
    /// to inject canned scanners.
    pub fn with_parts(
        scorer: Arc<ThreatScorer>,
        vision: Arc<dyn VisionScanner>,
        config: &Config,
    ) -> Self {
        Self {
            scorer,
            sessions: SessionStore::new(config.session_max_score, config.session_max_violations),
            vision,
            session_key: Box::new(default_session_key),
            base_threshold: config.risk_threshold,
            lockdown_threshold: config.lockdown_threshold,
        }
    }

    /// Replace the session key derivation.
    pub fn set_session_key(&mut self, key: Box<SessionKeyFn>) {
        self.session_key = key;
    }

    pub fn scorer(&self) -> Arc<ThreatScorer> {
        self.scorer.clone()
    }

    /// One-pass analysis: features, policy, session side effects.
    pub async fn execute(&self, req: &JsonRpcRequest) -> Result<Decision, GatewayError> {
        let session_id = (self.session_key)(req);
        let (cumulative_score, locked) = self.sessions.snapshot(&session_id);

        let ctx = AnalysisContext {
            request: req,
            request_id: stringify_id(req.id.as_ref()),
            timestamp: time::unix_now(),
            session: SessionSnapshot {
                cumulative_score,
                locked,
            },
        };

        let features = self.extract_features(&ctx).await;
        let decision = policy::evaluate(&features, self.base_threshold, self.lockdown_threshold);

        debug!(
            request_id = %ctx.request_id,
            session_id = %session_id,
            allow = decision.allow,
            risk = decision.risk_score,
            "kernel decision"
        );

        // Side effects after the decision: the lock may flip for future
        // requests but never rewrites the current one.
        if decision.risk_score > 0 {
            self.sessions
                .update_risk(&session_id, decision.risk_score, &decision.block_reason);
            if !decision.allow {
                self.sessions.record_violation(&session_id);
            }
        }

        Ok(decision)
    }

    async fn extract_features(&self, ctx: &AnalysisContext<'_>) -> FeatureSet {
        let params = ctx
            .request
            .params
            .clone()
            .unwrap_or(serde_json::Value::Null);

        // Text selection: arguments payload first, bare "text" second,
        // raw parameter JSON as the fallback. Malformed input is not an
        // error; the raw bytes get analyzed as-is.
        let mut raw_text = params.to_string();
        if let Some(map) = params.as_object() {
            if let Some(arguments) = map.get("arguments") {
                raw_text = arguments.to_string();
            } else if let Some(text) = map.get("text").and_then(serde_json::Value::as_str) {
                raw_text = text.to_string();
            }
        }

        let tool_name = params
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tool_lower = tool_name.to_lowercase();
        let is_sensitive_tool = !tool_name.is_empty()
            && policy_defaults::SENSITIVE_TOOL_MARKERS
                .iter()
                .any(|marker| tool_lower.contains(marker));

        // OCR enrichment for image-bearing payloads. Sidecar failures are
        // silent: the feature is simply absent.
        let mut full_text = raw_text.clone();
        if raw_text.contains("data:image") || raw_text.contains("base64") {
            match self.vision.extract_text(&raw_text).await {
                Ok(ocr) if !ocr.is_empty() => {
                    full_text.push('\n');
                    full_text.push_str(&ocr);
                }
                Ok(_) => {}
                Err(e) => debug!("OCR extraction failed: {}", e),
            }
        }

        let has_null_bytes = raw_text.contains('\0') || raw_text.contains("\\u0000");

        let mut has_hidden_chars = contains_format_chars(&raw_text);
        if !has_hidden_chars {
            if let Ok(findings) = self.vision.analyze_text(&full_text).await {
                has_hidden_chars = !findings.is_empty();
            }
        }

        let text_risk = self.scorer.evaluate(&full_text).await;

        let psych_urgency = URGENCY_RE.is_match(&full_text);
        let psych_impersonation = IMPERSONATION_RE.is_match(&full_text);

        FeatureSet {
            full_text,
            text_risk,
            has_null_bytes,
            has_hidden_chars,
            tool_name,
            is_sensitive_tool,
            psych_urgency,
            psych_impersonation,
            session_risk: ctx.session.cumulative_score,
            is_session_locked: ctx.session.locked,
        }
    }
}

/// Unicode Format (Cf) code points commonly abused to hide payloads:
/// soft hyphen, bidi controls, zero-width characters, BOM.
fn contains_format_chars(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(
            c,
            '\u{00AD}'
                | '\u{061C}'
                | '\u{180E}'
                | '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{2069}'
                | '\u{FEFF}'
        )
    })
}
