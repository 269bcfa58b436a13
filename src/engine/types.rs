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

//! Kernel data types: the per-request analysis context, the extracted
//! feature set, and the terminal decision.

use crate::mcp::types::JsonRpcRequest;

/// Session fields captured under the store lock at extraction time.
/// A concurrent request on the same session may race past this snapshot;
/// both deltas still accumulate monotonically.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSnapshot {
    pub cumulative_score: i64,
    pub locked: bool,
}

/// Ephemeral inputs for a single analysis pass.
#[derive(Debug)]
pub struct AnalysisContext<'a> {
    pub request: &'a JsonRpcRequest,
    pub request_id: String,
    pub timestamp: i64,
    pub session: SessionSnapshot,
}

/// Security signals extracted once per request, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    /// Canonicalized text, including OCR-extracted content
    pub full_text: String,
    /// Scorer probability, 0.0 - 1.0
    pub text_risk: f64,

    pub has_null_bytes: bool,
    pub has_hidden_chars: bool,

    pub tool_name: String,
    pub is_sensitive_tool: bool,

    pub psych_urgency: bool,
    pub psych_impersonation: bool,

    /// Cumulative session risk at extraction time
    pub session_risk: i64,
    pub is_session_locked: bool,
}

/// Terminal output of the kernel. Never mutated after policy runs.
#[derive(Debug, Clone)]
pub struct Decision {
    pub allow: bool,
    /// Normalized 0-100
    pub risk_score: i64,
    pub block_reason: String,
}

impl Decision {
    pub fn allowed() -> Self {
        Self {
            allow: true,
            risk_score: 0,
            block_reason: String::new(),
        }
    }

    pub fn denied(risk_score: i64, reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            risk_score,
            block_reason: reason.into(),
        }
    }
}
