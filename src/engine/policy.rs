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

//! Policy evaluation: the decision matrix over extracted features.
//!
//! Ordered gates: hard blocks first, then additive risk accumulation
//! against a threshold that tightens once a session has drifted.

use crate::constants::policy::LOCKDOWN_SESSION_RISK;
use crate::engine::types::{Decision, FeatureSet};

pub const REASON_SESSION_LOCKED: &str = "Session Locked (Behavioral Ban)";
pub const REASON_NULL_BYTES: &str = "Null Byte Injection Detected";
pub const REASON_OBFUSCATION: &str = "Malicious Payload Detected (Obfuscation)";

/// Apply the decision matrix. `base_threshold` is the configured default;
/// `lockdown_threshold` replaces it once session risk passes 100.
pub fn evaluate(features: &FeatureSet, base_threshold: i64, lockdown_threshold: i64) -> Decision {
    // 1. Hard blocks
    if features.is_session_locked {
        return Decision::denied(100, REASON_SESSION_LOCKED);
    }
    if features.has_null_bytes {
        return Decision::denied(100, REASON_NULL_BYTES);
    }

    // 2. Risk accumulation
    let mut base_risk: i64 = 0;

    if features.is_sensitive_tool {
        base_risk += 35;
    }
    if features.psych_urgency {
        base_risk += 40;
    }
    if features.psych_impersonation {
        base_risk += 50;
    }
    if features.has_hidden_chars {
        base_risk += 30;
    }

    // 3. Contextual risk: a session with a bad history starts higher,
    // scaled so it is not instant-kill until the drift is severe.
    let mut context_risk = features.session_risk / 5;
    if features.session_risk > 50 {
        context_risk += 30;
    }
    if features.session_risk > 80 {
        context_risk += 50;
    }

    let score = base_risk + context_risk + (features.text_risk * 100.0) as i64;

    // 4. Dynamic threshold
    let threshold = if features.session_risk > LOCKDOWN_SESSION_RISK {
        lockdown_threshold
    } else {
        base_threshold
    };

    let mut decision = Decision {
        allow: true,
        risk_score: score.min(100),
        block_reason: String::new(),
    };

    if score >= threshold {
        decision.allow = false;
        decision.block_reason = if features.is_sensitive_tool {
            format!("Sensitive Tool Usage: {}", features.tool_name)
        } else if features.has_hidden_chars {
            REASON_OBFUSCATION.to_string()
        } else {
            format!("Risk Threshold Exceeded (Score: {})", score)
        };
    }

    decision
}
