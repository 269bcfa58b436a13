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

//! Risk scoring primitives.
//!
//! `RiskContext` accumulates score and reasons across an HTTP request's
//! lifecycle. The level bands feed audit output only; the kernel's
//! allow/deny decision uses its own threshold.

use serde::Serialize;

/// Categorical severity bands over the 0-100 score range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    /// 0-20
    Safe,
    /// 21-60
    Suspicious,
    /// 61-90
    High,
    /// 91+
    Block,
}

/// Mutable risk state for one request.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub score: i64,
    pub reasons: Vec<String>,
    pub request_id: String,
    pub blocked: bool,
    pub block_reason: String,
}

impl RiskContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            score: 0,
            reasons: Vec::new(),
            request_id: request_id.into(),
            blocked: false,
            block_reason: String::new(),
        }
    }

    /// Increase the score and record the reason.
    pub fn add(&mut self, delta: i64, reason: &str) {
        self.score += delta;
        self.reasons.push(format!("{} (+{})", reason, delta));
    }

    /// Stop the request immediately. Score saturates at 100.
    pub fn force_block(&mut self, reason: impl Into<String>) {
        self.blocked = true;
        self.block_reason = reason.into();
        self.score = 100;
    }

    pub fn level(&self) -> RiskLevel {
        if self.score > 90 {
            RiskLevel::Block
        } else if self.score > 60 {
            RiskLevel::High
        } else if self.score > 20 {
            RiskLevel::Suspicious
        } else {
            RiskLevel::Safe
        }
    }
}
