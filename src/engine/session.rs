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

//! Per-session behavioral state.
//!
//! Tracks cumulative risk drift across requests sharing one identity.
//! Cumulative score and violation count only ever grow; a locked session
//! stays locked for the process lifetime. Sessions are created lazily and
//! never destroyed (no persistence across restarts).

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use crate::constants::session::HISTORY_CAP;
use crate::utils::time;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub cumulative_score: i64,
    pub violation_count: u32,
    pub last_interaction: f64,
    /// Audit trail of recent decision reasons, bounded
    pub history: Vec<String>,
    /// Frozen due to excessive risk; terminal until restart
    pub locked: bool,
}

impl SessionState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            cumulative_score: 0,
            violation_count: 0,
            last_interaction: time::now(),
            history: Vec::new(),
            locked: false,
        }
    }
}

/// Thread-safe session map. One mutex covers the map and every state in
/// it; callers keep the critical section short and run scoring outside.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
    max_score: i64,
    max_violations: u32,
}

impl SessionStore {
    pub fn new(max_score: i64, max_violations: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_score,
            max_violations,
        }
    }

    /// Cheap copy of the fields the policy needs. Creates the session if
    /// it does not exist yet.
    pub fn snapshot(&self, id: &str) -> (i64, bool) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let state = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionState::new(id.to_string()));
        (state.cumulative_score, state.locked)
    }

    /// Add risk to the session. Crossing the cumulative maximum locks it.
    pub fn update_risk(&self, id: &str, delta: i64, reason: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let state = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionState::new(id.to_string()));

        state.last_interaction = time::now();
        state.cumulative_score += delta;
        if state.history.len() >= HISTORY_CAP {
            state.history.remove(0);
        }
        state.history.push(reason.to_string());

        if delta > 0 && !state.locked && state.cumulative_score > self.max_score {
            state.locked = true;
            warn!(
                session_id = %id,
                cumulative = state.cumulative_score,
                "session locked: cumulative risk exceeded threshold"
            );
        }
    }

    /// Count a denied request. Reaching the violation maximum locks the
    /// session.
    pub fn record_violation(&self, id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let state = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionState::new(id.to_string()));

        state.violation_count += 1;
        if state.violation_count >= self.max_violations && !state.locked {
            state.locked = true;
            warn!(
                session_id = %id,
                violations = state.violation_count,
                "session locked: violation limit reached"
            );
        }
    }

    /// Run a closure against the session state under the store lock.
    pub fn with_session<T>(&self, id: &str, f: impl FnOnce(&SessionState) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let state = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionState::new(id.to_string()));
        f(state)
    }
}
