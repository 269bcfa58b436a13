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

//! Warden constants - single source of truth for error codes, limits and
//! policy defaults.

/// JSON-RPC 2.0 error codes
pub mod jsonrpc {
    /// Internal error during post-response analysis (custom code)
    pub const ERROR_INTERNAL_SECURITY: i32 = -32000;
    /// Request blocked by the kernel before reaching the upstream (custom code)
    pub const ERROR_SECURITY_BLOCK: i32 = -32001;
    /// Response blocked after the upstream ran, e.g. canary exfiltration (custom code)
    pub const ERROR_EXFILTRATION_BLOCK: i32 = -32002;
    /// Internal error (standard JSON-RPC)
    pub const ERROR_INTERNAL: i32 = -32603;
    /// Parse error (standard JSON-RPC)
    pub const ERROR_PARSE: i32 = -32700;
}

/// MCP protocol methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// Transport limits (DoS protection)
pub mod limits {
    /// Initial line buffer size for stdio framing (1 MiB)
    pub const LINE_BUFFER_INITIAL: usize = 1024 * 1024;
    /// Maximum allowed JSON-RPC message size (10 MiB)
    pub const MAX_MESSAGE_SIZE_BYTES: usize = 10 * 1024 * 1024;
}

/// Behavioral session tracking
pub mod session {
    /// Shared bucket for request ids starting with "10".
    /// Lets multiple requests exercise one session without an auth layer.
    pub const BEHAVIORAL_BUCKET: &str = "BehavioralUser";
    /// Prefix for per-request sessions derived from the request id
    pub const SESSION_PREFIX: &str = "Session-";
    /// Maximum reason strings retained per session
    pub const HISTORY_CAP: usize = 64;
}

/// Policy defaults
pub mod policy {
    /// Inbound deny threshold
    pub const RISK_THRESHOLD: i64 = 60;
    /// Lowered threshold once a session drifts past [`LOCKDOWN_SESSION_RISK`]
    pub const LOCKDOWN_THRESHOLD: i64 = 40;
    /// Session risk above which the lowered threshold applies
    pub const LOCKDOWN_SESSION_RISK: i64 = 100;
    /// Cumulative session score that triggers a lock
    pub const SESSION_MAX_SCORE: i64 = 150;
    /// Violation count that triggers a lock
    pub const SESSION_MAX_VIOLATIONS: u32 = 3;
    /// Outbound redaction trigger (scorer probability)
    pub const REDACTION_TRIGGER: f64 = 0.85;
    /// Indirect-injection trigger for post-response analysis
    pub const INDIRECT_INJECTION_TRIGGER: f64 = 0.8;

    /// Substrings that mark a tool as sensitive (matched case-insensitively)
    pub const SENSITIVE_TOOL_MARKERS: &[&str] = &[
        "write_file",
        "delete_file",
        "execute_command",
        "run_script",
        "bash",
        "shell",
    ];
}

/// Configuration environment variables
pub mod config {
    pub const ENV_LOG_LEVEL: &str = "WARDEN_LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "WARDEN_LOG_FORMAT";
    pub const ENV_LISTEN_ADDR: &str = "WARDEN_LISTEN_ADDR";
    pub const ENV_RISK_THRESHOLD: &str = "WARDEN_RISK_THRESHOLD";
    pub const ENV_SESSION_MAX_SCORE: &str = "WARDEN_SESSION_MAX_SCORE";
    pub const ENV_SESSION_MAX_VIOLATIONS: &str = "WARDEN_SESSION_MAX_VIOLATIONS";
    pub const ENV_EMBEDDING_URL: &str = "WARDEN_EMBEDDING_URL";
    pub const ENV_EMBEDDING_MODEL: &str = "WARDEN_EMBEDDING_MODEL";
    pub const ENV_VISION_URL: &str = "WARDEN_VISION_URL";
}

/// Sidecar client settings
pub mod sidecar {
    /// Client-side deadline for embedding and vision calls
    pub const TIMEOUT_SECS: u64 = 5;
}
