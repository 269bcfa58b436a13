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

//! Domain error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration problem at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream process management failure
    #[error("Process error: {0}")]
    Process(String),

    /// Sidecar (embedding / vision) call failed. Non-fatal: the caller
    /// proceeds without the enrichment.
    #[error("Sidecar error: {0}")]
    Sidecar(String),

    /// Transport framing or serialization failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
