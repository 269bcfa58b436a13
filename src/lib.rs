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

//! warden: a security gateway for MCP tool traffic.
//!
//! Warden sits between an LLM agent and its Model Context Protocol tool
//! servers. Every JSON-RPC message in either direction is analyzed for
//! prompt injection, data exfiltration, obfuscation and social
//! engineering, then forwarded, rewritten with secrets redacted, or
//! replaced with a synthetic block response.

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod mcp;
pub mod ml;
pub mod risk;
pub mod scanner;
pub mod server;
pub mod utils;
