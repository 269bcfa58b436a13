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

//! HTTP listener mode.
//!
//! One POST endpoint carrying JSON-RPC requests through the interceptor,
//! plus a health probe. Concurrency comes from independent worker tasks;
//! the interceptor shares state internally.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::engine::interceptor::Interceptor;
use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse};

#[derive(Clone)]
pub struct AppState {
    pub interceptor: Arc<Interceptor>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "warden" }))
}

async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    let (response, _rc) = state.interceptor.process_request(&request).await;
    Json(response)
}

pub async fn serve(config: Arc<Config>) -> Result<()> {
    let state = AppState {
        interceptor: Arc::new(Interceptor::new(&config)),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("warden gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
