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

//! Stdio proxy mode.
//!
//! Wraps a real MCP server process. The inbound task screens agent
//! requests through the kernel and answers blocks locally; the outbound
//! task runs every upstream line through the response redactor. Allowed
//! traffic is forwarded with its original bytes, and outbound lines are
//! emitted strictly in arrival order.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::kernel::Kernel;
use crate::engine::types::Decision;
use crate::mcp::pipeline::{
    spawn_downstream_reader, spawn_stderr_drain, spawn_upstream_reader, DownstreamEvent,
    UpstreamEvent,
};
use crate::mcp::process::ProcessSupervisor;
use crate::mcp::redactor;
use crate::mcp::types::JsonRpcRequest;

/// Run the proxy until both directions drain.
pub async fn run(config: Arc<Config>, command: Vec<String>) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("no upstream command provided for proxy mode")?;

    let kernel = Arc::new(Kernel::new(&config));
    let scorer = kernel.scorer();

    let (up_tx, mut up_rx) = mpsc::channel::<UpstreamEvent>(64);
    let mut spawned = ProcessSupervisor::spawn(program, args, up_tx.clone())
        .with_context(|| format!("failed to start upstream '{}'", program))?;

    spawn_upstream_reader(spawned.stdout, up_tx);
    if let Some(stderr) = spawned.stderr.take() {
        spawn_stderr_drain(stderr);
    }

    let (down_tx, mut down_rx) = mpsc::channel::<DownstreamEvent>(64);
    spawn_downstream_reader(tokio::io::stdin(), down_tx);

    // Both directions write to our stdout through one channel so emitted
    // lines never interleave mid-frame.
    let (emit_tx, mut emit_rx) = mpsc::channel::<String>(64);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = emit_rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    info!("stdio proxy active, upstream '{}' started", program);

    // Inbound: agent -> kernel -> upstream
    let inbound = {
        let kernel = kernel.clone();
        let emit = emit_tx.clone();
        let mut child_stdin = spawned.stdin;
        tokio::spawn(async move {
            while let Some(event) = down_rx.recv().await {
                match event {
                    DownstreamEvent::Request { request, raw } => {
                        let decision = match kernel.execute(&request).await {
                            Ok(decision) => decision,
                            Err(e) => {
                                // Fail closed on internal errors.
                                error!("kernel failure: {}", e);
                                Decision::denied(100, "Internal Security Error")
                            }
                        };
                        debug!(
                            method = %request.method,
                            id = ?request.id,
                            allow = decision.allow,
                            risk = decision.risk_score,
                            "request screened"
                        );

                        if decision.allow {
                            if child_stdin.write_all(raw.as_bytes()).await.is_err()
                                || child_stdin.write_all(b"\n").await.is_err()
                            {
                                warn!("upstream stdin closed, stopping inbound task");
                                break;
                            }
                            let _ = child_stdin.flush().await;
                        } else if emit.send(block_response(&request, &decision)).await.is_err() {
                            break;
                        }
                    }
                    DownstreamEvent::Raw(line) => {
                        // Not JSON-RPC: forward blindly, framing untouched.
                        if child_stdin.write_all(line.as_bytes()).await.is_err()
                            || child_stdin.write_all(b"\n").await.is_err()
                        {
                            break;
                        }
                        let _ = child_stdin.flush().await;
                    }
                    DownstreamEvent::Disconnect => break,
                }
            }
            // Dropping child stdin signals EOF to the upstream.
        })
    };

    // Outbound: upstream -> redactor -> agent
    let outbound = {
        let config = config.clone();
        tokio::spawn(async move {
            while let Some(event) = up_rx.recv().await {
                match event {
                    UpstreamEvent::Line(line) => {
                        let filtered =
                            redactor::filter_line(&line, &scorer, config.redaction_trigger).await;
                        if emit_tx.send(filtered).await.is_err() {
                            break;
                        }
                    }
                    UpstreamEvent::Terminated(code) => {
                        // Keep draining: lines read before the exit may
                        // still be queued behind this event.
                        info!(exit_code = ?code, "upstream terminated");
                    }
                }
            }
        })
    };

    let _ = tokio::join!(inbound, outbound);
    let _ = writer.await;

    spawned.supervisor.kill();
    info!("stdio proxy shutting down");
    Ok(())
}

/// A denied request never reaches the upstream; the agent gets a normal
/// tool result carrying the block notice so it can explain the refusal.
fn block_response(req: &JsonRpcRequest, decision: &Decision) -> String {
    let message = format!(
        "[WARDEN SECURITY BLOCK]\n\nAction prevented: risk threshold exceeded.\nReason: {}",
        decision.block_reason
    );
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": req.id.clone().unwrap_or(Value::Null),
        "result": {
            "content": [{"type": "text", "text": message}],
            "isError": false
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_response_preserves_id() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: "tools/call".to_string(),
            params: None,
            id: Some(json!(42)),
        };
        let decision = Decision::denied(100, "Null Byte Injection Detected");
        let line = block_response(&req, &decision);
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["id"], json!(42));
        assert_eq!(value["result"]["isError"], json!(false));
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Null Byte Injection Detected"));
    }
}
