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

//! Reader tasks for the stdio proxy.
//!
//! Newline-delimited JSON framing with a hard line-length cap. Each
//! direction runs as its own long-lived task feeding an mpsc channel;
//! lines that do not parse as JSON-RPC are passed along raw so framing is
//! never altered for traffic the gateway does not understand.

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, error};

use crate::constants::limits;
use crate::mcp::types::JsonRpcRequest;

/// Messages arriving from the downstream client (the agent).
#[derive(Debug)]
pub enum DownstreamEvent {
    /// A parsed request together with its original wire bytes
    Request {
        request: Box<JsonRpcRequest>,
        raw: String,
    },
    /// A line that is not a JSON-RPC request; forwarded verbatim
    Raw(String),
    /// Client disconnected (EOF) or the reader gave up
    Disconnect,
}

/// Messages arriving from the upstream tool process.
#[derive(Debug)]
pub enum UpstreamEvent {
    Line(String),
    /// Process terminated with optional exit code
    Terminated(Option<i32>),
}

fn framed<R: AsyncRead>(stream: R) -> FramedRead<R, LinesCodec> {
    FramedRead::with_capacity(
        stream,
        LinesCodec::new_with_max_length(limits::MAX_MESSAGE_SIZE_BYTES),
        limits::LINE_BUFFER_INITIAL,
    )
}

/// Read agent requests from stdin until EOF.
pub fn spawn_downstream_reader(stream: tokio::io::Stdin, tx: mpsc::Sender<DownstreamEvent>) {
    tokio::spawn(async move {
        let mut lines = framed(stream);

        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => {
                    let event = match serde_json::from_str::<JsonRpcRequest>(&line) {
                        Ok(request) => DownstreamEvent::Request {
                            request: Box::new(request),
                            raw: line,
                        },
                        Err(_) => DownstreamEvent::Raw(line),
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Oversized or broken framing: shut down the input
                    // side only.
                    error!("downstream framing error: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(DownstreamEvent::Disconnect).await;
    });
}

/// Read upstream output lines until EOF.
pub fn spawn_upstream_reader<R>(stream: R, tx: mpsc::Sender<UpstreamEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = framed(stream);

        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => {
                    if tx.send(UpstreamEvent::Line(line)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!("upstream framing error: {}", e);
                    break;
                }
            }
        }
    });
}

/// Drain upstream stderr into our diagnostics.
pub fn spawn_stderr_drain<R>(stream: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let message = line.trim();
                    if !message.is_empty() {
                        debug!("[upstream stderr] {}", message);
                    }
                }
                Err(_) => break,
            }
        }
    });
}
