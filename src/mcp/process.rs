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

//! Upstream process management.
//!
//! Spawns the wrapped tool with piped stdio and reports termination back
//! through the upstream event channel. On Linux the child is bound to the
//! gateway's lifetime via PR_SET_PDEATHSIG.

use std::process::Stdio;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::errors::GatewayError;
use crate::mcp::pipeline::UpstreamEvent;

pub struct ProcessSupervisor {
    kill_tx: Option<oneshot::Sender<()>>,
}

pub struct SpawnedUpstream {
    pub supervisor: ProcessSupervisor,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: Option<ChildStderr>,
}

impl ProcessSupervisor {
    pub fn spawn(
        cmd: &str,
        args: &[String],
        tx_events: mpsc::Sender<UpstreamEvent>,
    ) -> Result<SpawnedUpstream, GatewayError> {
        debug!("spawning upstream '{}' with args {:?}", cmd, args);

        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "linux")]
        // SAFETY: PR_SET_PDEATHSIG with SIGKILL is the standard Linux
        // mechanism to terminate the child when the parent dies; the
        // constants come from libc and are valid on this platform.
        unsafe {
            command.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = command
            .spawn()
            .map_err(|e| GatewayError::Process(format!("failed to spawn upstream: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GatewayError::Process("upstream stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GatewayError::Process("upstream stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                _ = kill_rx => {
                    let _ = child.kill().await;
                }
                status = child.wait() => {
                    let code = status.ok().and_then(|s| s.code());
                    let _ = tx_events.send(UpstreamEvent::Terminated(code)).await;
                }
            }
        });

        Ok(SpawnedUpstream {
            supervisor: ProcessSupervisor {
                kill_tx: Some(kill_tx),
            },
            stdin,
            stdout,
            stderr,
        })
    }

    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_spawn_reports_termination() {
        let (tx, mut rx) = mpsc::channel(4);
        let spawned = ProcessSupervisor::spawn("true", &[], tx).expect("spawn true");
        drop(spawned.stdin);

        match rx.recv().await {
            Some(UpstreamEvent::Terminated(code)) => assert_eq!(code, Some(0)),
            other => panic!("expected termination event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_pipes_stdout() {
        let (tx, _rx) = mpsc::channel(4);
        let mut spawned =
            ProcessSupervisor::spawn("echo", &["hello".to_string()], tx).expect("spawn echo");

        let mut output = String::new();
        spawned
            .stdout
            .read_to_string(&mut output)
            .await
            .expect("read stdout");
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_errors() {
        let (tx, _rx) = mpsc::channel(4);
        let result = ProcessSupervisor::spawn("definitely-not-a-real-binary-xyz", &[], tx);
        assert!(result.is_err());
    }
}
