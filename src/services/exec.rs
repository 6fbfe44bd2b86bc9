//! Shell command executor
//!
//! Runs the command line through `sh -c` with an explicit timeout and a cap
//! on captured output. The child is killed if the timeout fires.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ExecOutput, Executor, ServiceError};

#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
    max_output: usize,
}

impl ShellExecutor {
    pub fn new(timeout: Duration, max_output: usize) -> Self {
        Self { timeout, max_output }
    }

    async fn run_to_completion(&self, command_line: &str) -> Result<ExecOutput, ServiceError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServiceError::Exec(format!("spawn failed: {e}")))?;

        let mut stdout = Vec::new();
        if let Some(mut pipe) = child.stdout.take() {
            (&mut pipe).take(self.max_output as u64).read_to_end(&mut stdout).await?;
            // Keep the pipe drained so the child never blocks on a full buffer.
            tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
        }

        let status = child.wait().await?;
        Ok(ExecOutput {
            stdout,
            status: status.code(),
        })
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn run(&self, command_line: &str) -> Result<ExecOutput, ServiceError> {
        // Dropping the future on timeout drops the child, which kills it.
        match timeout(self.timeout, self.run_to_completion(command_line)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.timeout)),
        }
    }
}
