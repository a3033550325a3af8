//! Blocking execution of external tools.
//!
//! Every stage is one synchronous process invocation. Output is captured in
//! full; the exit status is the only thing used for control decisions.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::types::{ToolCommand, ToolError, ToolOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs tool commands to completion.
///
/// Implemented by [`SystemRunner`] for real processes; tests substitute
/// a recording fake.
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// `ToolOutput::exit_code`.
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

/// Runs commands as child processes, with an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process and fail once it runs longer than `secs` (0 = never).
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        let tool = command.tool_name();
        tracing::debug!("Running: {}", command.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty encoder can't
        // block on a full pipe while we wait for it.
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let stdout_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(ref mut out) = stdout {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });
        let stderr_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(ref mut err) = stderr {
                let _ = err.read_to_end(&mut buf);
            }
            buf
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if let Some(limit) = self.timeout {
                        if started.elapsed() >= limit {
                            let _ = child.kill();
                            let _ = child.wait();
                            let _ = stdout_handle.join();
                            let _ = stderr_handle.join();
                            tracing::warn!("{} killed after {}s", tool, limit.as_secs());
                            return Err(ToolError::TimedOut {
                                tool,
                                secs: limit.as_secs(),
                            });
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(ToolError::Wait { tool, source });
                }
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }
}
