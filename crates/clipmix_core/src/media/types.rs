//! Types shared by the probe and transform operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// One external tool invocation: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-like rendering for logs (arguments with spaces are quoted).
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        for arg in &self.args {
            if arg.contains(char::is_whitespace) || arg.is_empty() {
                parts.push(format!("\"{}\"", arg));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }

    /// Tool name without directories, used in error messages.
    pub fn tool_name(&self) -> String {
        std::path::Path::new(&self.program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }
}

/// Captured result of a finished tool process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code (`None` if the process was terminated by a signal).
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr (ffmpeg writes its diagnostics here).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code for error reporting (`-1` when unavailable).
    pub fn code_or_default(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Failure to run a tool at all (as opposed to a non-zero exit).
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: String, secs: u64 },
}

/// Duration lookup failed.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Media file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Could not parse duration from {tool} output '{output}'")]
    Unparsable { tool: String, output: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// An encode stage failed.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: String, secs: u64 },

    #[error("Could not run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl TransformError {
    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Exit code reported by the tool, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

impl From<ToolError> for TransformError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Spawn { tool, source } | ToolError::Wait { tool, source } => {
                Self::Launch { tool, source }
            }
            ToolError::TimedOut { tool, secs } => Self::TimedOut { tool, secs },
        }
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;
