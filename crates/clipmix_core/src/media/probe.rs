//! Duration lookup via the external probe tool.

use std::path::Path;
use std::sync::Arc;

use super::process::CommandRunner;
use super::types::{ProbeError, ProbeResult, ToolCommand};

/// Reads the container-level duration of a media file.
pub trait MediaProbe: Send + Sync {
    /// Duration in seconds.
    fn duration(&self, path: &Path) -> ProbeResult<f64>;
}

/// `ffprobe`-backed duration lookup.
pub struct FfprobeProbe {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Command asking for `format=duration` as a bare value.
    pub fn command(&self, path: &Path) -> ToolCommand {
        ToolCommand::new(
            self.program.clone(),
            vec![
                "-v".to_string(),
                "error".to_string(),
                "-show_entries".to_string(),
                "format=duration".to_string(),
                "-of".to_string(),
                "default=noprint_wrappers=1:nokey=1".to_string(),
                path.to_string_lossy().to_string(),
            ],
        )
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration(&self, path: &Path) -> ProbeResult<f64> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        let command = self.command(path);
        let output = self.runner.run(&command)?;

        if !output.success() {
            return Err(ProbeError::CommandFailed {
                tool: command.tool_name(),
                exit_code: output.code_or_default(),
                message: output.stderr.trim().to_string(),
            });
        }

        parse_duration_output(&output.stdout).ok_or_else(|| ProbeError::Unparsable {
            tool: command.tool_name(),
            output: output.stdout.trim().to_string(),
        })
    }
}

/// Parse the probe's plain-text duration (first non-empty line).
pub fn parse_duration_output(text: &str) -> Option<f64> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let value: f64 = line.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// `m:ss` label for a track duration, or `unknown` when probing failed.
pub fn format_duration_label(duration: Option<f64>) -> String {
    match duration {
        Some(secs) if secs.is_finite() && secs >= 0.0 => {
            let total = secs.round() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::types::{ToolError, ToolOutput};
    use tempfile::tempdir;

    struct CannedRunner(ToolOutput);

    impl CommandRunner for CannedRunner {
        fn run(&self, _command: &ToolCommand) -> Result<ToolOutput, ToolError> {
            Ok(self.0.clone())
        }
    }

    fn probe_with(output: ToolOutput) -> FfprobeProbe {
        FfprobeProbe::new("ffprobe", Arc::new(CannedRunner(output)))
    }

    #[test]
    fn parses_plain_duration() {
        assert_eq!(parse_duration_output("12.480000\n"), Some(12.48));
        assert_eq!(parse_duration_output("\n  40\n"), Some(40.0));
        assert_eq!(parse_duration_output("N/A"), None);
        assert_eq!(parse_duration_output(""), None);
    }

    #[test]
    fn formats_labels() {
        assert_eq!(format_duration_label(Some(125.4)), "2:05");
        assert_eq!(format_duration_label(None), "unknown");
    }

    #[test]
    fn missing_file_fails_before_running() {
        let probe = probe_with(ToolOutput::default());
        let err = probe.duration(Path::new("/nope/track.mp3")).unwrap_err();
        assert!(matches!(err, ProbeError::FileNotFound(_)));
    }

    #[test]
    fn reads_duration_from_tool() {
        let dir = tempdir().unwrap();
        let track = dir.path().join("track.mp3");
        std::fs::write(&track, b"x").unwrap();

        let probe = probe_with(ToolOutput {
            exit_code: Some(0),
            stdout: "40.000000\n".to_string(),
            stderr: String::new(),
        });
        assert_eq!(probe.duration(&track).unwrap(), 40.0);
    }

    #[test]
    fn non_zero_exit_and_garbage_fail() {
        let dir = tempdir().unwrap();
        let track = dir.path().join("track.mp3");
        std::fs::write(&track, b"x").unwrap();

        let failing = probe_with(ToolOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "moov atom not found".to_string(),
        });
        assert!(matches!(
            failing.duration(&track),
            Err(ProbeError::CommandFailed { exit_code: 1, .. })
        ));

        let garbage = probe_with(ToolOutput {
            exit_code: Some(0),
            stdout: "N/A\n".to_string(),
            stderr: String::new(),
        });
        assert!(matches!(
            garbage.duration(&track),
            Err(ProbeError::Unparsable { .. })
        ));
    }

    #[test]
    fn command_requests_format_duration() {
        let probe = probe_with(ToolOutput::default());
        let cmd = probe.command(Path::new("a.mp3"));
        assert!(cmd.args.contains(&"format=duration".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "a.mp3");
    }
}
