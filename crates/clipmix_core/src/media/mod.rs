//! External media engine boundary.
//!
//! Everything that talks to `ffmpeg`/`ffprobe` lives here:
//! - [`CommandRunner`]: blocking process execution (faked in tests)
//! - [`MediaProbe`]: container duration lookup
//! - [`MediaTransform`]: one encode invocation per pipeline stage
//! - [`FfmpegArgsBuilder`]: the stage → argument mapping

mod ffmpeg;
mod probe;
mod process;
mod transform;
mod types;

pub use ffmpeg::{concat_manifest, format_seconds, FfmpegArgsBuilder};
pub use probe::{format_duration_label, parse_duration_output, FfprobeProbe, MediaProbe};
pub use process::{CommandRunner, SystemRunner};
pub use transform::{write_concat_manifest, MediaTransform};
pub use types::{
    ProbeError, ProbeResult, ToolCommand, ToolError, ToolOutput, TransformError, TransformResult,
};
