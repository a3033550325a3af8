//! Stage execution through the external encode tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ffmpeg::{concat_manifest, FfmpegArgsBuilder};
use super::process::CommandRunner;
use super::types::{ToolCommand, TransformError, TransformResult};
use crate::config::EncodingSettings;
use crate::logging::JobLogger;
use crate::models::{MusicFit, Stage};

/// Runs one ffmpeg invocation per pipeline stage.
///
/// Each operation writes exactly the target path it is given and overwrites
/// it if present, so re-invoking a stage is a retry.
pub struct MediaTransform {
    runner: Arc<dyn CommandRunner>,
    ffmpeg: String,
    encoding: EncodingSettings,
    logger: Option<Arc<JobLogger>>,
}

impl MediaTransform {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ffmpeg: impl Into<String>,
        encoding: EncodingSettings,
    ) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.into(),
            encoding,
            logger: None,
        }
    }

    /// Route commands and tool output to a job log.
    pub fn with_logger(mut self, logger: Arc<JobLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn trim_scale_pad(
        &self,
        src: &Path,
        max_duration: f64,
        keep_audio: bool,
        output: &Path,
    ) -> TransformResult<PathBuf> {
        self.apply(&Stage::TrimScalePad {
            clip: 0,
            input: src.to_path_buf(),
            output: output.to_path_buf(),
            max_duration,
            keep_audio,
        })
    }

    pub fn isolate_voice(&self, src: &Path, output: &Path) -> TransformResult<PathBuf> {
        self.apply(&Stage::IsolateVoice {
            clip: 0,
            input: src.to_path_buf(),
            output: output.to_path_buf(),
        })
    }

    pub fn overlay_effect(
        &self,
        src: &Path,
        effect: &Path,
        has_audio: bool,
        output: &Path,
    ) -> TransformResult<PathBuf> {
        self.apply(&Stage::OverlayEffect {
            clip: 0,
            input: src.to_path_buf(),
            output: output.to_path_buf(),
            effect: effect.to_path_buf(),
            has_audio,
        })
    }

    /// Join `inputs` in order; the manifest is written next to `output`.
    pub fn concat(&self, inputs: &[PathBuf], manifest: &Path, output: &Path) -> TransformResult<PathBuf> {
        self.apply(&Stage::Concat {
            inputs: inputs.to_vec(),
            manifest: manifest.to_path_buf(),
            output: output.to_path_buf(),
        })
    }

    pub fn mix_background_music(
        &self,
        merged: &Path,
        music: &Path,
        total_duration: f64,
        fit: MusicFit,
        output: &Path,
    ) -> TransformResult<PathBuf> {
        self.apply(&Stage::MixBackgroundMusic {
            input: merged.to_path_buf(),
            output: output.to_path_buf(),
            music: music.to_path_buf(),
            total_duration,
            fit,
        })
    }

    pub fn overlay_effect_whole(
        &self,
        merged: &Path,
        effect: &Path,
        has_audio: bool,
        output: &Path,
    ) -> TransformResult<PathBuf> {
        self.apply(&Stage::OverlayEffectWhole {
            input: merged.to_path_buf(),
            output: output.to_path_buf(),
            effect: effect.to_path_buf(),
            has_audio,
        })
    }

    /// Execute a planned stage and return the file it wrote.
    pub fn apply(&self, stage: &Stage) -> TransformResult<PathBuf> {
        if let Stage::Concat {
            inputs, manifest, ..
        } = stage
        {
            write_concat_manifest(manifest, inputs)?;
        }

        let args = FfmpegArgsBuilder::new(stage, &self.encoding).build();
        let command = ToolCommand::new(self.ffmpeg.clone(), args);
        self.execute(&command)?;

        Ok(stage.output().to_path_buf())
    }

    fn execute(&self, command: &ToolCommand) -> TransformResult<()> {
        let rendered = command.display();
        tracing::debug!("{}", rendered);
        if let Some(ref logger) = self.logger {
            logger.clear_tail();
            logger.command(&rendered);
        }

        let output = self.runner.run(command)?;

        if let Some(ref logger) = self.logger {
            for line in output.stderr.lines() {
                logger.output_line(line);
            }
        }

        if !output.success() {
            if let Some(ref logger) = self.logger {
                logger.show_tail(&format!("{} output", command.tool_name()));
            }
            return Err(TransformError::command_failed(
                command.tool_name(),
                output.code_or_default(),
                output.stderr.trim().to_string(),
            ));
        }

        Ok(())
    }
}

/// Write the concat demuxer manifest for `inputs`.
pub fn write_concat_manifest(manifest: &Path, inputs: &[PathBuf]) -> TransformResult<()> {
    fs::write(manifest, concat_manifest(inputs))
        .map_err(|e| TransformError::io_error("writing concat manifest", e))
}
