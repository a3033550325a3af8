//! Pipeline stage list produced by the planner.
//!
//! Each output is described by an [`OutputPlan`]: the sampled clips plus an
//! ordered list of [`Stage`] values. The runner executes the list as-is;
//! all audio-mode, sound-effect and background-music decisions are made
//! once when the list is built.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How background music is fitted to the merged video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "timing")]
pub enum MusicFit {
    /// Loop the music and trim it to the video length.
    FollowVideo,
    /// Retime the video to the music's natural length.
    FollowMusic { music_duration: f64 },
}

impl MusicFit {
    /// Video retiming factor (`total / music`), if the video is retimed.
    pub fn speed(&self, total_duration: f64) -> Option<f64> {
        match self {
            MusicFit::FollowVideo => None,
            MusicFit::FollowMusic { music_duration } => Some(total_duration / music_duration),
        }
    }
}

/// One external-tool invocation in an output's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage")]
pub enum Stage {
    /// Cut, scale to the portrait frame and pad one clip.
    TrimScalePad {
        clip: usize,
        input: PathBuf,
        output: PathBuf,
        max_duration: f64,
        keep_audio: bool,
    },
    /// Band-pass the clip audio to the vocal range.
    IsolateVoice {
        clip: usize,
        input: PathBuf,
        output: PathBuf,
    },
    /// Mix a sound effect at the start of one clip.
    OverlayEffect {
        clip: usize,
        input: PathBuf,
        output: PathBuf,
        effect: PathBuf,
        has_audio: bool,
    },
    /// Join the per-clip results in sampling order.
    Concat {
        inputs: Vec<PathBuf>,
        manifest: PathBuf,
        output: PathBuf,
    },
    /// Replace the merged audio with background music.
    MixBackgroundMusic {
        input: PathBuf,
        output: PathBuf,
        music: PathBuf,
        total_duration: f64,
        fit: MusicFit,
    },
    /// Mix a sound effect once at the start of the merged video.
    OverlayEffectWhole {
        input: PathBuf,
        output: PathBuf,
        effect: PathBuf,
        has_audio: bool,
    },
}

impl Stage {
    /// Stage name for logs and status text.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::TrimScalePad { .. } => "TrimScalePad",
            Stage::IsolateVoice { .. } => "IsolateVoice",
            Stage::OverlayEffect { .. } => "OverlayEffect",
            Stage::Concat { .. } => "Concat",
            Stage::MixBackgroundMusic { .. } => "MixBackgroundMusic",
            Stage::OverlayEffectWhole { .. } => "OverlayEffectWhole",
        }
    }

    /// File this stage writes.
    pub fn output(&self) -> &Path {
        match self {
            Stage::TrimScalePad { output, .. }
            | Stage::IsolateVoice { output, .. }
            | Stage::OverlayEffect { output, .. }
            | Stage::Concat { output, .. }
            | Stage::MixBackgroundMusic { output, .. }
            | Stage::OverlayEffectWhole { output, .. } => output,
        }
    }

    /// Clip index (1-based) for per-clip stages.
    pub fn clip(&self) -> Option<usize> {
        match self {
            Stage::TrimScalePad { clip, .. }
            | Stage::IsolateVoice { clip, .. }
            | Stage::OverlayEffect { clip, .. } => Some(*clip),
            _ => None,
        }
    }

    /// Whether this stage runs after concatenation.
    pub fn is_post_merge(&self) -> bool {
        matches!(
            self,
            Stage::MixBackgroundMusic { .. } | Stage::OverlayEffectWhole { .. }
        )
    }
}

/// An intermediate file owned by the job's temporary working area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFile {
    /// Path of the staged file.
    pub path: PathBuf,
    /// Output iteration (1-based) it belongs to.
    pub iteration: usize,
    /// Clip index (1-based) for per-clip files.
    pub clip: Option<usize>,
}

/// Everything needed to produce one output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPlan {
    /// Output iteration (1-based).
    pub iteration: usize,
    /// Sampled clips in concatenation order.
    pub clips: Vec<PathBuf>,
    /// Chosen background-music track, if any.
    pub music: Option<PathBuf>,
    /// Stages in execution order.
    pub stages: Vec<Stage>,
}

impl OutputPlan {
    /// The file holding the finished video once every stage has run.
    pub fn final_file(&self) -> Option<&Path> {
        self.stages.last().map(|s| s.output())
    }

    /// Every intermediate file the stages create, including the concat manifest.
    pub fn stage_files(&self) -> Vec<StageFile> {
        let mut files = Vec::with_capacity(self.stages.len() + 1);
        for stage in &self.stages {
            if let Stage::Concat { manifest, .. } = stage {
                files.push(StageFile {
                    path: manifest.clone(),
                    iteration: self.iteration,
                    clip: None,
                });
            }
            files.push(StageFile {
                path: stage.output().to_path_buf(),
                iteration: self.iteration,
                clip: stage.clip(),
            });
        }
        files
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> OutputPlan {
        OutputPlan {
            iteration: 2,
            clips: vec![PathBuf::from("/c/a.mp4")],
            music: None,
            stages: vec![
                Stage::TrimScalePad {
                    clip: 1,
                    input: PathBuf::from("/c/a.mp4"),
                    output: PathBuf::from("/t/o2_c1_trim.mp4"),
                    max_duration: 5.0,
                    keep_audio: true,
                },
                Stage::Concat {
                    inputs: vec![PathBuf::from("/t/o2_c1_trim.mp4")],
                    manifest: PathBuf::from("/t/o2_concat.txt"),
                    output: PathBuf::from("/t/o2_merged.mp4"),
                },
            ],
        }
    }

    #[test]
    fn follow_music_speed_matches_ratio() {
        let fit = MusicFit::FollowMusic {
            music_duration: 40.0,
        };
        assert_eq!(fit.speed(50.0), Some(1.25));
        assert_eq!(MusicFit::FollowVideo.speed(50.0), None);
    }

    #[test]
    fn stage_files_include_manifest() {
        let files = plan().stage_files();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/t/o2_c1_trim.mp4"),
                PathBuf::from("/t/o2_concat.txt"),
                PathBuf::from("/t/o2_merged.mp4"),
            ]
        );
        assert_eq!(files[0].clip, Some(1));
        assert!(files.iter().all(|f| f.iteration == 2));
    }

    #[test]
    fn final_file_is_last_stage_output() {
        assert_eq!(
            plan().final_file(),
            Some(Path::new("/t/o2_merged.mp4"))
        );
        assert_eq!(plan().stage_names(), vec!["TrimScalePad", "Concat"]);
    }
}
