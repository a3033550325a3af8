//! ffmpeg argument builder.
//!
//! Builds the argument list for one pipeline [`Stage`]. All filter
//! graphs, codecs and quality constants live here; nothing else in the
//! crate knows ffmpeg syntax.
//!
//! | Stage               | Video            | Audio                                   |
//! |---------------------|------------------|-----------------------------------------|
//! | TrimScalePad        | x264 re-encode   | AAC re-encode, or dropped               |
//! | IsolateVoice        | copy             | high-pass + low-pass, AAC               |
//! | OverlayEffect(Whole)| copy             | amix with effect (primary governs length)|
//! | Concat              | copy             | copy                                    |
//! | MixBackgroundMusic  | copy / retimed   | music at reduced volume                 |

use std::path::Path;

use crate::config::EncodingSettings;
use crate::models::{MusicFit, Stage};

/// Builder for ffmpeg command-line arguments.
pub struct FfmpegArgsBuilder<'a> {
    stage: &'a Stage,
    encoding: &'a EncodingSettings,
}

impl<'a> FfmpegArgsBuilder<'a> {
    pub fn new(stage: &'a Stage, encoding: &'a EncodingSettings) -> Self {
        Self { stage, encoding }
    }

    /// Build the complete argument list (without the program name).
    pub fn build(&self) -> Vec<String> {
        // Always overwrite: re-running a stage with the same target is a retry.
        let mut args = vec!["-y".to_string()];

        match self.stage {
            Stage::TrimScalePad {
                input,
                output,
                max_duration,
                keep_audio,
                ..
            } => {
                push_input(&mut args, input);
                args.push("-t".to_string());
                args.push(format_seconds(*max_duration));
                args.push("-vf".to_string());
                args.push(self.scale_pad_filter());
                self.add_video_encode(&mut args);
                if *keep_audio {
                    self.add_audio_encode(&mut args);
                } else {
                    args.push("-an".to_string());
                }
                push_path(&mut args, output);
            }
            Stage::IsolateVoice { input, output, .. } => {
                push_input(&mut args, input);
                args.push("-af".to_string());
                args.push(format!(
                    "highpass=f={},lowpass=f={}",
                    self.encoding.voice_low_hz, self.encoding.voice_high_hz
                ));
                args.push("-c:v".to_string());
                args.push("copy".to_string());
                self.add_audio_encode(&mut args);
                push_path(&mut args, output);
            }
            Stage::OverlayEffect {
                input,
                output,
                effect,
                has_audio,
                ..
            }
            | Stage::OverlayEffectWhole {
                input,
                output,
                effect,
                has_audio,
            } => {
                self.add_effect_mix(&mut args, input, effect, *has_audio);
                push_path(&mut args, output);
            }
            Stage::Concat {
                manifest, output, ..
            } => {
                args.extend(
                    ["-f", "concat", "-safe", "0"]
                        .iter()
                        .map(|s| s.to_string()),
                );
                push_input(&mut args, manifest);
                args.push("-c".to_string());
                args.push("copy".to_string());
                push_path(&mut args, output);
            }
            Stage::MixBackgroundMusic {
                input,
                output,
                music,
                total_duration,
                fit,
            } => {
                self.add_music_mix(&mut args, input, music, *total_duration, fit);
                push_path(&mut args, output);
            }
        }

        args
    }

    /// Fit inside the target frame keeping aspect ratio, then letterbox.
    fn scale_pad_filter(&self) -> String {
        let (w, h) = (self.encoding.width, self.encoding.height);
        format!(
            "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1"
        )
    }

    fn add_video_encode(&self, args: &mut Vec<String>) {
        args.push("-c:v".to_string());
        args.push("libx264".to_string());
        args.push("-preset".to_string());
        args.push(self.encoding.preset.clone());
        args.push("-crf".to_string());
        args.push(self.encoding.crf.to_string());
    }

    fn add_audio_encode(&self, args: &mut Vec<String>) {
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-b:a".to_string());
        args.push(self.encoding.audio_bitrate.clone());
    }

    /// Effect starts at zero under the existing audio; the primary track
    /// sets the length. Without primary audio the effect is padded and cut
    /// to the video instead.
    fn add_effect_mix(&self, args: &mut Vec<String>, input: &Path, effect: &Path, has_audio: bool) {
        push_input(args, input);
        push_input(args, effect);
        args.push("-filter_complex".to_string());
        if has_audio {
            args.push("[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=0[aout]".to_string());
        } else {
            args.push("[1:a]apad[aout]".to_string());
        }
        args.push("-map".to_string());
        args.push("0:v".to_string());
        args.push("-map".to_string());
        args.push("[aout]".to_string());
        args.push("-c:v".to_string());
        args.push("copy".to_string());
        self.add_audio_encode(args);
        if !has_audio {
            args.push("-shortest".to_string());
        }
    }

    fn add_music_mix(
        &self,
        args: &mut Vec<String>,
        input: &Path,
        music: &Path,
        total_duration: f64,
        fit: &MusicFit,
    ) {
        let volume = format_seconds(self.encoding.music_volume);
        push_input(args, input);

        match fit {
            MusicFit::FollowVideo => {
                args.push("-stream_loop".to_string());
                args.push("-1".to_string());
                push_input(args, music);
                args.push("-filter_complex".to_string());
                args.push(format!(
                    "[1:a]aresample={},volume={}[aout]",
                    self.encoding.music_sample_rate, volume
                ));
                args.push("-map".to_string());
                args.push("0:v".to_string());
                args.push("-map".to_string());
                args.push("[aout]".to_string());
                args.push("-c:v".to_string());
                args.push("copy".to_string());
                self.add_audio_encode(args);
                args.push("-t".to_string());
                args.push(format_seconds(total_duration));
            }
            MusicFit::FollowMusic { .. } => {
                let speed = fit.speed(total_duration).unwrap_or(1.0);
                push_input(args, music);
                args.push("-filter_complex".to_string());
                args.push(format!(
                    "[0:v]setpts=PTS/{}[vout];[1:a]volume={}[aout]",
                    format_seconds(speed),
                    volume
                ));
                args.push("-map".to_string());
                args.push("[vout]".to_string());
                args.push("-map".to_string());
                args.push("[aout]".to_string());
                self.add_video_encode(args);
                self.add_audio_encode(args);
            }
        }
    }
}

fn push_input(args: &mut Vec<String>, path: &Path) {
    args.push("-i".to_string());
    push_path(args, path);
}

fn push_path(args: &mut Vec<String>, path: &Path) {
    args.push(path.to_string_lossy().to_string());
}

/// Seconds as ffmpeg accepts them (`5`, `4.7`, `0.3`).
pub fn format_seconds(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Concat demuxer manifest listing files in order.
pub fn concat_manifest(inputs: &[impl AsRef<Path>]) -> String {
    let mut manifest = String::new();
    for input in inputs {
        let path = input.as_ref().to_string_lossy().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{}'\n", path));
    }
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn build(stage: &Stage) -> Vec<String> {
        FfmpegArgsBuilder::new(stage, &EncodingSettings::default()).build()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn trim_scale_pad_keeps_audio() {
        let args = build(&Stage::TrimScalePad {
            clip: 1,
            input: PathBuf::from("/in/a.mp4"),
            output: PathBuf::from("/t/o1_c1_trim.mp4"),
            max_duration: 4.7,
            keep_audio: true,
        });
        assert_eq!(args[0], "-y");
        assert!(has_pair(&args, "-t", "4.7"));
        assert!(has_pair(&args, "-crf", "18"));
        assert!(has_pair(&args, "-b:a", "192k"));
        assert!(args.iter().any(|a| a.contains("pad=1080:1920")));
        assert!(!args.contains(&"-an".to_string()));
        assert_eq!(args.last().unwrap(), "/t/o1_c1_trim.mp4");
    }

    #[test]
    fn trim_scale_pad_strips_audio() {
        let args = build(&Stage::TrimScalePad {
            clip: 1,
            input: PathBuf::from("/in/a.mp4"),
            output: PathBuf::from("/t/out.mp4"),
            max_duration: 5.0,
            keep_audio: false,
        });
        assert!(has_pair(&args, "-t", "5"));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"aac".to_string()));
    }

    #[test]
    fn isolate_voice_band_passes_and_copies_video() {
        let args = build(&Stage::IsolateVoice {
            clip: 2,
            input: PathBuf::from("/t/in.mp4"),
            output: PathBuf::from("/t/out.mp4"),
        });
        assert!(has_pair(&args, "-af", "highpass=f=200,lowpass=f=3000"));
        assert!(has_pair(&args, "-c:v", "copy"));
    }

    #[test]
    fn effect_without_primary_audio_pads_effect() {
        let args = build(&Stage::OverlayEffect {
            clip: 1,
            input: PathBuf::from("/t/in.mp4"),
            output: PathBuf::from("/t/out.mp4"),
            effect: PathBuf::from("/fx/pop.wav"),
            has_audio: false,
        });
        assert!(has_pair(&args, "-filter_complex", "[1:a]apad[aout]"));
        assert!(args.contains(&"-shortest".to_string()));

        let args = build(&Stage::OverlayEffectWhole {
            input: PathBuf::from("/t/in.mp4"),
            output: PathBuf::from("/t/out.mp4"),
            effect: PathBuf::from("/fx/pop.wav"),
            has_audio: true,
        });
        assert!(args.iter().any(|a| a.contains("amix=inputs=2:duration=first")));
        assert!(!args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn concat_stream_copies_from_manifest() {
        let args = build(&Stage::Concat {
            inputs: vec![],
            manifest: PathBuf::from("/t/o1_concat.txt"),
            output: PathBuf::from("/t/o1_merged.mp4"),
        });
        assert!(has_pair(&args, "-f", "concat"));
        assert!(has_pair(&args, "-safe", "0"));
        assert!(has_pair(&args, "-i", "/t/o1_concat.txt"));
        assert!(has_pair(&args, "-c", "copy"));
    }

    #[test]
    fn follow_video_loops_and_trims() {
        let args = build(&Stage::MixBackgroundMusic {
            input: PathBuf::from("/t/merged.mp4"),
            output: PathBuf::from("/t/final.mp4"),
            music: PathBuf::from("/m/song.mp3"),
            total_duration: 50.0,
            fit: MusicFit::FollowVideo,
        });
        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_pos + 1], "-1");
        assert_eq!(args[loop_pos + 3], "/m/song.mp3");
        assert!(has_pair(&args, "-filter_complex", "[1:a]aresample=44100,volume=0.3[aout]"));
        assert!(has_pair(&args, "-c:v", "copy"));
        assert!(has_pair(&args, "-t", "50"));
    }

    #[test]
    fn follow_music_retimes_video() {
        let args = build(&Stage::MixBackgroundMusic {
            input: PathBuf::from("/t/merged.mp4"),
            output: PathBuf::from("/t/final.mp4"),
            music: PathBuf::from("/m/song.mp3"),
            total_duration: 50.0,
            fit: MusicFit::FollowMusic {
                music_duration: 40.0,
            },
        });
        assert!(has_pair(
            &args,
            "-filter_complex",
            "[0:v]setpts=PTS/1.25[vout];[1:a]volume=0.3[aout]"
        ));
        assert!(has_pair(&args, "-c:v", "libx264"));
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-stream_loop".to_string()));
    }

    #[test]
    fn formats_seconds_compactly() {
        assert_eq!(format_seconds(5.0), "5");
        assert_eq!(format_seconds(4.7), "4.7");
        assert_eq!(format_seconds(0.3), "0.3");
        assert_eq!(format_seconds(0.0), "0");
    }

    #[test]
    fn manifest_preserves_order_and_escapes_quotes() {
        let manifest = concat_manifest(&[
            PathBuf::from("/t/o1_c2.mp4"),
            PathBuf::from("/t/it's.mp4"),
        ]);
        assert_eq!(manifest, "file '/t/o1_c2.mp4'\nfile '/t/it'\\''s.mp4'\n");
    }
}
