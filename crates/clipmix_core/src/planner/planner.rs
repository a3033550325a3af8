//! Job validation and per-output stage list construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;

use super::errors::{PlanError, PlanResult};
use super::sampling::sample_clips;
use super::segments::Segmentation;
use crate::media::MediaProbe;
use crate::models::{
    BackgroundMusicPolicy, JobSpec, MusicFit, MusicTiming, OutputPlan, SoundEffectPolicy,
    SourceLibrary, Stage,
};
use crate::music::pick_random_track;

/// A validated job with its resolved segmentation.
///
/// Construction performs every check that must pass before background
/// work starts. [`plan_output`](Self::plan_output) is then called once per
/// requested output.
#[derive(Debug, Clone)]
pub struct JobPlanner {
    spec: JobSpec,
    segmentation: Segmentation,
}

impl JobPlanner {
    /// Validate a job spec and resolve its segmentation.
    pub fn new(spec: JobSpec, default_segment_seconds: f64) -> PlanResult<Self> {
        if spec.generate_count == 0 {
            return Err(PlanError::invalid("generate count", "must be at least 1"));
        }

        let base = spec.output_base_name.trim();
        if base.is_empty() {
            return Err(PlanError::invalid("output name", "must not be empty"));
        }
        if base.contains(['/', '\\']) {
            return Err(PlanError::invalid(
                "output name",
                format!("'{}' must not contain path separators", base),
            ));
        }

        if spec.clips.is_empty() {
            return Err(PlanError::invalid("clips", "no clips selected"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = spec.clips.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(PlanError::invalid("clips", format!("'{}' selected twice", dup)));
        }

        let segmentation = Segmentation::resolve(&spec.segments, default_segment_seconds)?;
        if spec.clips.len() < segmentation.count {
            return Err(PlanError::InsufficientClips {
                available: spec.clips.len(),
                required: segmentation.count,
            });
        }

        let library = SourceLibrary::scan(&spec.source_folder).map_err(|e| {
            PlanError::invalid(
                "source folder",
                format!("{}: {}", spec.source_folder.display(), e),
            )
        })?;
        if let Some(missing) = spec.clips.iter().find(|c| !library.contains(c)) {
            return Err(PlanError::invalid(
                "clips",
                format!("'{}' is not a clip in {}", missing, library.folder().display()),
            ));
        }

        if let Some(effect) = spec.sound_effect.effect_path() {
            if !effect.is_file() {
                return Err(PlanError::invalid(
                    "sound effect",
                    format!("{} does not exist", effect.display()),
                ));
            }
        }

        if spec.background_music.is_on()
            && matches!(spec.sound_effect, SoundEffectPolicy::WholeVideoStart(_))
        {
            tracing::warn!("Background music is on; the whole-video sound effect will be skipped");
        }

        Ok(Self { spec, segmentation })
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn segmentation(&self) -> Segmentation {
        self.segmentation
    }

    /// Sample clips, pick music and build the stage list for one output.
    ///
    /// Staged files are named after `iteration` inside `work_dir`.
    pub fn plan_output<R: Rng + ?Sized>(
        &self,
        iteration: usize,
        work_dir: &Path,
        rng: &mut R,
        probe: &dyn MediaProbe,
    ) -> PlanResult<OutputPlan> {
        let sample = sample_clips(&self.spec.clips, self.segmentation.count, rng)?;
        let music = self.choose_music(rng, probe)?;

        let keep_audio = self.spec.keeps_clip_audio();
        let isolate = self.spec.isolates_voice();
        let staged = |suffix: &str| work_dir.join(format!("o{}_{}", iteration, suffix));

        let mut stages = Vec::new();
        let mut concat_inputs = Vec::with_capacity(sample.len());
        let mut clips = Vec::with_capacity(sample.len());

        for (i, name) in sample.iter().enumerate() {
            let clip = i + 1;
            let input = self.spec.clip_path(name);
            let mut current = staged(&format!("c{}_trim.mp4", clip));
            stages.push(Stage::TrimScalePad {
                clip,
                input: input.clone(),
                output: current.clone(),
                max_duration: self.segmentation.duration,
                keep_audio,
            });

            if isolate {
                let output = staged(&format!("c{}_voice.mp4", clip));
                stages.push(Stage::IsolateVoice {
                    clip,
                    input: current,
                    output: output.clone(),
                });
                current = output;
            }

            if let SoundEffectPolicy::PerClip(effect) = &self.spec.sound_effect {
                let output = staged(&format!("c{}_fx.mp4", clip));
                stages.push(Stage::OverlayEffect {
                    clip,
                    input: current,
                    output: output.clone(),
                    effect: effect.clone(),
                    has_audio: keep_audio,
                });
                current = output;
            }

            clips.push(input);
            concat_inputs.push(current);
        }

        let merged = staged("merged.mp4");
        stages.push(Stage::Concat {
            inputs: concat_inputs,
            manifest: staged("concat.txt"),
            output: merged.clone(),
        });

        let final_file = staged("final.mp4");
        let music_path = music.as_ref().map(|(path, _)| path.clone());
        match (music, &self.spec.sound_effect) {
            (Some((track, fit)), _) => stages.push(Stage::MixBackgroundMusic {
                input: merged,
                output: final_file,
                music: track,
                total_duration: self.segmentation.total_seconds(),
                fit,
            }),
            (None, SoundEffectPolicy::WholeVideoStart(effect)) => {
                stages.push(Stage::OverlayEffectWhole {
                    input: merged,
                    output: final_file,
                    effect: effect.clone(),
                    has_audio: keep_audio,
                })
            }
            (None, _) => {}
        }

        Ok(OutputPlan {
            iteration,
            clips,
            music: music_path,
            stages,
        })
    }

    fn choose_music<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        probe: &dyn MediaProbe,
    ) -> PlanResult<Option<(PathBuf, MusicFit)>> {
        let BackgroundMusicPolicy::On { timing, tracks } = &self.spec.background_music else {
            return Ok(None);
        };

        let track = pick_random_track(tracks, rng).ok_or(PlanError::NoMusicAvailable)?;
        let fit = match timing {
            MusicTiming::FollowVideo => MusicFit::FollowVideo,
            MusicTiming::FollowMusic => {
                let music_duration = probe.duration(&track)?;
                if music_duration <= 0.0 {
                    return Err(PlanError::invalid(
                        "background music",
                        format!("{} has zero duration", track.display()),
                    ));
                }
                MusicFit::FollowMusic { music_duration }
            }
        };
        tracing::debug!("Picked background music {}", track.display());
        Ok(Some((track, fit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ProbeError, ProbeResult};
    use crate::models::{AudioMode, SegmentMode};
    use crate::planner::DEFAULT_SEGMENT_SECONDS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct FixedProbe(Option<f64>);

    impl MediaProbe for FixedProbe {
        fn duration(&self, path: &Path) -> ProbeResult<f64> {
            self.0
                .ok_or_else(|| ProbeError::FileNotFound(path.to_path_buf()))
        }
    }

    struct Fixture {
        dir: TempDir,
        clips: Vec<String>,
    }

    impl Fixture {
        fn new(count: usize) -> Self {
            let dir = tempdir().unwrap();
            fs::create_dir(dir.path().join("clips")).unwrap();
            let clips: Vec<String> = (1..=count).map(|i| format!("clip{:02}.mp4", i)).collect();
            for c in &clips {
                fs::write(dir.path().join("clips").join(c), b"x").unwrap();
            }
            fs::write(dir.path().join("pop.wav"), b"x").unwrap();
            Self { dir, clips }
        }

        fn spec(&self) -> JobSpec {
            JobSpec::new(
                self.dir.path().join("clips"),
                self.clips.clone(),
                self.dir.path().join("out"),
            )
            .with_segments(SegmentMode::Manual {
                duration: 5.0,
                count: 3,
            })
        }

        fn effect(&self) -> PathBuf {
            self.dir.path().join("pop.wav")
        }

        fn work(&self) -> PathBuf {
            self.dir.path().join("out").join("temp")
        }
    }

    fn plan(spec: JobSpec, probe: &dyn MediaProbe, work: &Path) -> PlanResult<OutputPlan> {
        let planner = JobPlanner::new(spec, DEFAULT_SEGMENT_SECONDS)?;
        planner.plan_output(1, work, &mut StdRng::seed_from_u64(9), probe)
    }

    #[test]
    fn eight_clips_ten_segments_is_insufficient() {
        let fx = Fixture::new(8);
        let spec = fx.spec().with_segments(SegmentMode::Manual {
            duration: 5.0,
            count: 10,
        });
        let err = JobPlanner::new(spec, DEFAULT_SEGMENT_SECONDS).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InsufficientClips {
                available: 8,
                required: 10
            }
        ));
        assert!(err.is_validation());
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let fx = Fixture::new(4);
        let cases = vec![
            fx.spec().with_generate_count(0),
            fx.spec().with_base_name("  "),
            fx.spec().with_base_name("a/b"),
            fx.spec()
                .with_sound_effect(SoundEffectPolicy::PerClip(fx.dir.path().join("none.wav"))),
            JobSpec {
                clips: vec!["clip01.mp4".into(), "clip02.mp4".into(), "nope.mp4".into()],
                ..fx.spec()
            },
            JobSpec {
                clips: vec!["clip01.mp4".into(), "clip01.mp4".into(), "clip02.mp4".into()],
                ..fx.spec()
            },
        ];
        for spec in cases {
            let err = JobPlanner::new(spec, DEFAULT_SEGMENT_SECONDS).unwrap_err();
            assert!(matches!(err, PlanError::InvalidParameter { .. }), "{}", err);
        }
    }

    #[test]
    fn each_output_draws_its_own_sample() {
        let fx = Fixture::new(4);
        let planner = JobPlanner::new(fx.spec(), DEFAULT_SEGMENT_SECONDS).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let samples: Vec<Vec<PathBuf>> = (1..=20)
            .map(|i| {
                planner
                    .plan_output(i, &fx.work(), &mut rng, &FixedProbe(None))
                    .unwrap()
                    .clips
            })
            .collect();

        for clips in &samples {
            let mut unique = clips.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 3);
        }
        // Three of four clips per output: any two outputs share a clip.
        assert!(samples[1].iter().any(|c| samples[0].contains(c)));
        assert!(samples.iter().any(|clips| clips != &samples[0]));
    }

    #[test]
    fn normal_mode_stage_list() {
        let fx = Fixture::new(4);
        let plan = plan(fx.spec(), &FixedProbe(None), &fx.work()).unwrap();

        assert_eq!(
            plan.stage_names(),
            vec!["TrimScalePad", "TrimScalePad", "TrimScalePad", "Concat"]
        );
        assert!(matches!(
            plan.stages[0],
            Stage::TrimScalePad {
                keep_audio: true,
                ..
            }
        ));
        assert_eq!(plan.final_file(), Some(fx.work().join("o1_merged.mp4").as_path()));
        assert!(plan.music.is_none());
    }

    #[test]
    fn concat_order_matches_sample_order() {
        let fx = Fixture::new(6);
        let plan = plan(fx.spec(), &FixedProbe(None), &fx.work()).unwrap();

        let Some(Stage::Concat { inputs, manifest, .. }) = plan.stages.last() else {
            panic!("last stage should be concat");
        };
        let expected: Vec<_> = (1..=3)
            .map(|i| fx.work().join(format!("o1_c{}_trim.mp4", i)))
            .collect();
        assert_eq!(inputs, &expected);
        assert_eq!(manifest, &fx.work().join("o1_concat.txt"));

        let trimmed: Vec<_> = plan
            .stages
            .iter()
            .filter_map(|s| match s {
                Stage::TrimScalePad { input, .. } => Some(input.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(trimmed, plan.clips);
    }

    #[test]
    fn voice_only_with_per_clip_effect() {
        let fx = Fixture::new(3);
        let spec = fx
            .spec()
            .with_audio_mode(AudioMode::VoiceOnly)
            .with_sound_effect(SoundEffectPolicy::PerClip(fx.effect()));
        let plan = plan(spec, &FixedProbe(None), &fx.work()).unwrap();

        assert_eq!(
            &plan.stage_names()[..3],
            &["TrimScalePad", "IsolateVoice", "OverlayEffect"]
        );
        assert_eq!(plan.stages.len(), 3 * 3 + 1);
        let Some(Stage::Concat { inputs, .. }) = plan.stages.last() else {
            panic!("last stage should be concat");
        };
        assert_eq!(inputs[0], fx.work().join("o1_c1_fx.mp4"));
    }

    #[test]
    fn silent_mode_strips_audio_and_skips_voice() {
        let fx = Fixture::new(3);
        let spec = fx
            .spec()
            .with_audio_mode(AudioMode::Silent)
            .with_sound_effect(SoundEffectPolicy::WholeVideoStart(fx.effect()));
        let plan = plan(spec, &FixedProbe(None), &fx.work()).unwrap();

        assert!(!plan.stage_names().contains(&"IsolateVoice"));
        assert!(matches!(
            plan.stages.last(),
            Some(Stage::OverlayEffectWhole {
                has_audio: false,
                ..
            })
        ));
    }

    #[test]
    fn background_music_wins_over_whole_video_effect() {
        let fx = Fixture::new(3);
        let track = fx.dir.path().join("song.mp3");
        let spec = fx
            .spec()
            .with_audio_mode(AudioMode::VoiceOnly)
            .with_sound_effect(SoundEffectPolicy::WholeVideoStart(fx.effect()))
            .with_background_music(BackgroundMusicPolicy::On {
                timing: MusicTiming::FollowVideo,
                tracks: vec![track.clone()],
            });
        let plan = plan(spec, &FixedProbe(None), &fx.work()).unwrap();

        assert!(!plan.stage_names().contains(&"IsolateVoice"));
        assert!(!plan.stage_names().contains(&"OverlayEffectWhole"));
        assert!(matches!(
            plan.stages[0],
            Stage::TrimScalePad {
                keep_audio: false,
                ..
            }
        ));
        match plan.stages.last() {
            Some(Stage::MixBackgroundMusic {
                music,
                total_duration,
                fit,
                ..
            }) => {
                assert_eq!(music, &track);
                assert_eq!(*total_duration, 15.0);
                assert_eq!(*fit, MusicFit::FollowVideo);
            }
            other => panic!("unexpected last stage {:?}", other),
        }
        assert_eq!(plan.music, Some(track));
    }

    #[test]
    fn follow_music_probes_track() {
        let fx = Fixture::new(10);
        let spec = fx
            .spec()
            .with_segments(SegmentMode::Manual {
                duration: 5.0,
                count: 10,
            })
            .with_background_music(BackgroundMusicPolicy::On {
                timing: MusicTiming::FollowMusic,
                tracks: vec![PathBuf::from("/m/song.mp3")],
            });

        let plan = plan(spec.clone(), &FixedProbe(Some(40.0)), &fx.work()).unwrap();
        let Some(Stage::MixBackgroundMusic {
            fit, total_duration, ..
        }) = plan.stages.last()
        else {
            panic!("last stage should mix music");
        };
        assert_eq!(fit.speed(*total_duration), Some(1.25));

        let err = self::plan(spec, &FixedProbe(None), &fx.work()).unwrap_err();
        assert!(matches!(err, PlanError::Probe(_)));
    }

    #[test]
    fn no_eligible_track_fails_per_output() {
        let fx = Fixture::new(3);
        let spec = fx.spec().with_background_music(BackgroundMusicPolicy::On {
            timing: MusicTiming::FollowVideo,
            tracks: vec![],
        });
        let planner = JobPlanner::new(spec, DEFAULT_SEGMENT_SECONDS).unwrap();
        let err = planner
            .plan_output(1, &fx.work(), &mut StdRng::seed_from_u64(1), &FixedProbe(None))
            .unwrap_err();
        assert!(matches!(err, PlanError::NoMusicAvailable));
    }

    #[test]
    fn same_seed_same_plan() {
        let fx = Fixture::new(12);
        let planner = JobPlanner::new(fx.spec(), DEFAULT_SEGMENT_SECONDS).unwrap();
        let a = planner
            .plan_output(1, &fx.work(), &mut StdRng::seed_from_u64(5), &FixedProbe(None))
            .unwrap();
        let b = planner
            .plan_output(1, &fx.work(), &mut StdRng::seed_from_u64(5), &FixedProbe(None))
            .unwrap();
        assert_eq!(a.clips, b.clips);
        assert_eq!(a, b);
    }
}
