//! Single-job execution engine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::errors::{RunnerError, RunnerResult, StageError};
use super::types::{
    JobReport, OutputOutcome, ProgressCallback, RunOptions, RunPhase, RunState, StatusBoard,
};
use super::workspace::TempWorkspace;
use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::media::{CommandRunner, FfprobeProbe, MediaProbe, MediaTransform, SystemRunner};
use crate::models::{JobSpec, Stage};
use crate::naming::unique_path;
use crate::planner::JobPlanner;

/// Runs mix jobs, at most one at a time.
///
/// `start` validates synchronously and then hands the job to a worker
/// thread. A second `start` while a job is running is rejected, not
/// queued.
pub struct JobRunner {
    running: Arc<AtomicBool>,
    status: StatusBoard,
    commands: Arc<dyn CommandRunner>,
    probe: Arc<dyn MediaProbe>,
    settings: Settings,
    logs_dir: PathBuf,
}

impl JobRunner {
    pub fn new(
        settings: Settings,
        commands: Arc<dyn CommandRunner>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        let logs_dir = PathBuf::from(&settings.paths.logs_folder);
        Self {
            running: Arc::new(AtomicBool::new(false)),
            status: StatusBoard::new(),
            commands,
            probe,
            settings,
            logs_dir,
        }
    }

    /// Runner backed by the real `ffmpeg`/`ffprobe` from `[tools]`.
    pub fn from_settings(settings: Settings) -> Self {
        let commands: Arc<dyn CommandRunner> =
            Arc::new(SystemRunner::new().with_timeout_secs(settings.tools.timeout_secs));
        let probe = Arc::new(FfprobeProbe::new(
            settings.tools.ffprobe.clone(),
            Arc::clone(&commands),
        ));
        Self::new(settings, commands, probe)
    }

    /// Write job logs to `dir` instead of the configured logs folder.
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = dir.into();
        self
    }

    /// Handle for reading the latest status text.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validate `spec` and run it on a worker thread.
    ///
    /// Validation and setup errors are returned here; per-output failures
    /// are reported in the [`JobReport`] the handle yields.
    pub fn start(&self, spec: JobSpec, options: RunOptions) -> RunnerResult<JoinHandle<JobReport>> {
        let job = self.prepare(spec, options)?;
        thread::Builder::new()
            .name("clipmix-job".to_string())
            .spawn(move || job.run())
            .map_err(|e| RunnerError::setup_failed(format!("spawning worker thread: {}", e)))
    }

    /// Validate and run `spec` on the calling thread.
    pub fn run_blocking(&self, spec: JobSpec, options: RunOptions) -> RunnerResult<JobReport> {
        Ok(self.prepare(spec, options)?.run())
    }

    fn prepare(&self, spec: JobSpec, options: RunOptions) -> RunnerResult<PreparedJob> {
        let guard = RunningGuard::acquire(&self.running).ok_or(RunnerError::AlreadyRunning)?;

        let planner = JobPlanner::new(spec, self.settings.mix.default_segment_seconds)?;
        let spec = planner.spec();

        let workspace = TempWorkspace::create(&spec.temp_dir()).map_err(|e| {
            RunnerError::setup_failed(format!("creating temp directory: {}", e))
        })?;

        let job_name = format!(
            "{}_{}",
            spec.output_base_name.trim(),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let logger = JobLogger::new(
            &job_name,
            &self.logs_dir,
            LogConfig::from_settings(&self.settings.logging),
            options.log_callback,
        )
        .map_err(|e| RunnerError::setup_failed(format!("creating job log: {}", e)))?;
        let logger = Arc::new(logger);

        let transform = MediaTransform::new(
            Arc::clone(&self.commands),
            self.settings.tools.ffmpeg.clone(),
            self.settings.encoding.clone(),
        )
        .with_logger(Arc::clone(&logger));

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(PreparedJob {
            job_name,
            planner,
            workspace,
            logger,
            transform,
            probe: Arc::clone(&self.probe),
            status: self.status.clone(),
            progress: options.progress,
            rng,
            continue_on_error: self.settings.mix.continue_on_error,
            guard,
        })
    }
}

/// Holds the job-level running flag until dropped.
struct RunningGuard {
    flag: Arc<AtomicBool>,
}

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A validated job with its temp directory and log, ready to run.
struct PreparedJob {
    job_name: String,
    planner: JobPlanner,
    workspace: TempWorkspace,
    logger: Arc<JobLogger>,
    transform: MediaTransform,
    probe: Arc<dyn MediaProbe>,
    status: StatusBoard,
    progress: Option<ProgressCallback>,
    rng: StdRng,
    continue_on_error: bool,
    guard: RunningGuard,
}

impl PreparedJob {
    fn run(mut self) -> JobReport {
        let spec = self.planner.spec();
        let count = spec.generate_count;
        let segmentation = self.planner.segmentation();
        let mut report = JobReport::new(&self.job_name, count);

        self.logger.info(&format!(
            "Job '{}': {} output(s), {} clips x {}s, audio {}, effect {}",
            self.job_name,
            count,
            segmentation.count,
            segmentation.duration_label(),
            spec.audio_mode,
            spec.sound_effect.name(),
        ));
        tracing::info!("Starting job '{}' ({} outputs)", self.job_name, count);

        for iteration in 1..=count {
            self.logger.phase(&format!("Output {}/{}", iteration, count));
            let mut state = RunState::new(iteration);

            let result = self.run_output(&mut state);
            self.workspace.remove_files(&state.staged);

            match result {
                Ok(path) => {
                    self.logger.success(&format!("Wrote {}", path.display()));
                    self.enter(&mut state, RunPhase::Done);
                    report.outputs.push(OutputOutcome::Finalized { iteration, path });
                }
                Err(err) => {
                    self.logger.error(&err.to_string());
                    self.enter(&mut state, RunPhase::Failed);
                    let stop = match err {
                        RunnerError::StageFailed { stage, source, .. } => {
                            let fatal = source.is_job_fatal();
                            report.outputs.push(OutputOutcome::Failed {
                                iteration,
                                stage,
                                message: source.to_string(),
                            });
                            fatal || !self.continue_on_error
                        }
                        other => {
                            report.outputs.push(OutputOutcome::Failed {
                                iteration,
                                stage: "Setup".to_string(),
                                message: other.to_string(),
                            });
                            true
                        }
                    };
                    if stop {
                        if iteration < count {
                            self.logger
                                .warn(&format!("Skipping {} remaining output(s)", count - iteration));
                        }
                        break;
                    }
                }
            }
        }

        let summary = format!(
            "Finished: {} of {} output(s) written",
            report.artifacts().len(),
            count
        );
        if report.is_success() {
            self.logger.success(&summary);
        } else {
            self.logger.warn(&summary);
        }
        self.logger.close();

        // Temp directory goes before the flag is released.
        let PreparedJob {
            workspace,
            guard,
            status,
            ..
        } = self;
        drop(workspace);
        status.publish(summary);
        drop(guard);

        report
    }

    /// Plan and execute one output; returns the finalized artifact.
    fn run_output(&mut self, state: &mut RunState) -> RunnerResult<PathBuf> {
        let iteration = state.iteration;
        self.enter(state, RunPhase::Sampling);

        let plan = self
            .planner
            .plan_output(
                iteration,
                self.workspace.path(),
                &mut self.rng,
                self.probe.as_ref(),
            )
            .map_err(|e| RunnerError::stage_failed(iteration, "Sampling", e.into()))?;

        state.clips = plan.clips.clone();
        state.music = plan.music.clone();
        state.staged = plan.stage_files();
        self.logger.log_plan_json(&plan);
        for clip in &plan.clips {
            self.logger.debug(&format!("Clip: {}", clip.display()));
        }
        if let Some(ref music) = plan.music {
            self.logger.info(&format!("Background music: {}", music.display()));
        }

        let clip_count = plan.clips.len();
        for stage in &plan.stages {
            let phase = phase_for(stage, clip_count);
            if state.phase != phase {
                self.enter(state, phase);
            }

            self.logger.stage(stage.name());
            let output = self
                .transform
                .apply(stage)
                .map_err(|e| RunnerError::stage_failed(iteration, stage.name(), e.into()))?;
            if !output.exists() {
                return Err(RunnerError::stage_failed(
                    iteration,
                    stage.name(),
                    StageError::MissingOutput(output),
                ));
            }
        }

        self.enter(state, RunPhase::Naming);
        let spec = self.planner.spec();
        let final_file = plan
            .final_file()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                RunnerError::stage_failed(
                    iteration,
                    "Naming",
                    StageError::MissingOutput(self.workspace.path().to_path_buf()),
                )
            })?;
        let target = unique_path(&spec.output_folder, spec.output_base_name.trim(), iteration);
        move_into_place(&final_file, &target).map_err(|e| {
            RunnerError::stage_failed(
                iteration,
                "Naming",
                StageError::io_error("moving output into place", e),
            )
        })?;

        Ok(target)
    }

    /// Record a phase transition and publish it.
    fn enter(&self, state: &mut RunState, phase: RunPhase) {
        let count = self.planner.spec().generate_count;
        let text = format!("Output {}/{}: {}", state.iteration, count, phase);
        tracing::info!("{}", text);

        state.phase = phase;
        state.status = text.clone();
        self.status.publish(text.clone());
        if let Some(ref callback) = self.progress {
            callback(state.iteration, &state.phase, &text);
        }
    }
}

fn phase_for(stage: &Stage, clip_count: usize) -> RunPhase {
    match stage {
        Stage::Concat { .. } => RunPhase::Concatenating,
        s if s.is_post_merge() => RunPhase::PostMerge,
        s => RunPhase::PerClipTransform {
            clip: s.clip().unwrap_or(1),
            count: clip_count,
        },
    }
}

/// Rename into the output folder, copying when the rename crosses devices.
fn move_into_place(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_tracing;
    use crate::media::{ProbeResult, ToolCommand, ToolError, ToolOutput};
    use crate::models::{SegmentMode, SoundEffectPolicy};
    use crate::planner::PlanError;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tempfile::{tempdir, TempDir};

    /// Creates the file named by the last argument; fails on call `fail_on`.
    #[derive(Default)]
    struct FakeEncoder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
        gate: Mutex<()>,
    }

    impl CommandRunner for FakeEncoder {
        fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
            let _gate = self.gate.lock();
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.fail_on {
                return Ok(ToolOutput {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "Error while filtering".to_string(),
                });
            }
            if let Some(out) = command.args.last() {
                fs::write(out, b"video").unwrap();
            }
            Ok(ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    struct NoProbe;

    impl MediaProbe for NoProbe {
        fn duration(&self, _path: &Path) -> ProbeResult<f64> {
            Ok(40.0)
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(clips: usize) -> Self {
            init_test_tracing();
            let dir = tempdir().unwrap();
            fs::create_dir(dir.path().join("clips")).unwrap();
            for i in 1..=clips {
                fs::write(dir.path().join("clips").join(format!("c{}.mp4", i)), b"x").unwrap();
            }
            Self { dir }
        }

        fn out(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        fn spec(&self, count: usize) -> JobSpec {
            let clips = fs::read_dir(self.dir.path().join("clips"))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            JobSpec::new(self.dir.path().join("clips"), clips, self.out())
                .with_segments(SegmentMode::Manual {
                    duration: 5.0,
                    count,
                })
        }

        fn runner(&self, encoder: Arc<FakeEncoder>, settings: Settings) -> JobRunner {
            JobRunner::new(settings, encoder, Arc::new(NoProbe))
                .with_logs_dir(self.dir.path().join("logs"))
        }
    }

    #[test]
    fn failure_on_second_output_keeps_others_and_cleans_temp() {
        let fx = Fixture::new(3);
        // Normal mode, 3 clips: 3 trims + concat per output; call 5 is output 2's first trim.
        let encoder = Arc::new(FakeEncoder {
            fail_on: Some(5),
            ..Default::default()
        });
        let runner = fx.runner(encoder.clone(), Settings::default());

        let report = runner
            .run_blocking(fx.spec(3).with_generate_count(3), RunOptions::default().with_seed(1))
            .unwrap();

        assert!(fx.out().join("mix-1.mp4").exists());
        assert!(!fx.out().join("mix-2.mp4").exists());
        assert!(fx.out().join("mix-3.mp4").exists());
        assert!(!fx.out().join("temp").exists());
        assert_eq!(report.outputs.len(), 3);
        assert_eq!(report.failures(), 1);
        assert!(matches!(
            &report.outputs[1],
            OutputOutcome::Failed { iteration: 2, stage, message }
                if stage == "TrimScalePad" && message.contains("Error while filtering")
        ));
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 9);
        assert!(!runner.is_running());
    }

    #[test]
    fn stop_on_error_skips_remaining_outputs() {
        let fx = Fixture::new(3);
        let encoder = Arc::new(FakeEncoder {
            fail_on: Some(8),
            ..Default::default()
        });
        let mut settings = Settings::default();
        settings.mix.continue_on_error = false;
        let runner = fx.runner(encoder.clone(), settings);

        let report = runner
            .run_blocking(fx.spec(3).with_generate_count(3), RunOptions::default())
            .unwrap();

        assert!(fx.out().join("mix-1.mp4").exists());
        assert!(!fx.out().join("mix-2.mp4").exists());
        assert!(!fx.out().join("mix-3.mp4").exists());
        assert_eq!(report.outputs.len(), 2);
        assert!(matches!(
            &report.outputs[1],
            OutputOutcome::Failed { stage, .. } if stage == "Concat"
        ));
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 8);
        assert!(!fx.out().join("temp").exists());
    }

    #[test]
    fn existing_temp_folder_is_not_touched() {
        let fx = Fixture::new(3);
        let user_temp = fx.out().join("temp");
        fs::create_dir_all(&user_temp).unwrap();
        fs::write(user_temp.join("my_notes.txt"), b"notes").unwrap();
        let encoder = Arc::new(FakeEncoder::default());
        let runner = fx.runner(encoder.clone(), Settings::default());

        let err = runner
            .run_blocking(fx.spec(3), RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, RunnerError::Setup { .. }));
        assert!(user_temp.join("my_notes.txt").exists());
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
        assert!(!runner.is_running());
    }

    #[test]
    fn insufficient_clips_creates_no_temp_dir() {
        let fx = Fixture::new(8);
        let runner = fx.runner(Arc::new(FakeEncoder::default()), Settings::default());

        let err = runner
            .run_blocking(fx.spec(10), RunOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Plan(PlanError::InsufficientClips { .. })
        ));
        assert!(!fx.out().join("temp").exists());
        assert!(!runner.is_running());
    }

    #[test]
    fn second_start_while_running_is_rejected() {
        let fx = Fixture::new(3);
        let encoder = Arc::new(FakeEncoder::default());
        let runner = fx.runner(encoder.clone(), Settings::default());

        let gate = encoder.gate.lock();
        let handle = runner.start(fx.spec(3), RunOptions::default()).unwrap();
        assert!(runner.is_running());
        assert!(matches!(
            runner.start(fx.spec(3), RunOptions::default()),
            Err(RunnerError::AlreadyRunning)
        ));
        drop(gate);

        let report = handle.join().unwrap();
        assert!(report.is_success());
        assert!(!runner.is_running());
        assert!(runner.start(fx.spec(3), RunOptions::default()).unwrap().join().is_ok());
        assert!(fx.out().join("mix-1-1.mp4").exists());
    }

    #[test]
    fn publishes_phases_in_order() {
        let fx = Fixture::new(2);
        let runner = fx.runner(Arc::new(FakeEncoder::default()), Settings::default());
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);

        let report = runner
            .run_blocking(
                fx.spec(2),
                RunOptions::default().with_progress(Box::new(move |_: usize, phase: &RunPhase, _: &str| {
                    sink.lock().push(phase.clone());
                })),
            )
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            *phases.lock(),
            vec![
                RunPhase::Sampling,
                RunPhase::PerClipTransform { clip: 1, count: 2 },
                RunPhase::PerClipTransform { clip: 2, count: 2 },
                RunPhase::Concatenating,
                RunPhase::Naming,
                RunPhase::Done,
            ]
        );
        assert!(runner.status().current().starts_with("Finished: 1 of 1"));
    }

    #[test]
    fn whole_video_effect_runs_after_concat() {
        let fx = Fixture::new(2);
        let effect = fx.dir.path().join("pop.wav");
        fs::write(&effect, b"x").unwrap();
        let encoder = Arc::new(FakeEncoder::default());
        let runner = fx.runner(encoder.clone(), Settings::default());

        let report = runner
            .run_blocking(
                fx.spec(2)
                    .with_sound_effect(SoundEffectPolicy::WholeVideoStart(effect))
                    .with_base_name("fx"),
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(report.artifacts(), vec![&fx.out().join("fx-1.mp4")]);
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 4);
    }
}
