use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _};
use clap::{Parser, Subcommand, ValueEnum};

use clipmix_core::config::{ConfigManager, ConfigSection};
use clipmix_core::logging::{init_tracing, LogLevel};
use clipmix_core::media::{format_duration_label, FfprobeProbe, SystemRunner};
use clipmix_core::models::{
    AudioMode, BackgroundMusicPolicy, JobSpec, MusicTiming, SoundEffectPolicy, SourceLibrary,
};
use clipmix_core::music::MusicPoolRegistry;
use clipmix_core::planner::{format_total, parse_auto, parse_generate_count, parse_manual, Segmentation};
use clipmix_core::runner::{JobRunner, OutputOutcome, RunOptions, RunPhase};

#[derive(Parser, Debug)]
#[command(name = "clipmix", version, about = "Build mixed short-form videos from a folder of clips")]
struct Cli {
    /// Settings file (created with defaults if missing).
    #[arg(long, global = true, default_value = "clipmix.toml")]
    config: PathBuf,

    /// Debug-level diagnostics.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the clips in a source folder.
    Scan(ScanArgs),
    /// Generate mixed videos.
    Run(RunArgs),
    /// Manage background-music pools.
    #[command(subcommand)]
    Pool(PoolCommand),
}

#[derive(Parser, Debug)]
struct ScanArgs {
    /// Source folder (defaults to the last used one).
    folder: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Source folder (defaults to the last used one).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output folder (defaults to the last used one).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Clip filenames to sample from (defaults to every clip in the folder).
    #[arg(long, value_delimiter = ',')]
    clips: Vec<String>,

    /// Seconds taken from each clip.
    #[arg(long, conflicts_with = "target")]
    duration: Option<String>,

    /// Clips per output.
    #[arg(long, conflicts_with = "target")]
    count: Option<String>,

    /// Target length of each output; count and duration are derived.
    #[arg(long)]
    target: Option<String>,

    /// Number of outputs to generate.
    #[arg(long, default_value = "1")]
    generate: String,

    /// Base name of generated files.
    #[arg(long, default_value = "mix")]
    name: String,

    /// Clip audio: normal, voice-only or silent.
    #[arg(long, default_value = "normal")]
    audio: AudioMode,

    /// Sound effect file (defaults to the last used one when --effect-mode is set).
    #[arg(long)]
    effect: Option<PathBuf>,

    /// Where the sound effect is mixed in.
    #[arg(long, value_enum)]
    effect_mode: Option<EffectMode>,

    /// Background music timing: follow-video or follow-music.
    #[arg(long)]
    music: Option<MusicTiming>,

    /// Music pool to draw from (defaults to the last used pool).
    #[arg(long)]
    pool: Option<String>,

    /// Restrict the draw to these tracks of the pool.
    #[arg(long = "track", value_delimiter = ',')]
    tracks: Vec<String>,

    /// Fixed sampling seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EffectMode {
    PerClip,
    WholeVideo,
}

#[derive(Subcommand, Debug)]
enum PoolCommand {
    /// Register a folder of tracks under a name.
    Add { name: String, folder: PathBuf },
    /// Forget a pool.
    Remove { name: String },
    /// List pools, or the tracks of one pool with their durations.
    List { name: Option<String> },
    /// Re-read a pool folder and its track durations.
    Reload { name: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("load settings '{}'", cli.config.display()))?;
    tracing::debug!("Using settings from {}", config.path().display());

    match cli.cmd {
        Command::Scan(args) => cmd_scan(&mut config, args),
        Command::Run(args) => cmd_run(&mut config, args),
        Command::Pool(cmd) => cmd_pool(&mut config, cmd),
    }
}

fn cmd_scan(config: &mut ConfigManager, args: ScanArgs) -> anyhow::Result<()> {
    let folder = args
        .folder
        .or_else(|| non_empty_path(&config.settings().paths.input_folder))
        .ok_or_else(|| anyhow!("no source folder given and none remembered"))?;

    let library = SourceLibrary::scan(&folder)
        .with_context(|| format!("scan '{}'", folder.display()))?;
    for clip in library.clips() {
        println!("{}", clip);
    }
    eprintln!("{} clip(s) in {}", library.len(), folder.display());

    config.settings_mut().paths.input_folder = folder.to_string_lossy().to_string();
    config.update_section(ConfigSection::Paths)?;
    Ok(())
}

fn cmd_run(config: &mut ConfigManager, args: RunArgs) -> anyhow::Result<()> {
    let settings = config.settings().clone();

    let input = args
        .input
        .clone()
        .or_else(|| non_empty_path(&settings.paths.input_folder))
        .ok_or_else(|| anyhow!("--input is required"))?;
    let output = args
        .output
        .clone()
        .or_else(|| non_empty_path(&settings.paths.output_folder))
        .ok_or_else(|| anyhow!("--output is required"))?;

    let clips = if args.clips.is_empty() {
        SourceLibrary::scan(&input)
            .with_context(|| format!("scan '{}'", input.display()))?
            .clips()
            .to_vec()
    } else {
        args.clips.clone()
    };

    let segments = match (&args.target, &args.duration, &args.count) {
        (Some(target), _, _) => parse_auto(target)?,
        (None, duration, count) => {
            let default_duration = settings.mix.default_segment_seconds.to_string();
            parse_manual(
                duration.as_deref().unwrap_or(&default_duration),
                count.as_deref().unwrap_or("10"),
            )?
        }
    };
    let resolved = Segmentation::resolve(&segments, settings.mix.default_segment_seconds)?;
    eprintln!(
        "{} clips x {}s = {}",
        resolved.count,
        resolved.duration_label(),
        format_total(resolved.total_seconds())
    );

    let effect_path = args
        .effect
        .clone()
        .or_else(|| non_empty_path(&settings.mix.sound_effect_path));
    let sound_effect = match (args.effect_mode, effect_path.clone()) {
        (None, _) => SoundEffectPolicy::None,
        (Some(_), None) => bail!("--effect-mode needs --effect"),
        (Some(EffectMode::PerClip), Some(path)) => SoundEffectPolicy::PerClip(path),
        (Some(EffectMode::WholeVideo), Some(path)) => SoundEffectPolicy::WholeVideoStart(path),
    };

    let commands = Arc::new(SystemRunner::new().with_timeout_secs(settings.tools.timeout_secs));
    let probe = Arc::new(FfprobeProbe::new(settings.tools.ffprobe.clone(), commands));
    let mut pools = MusicPoolRegistry::from_settings(
        &settings.music_pools,
        &settings.mix.last_pool,
        probe,
    );

    let background_music = match args.music {
        None => BackgroundMusicPolicy::Off,
        Some(timing) => {
            if let Some(ref pool) = args.pool {
                pools.set_active(pool)?;
            }
            let active = pools
                .active()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("--music needs --pool (no pool remembered)"))?;
            for track in &args.tracks {
                pools.select_track(&active, track, true)?;
            }
            BackgroundMusicPolicy::On {
                timing,
                tracks: pools.eligible_tracks()?,
            }
        }
    };

    let spec = JobSpec::new(&input, clips, &output)
        .with_segments(segments)
        .with_generate_count(parse_generate_count(&args.generate)?)
        .with_base_name(args.name.clone())
        .with_audio_mode(args.audio)
        .with_sound_effect(sound_effect)
        .with_background_music(background_music);

    // Remember what was used before the job runs.
    {
        let s = config.settings_mut();
        s.paths.input_folder = input.to_string_lossy().to_string();
        s.paths.output_folder = output.to_string_lossy().to_string();
        if let Some(ref path) = effect_path {
            s.mix.sound_effect_path = path.to_string_lossy().to_string();
        }
        s.mix.background_music_enabled = args.music.is_some();
        if let Some(active) = pools.active() {
            s.mix.last_pool = active.to_string();
        }
    }
    config.update_section(ConfigSection::Paths)?;
    config.update_section(ConfigSection::Mix)?;

    let runner = JobRunner::from_settings(settings).with_logs_dir(config.logs_folder());
    let mut options = RunOptions::default().with_progress(Box::new(
        |_: usize, _: &RunPhase, text: &str| eprintln!("{}", text),
    ));
    options.seed = args.seed;

    let report = runner
        .start(spec, options)?
        .join()
        .map_err(|_| anyhow!("job worker panicked"))?;

    for outcome in &report.outputs {
        match outcome {
            OutputOutcome::Finalized { path, .. } => println!("{}", path.display()),
            OutputOutcome::Failed {
                iteration,
                stage,
                message,
            } => eprintln!("output {} failed at {}: {}", iteration, stage, message),
        }
    }

    if !report.is_success() {
        bail!(
            "{} of {} output(s) written",
            report.artifacts().len(),
            report.requested
        );
    }
    Ok(())
}

fn cmd_pool(config: &mut ConfigManager, cmd: PoolCommand) -> anyhow::Result<()> {
    let settings = config.settings().clone();
    let probe = Arc::new(FfprobeProbe::new(
        settings.tools.ffprobe.clone(),
        Arc::new(SystemRunner::new().with_timeout_secs(settings.tools.timeout_secs)),
    ));
    let mut pools =
        MusicPoolRegistry::from_settings(&settings.music_pools, &settings.mix.last_pool, probe);

    match cmd {
        PoolCommand::Add { name, folder } => {
            pools.add_pool(&name, &folder)?;
            save_pools(config, &pools)?;
            eprintln!("added pool '{}'", name.trim());
        }
        PoolCommand::Remove { name } => {
            pools.remove_pool(&name)?;
            save_pools(config, &pools)?;
            if config.settings().mix.last_pool == name {
                config.settings_mut().mix.last_pool.clear();
                config.update_section(ConfigSection::Mix)?;
            }
            eprintln!("removed pool '{}'", name);
        }
        PoolCommand::List { name: None } => {
            for name in pools.pool_names() {
                let folder = pools.folder_of(&name).map(Path::display);
                match folder {
                    Some(folder) => println!("{}\t{}", name, folder),
                    None => println!("{}", name),
                }
            }
        }
        PoolCommand::List { name: Some(name) } => list_tracks(&mut pools, &name)?,
        PoolCommand::Reload { name } => {
            pools.reload_pool(&name)?;
            list_tracks(&mut pools, &name)?;
        }
    }
    Ok(())
}

fn list_tracks(pools: &mut MusicPoolRegistry, name: &str) -> anyhow::Result<()> {
    for track in pools.list_tracks(name)? {
        println!("{}\t{}", format_duration_label(track.duration), track.filename);
    }
    Ok(())
}

fn save_pools(config: &mut ConfigManager, pools: &MusicPoolRegistry) -> anyhow::Result<()> {
    config.settings_mut().music_pools = pools.to_settings();
    config.update_section(ConfigSection::MusicPools)?;
    Ok(())
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.trim().is_empty()).then(|| PathBuf::from(value))
}
