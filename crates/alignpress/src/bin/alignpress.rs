//! alignpress CLI: headless alignment runs, calibration and preset composition.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alignpress::aruco::DictionarySet;
use alignpress::core::{init_with_level, level_from_verbosity, AlignmentStatus, CalibrationResult};
use alignpress::detect::{
    chessboard_mm_per_px, marker_mm_per_px, ChessboardTarget, DetectorRegistry, MarkerTarget,
};
use alignpress::preset::LogoTask;
use alignpress::vision::{NativeVision, PatternSize};
use alignpress::{
    load_gray, plan_session, AppConfig, FrameAnalysis, ImageSequenceSource, JobCard, JobLogoRecord,
    ResultLogger, SessionContext, SessionPlan, SessionRunner,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "alignpress")]
#[command(about = "Check heat-press logo placement against composed presets")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Explicit log level; overrides --verbose.
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Emit JSON log lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless session over the configured dataset.
    Run(RunArgs),

    /// Derive a mm-per-pixel calibration from a reference image.
    Calibrate(CalibrateArgs),

    /// Compose presets from the configured platen/style/variant and write them as JSON.
    Compose {
        #[arg(long)]
        config: PathBuf,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    #[arg(long)]
    config: PathBuf,

    /// Stop each logo's session after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Only align this logo id.
    #[arg(long)]
    logo: Option<String>,

    /// Write a job card into this directory.
    #[arg(long)]
    job_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Reference image.
    #[arg(long)]
    image: Option<PathBuf>,

    #[arg(long, value_enum)]
    method: CalibrationMethodArg,

    /// Chessboard inner corners as COLSxROWS.
    #[arg(long, default_value = "7x5", value_parser = parse_pattern)]
    pattern: PatternSize,

    /// Chessboard square side in mm.
    #[arg(long, default_value_t = 25.0)]
    square_mm: f64,

    /// Marker side in mm.
    #[arg(long, default_value_t = 50.0)]
    marker_mm: f64,

    /// Marker dictionary name.
    #[arg(long, default_value = "DICT_5X5_50")]
    dictionary: String,

    /// Marker dictionary documents to load.
    #[arg(long = "dictionary-file")]
    dictionary_files: Vec<PathBuf>,

    /// Known factor for `--method constant`.
    #[arg(long)]
    mm_per_px: Option<f64>,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CalibrationMethodArg {
    Chessboard,
    Marker,
    Constant,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Off => LevelFilter::Off,
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_pattern(raw: &str) -> Result<PatternSize, String> {
    let (cols, rows) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected COLSxROWS, got {raw:?}"))?;
    let cols: usize = cols.trim().parse().map_err(|e| format!("bad column count: {e}"))?;
    let rows: usize = rows.trim().parse().map_err(|e| format!("bad row count: {e}"))?;
    if cols == 0 || rows == 0 {
        return Err("pattern dimensions must be positive".into());
    }
    Ok(PatternSize::new(cols, rows))
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    if cli.log_json || std::env::var_os("RUST_LOG").is_some() {
        let _ = tracing_log::LogTracer::init();
        alignpress::core::init_tracing(cli.log_json);
        return Ok(());
    }
    #[cfg(not(feature = "tracing"))]
    if cli.log_json {
        eprintln!("--log-json needs the `tracing` feature; using plain logs");
    }
    let level = cli
        .log_level
        .map(LevelFilter::from)
        .unwrap_or_else(|| level_from_verbosity(cli.verbose));
    init_with_level(level)?;
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Run(args) => run_session(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Compose { config, out } => run_compose(&config, out.as_deref()),
    }
}

// ── run ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    ok: usize,
    out_of_tolerance: usize,
    not_found: usize,
}

impl Tally {
    fn of(analyses: &[FrameAnalysis]) -> Self {
        let mut t = Tally::default();
        for a in analyses {
            match a.evaluation.status {
                AlignmentStatus::Ok => t.ok += 1,
                AlignmentStatus::OutOfTolerance => t.out_of_tolerance += 1,
                AlignmentStatus::NotFound => t.not_found += 1,
            }
        }
        t
    }
}

fn selected_tasks<'a>(plan: &'a SessionPlan, logo: Option<&str>) -> CliResult<Vec<&'a LogoTask>> {
    Ok(match logo {
        Some(id) => vec![plan.task(id)?],
        None => plan.tasks.iter().collect(),
    })
}

fn run_session(args: &RunArgs) -> CliResult<()> {
    let now = Utc::now();
    let config = AppConfig::load(&args.config)?;
    let plan = plan_session(&config, now)?;
    let vision = NativeVision::new(config.load_dictionaries()?);
    let registry = Arc::new(DetectorRegistry::with_builtins(Arc::new(vision)));
    let session_id = now.format("session_%Y%m%d_%H%M%S").to_string();
    let dataset = config.dataset.path.display().to_string();

    let tasks = selected_tasks(&plan, args.logo.as_deref())?;
    let mut last: BTreeMap<String, (String, FrameAnalysis)> = BTreeMap::new();
    for task in &tasks {
        let aligner = alignpress::Aligner::new(
            task.preset.clone(),
            plan.calibration.clone(),
            registry.clone(),
        )?;
        let output_dir = if tasks.len() == 1 {
            config.logging.output_dir.clone()
        } else {
            config.logging.output_dir.join(&task.logo_id)
        };
        let mut sink = ResultLogger::new(output_dir, &config.logging.formats);
        let source = ImageSequenceSource::open(
            &config.dataset.path,
            config.dataset.fps,
            config.dataset.looping,
        )?;
        let context = SessionContext {
            session_id: session_id.clone(),
            preset_name: task.preset.name.clone(),
            dataset_path: dataset.clone(),
        };
        let analyses = SessionRunner::new(&aligner, context)
            .with_max_frames(args.max_frames)
            .run(source, &mut sink)?;

        let tally = Tally::of(&analyses);
        println!(
            "{}: {} frames, {} ok, {} out of tolerance, {} not found",
            task.logo_id,
            analyses.len(),
            tally.ok,
            tally.out_of_tolerance,
            tally.not_found
        );
        if let Some(a) = analyses.last() {
            last.insert(task.logo_id.clone(), (task.display_name.clone(), a.clone()));
        }
    }

    if let Some(job_dir) = &args.job_dir {
        let logos = tasks
            .iter()
            .map(|t| match last.get(&t.logo_id) {
                Some((name, a)) => JobLogoRecord::from_analysis(&t.logo_id, name, a),
                None => JobLogoRecord::missing(&t.logo_id, &t.display_name),
            })
            .collect();
        let (platen, style, version, variant) = match &plan.documents {
            Some(d) => (
                d.platen.name.clone(),
                d.style.name.clone(),
                d.style.version.clone(),
                d.variant.as_ref().map(|v| v.name.clone()).unwrap_or_default(),
            ),
            None => Default::default(),
        };
        let card = JobCard::create(now, platen, style, version, variant, dataset, logos);
        let path = card.save(job_dir)?;
        println!("job card written to {}", path.display());
    }
    Ok(())
}

// ── calibrate ──────────────────────────────────────────────────────────

fn require_image(args: &CalibrateArgs) -> CliResult<&Path> {
    args.image
        .as_deref()
        .ok_or_else(|| "--image is required for this method".into())
}

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let calibration = match args.method {
        CalibrationMethodArg::Constant => {
            let k = args.mm_per_px.ok_or("--mm-per-px is required for --method constant")?;
            CalibrationResult::constant(k)?
        }
        CalibrationMethodArg::Chessboard => {
            let image = load_gray(require_image(args)?)?;
            let target = ChessboardTarget {
                pattern_size: args.pattern,
                square_size_mm: args.square_mm,
            };
            chessboard_mm_per_px(&NativeVision::default(), &image.view(), &target)
                .ok_or("chessboard not found; calibration not derivable")?
        }
        CalibrationMethodArg::Marker => {
            let image = load_gray(require_image(args)?)?;
            let vision = NativeVision::new(DictionarySet::load_files(&args.dictionary_files)?);
            let target = MarkerTarget {
                marker_length_mm: args.marker_mm,
                dictionary: args.dictionary.clone(),
            };
            marker_mm_per_px(&vision, &image.view(), &target)
                .ok_or("no marker found; calibration not derivable")?
        }
    };
    calibration.write_json(&args.out)?;
    println!(
        "{:.6} mm/px ({:?}) written to {}",
        calibration.mm_per_px(),
        calibration.method(),
        args.out.display()
    );
    Ok(())
}

// ── compose ────────────────────────────────────────────────────────────

fn run_compose(config: &Path, out: Option<&Path>) -> CliResult<()> {
    let config = AppConfig::load(config)?;
    let plan = plan_session(&config, Utc::now())?;
    match out {
        Some(path) => {
            alignpress::core::io::write_json(path, &plan.tasks)?;
            println!("{} preset(s) written to {}", plan.tasks.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&plan.tasks)?),
    }
    Ok(())
}
