//! LLRCal CLI - FFT length calibration for LLR.
//!
//! `generate` probes an LLR binary to build a calibration table (FFT length to
//! maximum exponent) plus a test input bracketing every transition.
//! `adjust` prints a calibration table converted to a specific multiplier.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use llrcal_core::config::{files, probe as probe_config, search};
use llrcal_core::{
    format_fftlen, read_table, render_adjusted, CachingProbe, CalibrationConfig,
    CalibrationRecord, CalibrationSink, Calibrator, FftLen, LengthModel, LlrProbe, Probe,
    StopAt, TableWriter, TestCase,
};
use log::LevelFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI arguments structure.
#[derive(Parser)]
#[command(name = "llrcal", version, about = "FFT length calibration for LLR k*2^n-1 tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase output verbosity (debug logging, progress spinner off).
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Probe LLR to generate a calibration table and LLR test input.
    Generate(GenerateArgs),
    /// Print maximum n per FFT length adjusted for a given k.
    Adjust {
        /// Multiplier k.
        k: u64,
        /// Calibration table to read.
        #[arg(long, default_value = files::TABLE)]
        table: PathBuf,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("ceiling").required(true).args(["max_n", "fftlen"])))]
struct GenerateArgs {
    /// Multiplier k used for probing.
    #[arg(short, default_value_t = search::DEFAULT_K)]
    k: u64,

    /// Start from this n instead of the model's estimate.
    #[arg(short = 'm', long = "min-n")]
    min_n: Option<u64>,

    /// Stop once the exponent cursor passes this n.
    #[arg(short = 'n', long = "max-n")]
    max_n: Option<u64>,

    /// Stop once the FFT length passes this value (e.g. 512K, 2M).
    #[arg(short = 'f', long)]
    fftlen: Option<FftLen>,

    /// LLR executable.
    #[arg(long, default_value = probe_config::DEFAULT_PROGRAM)]
    llr: PathBuf,

    /// Time budget per LLR invocation in milliseconds.
    #[arg(long, default_value_t = probe_config::DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Working directory passed to LLR (default: a fresh temporary directory).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Calibration table to write.
    #[arg(long, default_value = files::NEW_TABLE)]
    table: PathBuf,

    /// LLR test input to write.
    #[arg(long, default_value = files::NEW_TEST_INPUT)]
    tests: PathBuf,

    /// Re-run LLR for exponents that were already probed.
    #[arg(long)]
    no_cache: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Generate(args) => run_generate(&args, cli.verbose),
        Commands::Adjust { k, table } => run_adjust(k, &table),
    }
}

/// Streams calibration output to the files and keeps the spinner current.
struct ConsoleSink<T: Write, C: Write> {
    writer: TableWriter<T, C>,
    spinner: ProgressBar,
}

impl<T: Write, C: Write> CalibrationSink for ConsoleSink<T, C> {
    fn on_probe(&mut self, n: u64, fftlen: Option<u64>) {
        let fft = fftlen.map_or_else(|| "?".to_string(), format_fftlen);
        self.spinner.set_message(format!("n={} FFT={}", n, fft));
        self.spinner.inc(1);
    }

    fn on_test_case(&mut self, case: &TestCase) -> std::io::Result<()> {
        self.writer.on_test_case(case)
    }

    fn on_record(&mut self, record: &CalibrationRecord) -> std::io::Result<()> {
        self.writer.on_record(record)?;
        self.spinner
            .suspend(|| println!("FFT={} done.", format_fftlen(record.fftlen)));
        Ok(())
    }
}

/// Probes LLR across the configured range and writes the table and test input.
///
/// Everything that can be rejected up front (k, the ceiling, an unresolvable
/// minimum n) is checked before either output file is created.
fn run_generate(args: &GenerateArgs, verbose: bool) -> Result<()> {
    let stop = match (args.max_n, args.fftlen) {
        (Some(n), None) => StopAt::Exponent(n),
        (None, Some(len)) => StopAt::FftLen(len.get()),
        _ => bail!("exactly one of --max-n and --fftlen is required"),
    };
    let mut config = CalibrationConfig::new(args.k, stop);
    if let Some(n) = args.min_n {
        config = config.with_min_n(n);
    }

    let timeout = Duration::from_millis(args.timeout_ms);
    let llr = match &args.workdir {
        Some(dir) => LlrProbe::in_workdir(&args.llr, dir),
        None => LlrProbe::new(&args.llr).context("failed to set up LLR probe")?,
    }
    .with_timeout(timeout);

    println!("--- Execution Configuration ---");
    println!("LLRCal v{}", VERSION);
    println!("LLR: {} (workdir {})", llr.program().display(), llr.workdir().display());
    println!("Probe timeout: {}", format_duration(timeout));
    println!("k={}", args.k);
    match stop {
        StopAt::Exponent(n) => println!("Stop: n > {}", n),
        StopAt::FftLen(len) => println!("Stop: FFT length > {}", format_fftlen(len)),
    }

    let probe: Box<dyn Probe> = if args.no_cache {
        Box::new(llr)
    } else {
        Box::new(CachingProbe::new(llr))
    };
    let mut calibrator = Calibrator::new(probe, config).context("invalid calibration settings")?;

    let (start_n, start_fftlen) = calibrator
        .resolve_start()
        .context("failed to resolve the starting exponent")?;
    if args.min_n.is_some() {
        println!("Start: n={} (FFT length {})", start_n, format_fftlen(start_fftlen));
    } else {
        println!("Start: n={} (model estimate)", start_n);
    }
    println!();

    let table = create(&args.table)?;
    let tests = create(&args.tests)?;
    let spinner = if verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} [{elapsed_precise}] {pos} probes, {msg}")
                .context("invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    let mut sink = ConsoleSink {
        writer: TableWriter::new(table, tests)
            .with_context(|| format!("failed to write {}", args.tests.display()))?,
        spinner,
    };

    println!("--- Starting Calibration ---");
    let start = Instant::now();
    let result = calibrator.run(&mut sink);
    sink.spinner.finish_and_clear();
    let result = result.context("calibration failed")?;
    let duration = start.elapsed();

    println!();
    println!("--- Calibration Complete ---");
    println!(
        "Recorded {} FFT lengths in {}.",
        result.records.len(),
        format_duration(duration)
    );
    println!(
        "Probes: {} ({} stalled boundary searches)",
        result.probes, result.stalls
    );
    println!("Table: {}", args.table.display());
    println!("Test input: {} ({} cases)", args.tests.display(), result.test_cases.len());

    Ok(())
}

/// Prints the calibration table in `table` adjusted for multiplier `k`.
fn run_adjust(k: u64, table: &Path) -> Result<()> {
    let model = LengthModel::new(k).context("invalid multiplier")?;
    let file =
        File::open(table).with_context(|| format!("failed to open {}", table.display()))?;
    let entries = read_table(BufReader::new(file))
        .with_context(|| format!("failed to read {}", table.display()))?;
    print!("{}", render_adjusted(&model, &entries));
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Formats a duration into a human-readable string (ms or s).
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
