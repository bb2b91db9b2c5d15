use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::bail;
use itertools::Itertools;
use log::{info, warn};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use sat_arena_core::cnf::ParseMode;
use sat_arena_core::repository::{Corpus, FormulaRepository, InvalidPolicy};
use sat_arena_runner::adapter::SolverKind;
use sat_arena_runner::batch::BatchScheduler;
use sat_arena_runner::config::{BenchConfig, Drive, Role, DEFAULT_KILL_GRACE, DEFAULT_SWEEP};
use sat_arena_runner::histogram::Histogram;
use sat_arena_runner::report::{ResultsWriter, TimingPairs};

mod summary;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// Verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print statistics of CNF files.
    Stat(StatArgs),
    /// Compare solvers on a corpus of CNF files.
    Bench(BenchArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// CNF files or directories.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Do not descend into subdirectories.
    #[arg(long, action)]
    no_recursive: bool,

    /// File extensions to look for in directories.
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,
}

impl CorpusArgs {
    fn repository(&self, mode: ParseMode) -> FormulaRepository {
        let mut repo = FormulaRepository::new(mode).recursive(!self.no_recursive);
        if !self.extensions.is_empty() {
            repo = repo.extensions(self.extensions.iter().map(|e| e.trim_start_matches('.')));
        }
        repo
    }
}

#[derive(Args, Debug)]
struct StatArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Collect clause-level statistics.
    #[arg(long, action)]
    stats: bool,
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Solver under test.
    #[arg(long, value_name = "KIND")]
    optimized: Option<SolverKind>,

    /// Reference solver the optimized one is timed against.
    #[arg(long, value_name = "KIND")]
    baseline: Option<SolverKind>,

    /// Independent solver certifying the answers.
    #[arg(long, value_name = "KIND")]
    validator: Option<SolverKind>,

    /// Executable for the optimized solver.
    #[arg(long, value_name = "CMD")]
    optimized_cmd: Option<String>,

    /// Executable for the baseline solver.
    #[arg(long, value_name = "CMD")]
    baseline_cmd: Option<String>,

    /// Executable for the validator.
    #[arg(long, value_name = "CMD")]
    validator_cmd: Option<String>,

    /// Time limit in seconds (0 = unbounded). Repeat to run one batch per limit.
    #[arg(short = 't', long = "time-limit", value_name = "SECS")]
    time_limits: Vec<u64>,

    /// Maximum number of formulas in flight.
    #[arg(short = 'j', long, default_value_t = 1)]
    jobs: usize,

    /// Poll all running formulas instead of waiting for each in turn.
    #[arg(long, action)]
    poll: bool,

    /// Sleep between polling sweeps, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_SWEEP.as_millis() as u64)]
    sweep_ms: u64,

    /// Kill solvers still running this many seconds after the time limit (0 = never).
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_KILL_GRACE.as_secs())]
    kill_grace: u64,

    /// Benchmark invalid formulas too.
    #[arg(long, action)]
    keep_invalid: bool,

    /// Skip formulas with fewer clauses.
    #[arg(long, value_name = "INT")]
    min_clauses: Option<usize>,

    /// Skip formulas with more clauses.
    #[arg(long, value_name = "INT")]
    max_clauses: Option<usize>,

    /// Write (baseline, optimized) timing pairs here.
    #[arg(long = "plot-data", value_name = "FILE")]
    path_plot_data: Option<PathBuf>,

    /// Write a CSV line per formula here.
    #[arg(long = "results", value_name = "FILE")]
    path_results: Option<PathBuf>,
}

impl BenchArgs {
    fn config(&self) -> BenchConfig {
        let drive = if self.poll {
            Drive::Polling {
                sweep: Duration::from_millis(self.sweep_ms),
            }
        } else {
            Drive::Blocking
        };
        let kill_grace = (self.kill_grace > 0).then(|| Duration::from_secs(self.kill_grace));
        let mut config = BenchConfig::new()
            .with_max_concurrency(self.jobs)
            .with_drive(drive)
            .with_kill_grace(kill_grace);
        let roles = [
            (Role::Optimized, self.optimized, &self.optimized_cmd),
            (Role::Baseline, self.baseline, &self.baseline_cmd),
            (Role::Validator, self.validator, &self.validator_cmd),
        ];
        for (role, kind, cmd) in roles {
            if let Some(kind) = kind {
                config = config.with_solver(role, kind.adapter(), cmd.clone());
            }
        }
        config
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;
    info!("args = {:?}", args);

    match args.command {
        Command::Stat(args) => stat(args),
        Command::Bench(args) => bench(args),
    }
}

fn stat(args: StatArgs) -> color_eyre::Result<()> {
    let mode = if args.stats { ParseMode::Stats } else { ParseMode::Fast };
    let corpus = args
        .corpus
        .repository(mode)
        .invalid_policy(InvalidPolicy::Flag)
        .load(&args.corpus.paths);
    for formula in corpus.iter() {
        println!("{}", formula.report());
    }
    Ok(())
}

fn bench(args: BenchArgs) -> color_eyre::Result<()> {
    let config = args.config();
    if let Err(e) = config.validate() {
        bail!("Bad configuration: {}", e);
    }

    let (min_clauses, max_clauses) = (args.min_clauses, args.max_clauses);
    let policy = if args.keep_invalid {
        InvalidPolicy::Flag
    } else {
        InvalidPolicy::Exclude
    };
    let corpus = args
        .corpus
        .repository(ParseMode::Fast)
        .invalid_policy(policy)
        .with_filter(move |f| {
            min_clauses.map_or(true, |m| f.num_clauses() >= m) && max_clauses.map_or(true, |m| f.num_clauses() <= m)
        })
        .load(&args.corpus.paths);
    if corpus.is_empty() {
        warn!("No formulas to run");
    }

    let time_limits = if args.time_limits.is_empty() {
        vec![0]
    } else {
        args.time_limits.iter().copied().unique().collect_vec()
    };

    let mut results = match &args.path_results {
        Some(path) => Some(ResultsWriter::from_path(path)?),
        None => None,
    };
    let mut timings = TimingPairs::new();
    let mut histogram = Histogram::default();

    for &time_limit in time_limits.iter() {
        let batch = Corpus::from_formulas(corpus.formulas.clone());
        let scheduler = BatchScheduler::new(batch, config.clone().with_time_limit(time_limit))?;
        let mut write_error = None;
        let summary = scheduler.run(|record| {
            println!(
                "[{}/{}] {} {}",
                record.index(),
                record.total(),
                record,
                record.formula().abs_path().display()
            );
            timings.record(record);
            if let Some(wrt) = results.as_mut() {
                if let Err(e) = wrt.write(record) {
                    write_error.get_or_insert(e);
                }
            }
        });
        if let Some(e) = write_error {
            return Err(e.into());
        }
        histogram.merge(&summary.histogram);
    }

    if let Some(wrt) = results.as_mut() {
        wrt.flush()?;
    }
    if let Some(path) = &args.path_plot_data {
        timings.write_to_path(path)?;
        let (optimized, baseline) = timings.wins();
        info!(
            "Wrote {} timing pairs to '{}' (optimized faster on {}, baseline faster on {})",
            timings.len(),
            path.display(),
            optimized,
            baseline
        );
    }

    println!("{}", summary::render(&histogram));
    Ok(())
}
