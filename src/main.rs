use clap::{Args, Parser, Subcommand, ValueEnum};
use log::Level;
use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;

use venom::config::{Config, ConfigLoader, DetailsLevel, OutputFormat};
use venom::report::{SummaryFormatter, write_report};
use venom::{RunnerBuilder, Tests};

/// Exit code when every case passed.
const EXIT_OK: i32 = 0;
/// Exit code for configuration, discovery or reporting errors.
const EXIT_ERROR: i32 = 1;
/// Exit code when at least one case failed or errored.
const EXIT_FAILURES: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "venom", version, about = "Run declarative YAML integration test suites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run test suites and write a report
    Run(RunArgs),
    /// Parse test suites and their assertions without running anything
    Check(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Suite files, directories or glob patterns
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Configuration file (defaults to ./venom.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pattern used to expand directories
    #[arg(long)]
    glob: Option<String>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of suites run at the same time
    #[arg(long, short)]
    parallel: Option<usize>,

    /// Report format
    #[arg(long, short)]
    format: Option<FormatArg>,

    /// Directory receiving report files (stdout when unset)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Progress detail level
    #[arg(long)]
    details: Option<DetailsArg>,

    /// Command alias, written alias:real-command (repeatable)
    #[arg(long)]
    alias: Vec<String>,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum FormatArg {
    Json,
    Yaml,
    Xml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
            FormatArg::Xml => OutputFormat::Xml,
        }
    }
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum DetailsArg {
    Low,
    Medium,
    High,
}

impl From<DetailsArg> for DetailsLevel {
    fn from(arg: DetailsArg) -> Self {
        match arg {
            DetailsArg::Low => DetailsLevel::Low,
            DetailsArg::Medium => DetailsLevel::Medium,
            DetailsArg::High => DetailsLevel::High,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Check(args) => check_command(args),
    };

    match code {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            exit(EXIT_ERROR);
        }
    }
}

/// Defaults, then the config file, then `VENOM_*`, then the common flags.
fn load_config(args: &CommonArgs) -> venom::Result<Config> {
    let mut loader = ConfigLoader::new().working_dir(".");
    if let Some(ref path) = args.config {
        loader = loader.config_file(path);
    }
    let mut config = loader.load()?;

    if let Some(ref glob) = args.glob {
        config.run.glob = glob.clone();
    }
    if let Some(ref level) = args.log_level {
        config.run.log_level = level.clone();
    }

    init_logger(&config.run.log_level);
    for (key, value) in venom::config::env::detect_active_overrides() {
        log::debug!("env override {key}={value}");
    }
    Ok(config)
}

fn init_logger(level: &str) {
    let level = Level::from_str(level).unwrap_or_else(|_| {
        eprintln!("warning: unknown log level {level:?}, using warn");
        Level::Warn
    });
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("warning: cannot initialize logging: {e}");
    }
}

fn run_command(args: RunArgs) -> venom::Result<i32> {
    let mut config = load_config(&args.common)?;

    if let Some(parallel) = args.parallel {
        config.run.parallel = parallel;
    }
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = Some(dir);
    }
    if let Some(details) = args.details {
        config.run.details = details.into();
    }
    if !args.alias.is_empty() {
        config.run.alias = args.alias;
    }

    let format = config.output.format;
    let output_dir = config.output.dir.clone();
    let details = config.run.details;

    let tests: Tests = RunnerBuilder::new()
        .with_config(config)
        .paths(args.common.paths)
        .progress_from_config()
        .run()?;

    write_report(&tests, format, output_dir.as_deref())?;
    SummaryFormatter::new(details).print(&tests);

    Ok(if tests.is_success() {
        EXIT_OK
    } else {
        EXIT_FAILURES
    })
}

fn check_command(args: CommonArgs) -> venom::Result<i32> {
    let config = load_config(&args)?;
    let runner = RunnerBuilder::new()
        .with_config(config)
        .paths(args.paths)
        .build()?;

    let problems = runner.check()?;
    for problem in &problems {
        println!("{problem}");
    }

    if problems.is_empty() {
        eprintln!("no problems found");
        Ok(EXIT_OK)
    } else {
        eprintln!("{} problem(s) found", problems.len());
        Ok(EXIT_ERROR)
    }
}
