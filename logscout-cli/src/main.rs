use clap::{Parser, Subcommand};
use colored::Colorize;
use logscout::{
    config::{EncodingMode, ScanConfig},
    parse_request_line,
    request::parse_request_fields,
    scan, RunReport, ScanRequest, SearchError,
};
use std::{
    io::{self, BufRead, Write},
    num::NonZeroUsize,
    path::PathBuf,
    process::ExitCode,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

const REQUEST_FORMAT: &str = "<threads>; <search text>; <input dir>; <output file>; <ext> <ext> ...";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file layered over the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliScanConfig {
    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Text to look for, matched case-insensitively
    #[arg(short = 'p', long = "pattern")]
    pattern: Option<String>,

    /// Directory to scan
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// File the matching lines are appended to
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// File extensions to include (e.g. log,txt)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// How file bytes are decoded (latin1|utf8)
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// Longest line, in bytes, before a file is skipped
    #[arg(long)]
    max_line_bytes: Option<usize>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_links: bool,

    /// Stop starting new files after this long (e.g. 30s, 2m)
    #[arg(long)]
    timeout: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree once
    Scan(Box<CliScanConfig>),

    /// Read request lines from stdin until `exit`
    Repl,

    /// Validate a request line and print the resulting configuration
    Parse {
        /// The request line, e.g. "4; error; /var/log; out.txt; log txt"
        #[arg(required = true)]
        line: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let base = ScanConfig::load_from(cli.config.as_deref())
        .map_err(|e| SearchError::config_error(format!("Could not load configuration: {}", e)))?;
    init_logging(&base.log_level);
    debug!("Base configuration: {:?}", base);

    match cli.command {
        Commands::Scan(args) => {
            let json = args.json;
            let config = apply_overrides(base, *args);
            let request = config.validate()?;
            let report = scan(&request)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&request, &report);
            }
            Ok(())
        }
        Commands::Repl => {
            let stdin = io::stdin();
            repl(stdin.lock(), &base)
        }
        Commands::Parse { line } => {
            let config = parse_request_fields(&line, &base)?;
            config.validate()?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logscout={},warn", log_level)));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Command-line values win over anything read from configuration files
fn apply_overrides(mut config: ScanConfig, args: CliScanConfig) -> ScanConfig {
    if let Some(threads) = args.threads {
        config.thread_count = threads;
    }
    if let Some(pattern) = args.pattern {
        config.search_text = pattern;
    }
    if let Some(root) = args.root {
        config.input_dir = root;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(extensions) = args.extensions {
        config.extensions = extensions
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(encoding) = args.encoding {
        config.encoding_mode = encoding;
    }
    if let Some(limit) = args.max_line_bytes {
        config.max_line_bytes = limit;
    }
    if args.follow_links {
        config.follow_links = true;
    }
    if args.timeout.is_some() {
        config.timeout = args.timeout;
    }
    config
}

fn repl<R: BufRead>(input: R, base: &ScanConfig) -> Result<()> {
    print_prompt()?;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if !line.is_empty() {
            match parse_request_line(line, base) {
                Ok(request) => match scan(&request) {
                    Ok(report) => print_report(&request, &report),
                    Err(e) => println!("> {} {}", "Scan failed:".red(), e),
                },
                Err(e) => println!("> {}", e.to_string().red()),
            }
        }
        print_prompt()?;
    }
    Ok(())
}

fn print_prompt() -> Result<()> {
    println!(
        "> Enter a request separated by ';' (or {} to quit):\n> {}",
        "exit".bold(),
        REQUEST_FORMAT.dimmed()
    );
    io::stdout().flush()?;
    Ok(())
}

fn print_report(request: &ScanRequest, report: &RunReport) {
    let output = request.output_path().display().to_string();
    if report.output_missing {
        println!(
            "> {}",
            format!("Output file {} is gone, it may have been deleted", output).yellow()
        );
    } else if report.found {
        println!("> Results written to {}", output.blue());
    } else {
        println!(
            "> No line containing {} was found",
            format!("{:?}", request.search_text()).bold()
        );
    }

    if report.cancelled {
        println!("> {}", "Scan was cancelled, results are partial".yellow());
    }
    if report.stats.write_failures > 0 {
        println!(
            "> {}",
            format!("{} batches could not be written", report.stats.write_failures).red()
        );
    }
    println!(
        "> Scanned {} of {} files, {} matches ({})",
        report.stats.files_scanned,
        report.stats.files_discovered,
        report.stats.matches.to_string().green(),
        report.summary_line()
    );
}
