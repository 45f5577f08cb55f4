use anyhow::{Context, Result};
use apel_boinc::config::Config;
use apel_boinc::ingest::{IngestSummary, Ingestor, JsonLinesSink};
use apel_boinc::logging::init_logging;
use apel_boinc::{ingest_span, resolve_checkpoint, BoincParser, RecordKind};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "apel-boinc")]
#[command(about = "Parse BOINC accounting logs into APEL event and blah records")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to apel-boinc.toml lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse log files and print records as JSON lines
    Parse {
        /// Record kind to produce (batch or blah)
        #[arg(long, short)]
        kind: RecordKind,
        /// Use this checkpoint instead of querying the database
        #[arg(long)]
        checkpoint: Option<i64>,
        /// Print line counts to stderr when done
        #[arg(long)]
        summary: bool,
        /// Log files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the checkpoint the database holds for this node
    Checkpoint {
        /// Record kind to query (batch or blah)
        #[arg(long, short)]
        kind: RecordKind,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        handle_error(e);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging);
    match &config.source {
        Some(path) => info!(config_file = %path.display(), "Loaded configuration from file"),
        None => info!("No configuration file found, using defaults and environment"),
    }

    match cli.command {
        Commands::Parse {
            kind,
            checkpoint,
            summary,
            files,
        } => {
            let totals = parse_files(&config, kind, checkpoint, &files)?;
            if summary {
                print_summary(kind, &totals);
            }
            Ok(())
        }
        Commands::Checkpoint { kind } => {
            let settings = config.parser_settings(kind)?;
            let store = config.store()?;
            let checkpoint = resolve_checkpoint(&store, kind, &settings.identity())?;
            println!("{}", checkpoint);
            Ok(())
        }
        Commands::ShowConfig => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn parse_files(
    config: &Config,
    kind: RecordKind,
    checkpoint: Option<i64>,
    patterns: &[String],
) -> Result<IngestSummary> {
    let settings = config.parser_settings(kind)?;
    let parser = match (checkpoint, &config.db.path) {
        (Some(checkpoint), _) => BoincParser::new(kind, settings, checkpoint)?,
        (None, Some(_)) => BoincParser::with_store(kind, settings, &config.store()?)?,
        (None, None) => {
            warn!(kind = %kind, "No database configured, parsing every line");
            BoincParser::new(kind, settings, 0)?
        }
    };

    let files = expand_patterns(patterns)?;
    let span = ingest_span!(kind = %kind, checkpoint = parser.checkpoint());
    let _enter = span.enter();

    let stdout = io::stdout();
    let mut sink = JsonLinesSink::new(BufWriter::new(stdout.lock()));
    let ingestor = Ingestor::new(&parser);
    let mut totals = IngestSummary::default();

    for path in &files {
        totals.merge(ingestor.ingest_file(path, &mut sink)?);
    }

    sink.into_inner().flush().context("Failed to flush output")?;
    Ok(totals)
}

/// Expands glob patterns; a pattern matching nothing is kept as a literal path so the open
/// error names it.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid file pattern: {}", pattern))?
            .flatten()
            .filter(|p| p.is_file())
            .collect();

        if matched.is_empty() {
            files.push(PathBuf::from(pattern));
        } else {
            matched.sort();
            files.append(&mut matched);
        }
    }

    Ok(files)
}

fn print_summary(kind: RecordKind, totals: &IngestSummary) {
    eprintln!(
        "{} {} lines: {} emitted, {} skipped, {} failed",
        kind.to_string().bold(),
        totals.lines,
        totals.emitted.to_string().green(),
        totals.skipped.to_string().yellow(),
        if totals.failed > 0 {
            totals.failed.to_string().red()
        } else {
            totals.failed.to_string().normal()
        }
    );
}

fn handle_error(e: anyhow::Error) {
    eprintln!("Error: {:#}", e);
    process::exit(1);
}
