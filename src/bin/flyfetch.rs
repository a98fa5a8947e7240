use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use flyfetch::app::App;
use flyfetch::config::FetchConfig;
use flyfetch::diopt::DioptHttpClient;
use flyfetch::error::FetchError;
use flyfetch::flybase::FlybaseHttpClient;
use flyfetch::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "flyfetch")]
#[command(about = "Fetch FlyBase gene records and DIOPT ortholog tables into spreadsheets")]
#[command(version, author)]
struct Cli {
    /// Print the result as JSON instead of the output path.
    #[arg(long, global = true)]
    json: bool,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch every facet of a gene and save a multi-sheet bundle")]
    Gene(GeneArgs),
    #[command(about = "Fetch the DIOPT ortholog table for a gene id")]
    Orthologs(OrthologArgs),
}

#[derive(Args)]
struct GeneArgs {
    /// Gene symbol or FBgn id (e.g. 'so' or FBgn0000099).
    query: String,

    #[arg(long, default_value = ".")]
    out: Utf8PathBuf,
}

#[derive(Args)]
struct OrthologArgs {
    /// FlyBase gene id (e.g. FBgn0000099).
    id: String,

    /// Target organism: human, mouse, rat, zebrafish, yeast, c.elegans,
    /// arabidopsis.
    organism: String,

    #[arg(long, default_value = ".")]
    out: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::ResolutionFailed(_)
        | FetchError::UnsupportedIdentifierKind(_)
        | FetchError::InvalidIdentifier(_)
        | FetchError::UnsupportedOrganism(_) => 2,
        FetchError::FetchFailed { .. } | FetchError::EmptyResult(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut config = FetchConfig::default();
    if let Some(secs) = cli.timeout {
        config = config.with_timeout_secs(secs);
    }

    let flybase = FlybaseHttpClient::new(&config).into_diagnostic()?;
    let diopt = DioptHttpClient::new(&config).into_diagnostic()?;
    let app = App::new(flybase, diopt);

    let result = match cli.command {
        Commands::Gene(args) => app
            .fetch_and_save(&args.query, &args.out)
            .into_diagnostic()?,
        Commands::Orthologs(args) => app
            .fetch_orthologs_and_save(&args.id, &args.organism, &args.out)
            .into_diagnostic()?,
    };

    match output_mode {
        OutputMode::Json => JsonOutput::print_save(&result).into_diagnostic()?,
        OutputMode::Text => {
            if let Some(query) = &result.resolved_from_query {
                eprintln!("resolved '{query}' to {}", result.resolved_id);
            }
            println!("{}", result.output_path);
        }
    }
    Ok(())
}
