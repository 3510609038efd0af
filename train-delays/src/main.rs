use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use train_delays::config::{ConfigError, Credentials, FetchDefaults, STATION_VAR};
use train_delays::matcher::{Grouping, MergeConfig};
use train_delays::pipeline::{self, FetchRequest, MergeSummary, Paths, PipelineError};
use train_delays::timetables::TimetablesClient;

/// Fetch DB timetables and compute arrival and departure delays.
#[derive(Debug, Parser)]
#[command(name = "train-delays", version)]
struct Cli {
    /// Directory for raw API snapshots
    #[arg(long, global = true, default_value = "data/raw")]
    raw_dir: PathBuf,

    /// Directory for parsed and merged CSV tables
    #[arg(long, global = true, default_value = "data/processed")]
    processed_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download plan and changes for a station into a new raw snapshot
    Fetch(FetchArgs),
    /// Parse the newest raw plan into plan_parsed.csv
    ParsePlan,
    /// Parse the newest raw changes into changes_parsed.csv
    ParseChanges,
    /// Join the parsed tables and compute delays
    Merge(MergeArgs),
    /// Fetch, parse and merge in one go
    Run {
        #[command(flatten)]
        fetch: FetchArgs,
        #[command(flatten)]
        merge: MergeArgs,
    },
}

#[derive(Debug, Args)]
struct FetchArgs {
    /// Station name to search for [env: DEFAULT_STATION]
    #[arg(long)]
    station: Option<String>,

    /// Plan date as YYMMDD, YYYYMMDD or YYYY-MM-DD [env: DEFAULT_DATE]
    #[arg(long)]
    date: Option<String>,

    /// Plan hour, 0-23 [env: DEFAULT_HOUR]
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,
}

impl FetchArgs {
    fn into_request(self, defaults: FetchDefaults) -> Result<FetchRequest, ConfigError> {
        let station = self
            .station
            .or(defaults.station)
            .ok_or(ConfigError::Missing(STATION_VAR))?;
        Ok(FetchRequest {
            station,
            date: self.date.or(defaults.date),
            hour: self.hour.or(defaults.hour),
        })
    }
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Largest distance in minutes between planned and changed time
    #[arg(long = "tolerance-min", default_value_t = 2)]
    tolerance_min: u32,

    /// Stop id grouping: auto, by-stop-id or ungrouped
    #[arg(long, default_value_t = Grouping::Auto)]
    grouping: Grouping,

    /// Output CSV (defaults to merged_with_delays.csv in the processed dir)
    #[arg(long)]
    out: Option<PathBuf>,
}

impl MergeArgs {
    fn config(&self) -> MergeConfig {
        MergeConfig::new(self.tolerance_min).with_grouping(self.grouping)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "train-delays failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<(), PipelineError> {
    let paths = Paths::new(cli.raw_dir, cli.processed_dir);

    match cli.command {
        Command::Fetch(args) => {
            let request = args.into_request(FetchDefaults::from_env()?)?;
            let client = client()?;
            let outcome = pipeline::fetch_and_save_raw(&client, &paths.raw_store(), &request).await?;
            info!(
                station = outcome.station.label(),
                eva = %outcome.eva,
                stations = %outcome.stations_path.display(),
                plan = %outcome.plan_path.display(),
                changes = %outcome.changes_path.display(),
                "saved raw snapshot"
            );
        }
        Command::ParsePlan => {
            pipeline::parse_plan_stage(&paths)?;
        }
        Command::ParseChanges => {
            pipeline::parse_changes_stage(&paths)?;
        }
        Command::Merge(args) => {
            let summary = pipeline::merge_stage(&paths, &args.config(), args.out.as_deref())?;
            report(&summary);
        }
        Command::Run { fetch, merge } => {
            let request = fetch.into_request(FetchDefaults::from_env()?)?;
            let client = client()?;
            let summary =
                pipeline::run(&client, &paths, &request, &merge.config(), merge.out.as_deref())
                    .await?;
            report(&summary);
        }
    }

    Ok(())
}

fn client() -> Result<TimetablesClient, PipelineError> {
    let credentials = Credentials::from_env()?;
    Ok(TimetablesClient::new(credentials.timetables_config())?)
}

fn report(summary: &MergeSummary) {
    println!("Saved: {}", summary.out.display());
    println!("Rows: {} ({} matched)", summary.rows, summary.matched);
    println!("Share of rows with delay > 0 min: {:.3}", summary.delayed_share);
}
