use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveTime, Weekday};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use petdata::{KaggleClient, Pipeline, PipelineConfig, WeeklySchedule, run_weekly};

#[derive(Debug, Parser)]
#[command(
    name = "petdata",
    disable_help_subcommand = true,
    about = "Refresh the combined pet-adoption dataset",
    long_about = "Download the configured adoption datasets, normalize them into one \
                  canonical shape, and write a combined CSV filtered to the target species.",
    after_help = "Catalog credentials are read from KAGGLE_USERNAME and KAGGLE_KEY."
)]
struct Cli {
    #[arg(long, help = "Run one refresh and exit instead of scheduling weekly runs")]
    once: bool,
    #[arg(
        long = "data-dir",
        value_name = "PATH",
        default_value = "data",
        help = "Directory for checkpoints, local inputs, and the combined output"
    )]
    data_dir: PathBuf,
    #[arg(
        long = "work-dir",
        value_name = "PATH",
        help = "Scratch directory for downloaded archives (default: <data-dir>/downloads)"
    )]
    work_dir: Option<PathBuf>,
    #[arg(long, default_value = "cat", help = "Species kept in the combined output")]
    species: String,
    #[arg(
        long,
        value_name = "QUERY",
        help = "Catalog search query for the discovery loader"
    )]
    query: Option<String>,
    #[arg(long = "skip-discovery", help = "Skip the run-time catalog discovery loader")]
    skip_discovery: bool,
    #[arg(
        long,
        default_value = "mon",
        value_parser = parse_weekday,
        help = "Weekday for scheduled refreshes"
    )]
    weekday: Weekday,
    #[arg(
        long,
        default_value = "10:00",
        value_parser = parse_time,
        value_name = "HH:MM",
        help = "Local time for scheduled refreshes"
    )]
    at: NaiveTime,
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse::<Weekday>()
        .map_err(|_| format!("invalid weekday '{value}'"))
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("invalid time '{value}', expected HH:MM"))
}

fn refresh(pipeline: &Pipeline, client: &KaggleClient) -> bool {
    match pipeline.run(client) {
        Ok(summary) => {
            for (source_id, rows) in &summary.source_rows {
                info!("[petdata:run] {source_id}: {rows} rows");
            }
            info!(
                "[petdata:run] {} updated, {} rows",
                summary.output_path.display(),
                summary.combined_rows
            );
            true
        }
        Err(err) => {
            error!("[petdata:run] refresh failed: {err}");
            false
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config =
        PipelineConfig::new(cli.data_dir.clone()).with_target_species(cli.species.clone());
    if let Some(work_dir) = &cli.work_dir {
        config = config.with_work_dir(work_dir.clone());
    }
    if let Some(query) = &cli.query {
        config = config.with_discovery_query(query.clone());
    }
    if cli.skip_discovery {
        config = config.without_discovery();
    }

    let client = KaggleClient::from_env();
    let pipeline = Pipeline::new(config);

    if cli.once {
        return if refresh(&pipeline, &client) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let schedule = WeeklySchedule::new(cli.weekday, cli.at);
    info!(
        "[petdata:schedule] refreshing now, then every {:?} at {}",
        schedule.weekday, schedule.at
    );
    // A failed run only skips its own remaining stages; the loop keeps going.
    run_weekly(&schedule, || {
        refresh(&pipeline, &client);
    });
    ExitCode::SUCCESS
}
