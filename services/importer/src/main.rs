//! Cube importer service.
//!
//! Waits for the index database, makes sure its schema exists and registers
//! every enabled source's products and datasets, once or on a schedule.

mod database;
mod exit;
mod schedule;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use ingestion::{ImporterConfig, Importer};
use storage::{IndexBackend, MemoryIndex};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use database::DbSettings;
use exit::StartupError;
use schedule::Schedule;

#[derive(Parser, Debug)]
#[command(name = "importer")]
#[command(about = "Add data from the configured sources to the cube index")]
struct Args {
    /// Database host name
    #[arg(short = 's', long, env = "DB_HOST", default_value = "localhost")]
    host: String,

    /// Database port
    #[arg(short, long, env = "DB_PORT", default_value_t = 5432)]
    port: u16,

    /// Database user
    #[arg(short, long, env = "DB_USER", default_value = "opendatacube")]
    user: String,

    /// Database password
    #[arg(
        short = 'a',
        long,
        env = "DB_PASSWORD",
        default_value = "opendatacube",
        hide_env_values = true,
        hide_default_value = true
    )]
    password: String,

    /// Database name
    #[arg(short = 'd', long = "db", env = "DB_DATABASE", default_value = "opendatacube")]
    database: String,

    /// Do not resolve the database host before probing its port
    #[arg(short, long, env = "DB_NO_PING")]
    no_ping: bool,

    /// Connection attempts while waiting for the database
    #[arg(
        short = 'r',
        long,
        env = "DB_MAX_RETRIES",
        default_value_t = 15,
        value_parser = clap::value_parser!(u8).range(1..=15)
    )]
    max_retries: u8,

    /// Seconds between connection attempts
    #[arg(
        short = 'l',
        long,
        env = "DB_SLEEP",
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(1..=20)
    )]
    sleep: u64,

    /// Use an in-memory index instead of the database
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn db_settings(&self) -> DbSettings {
        DbSettings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            no_ping: self.no_ping,
            max_retries: self.max_retries,
            sleep: Duration::from_secs(self.sleep),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install log subscriber: {e}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Importer failed");
            exit::exit_code(&e)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ImporterConfig::from_env().context("Invalid importer configuration")?;
    info!(
        sources = ?config.sources.iter().map(|s| s.kind.id()).collect::<Vec<_>>(),
        host = %args.host,
        port = args.port,
        user = %args.user,
        max_retries = args.max_retries,
        sleep = args.sleep,
        dry_run = args.dry_run,
        "Starting cube importer"
    );

    let index: Arc<dyn IndexBackend> = if args.dry_run {
        warn!("Dry run, using an in-memory index");
        Arc::new(MemoryIndex::new())
    } else {
        Arc::new(database::connect_and_initialize(&args.db_settings()).await?)
    };

    let data_root = config.data_root();
    check_data_folder(&data_root).await?;

    let importer = Importer::new(&config, index).context("Could not set up sources")?;

    match &config.periodic {
        None => import(&importer).await,
        Some(periodic) => {
            let schedule = Schedule::new(periodic, Utc::now())?;
            info!(schedule = %schedule, sleep_secs = schedule.sleep().as_secs(), "Periodic mode");
            run_periodic(&importer, &schedule).await
        }
    }
}

async fn import(importer: &Importer) -> Result<()> {
    let reports = importer.run_once().await?;
    let added: usize = reports.iter().map(|r| r.datasets_added).sum();
    info!(sources = reports.len(), datasets_added = added, "Finished processing sources");
    Ok(())
}

async fn run_periodic(importer: &Importer, schedule: &Schedule) -> Result<()> {
    import(importer).await?;

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_run(now)? else {
            info!("Schedule deadline reached, stopping");
            return Ok(());
        };
        info!(next_run = %next, "Waiting for next import");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait.max(schedule.sleep())).await;

        import(importer).await?;
    }
}

/// The shared data folder must exist and be writable.
async fn check_data_folder(path: &Path) -> Result<(), StartupError> {
    let unusable = |reason: String| StartupError::DataFolder {
        path: path.to_path_buf(),
        reason,
    };

    if !tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(unusable("does not exist".to_string()));
    }

    let probe = path.join(".importer-write-test");
    tokio::fs::write(&probe, b"")
        .await
        .map_err(|e| unusable(format!("is not writable: {e}")))?;
    if let Err(e) = tokio::fs::remove_file(&probe).await {
        warn!(path = %probe.display(), error = %e, "Could not remove write probe");
    }

    info!(path = %path.display(), "Data folder ready");
    Ok(())
}
