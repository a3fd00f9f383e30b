//! scribe-daemon: polls the video catalog and drives the transcription or
//! patch workflow one job at a time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use scribe_core::{config::ScribeConfig, types::VideoId, PathHelper};
use scribe_jobs::PresenceCache;
use scribe_media::Toolbox;
use scribe_scheduler::{
    Engine, JobScheduler, PatchScheduler, SchedulerBase, SqliteCatalog, SqliteRecordSink,
    TranscriptionScheduler, Workflow,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "scribe-daemon")]
#[command(about = "Incremental broadcast transcription scheduler")]
#[command(version)]
struct Args {
    /// Config file (default: $SCRIBE_CONFIG or ~/.scribe/scribe.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduling loop (default)
    Run(RunArgs),
    /// Show the most recent job outcomes
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(clap::Args, Default)]
struct RunArgs {
    #[arg(long, value_enum, default_value_t = WorkflowArg::Transcribe)]
    workflow: WorkflowArg,

    /// Re-run every scheduled job once, ignoring existing outputs
    #[arg(long)]
    force: bool,

    /// Stop each video after audio extraction
    #[arg(long)]
    download_only: bool,

    /// Exit once nothing is runnable instead of sleeping
    #[arg(long)]
    once: bool,

    /// Only schedule this video id
    #[arg(long)]
    video: Option<i64>,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum WorkflowArg {
    #[default]
    Transcribe,
    Patch,
}

impl From<WorkflowArg> for Workflow {
    fn from(arg: WorkflowArg) -> Self {
        match arg {
            WorkflowArg::Transcribe => Workflow::Transcribe,
            WorkflowArg::Patch => Workflow::Patch,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe_daemon=info,scribe_scheduler=info,scribe_jobs=info".into()),
        )
        .init();

    let args = Args::parse();

    // config: --config > SCRIBE_CONFIG env > ~/.scribe/scribe.toml
    let config_path = args.config.or_else(|| std::env::var("SCRIBE_CONFIG").ok());
    let config = ScribeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        ScribeConfig::default()
    });

    match args.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(run) => run_engine(config, run).await,
        Command::History { limit } => show_history(&config, limit),
    }
}

async fn run_engine(config: ScribeConfig, args: RunArgs) -> anyhow::Result<()> {
    let force = args.force || config.engine.force_execute;
    let download_only = args.download_only || config.engine.download_only;
    let workflow = Workflow::from(args.workflow);

    ensure_parent_dir(&config.database.path);
    info!(path = %config.database.path, "opening record database");
    let records = rusqlite::Connection::open(&config.database.path)?;
    records.execute_batch("PRAGMA journal_mode=WAL;")?;
    let sink = Arc::new(SqliteRecordSink::new(records)?);

    info!(path = %config.catalog.path, "opening video catalog");
    let catalog = SqliteCatalog::open(&config.catalog.path)
        .with_context(|| format!("opening catalog {}", config.catalog.path))?;

    let base = SchedulerBase::new(
        PathHelper::new(&config.workspace.root),
        Arc::new(PresenceCache),
        force,
    )
    .with_sink(sink);
    let toolbox = Toolbox::new(config.tools.clone());
    let scheduler: Box<dyn JobScheduler> = match workflow {
        Workflow::Transcribe => Box::new(TranscriptionScheduler::new(base, toolbox)),
        Workflow::Patch => Box::new(PatchScheduler::new(base, toolbox, config.patch.clone())),
    };

    let mut engine = Engine::new(
        scheduler,
        Arc::new(catalog),
        Duration::from_secs(config.engine.poll_interval_secs),
    )
    .download_only(download_only)
    .only_video(args.video.map(VideoId));

    info!(
        %workflow,
        force,
        download_only,
        root = %config.workspace.root,
        "scribe daemon starting"
    );

    if args.once && !force {
        let executed = engine.run_until_idle().await?;
        info!(executed, "nothing left to run");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; finishing current job");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await?;
    Ok(())
}

fn show_history(config: &ScribeConfig, limit: usize) -> anyhow::Result<()> {
    let conn = rusqlite::Connection::open(&config.database.path)
        .with_context(|| format!("opening {}", config.database.path))?;
    let sink = SqliteRecordSink::new(conn)?;
    for record in sink.recent(limit)? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
