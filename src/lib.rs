pub mod alert;
pub mod arm;
pub mod db;
pub mod gesture;
pub mod service;
pub mod settings;
pub mod source;
pub mod transport;
pub mod unlock;
mod utils;

use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};

use alert::{AlertPipeline, LogNotifier};
use db::Database;
use service::LockService;
use settings::SettingsStore;
use source::{GestureSource, ReplaySource, SimulatedSource};
use transport::{LineLink, RecordingTransport, TransportHandle};
use unlock::UnlockController;

const DEFAULT_DATA_DIR: &str = "gesturelock-data";

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn spawn_transport(settings: &settings::LockSettings) -> Result<TransportHandle> {
    match &settings.serial_path {
        Some(path) => {
            let link = LineLink::open(path)?;
            log::info!("Actuator link open on {}", path.display());
            TransportHandle::spawn(link)
        }
        None => {
            log::warn!("No serial path configured; actuator commands are recorded only");
            TransportHandle::spawn(RecordingTransport::new())
        }
    }
}

fn pick_source(settings: &settings::LockSettings) -> Result<Box<dyn GestureSource>> {
    if let Ok(path) = std::env::var("GESTURELOCK_REPLAY") {
        let source = ReplaySource::open(&PathBuf::from(path))?;
        log::info!("Replaying {} recorded frames", source.remaining());
        return Ok(Box::new(source));
    }

    if env_flag("GESTURELOCK_SIMULATE") {
        let sequence = settings.unlock_sequence()?;
        log::info!("Simulating an operator performing {sequence}");
        return Ok(Box::new(SimulatedSource::new(
            sequence,
            Duration::from_millis(settings.debounce_ms + 500),
            rand::random(),
        )));
    }

    anyhow::bail!("no gesture source: set GESTURELOCK_REPLAY or GESTURELOCK_SIMULATE=1")
}

async fn serve(data_dir: PathBuf) -> Result<()> {
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
    let settings = settings_store.get();

    let controller = UnlockController::new(settings.unlock_sequence()?, settings.controller_config())
        .context("invalid lock configuration")?;

    let database = Database::new(data_dir.join("gesturelock.sqlite3"))?;
    let transport = spawn_transport(&settings)?;
    let alerts_dir = settings
        .alerts_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("alerts"));
    let alerts = AlertPipeline::new(database.clone(), alerts_dir, Arc::new(LogNotifier));

    let service = LockService::new(
        controller,
        database,
        transport.clone(),
        alerts,
        settings_store,
        settings.tick_interval(),
    );

    service.start(pick_source(&settings)?).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted; shutting down"),
        _ = service.finished() => log::info!("Gesture source finished"),
    }

    service.stop().await?;
    transport.shutdown();
    log::info!(
        "Final state {:?}; {} commands sent, {} failed",
        service.progress().await.display,
        transport.sent_count(),
        transport.failed_count()
    );
    Ok(())
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("gesturelock starting up...");

    let data_dir = std::env::var("GESTURELOCK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(serve(data_dir))
}
