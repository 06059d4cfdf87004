mod app;
mod mpv;
mod ui;

use fmdial_core::playback::StatusCell;
use fmdial_core::{config::Config, platform, Catalog, Player, Tuner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("fmdial.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fmdial=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    tracing::info!("fmdial starting…");

    // Config errors are fatal, same as the station file below.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load config: {:#}", e);
            eprintln!("fmdial: {:#}", e);
            std::process::exit(1);
        }
    };

    // A broken station file is fatal: report it before any terminal takeover.
    let catalog = match Catalog::load(&config.stations.stations_file) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("failed to load stations: {}", e);
            eprintln!("fmdial: {}", e);
            eprintln!("        (station file: {})", config.stations.stations_file.display());
            std::process::exit(1);
        }
    };
    tracing::info!("loaded {} stations", catalog.len());

    let cell = StatusCell::new();
    let volume = config.playback.default_volume.min(100);
    let engine = mpv::MpvEngine::spawn(cell.clone(), volume).await?;
    let player = Player::new(engine.clone(), cell, volume);

    let app = app::App::new(Tuner::new(catalog), player, engine);
    app.run().await?;

    Ok(())
}
