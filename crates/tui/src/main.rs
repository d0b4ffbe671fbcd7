mod app;
mod keymap;
mod running;

use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use dtop_core::{
    config::{self, AppConfig, BackendChoice},
    console::task_channel,
    DockerBackend, MemoryBackend, ResourceBackend,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load_from(&config_path)?;
    init_logging(&config)?;

    let backend: Arc<dyn ResourceBackend> = match config.backend {
        BackendChoice::Docker => Arc::new(DockerBackend::new(config.docker_socket.clone())),
        BackendChoice::Demo => Arc::new(MemoryBackend::demo()),
    };
    info!(
        config = %config_path.display(),
        backend = ?config.backend,
        page_size = config.page_size,
        "starting dtop"
    );

    let (task_tx, task_rx) = task_channel();
    let mut app = app::DtopApp::new(
        backend,
        config.console_settings(),
        task_tx,
        Duration::from_millis(config.tick_rate_ms),
    );
    app.attach_tasks(task_rx);
    app.run().await
}

/// Log to `<log_dir>/dtop.log` only; stdout belongs to the terminal UI.
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("dtop.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
