use clap::Parser;
use labsheet::app::{self, Config};

/// Main entry point for the web application
///
/// Initializes logging (`RUST_LOG`, default `info`), reads the listener
/// configuration from flags or `LAB_*` environment variables and serves the
/// upload form until the process is stopped.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!(
        "Starting lab results server (static dir {}, upload limit {} MB)",
        config.static_dir.display(),
        config.max_upload_mb
    );

    app::run(config).await
}
