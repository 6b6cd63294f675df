use std::sync::Arc;

use tracing::info;

use campsite::config::Config;
use campsite::engine::Engine;
use campsite::reaper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    campsite::observability::init(config.metrics_port);

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let engine = Arc::new(Engine::new(config.engine_config()));
    let free = engine.available_dates(None, None).await.len();
    info!("campsite engine ready");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  restore: {}, backup: {}", config.restore, config.backup);
    let policy = engine.policy();
    info!(
        "  policy: max stay {} days, window {} days",
        policy.max_stay_days, policy.window_days
    );
    info!("  free dates: {free}");

    let purger = tokio::spawn(reaper::run_purger(engine.clone()));
    let backup = config
        .backup
        .then(|| tokio::spawn(reaper::run_backup(engine.clone(), config.backup_interval)));

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, stopping maintenance tasks");

    purger.abort();
    if let Some(backup) = backup {
        backup.abort();
        // Final snapshot so a restart picks up everything booked since the last tick
        engine.backup().await;
    }

    info!("campsite stopped");
    Ok(())
}
