use depot_server::core::{BackgroundTasks, Config, ServerState, TaskKind};
use depot_server::gate::sweep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment + logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    let log_dir = format!("{}/logs", config.work_dir);
    std::fs::create_dir_all(&log_dir).ok();
    depot_server::init_logger_with_file(
        Some(if config.is_development() { "debug" } else { "info" }),
        Some(&log_dir),
    );

    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "Depot server starting..."
    );

    // Wire the service graph
    let state = ServerState::initialize(config)?;
    let timezone = state.sweep_timezone()?;

    // Background tasks
    let mut tasks = BackgroundTasks::new();

    let sweep_gate = state.gate.clone();
    let sweep_hour = state.config.sweep_hour;
    let sweep_token = tasks.shutdown_token();
    tasks.spawn("balance_sweep", TaskKind::Periodic, async move {
        sweep::run(sweep_gate, timezone, sweep_hour, sweep_token).await;
    });

    let bus = state.bus.clone();
    let prune_token = tasks.shutdown_token();
    tasks.spawn("room_pruner", TaskKind::Periodic, async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            tokio::select! {
                _ = prune_token.cancelled() => return,
                _ = interval.tick() => {
                    let pruned = bus.prune_empty_rooms();
                    if pruned > 0 {
                        tracing::debug!(pruned, "Pruned empty fanout rooms");
                    }
                }
            }
        }
    });

    tracing::info!(tasks = tasks.len(), "Depot server ready");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
