use std::sync::Arc;
use std::time::Duration;

use aisle_core::clock::SystemClock;
use aisle_notify::{
    DispatchConfig, EngineConfig, NotificationEngine, ReminderScheduler, SchedulerConfig,
    SimulatedChannel, Stores,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod background;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aisle_worker=info,aisle_notify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let dispatch_config = DispatchConfig::from_env();
    let scheduler_config = SchedulerConfig::from_env();
    let engine_config = EngineConfig::from_env();
    tracing::info!(
        channel = %dispatch_config.channel_name,
        rate_limit_per_minute = dispatch_config.rate_limit_per_minute,
        check_interval_ms = scheduler_config.check_interval_ms,
        rsvp_base_url = %engine_config.rsvp_base_url,
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = aisle_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    aisle_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    aisle_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Dispatch channel ---
    let stores = Stores::postgres(pool);
    let clock = Arc::new(SystemClock);
    let prune_every = dispatch_config.rate_limit_window.max(Duration::from_secs(1));
    let channel = SimulatedChannel::new(dispatch_config, stores.messages.clone(), clock.clone());

    // --- Reminder engine and scheduler ---
    let engine = Arc::new(NotificationEngine::new(
        stores,
        Arc::new(channel.clone()),
        clock,
        engine_config,
    ));
    let scheduler = ReminderScheduler::new(engine, scheduler_config);
    scheduler.start();

    // Spawn rate-limit pruner (drops expired windows once per window).
    let pruner_cancel = CancellationToken::new();
    let pruner_handle = tokio::spawn(background::rate_limit_pruner::run(
        channel.clone(),
        prune_every,
        pruner_cancel.clone(),
    ));

    tracing::info!("Worker started (reminder scheduler, rate-limit pruner)");

    shutdown_signal().await;

    // --- Shutdown ---
    scheduler.stop();

    pruner_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), pruner_handle).await;
    tracing::info!("Rate-limit pruner stopped");

    let stats = channel.get_stats();
    tracing::info!(
        total_sent = stats.total_sent,
        delivered = stats.delivered,
        failed = stats.failed,
        delivery_rate = stats.delivery_rate,
        "Dispatch channel summary"
    );
    channel.reset();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
