//! OrderBridge Server — bulk order import and remote workflow engine.
//!
//! Main entry point that wires all crates together and starts the
//! HTTP server and the background worker.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use orderbridge_core::config::AppConfig;
use orderbridge_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("ORDERBRIDGE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting OrderBridge v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = orderbridge_database::connection::DatabasePool::connect(&config.database).await?;
    let db_pool = db.into_pool();

    tracing::info!("Running database migrations...");
    orderbridge_database::migration::run_migrations(&db_pool).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let job_repo = Arc::new(orderbridge_database::repositories::job::JobRepository::new(
        db_pool.clone(),
    ));
    let order_repo = Arc::new(
        orderbridge_database::repositories::order::OrderRepository::new(db_pool.clone()),
    );
    let import_repo = Arc::new(
        orderbridge_database::repositories::import::ImportRepository::new(db_pool.clone()),
    );
    let channel_rule_repo = Arc::new(
        orderbridge_database::repositories::channel_rule::ChannelRuleRepository::new(
            db_pool.clone(),
        ),
    );

    // ── Step 3: Remote order system client ───────────────────────
    tracing::info!(base_url = %config.remote.base_url, "Initializing remote order client...");
    let remote: Arc<dyn orderbridge_remote::api::RemoteOrderApi> = Arc::new(
        orderbridge_remote::http::HttpRemoteOrderApi::new(&config.remote)?,
    );

    // ── Step 4: Services ─────────────────────────────────────────
    let policy_service = Arc::new(orderbridge_service::channel::ChannelPolicyService::new(
        Arc::clone(&channel_rule_repo),
    ));
    let import_service = Arc::new(orderbridge_service::import::ImportService::new(
        Arc::clone(&import_repo),
        Arc::clone(&job_repo),
        config.worker.default_max_attempts,
    ));
    let order_service = Arc::new(orderbridge_service::order::OrderService::new(Arc::clone(
        &order_repo,
    )));

    // ── Step 5: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 6: Background worker ────────────────────────────────
    let worker_handle = if config.worker.enabled {
        tracing::info!("Starting background worker...");

        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().to_string()[..8]);

        let job_store: Arc<dyn orderbridge_worker::store::JobStore> = Arc::clone(&job_repo) as _;
        let job_queue = Arc::new(orderbridge_worker::queue::JobQueue::new(
            Arc::clone(&job_store),
            config.worker.default_max_attempts,
        ));

        let orders: Arc<dyn orderbridge_worker::jobs::OrderStore> = Arc::clone(&order_repo) as _;
        let imports: Arc<dyn orderbridge_worker::jobs::ImportStore> =
            Arc::clone(&import_repo) as _;
        let policy: Arc<dyn orderbridge_worker::jobs::PolicyResolver> =
            Arc::clone(&policy_service) as _;

        let mut job_executor = orderbridge_worker::executor::JobExecutor::new();
        job_executor.register(Arc::new(orderbridge_worker::jobs::SyncOrderHandler::new(
            Arc::clone(&orders),
            Arc::clone(&remote),
            Arc::clone(&policy),
            Arc::clone(&job_queue),
        )));
        job_executor.register(Arc::new(orderbridge_worker::jobs::InvoiceOrderHandler::new(
            Arc::clone(&orders),
            Arc::clone(&remote),
            Arc::clone(&policy),
            Arc::clone(&job_queue),
        )));
        job_executor.register(Arc::new(orderbridge_worker::jobs::ShipOrderHandler::new(
            Arc::clone(&orders),
            Arc::clone(&remote),
        )));
        job_executor.register(Arc::new(orderbridge_worker::jobs::ImportOrdersHandler::new(
            Arc::clone(&imports),
            Arc::clone(&orders),
            Arc::clone(&remote),
            Arc::clone(&job_queue),
            config.remote.validate_stock,
        )));

        let job_runner = Arc::new(orderbridge_worker::runner::JobRunner::new(
            Arc::clone(&job_store),
            Arc::new(job_executor),
            orderbridge_worker::retry::RetryPolicy::from_config(&config.worker),
        ));
        let worker_runner = orderbridge_worker::worker::WorkerRunner::new(
            Arc::clone(&job_store),
            job_runner,
            config.worker.clone(),
            worker_id,
        );

        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            worker_runner.run(worker_cancel).await;
        });

        tracing::info!("Background worker started");
        Some(handle)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 7: HTTP server ──────────────────────────────────────
    let app_state = orderbridge_api::state::AppState {
        config: Arc::new(config.clone()),
        db_pool: db_pool.clone(),
        job_repo: Arc::clone(&job_repo),
        channel_rule_repo: Arc::clone(&channel_rule_repo),
        import_service: Arc::clone(&import_service),
        order_service: Arc::clone(&order_service),
    };

    let app = orderbridge_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("OrderBridge server listening on {}", addr);

    // ── Step 8: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 9: Wait for the worker to drain ─────────────────────
    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for background worker to drain...");
        let _ = tokio::time::timeout(
            std::time::Duration::from_secs(config.server.shutdown_grace_seconds),
            handle,
        )
        .await;
    }

    tracing::info!("OrderBridge server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
