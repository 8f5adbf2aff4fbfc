//! GramLoan backend server
//!
//! HTTP API for the village microfinance back office: borrower registry,
//! loan issuance with weekly installment schedules, payment collection,
//! and dashboard reporting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use gramloan_server::auth::AuthService;
use gramloan_server::borrower_service::BorrowerService;
use gramloan_server::collection_service::CollectionService;
use gramloan_server::config::Config;
use gramloan_server::db;
use gramloan_server::loan_service::LoanService;
use gramloan_server::middleware::{request_tracing, security_headers};
use gramloan_server::ports::{AssetStoreService, SheetBackupService};
use gramloan_server::report_service::ReportService;
use gramloan_server::routes;
use gramloan_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(
        environment = ?config.environment,
        database = %config.database_url_masked(),
        "Starting GramLoan server"
    );

    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let auth_service = Arc::new(AuthService::new(
        db_pool.clone(),
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
        config.jwt_refresh_token_ttl_days,
    ));
    let borrower_service = Arc::new(BorrowerService::new(db_pool.clone()));
    let loan_service = Arc::new(LoanService::new(db_pool.clone()));
    let collection_service = Arc::new(CollectionService::new(db_pool.clone()));
    let report_service = Arc::new(ReportService::new(db_pool.clone()));
    let sheet_backup = Arc::new(SheetBackupService::new(config.sheet_backup_url.clone()));
    let asset_store = Arc::new(AssetStoreService::new(config.asset_store_url.clone()));

    let app_state = AppState {
        db_pool: db_pool.clone(),
        auth_service,
        borrower_service,
        loan_service: loan_service.clone(),
        collection_service,
        report_service,
        sheet_backup,
        asset_store,
    };

    // Overdue sweep: run once at startup, then on an interval
    let sweep_service = loan_service.clone();
    let sweep_interval = config.overdue_sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            if let Err(e) = sweep_service.mark_overdue_installments().await {
                tracing::error!("Overdue sweep failed: {}", e);
            }
        }
    });

    let api_routes = Router::new()
        .merge(routes::auth_routes())
        .merge(routes::borrower_routes())
        .merge(routes::loan_routes())
        .merge(routes::installment_routes())
        .merge(routes::collection_routes())
        .merge(routes::collector_routes())
        .merge(routes::report_routes());

    let health_db_pool = db_pool.clone();

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .nest("/api", api_routes)
        .with_state(app_state)
        .layer(axum::middleware::from_fn(security_headers))
        .layer(axum::middleware::from_fn(request_tracing))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "GramLoan API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins.filter(|s| !s.is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
