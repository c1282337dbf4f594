mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::database::{self, DatabasePools};
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::secrets;
use crate::features::analytics::{
    routes as analytics_routes, AnalyticsService, PgAnalyticsRepository,
};
use crate::features::reports::{
    routes as reports_routes, AttachmentService, PgReportRepository, ReportService,
};
use crate::modules::storage::{
    BlobConnectionString, BlobStorage, DisabledBlobStorage, ObjectStorageClient,
};
use crate::modules::vault::KeyVaultClient;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Config loads .env, so it comes before the logger to make RUST_LOG available
    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let environment = config.app.environment;

    let default_level = if config.app.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}, environment={}",
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
        worker_threads,
        std::process::id(),
        environment
    );

    // Fill unset secrets from the vault
    let vault = KeyVaultClient::new(&config.vault);
    secrets::load_missing_secrets(&mut config.secrets, &vault, environment)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Configuration loaded successfully");
    tracing::info!(
        "Access tokens are issued upstream: algorithm={}, expire_minutes={}",
        config.security.algorithm,
        config.security.access_token_expire_minutes
    );

    // Database pools
    let ops_url = config
        .secrets
        .database_url_ops
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL_OPS is not configured"))?;
    let ops = database::create_pool(ops_url, &config.database).await?;
    tracing::info!(
        "Ops database connection established: {}",
        database::redact_url(ops_url)
    );

    let analytics = match config.secrets.database_url_analytics.as_deref() {
        Some(url) => {
            let pool = database::create_pool(url, &config.database).await?;
            tracing::info!(
                "Analytics database connection established: {}",
                database::redact_url(url)
            );
            pool
        }
        None if environment.is_production() => {
            anyhow::bail!("DATABASE_URL_ANALYTICS is not configured");
        }
        None => {
            tracing::warn!("DATABASE_URL_ANALYTICS not set, analytics will use the ops database");
            ops.clone()
        }
    };
    let pools = DatabasePools { ops, analytics };

    tracing::info!("Running database migrations...");
    pools
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Blob storage
    let storage: Arc<dyn BlobStorage> =
        match config.secrets.blob_storage_connection_string.as_deref() {
            Some(raw) => {
                let connection: BlobConnectionString = raw
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid blob connection string: {}", e))?;
                Arc::new(
                    ObjectStorageClient::new(connection, &config.storage.container_name)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to initialize blob storage: {}", e))?,
                )
            }
            None if environment.is_production() => {
                anyhow::bail!("BLOB_STORAGE_CONNECTION_STRING is not configured");
            }
            None => {
                tracing::warn!("Blob storage not configured, attachment storage is disabled");
                Arc::new(DisabledBlobStorage)
            }
        };

    // Services
    let report_repository = Arc::new(PgReportRepository::new(pools.ops.clone()));
    let analytics_repository = Arc::new(PgAnalyticsRepository::new(pools.analytics.clone()));

    let report_service = Arc::new(ReportService::new(
        report_repository.clone(),
        analytics_repository.clone(),
        Arc::clone(&storage),
    ));
    let attachment_service = Arc::new(AttachmentService::new(report_repository, storage));
    let analytics_service = Arc::new(AnalyticsService::new(analytics_repository));
    tracing::info!("Services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    let mut api_routes = Router::new()
        .merge(reports_routes::routes(report_service, attachment_service))
        .merge(analytics_routes::routes(analytics_service));

    if let Some(per_minute) = NonZeroU32::new(config.app.rate_limit_per_minute) {
        let limiter = Arc::new(middleware::client_rate_limiter(per_minute));

        // Forget clients whose quota has fully replenished
        let pruned = Arc::clone(&limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                pruned.retain_recent();
            }
        });

        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
        tracing::info!(
            "Rate limiting enabled: {} requests per minute per client",
            config.app.rate_limit_per_minute
        );
    }

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(api_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(Duration::from_secs(60))
            .with_interval(Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
