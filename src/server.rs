//! HTTP server bootstrap for the certificate service.
//!
//! This module wires together:
//! - configuration
//! - database connection pool (Postgres or SQLite)
//! - storage backend and document converter
//! - issuance and verification services
//! - the Axum router

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::handlers::{health_check, readiness_check};
use crate::auth::{AuthMiddlewareState, Authenticator, JwtValidator};
use crate::config::{Config, LogFormat};
use crate::infra::sqlite::connect_sqlite;
use crate::infra::{
    shutdown_signal, ArtifactStore, AuditLog, CertificateStore, Converter, EventDirectory,
    PgAuditLogger, PgCertificateStore, PgEventDirectory, SqliteAuditLogger,
    SqliteCertificateStore, SqliteEventDirectory,
};
use crate::issuance::{IssuanceLedger, VerificationLookup};
use crate::render::{ArtifactRenderer, OfficeConverter};

/// Database-backed services, independent of storage and rendering.
#[derive(Clone)]
pub struct Backends {
    pub directory: Arc<dyn EventDirectory>,
    pub certificates: Arc<dyn CertificateStore>,
    pub audit: Arc<dyn AuditLog>,
}

/// Connect to the database named by `database_url`.
///
/// `sqlite:` URLs select the SQLite backend; anything else is treated as Postgres.
pub async fn connect_backends(
    database_url: &str,
    max_connections: u32,
    migrate: bool,
) -> anyhow::Result<Backends> {
    if database_url.starts_with("sqlite:") {
        info!("Opening SQLite database");
        let pool = connect_sqlite(database_url, max_connections).await?;
        if migrate {
            crate::migrations::run_sqlite(&pool).await?;
            info!("Database migrations applied");
        }
        return Ok(Backends {
            directory: Arc::new(SqliteEventDirectory::new(pool.clone())),
            certificates: Arc::new(SqliteCertificateStore::new(pool.clone())),
            audit: Arc::new(SqliteAuditLogger::new(pool)),
        });
    }

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    info!("Connected to PostgreSQL");

    if migrate {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    Ok(Backends {
        directory: Arc::new(PgEventDirectory::new(pool.clone())),
        certificates: Arc::new(PgCertificateStore::new(pool.clone())),
        audit: Arc::new(PgAuditLogger::new(pool)),
    })
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn EventDirectory>,
    pub certificates: Arc<dyn CertificateStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub audit: Arc<dyn AuditLog>,
    pub ledger: IssuanceLedger,
    pub lookup: VerificationLookup,
}

impl AppState {
    pub fn new(
        backends: Backends,
        artifacts: Arc<dyn ArtifactStore>,
        converter: Option<Arc<dyn Converter>>,
    ) -> Self {
        let renderer = ArtifactRenderer::new(artifacts.clone(), converter);
        let ledger = IssuanceLedger::new(
            backends.directory.clone(),
            backends.certificates.clone(),
            artifacts.clone(),
            renderer,
            backends.audit.clone(),
        );
        let lookup = VerificationLookup::new(backends.certificates.clone());

        Self {
            directory: backends.directory,
            certificates: backends.certificates,
            artifacts,
            audit: backends.audit,
            ledger,
            lookup,
        }
    }

    /// Build every service named by the configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backends = connect_backends(
            &config.database_url,
            config.max_connections,
            config.migrate_on_startup,
        )
        .await?;

        let artifacts = config.storage.build()?;
        info!(backend = artifacts.backend_tag(), "Artifact storage configured");

        let converter: Option<Arc<dyn Converter>> = match &config.converter {
            Some(converter_config) => {
                let converter = OfficeConverter::new(converter_config.clone());
                match converter.locate_binary() {
                    Ok(binary) => info!(binary = %binary.display(), "Document converter found"),
                    Err(e) => warn!(
                        error = %e,
                        "Document converter not available; document templates fall back to raster"
                    ),
                }
                Some(Arc::new(converter))
            }
            None => {
                info!("Document conversion disabled; filled templates are stored as pptx");
                None
            }
        };

        Ok(Self::new(backends, artifacts, converter))
    }
}

/// Router options that do not live in [`AppState`].
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    pub cors_allow_origins: Option<String>,
    /// Root directory served at `/files` for local storage
    pub files_root: Option<PathBuf>,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Starting event-certs v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);

    let auth_state = auth_state(&config);
    if !auth_state.require_auth {
        warn!("Authentication disabled (AUTH_MODE=disabled); all requests act as admin");
    }

    let state = AppState::from_config(&config).await?;

    let options = RouterOptions {
        cors_allow_origins: config.cors_allow_origins.clone(),
        files_root: config.storage.local_root().cloned(),
    };
    let app = build_router(state, auth_state, &options)?;

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("event-certs is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Authentication state derived from configuration.
pub fn auth_state(config: &Config) -> AuthMiddlewareState {
    let authenticator = match &config.auth.jwt_secret {
        Some(secret) => Authenticator::new().with_jwt(Arc::new(JwtValidator::new(
            secret.as_bytes(),
            &config.auth.jwt_issuer,
            &config.auth.jwt_audience,
        ))),
        None => Authenticator::new(),
    };

    AuthMiddlewareState {
        authenticator: Arc::new(authenticator),
        require_auth: config.auth.require_auth,
    }
}

/// Assemble the full router with state applied.
pub fn build_router(
    state: AppState,
    auth_state: AuthMiddlewareState,
    options: &RouterOptions,
) -> anyhow::Result<Router> {
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::auth::auth_middleware,
    ));

    let mut router = Router::new()
        .nest("/api", api.merge(crate::api::public_router()))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    if let Some(root) = &options.files_root {
        router = router.nest_service("/files", ServeDir::new(root));
    }

    let mut router = router.with_state(state).layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer(options.cors_allow_origins.as_deref())? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]),
    ))
}
