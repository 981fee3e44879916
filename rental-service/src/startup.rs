use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::{CacheBackendKind, RentalConfig};
use crate::services::{Database, RedisCache, StatsCache};
use crate::{build_router, AppState};

/// A bound, not yet serving, rental-service process.
///
/// Owns the database pool: it is opened and migrated in [`Application::build`]
/// and closed once [`Application::run_until_stopped`] returns.
pub struct Application {
    port: u16,
    listener: TcpListener,
    db: Database,
    state: AppState,
}

impl Application {
    pub async fn build(config: RentalConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;
        db.run_migrations().await?;

        let cache = match config.cache.backend {
            CacheBackendKind::Memory => {
                tracing::info!("Using in-process stats cache");
                StatsCache::in_memory()
            }
            CacheBackendKind::Redis => {
                let url = config.cache.redis_url.as_deref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("REDIS_URL is required"))
                })?;
                StatsCache::new(Arc::new(RedisCache::new(url).await?))
            }
        };

        let state = AppState::new(config.clone(), Arc::new(db.clone()), cache);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            db,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!(port = self.port, "Listening");

        let app = build_router(self.state);
        let served = axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.db.close().await;
        tracing::info!("Service shutdown complete");

        served.map_err(AppError::from)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
