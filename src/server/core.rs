use log::{error, info, warn};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::{QuotaStrategy, ServerConfig};
use crate::error::StartupError;
use crate::quota;
use crate::server::lock::ProcessLock;
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::{self, VaultRoot};

pub struct Server {
    listener: TcpListener,
    state: AppState,
    // Held for the lifetime of the server; released by the kernel on exit.
    _lock: Option<ProcessLock>,
}

impl Server {
    /// Prepares the root, establishes the quota baseline and binds the listener.
    pub async fn bind(config: ServerConfig) -> Result<Self, StartupError> {
        let root_path = config.root_path();
        std::fs::create_dir_all(&root_path)?;
        let root = VaultRoot::new(&root_path)?;
        info!("Vault root directory: {}", root.path().display());

        let lock = match config.quota_strategy {
            QuotaStrategy::Counter => {
                let lock = ProcessLock::acquire(root.path())?;
                info!("Holding process lock {}", lock.path().display());
                let removed = storage::remove_stale_staging(root.path())?;
                if removed > 0 {
                    warn!("Removed {} stale staging file(s) from a previous run", removed);
                }
                Some(lock)
            }
            QuotaStrategy::Disk => None,
        };

        let tracker = quota::from_config(&config, root.path().to_path_buf());
        let baseline = {
            let tracker = tracker.clone();
            tokio::task::spawn_blocking(move || tracker.initialize())
                .await
                .map_err(std::io::Error::other)??
        };

        match tracker.quota() {
            Some(limit) => info!(
                "Quota strategy {:?}: {} of {} bytes in use",
                config.quota_strategy, baseline, limit
            ),
            None => info!(
                "Quota strategy {:?}: {} bytes writable",
                config.quota_strategy,
                tracker.free_space()
            ),
        }

        let state = AppState::new(root, tracker, &config);

        let addr = config.socket_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            listener,
            state,
            _lock: lock,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until Ctrl-C or SIGTERM.
    pub async fn start(self) -> std::io::Result<()> {
        info!("Starting FlashVault on {}", self.local_addr()?);

        let app = routes::app(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}
