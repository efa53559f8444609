use actix_web::dev::ServerHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Handles graceful shutdown of the application
///
/// On SIGTERM or CTRL+C:
/// 1. Cancels the root token so in-flight polls stop issuing status checks
/// 2. Stops the HTTP server, letting running handlers answer
/// 3. Waits for the server task to finish
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    shutdown: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            shutdown,
        }
    }

    /// Wait for a shutdown signal, then shut down gracefully
    ///
    /// Returns early with the server's own result if it stops by itself.
    pub async fn wait_for_shutdown(mut self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {:?}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {:?}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
            result = &mut self.server_task => {
                self.shutdown.cancel();
                return match result {
                    Ok(result) => result,
                    Err(e) => Err(std::io::Error::other(e)),
                };
            }
        }

        self.stop().await
    }

    async fn stop(self) -> Result<(), std::io::Error> {
        // 1. Stop polling providers
        info!("Cancelling in-flight provider polls...");
        self.shutdown.cancel();

        // 2. Stop HTTP server
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        // 3. Wait for the server task
        match self.server_task.await {
            Ok(Ok(_)) => info!("HTTP server shut down successfully"),
            Ok(Err(e)) => error!("HTTP server encountered error during shutdown: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
