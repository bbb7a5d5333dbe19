//! Main application run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::command::{Executor, ExecutorOptions, ProcessExecutor};
use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::server::{serve, AgentService};

/// How long in-flight requests get to finish after a shutdown signal
pub const MAX_SHUTDOWN_DELAY: Duration = Duration::from_secs(10);

/// Run the periphery agent until `shutdown_signal` resolves
pub async fn run(
    config: AgentConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    info!("Initializing periphery agent...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let cancel = CancellationToken::new();
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), cancel.clone());

    let executor: Arc<dyn Executor> = Arc::new(ProcessExecutor::new(
        ExecutorOptions {
            timeout: config.command_timeout,
        },
        cancel,
    ));
    let port = config.port;
    let service = match AgentService::new(Arc::new(config), executor) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Failed to start agent: {}", e);
            return Err(e);
        }
    };

    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(port, service, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;
    shutdown_manager.with_server_handle(server_handle);

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    cancel: CancellationToken,
    server_handle: Option<JoinHandle<Result<(), AgentError>>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, cancel: CancellationToken) -> Self {
        Self {
            shutdown_tx,
            cancel,
            server_handle: None,
        }
    }

    fn with_server_handle(&mut self, handle: JoinHandle<Result<(), AgentError>>) {
        self.server_handle = Some(handle);
    }

    async fn shutdown(&mut self) -> Result<(), AgentError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(MAX_SHUTDOWN_DELAY, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, killing running commands...",
                    MAX_SHUTDOWN_DELAY
                );
                self.cancel.cancel();
                Err(AgentError::ServerError("shutdown timed out".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), AgentError> {
        info!("Shutting down periphery agent...");

        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| AgentError::ServerError(e.to_string()))??;
        }

        // nothing can start a command any more
        self.cancel.cancel();
        info!("Shutdown complete");
        Ok(())
    }
}
