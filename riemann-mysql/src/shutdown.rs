use std::future::Future;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("failed to install SIGTERM handler, only SIGINT stops the agent: {}", e);
            if let Err(e) = ctrl_c.await {
                error!("failed to listen for SIGINT: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

/// Cancel `shutdown` once a termination signal arrives.
pub fn spawn_signal_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    cancel_on(wait_for_shutdown_signal(), shutdown)
}

/// Cancel `shutdown` when `trigger` resolves.
pub fn cancel_on<F>(trigger: F, shutdown: CancellationToken) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        trigger.await;
        shutdown.cancel();
    })
}
