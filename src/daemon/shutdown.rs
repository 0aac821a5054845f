use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `cancellation` once the process is asked to stop, either by ctrl-c or, on unix, by
/// SIGTERM which is what browsers send to native hosts.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => (),
                    _ = terminate.recv() => (),
                }
            }
            Err(e) => {
                error!("Can't listen for SIGTERM {e:?}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Received shutdown signal");
    cancellation.cancel();
}
