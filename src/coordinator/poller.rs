/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::coordinator::DispatchController;

/***************************************/
/*             Public API              */
/***************************************/
/// Drains the pending queue every `interval` until `shutdown` is cancelled.
pub async fn run_pending_poller(
    controller: Arc<DispatchController>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!("Polling pending requests every {:?}", interval);

    while !shutdown.is_cancelled() {
        if let Err(e) = controller.process_pending_requests().await {
            warn!("Failed to process pending requests: {}", e);
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Pending request poller stopped");
}
