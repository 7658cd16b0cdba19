//! Background timeout enforcement.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::controller::ArtifactController;

/// Spawns a task that calls [`ArtifactController::poll_timeouts`] every
/// `watchdog_interval_ms`.
///
/// The task holds only a weak reference and exits once the controller is
/// dropped. Must be called from within a tokio runtime.
pub fn spawn_timeout_watchdog(controller: &Arc<ArtifactController>) -> JoinHandle<()> {
    let period = controller.config().watchdog_interval();
    let controller = Arc::downgrade(controller);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(controller) = controller.upgrade() else {
                debug!("artifact watchdog stopping: controller dropped");
                break;
            };
            let timed_out = controller.poll_timeouts(Utc::now());
            if !timed_out.is_empty() {
                info!(count = timed_out.len(), "artifact watchdog timed out artifacts");
            }
        }
    })
}
