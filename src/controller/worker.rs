// src/controller/worker.rs

//! The controller's single worker loop.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::controller::core::WorkerCore;
use crate::errors::Result;
use crate::mirror::Store;
use crate::notifier::Notifier;
use crate::queue::EventQueue;

/// Process keys until the queue is shut down and drained.
///
/// A key that fails to resolve or send is logged and dropped; it is only
/// seen again when the mirror schedules it again.
pub(crate) async fn run_worker(
    queue: Arc<EventQueue>,
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
    mut core: WorkerCore,
) {
    info!(kind = %core.kind(), "worker started");

    while let Some(key) = queue.get().await {
        match process_key(&mut core, &store, notifier.as_ref(), &key).await {
            Ok(()) => queue.forget(&key),
            Err(err) => error!(
                kind = %core.kind(),
                %key,
                error = %err,
                "failed to process key; dropping this cycle"
            ),
        }
        queue.done(&key);
    }

    info!(kind = %core.kind(), known = core.known_len(), "worker stopped");
}

async fn process_key(
    core: &mut WorkerCore,
    store: &Store,
    notifier: &dyn Notifier,
    key: &str,
) -> Result<()> {
    let current = store.get(key);
    let notification = core.resolve(key, current.as_deref())?;
    let action = notification.action;

    debug!(
        kind = %core.kind(),
        %key,
        %action,
        bytes = notification.object.len(),
        "sending notification"
    );
    notifier.send(notification).await?;
    core.commit(key, action);

    Ok(())
}
