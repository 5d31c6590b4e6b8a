use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedReceiver, watch, Mutex};
use tokio::task::JoinHandle;

use crate::entities::Event;

/// Drains an inbox into shared client state. Events that queued up while the
/// snapshot was being read are applied first, in arrival order. Every event
/// that changes the state bumps `revision`.
pub(super) fn spawn<S, F>(
    mut inbox: UnboundedReceiver<Event>,
    state: Arc<Mutex<S>>,
    revision: Arc<watch::Sender<u64>>,
    apply: F,
) -> JoinHandle<()>
where
    S: Send + 'static,
    F: Fn(&mut S, &Event) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let mut guard = state.lock().await;
            let applied = apply(&mut guard, &event);
            drop(guard);

            if applied {
                revision.send_modify(|revision| *revision += 1);
            } else {
                tracing::debug!(
                    session_id = %event.session_id,
                    sequence = event.sequence,
                    event = event.name(),
                    "event changed nothing"
                );
            }
        }

        tracing::debug!("inbox closed, pump stopped");
    })
}
