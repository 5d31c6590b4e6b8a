use super::Engine;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::{
    entities::{Event, EventKind, Session},
    error::Error,
    realtime::Channel,
    registry::Entry,
};

impl Engine {
    #[tracing::instrument(skip(self))]
    pub(super) fn fetch_entry(&self, id: &Uuid) -> Result<Arc<Entry>, Error> {
        self.registry.get(id)
    }

    /// Shared access: bids may be admitted concurrently, the session itself
    /// does not change while the guard is held.
    pub(super) async fn fetch_session(entry: &Entry) -> RwLockReadGuard<'_, Session> {
        entry.session.read().await
    }

    /// Exclusive access: waits for in-flight admissions to finish and blocks
    /// new ones until the guard is dropped.
    pub(super) async fn fetch_session_for_update(entry: &Entry) -> RwLockWriteGuard<'_, Session> {
        entry.session.write().await
    }

    /// The session as callers see it right now.
    pub(super) fn observe(&self, session: &Session) -> Session {
        session.observe(Utc::now(), self.ledger.total_bids(&session.id))
    }

    /// Publishes on the session channel. Call while holding the lock that
    /// covers the change, so sequence numbers follow the order of writes.
    pub(super) fn publish(&self, entry: &Entry, session_id: Uuid, kind: EventKind) -> Event {
        let event = Event::new(session_id, entry.next_sequence(), kind);
        self.broadcaster
            .publish(&Channel::Session(session_id), &event);
        event
    }

    /// Like `publish`, but user channels hear about it too.
    pub(super) fn announce(&self, entry: &Entry, session_id: Uuid, kind: EventKind) -> Event {
        let event = Event::new(session_id, entry.next_sequence(), kind);
        self.broadcaster.announce(&event);
        event
    }
}
