use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::RealtimeAPI,
    auth::User,
    entities::{Event, EventKind, Session},
    error::{not_found_error, Error},
    realtime::{Channel, SubscriberId, Subscription},
};

#[async_trait]
impl RealtimeAPI for Engine {
    fn connect(&self) -> Subscription {
        self.broadcaster.connect()
    }

    /// Joins the session channel and returns the session as of the join. A
    /// subscriber joining a closed session is sent the closure right away, so
    /// it never waits for an event that has already gone out.
    #[tracing::instrument(skip(self))]
    async fn join_session(
        &self,
        user: User,
        subscriber: SubscriberId,
        session_id: Uuid,
    ) -> Result<Session, Error> {
        let entry = self.fetch_entry(&session_id)?;

        if !self.broadcaster.is_connected(&subscriber) {
            return Err(not_found_error());
        }

        // membership first, then the read: a close that lands in between is
        // either visible to the read or published to us
        self.broadcaster
            .join(subscriber, Channel::Session(session_id));

        let session = Self::fetch_session(&entry).await.clone();

        if let Err(err) = self.authorize(user.clone(), "read", session.clone()) {
            self.broadcaster
                .leave(&subscriber, &Channel::Session(session_id));
            return Err(err);
        }

        let session = self.observe(&session);

        if let Some(reason) = session.close_reason() {
            let event = Event::new(
                session_id,
                entry.last_sequence(),
                EventKind::SessionClosed {
                    reason,
                    winning_bid_id: session.winning_bid_id,
                },
            );
            self.broadcaster.deliver(&subscriber, event);
        }

        Ok(session)
    }

    fn leave_session(&self, subscriber: SubscriberId, session_id: Uuid) -> bool {
        self.broadcaster
            .leave(&subscriber, &Channel::Session(session_id))
    }

    fn join_user(&self, user: &User, subscriber: SubscriberId) -> bool {
        self.broadcaster.join(subscriber, Channel::User(user.id))
    }

    fn leave_user(&self, user: &User, subscriber: SubscriberId) -> bool {
        self.broadcaster.leave(&subscriber, &Channel::User(user.id))
    }

    fn disconnect(&self, subscriber: SubscriberId) {
        self.broadcaster.disconnect(&subscriber);
    }
}
