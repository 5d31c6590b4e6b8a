use super::Engine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::{NewSession, SessionAPI, SessionFilter},
    auth::User,
    entities::{CloseReason, Event, EventKind, Session},
    error::Error,
};

#[async_trait]
impl SessionAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_session(&self, user: User, params: NewSession) -> Result<Session, Error> {
        let load = self.fleet.find_load(params.load_id).await?;

        self.authorize(user.clone(), "open_bidding", load.clone())?;

        let session = Session::new(
            load.id,
            load.owner_id,
            params.end_time,
            params.bounds,
            Utc::now(),
        )?;

        // the book exists before the session becomes visible
        self.ledger.open(session.id);
        let entry = match self.registry.insert(session.clone()) {
            Ok(entry) => entry,
            Err(err) => {
                self.ledger.discard(&session.id);
                return Err(err);
            }
        };

        let event = Event::new(
            session.id,
            entry.next_sequence(),
            EventKind::SessionOpened {
                session: session.clone(),
            },
        );
        let notified = self.broadcaster.publish_to_users(&event);

        tracing::info!(
            session_id = %session.id,
            load_id = %session.load_id,
            end_time = %session.end_time,
            notified,
            "bidding session opened"
        );

        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    async fn find_session(&self, user: User, id: Uuid) -> Result<Session, Error> {
        let entry = self.fetch_entry(&id)?;
        let session = Self::fetch_session(&entry).await.clone();

        self.authorize(user.clone(), "read", session.clone())?;

        Ok(self.observe(&session))
    }

    #[tracing::instrument(skip(self))]
    async fn find_session_by_load(&self, user: User, load_id: Uuid) -> Result<Session, Error> {
        let id = self.registry.session_id_for_load(&load_id)?;

        self.find_session(user, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn active_sessions(
        &self,
        user: User,
        filter: SessionFilter,
    ) -> Result<Vec<Session>, Error> {
        let now = Utc::now();
        let mut sessions = Vec::new();

        for entry in self.registry.entries() {
            let session = Self::fetch_session(&entry).await.clone();

            if !session.is_active(now) || !filter.matches(&session) {
                continue;
            }

            if self.authorize(user.clone(), "read", session.clone()).is_err() {
                continue;
            }

            sessions.push(self.observe(&session));
        }

        // soonest to close first
        sessions.sort_by(|a, b| a.end_time.cmp(&b.end_time).then(a.id.cmp(&b.id)));

        Ok(sessions)
    }

    #[tracing::instrument(skip(self))]
    async fn close_session(&self, user: User, id: Uuid) -> Result<Session, Error> {
        let entry = self.fetch_entry(&id)?;
        let mut session = Self::fetch_session_for_update(&entry).await;

        self.authorize(user.clone(), "close", session.clone())?;

        let now = Utc::now();
        let (reason, closed_at) = if now >= session.end_time {
            (CloseReason::Expired, session.end_time)
        } else {
            (CloseReason::ClosedByOwner, now)
        };

        if session.close(reason, closed_at) {
            tracing::info!(session_id = %id, ?reason, "bidding session closed");

            self.announce(
                &entry,
                id,
                EventKind::SessionClosed {
                    reason,
                    winning_bid_id: session.winning_bid_id,
                },
            );
        } else {
            tracing::info!(session_id = %id, "bidding session already closed");
        }

        Ok(self.observe(&session))
    }

    #[tracing::instrument(skip(self))]
    async fn extend_session(
        &self,
        user: User,
        id: Uuid,
        end_time: DateTime<Utc>,
    ) -> Result<Session, Error> {
        let entry = self.fetch_entry(&id)?;
        let mut session = Self::fetch_session_for_update(&entry).await;

        self.authorize(user.clone(), "extend", session.clone())?;

        session.extend(end_time, Utc::now())?;

        tracing::info!(session_id = %id, %end_time, "bidding session extended");

        self.announce(&entry, id, EventKind::SessionExtended { end_time });

        Ok(self.observe(&session))
    }
}
