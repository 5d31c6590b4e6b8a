use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::pump;
use crate::{
    api::{DynAPI, SessionFilter},
    auth::User,
    entities::{Event, EventKind, Session},
    error::{not_found_error, Error},
    realtime::{SubscriberId, Subscription},
};

/// Sessions a viewer could bid on. The viewer's own loads never show up.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenSessions {
    viewer: Uuid,
    sessions: HashMap<Uuid, Session>,
}

impl OpenSessions {
    pub fn new(viewer: Uuid, snapshot: Vec<Session>) -> Self {
        let mut open = Self {
            viewer,
            sessions: HashMap::new(),
        };

        for session in snapshot {
            open.insert(session);
        }

        open
    }

    pub fn apply(&mut self, event: &Event) -> bool {
        match &event.kind {
            EventKind::SessionOpened { session } => self.insert(session.clone()),
            EventKind::SessionClosed { .. } => self.sessions.remove(&event.session_id).is_some(),
            EventKind::SessionExtended { end_time } => {
                match self.sessions.get_mut(&event.session_id) {
                    Some(session) if *end_time > session.end_time => {
                        session.end_time = *end_time;
                        true
                    }
                    _ => false,
                }
            }
            EventKind::BidPlaced { .. }
            | EventKind::BidAmended { .. }
            | EventKind::TransportRequested { .. } => false,
        }
    }

    /// Still-active sessions, soonest to close first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .values()
            .filter(|session| session.is_active(now))
            .cloned()
            .collect();

        sessions.sort_by(|a, b| a.end_time.cmp(&b.end_time).then(a.id.cmp(&b.id)));
        sessions
    }

    fn insert(&mut self, session: Session) -> bool {
        if session.load_owner_id == self.viewer {
            return false;
        }

        if self.sessions.contains_key(&session.id) {
            return false;
        }

        self.sessions.insert(session.id, session);
        true
    }
}

/// Follows the viewer's user channel on top of an initial listing of the
/// active sessions. Opened sessions are added, closed ones dropped, and
/// extensions move a listed session's end time.
pub struct OpenSessionFeed {
    api: DynAPI,
    user: User,
    subscriber: SubscriberId,
    state: Arc<Mutex<OpenSessions>>,
    revision_tx: Arc<watch::Sender<u64>>,
    revision: watch::Receiver<u64>,
    pump: JoinHandle<()>,
}

impl OpenSessionFeed {
    #[tracing::instrument(skip(api))]
    pub async fn mount(api: DynAPI, user: User) -> Result<Self, Error> {
        let Subscription { id, inbox } = api.connect();

        let state = match snapshot(&api, &user, id).await {
            Ok(state) => state,
            Err(err) => {
                api.disconnect(id);
                return Err(err);
            }
        };
        let state = Arc::new(Mutex::new(state));

        let (revision_tx, revision) = watch::channel(0);
        let revision_tx = Arc::new(revision_tx);

        let pump = pump::spawn(inbox, state.clone(), revision_tx.clone(), OpenSessions::apply);

        Ok(Self {
            api,
            user,
            subscriber: id,
            state,
            revision_tx,
            revision,
            pump,
        })
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.lock().await.active(Utc::now())
    }

    pub fn updates(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }

    #[tracing::instrument(skip(self))]
    pub async fn reconnect(&mut self) -> Result<(), Error> {
        self.pump.abort();
        let _ = (&mut self.pump).await;
        self.api.disconnect(self.subscriber);

        let Subscription { id, inbox } = self.api.connect();

        let fresh = match snapshot(&self.api, &self.user, id).await {
            Ok(state) => state,
            Err(err) => {
                self.api.disconnect(id);
                return Err(err);
            }
        };

        *self.state.lock().await = fresh;
        self.revision_tx.send_modify(|revision| *revision += 1);

        self.subscriber = id;
        self.pump = pump::spawn(
            inbox,
            self.state.clone(),
            self.revision_tx.clone(),
            OpenSessions::apply,
        );

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn teardown(mut self) {
        self.pump.abort();
        let _ = (&mut self.pump).await;

        self.api.leave_user(&self.user, self.subscriber);
        self.api.disconnect(self.subscriber);
    }
}

impl Drop for OpenSessionFeed {
    fn drop(&mut self) {
        self.pump.abort();
        self.api.disconnect(self.subscriber);
    }
}

async fn snapshot(
    api: &DynAPI,
    user: &User,
    subscriber: SubscriberId,
) -> Result<OpenSessions, Error> {
    if !api.join_user(user, subscriber) {
        return Err(not_found_error());
    }

    let filter = SessionFilter {
        owned_by: None,
        excluding_owner: Some(user.id),
    };
    let sessions = api.active_sessions(user.clone(), filter).await?;

    Ok(OpenSessions::new(user.id, sessions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Bounds, CloseReason};
    use chrono::Duration;

    fn session(owner: Uuid) -> Session {
        let now = Utc::now();

        Session::new(
            Uuid::new_v4(),
            owner,
            now + Duration::hours(1),
            Bounds::default(),
            now,
        )
        .unwrap()
    }

    fn opened(session: &Session) -> Event {
        Event::new(
            session.id,
            1,
            EventKind::SessionOpened {
                session: session.clone(),
            },
        )
    }

    #[test]
    fn own_loads_are_filtered_out() {
        let viewer = Uuid::new_v4();
        let mut open = OpenSessions::new(viewer, vec![session(viewer)]);

        assert!(open.active(Utc::now()).is_empty());

        let mine = session(viewer);
        let theirs = session(Uuid::new_v4());

        assert!(!open.apply(&opened(&mine)));
        assert!(open.apply(&opened(&theirs)));
        assert!(!open.apply(&opened(&theirs)));

        let active = open.active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, theirs.id);
    }

    #[test]
    fn closures_and_extensions_update_the_listing() {
        let viewer = Uuid::new_v4();
        let closing = session(Uuid::new_v4());
        let extended = session(Uuid::new_v4());
        let mut open = OpenSessions::new(viewer, vec![closing.clone(), extended.clone()]);

        let closed = Event::new(
            closing.id,
            2,
            EventKind::SessionClosed {
                reason: CloseReason::ClosedByOwner,
                winning_bid_id: None,
            },
        );
        assert!(open.apply(&closed));
        assert!(!open.apply(&closed));

        let end_time = extended.end_time + Duration::hours(2);
        let extension = Event::new(extended.id, 2, EventKind::SessionExtended { end_time });
        assert!(open.apply(&extension));
        assert!(!open.apply(&extension));

        // a stale opened event does not roll the extension back
        assert!(!open.apply(&opened(&extended)));

        let active = open.active(Utc::now());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, extended.id);
        assert_eq!(active[0].end_time, end_time);
        assert_eq!(open.active(extended.end_time + Duration::minutes(1)).len(), 1);
    }
}
