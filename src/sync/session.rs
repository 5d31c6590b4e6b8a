use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{pump, BidBook, Countdown};
use crate::{
    api::DynAPI,
    auth::User,
    entities::{Bid, Event, EventKind, Session},
    error::Error,
    realtime::{SubscriberId, Subscription},
};

/// One session as a client currently sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub session: Session,
    pub book: BidBook,
    last_sequence: u64,
}

impl SessionState {
    pub fn new(session: Session, bids: Vec<Bid>) -> Self {
        Self {
            session,
            book: BidBook::from_snapshot(bids),
            last_sequence: 0,
        }
    }

    /// Highest sequence seen since the last snapshot.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Merges one pushed event. Returns false when it changed nothing, which
    /// is the case for duplicates and for events of other sessions.
    pub fn apply(&mut self, event: &Event) -> bool {
        if event.session_id != self.session.id {
            return false;
        }

        self.last_sequence = self.last_sequence.max(event.sequence);

        match &event.kind {
            EventKind::BidPlaced { bid } | EventKind::BidAmended { bid } => {
                let applied = self.book.apply(bid);
                self.session.total_bids = self.session.total_bids.max(self.book.len() as u64);
                applied
            }
            EventKind::SessionExtended { end_time } => {
                if *end_time <= self.session.end_time {
                    return false;
                }

                self.session.end_time = *end_time;
                true
            }
            EventKind::SessionClosed {
                reason,
                winning_bid_id,
            } => {
                let mut changed = false;

                if let Some(bid_id) = winning_bid_id {
                    if self.session.winning_bid_id.is_none() {
                        self.session.winning_bid_id = Some(*bid_id);
                        changed = true;
                    }
                    self.book.award(*bid_id);
                }

                self.session.close(*reason, event.emitted_at) || changed
            }
            EventKind::SessionOpened { .. } | EventKind::TransportRequested { .. } => false,
        }
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        if !self.session.is_active(now) {
            return Countdown::default();
        }

        Countdown::until(self.session.end_time, now)
    }
}

/// Keeps a [`SessionState`] in step with the server: a snapshot on mount and
/// on every reconnect, pushed events in between, and a countdown recomputed on
/// a fixed tick.
pub struct SessionSync {
    api: DynAPI,
    user: User,
    session_id: Uuid,
    subscriber: SubscriberId,
    state: Arc<Mutex<SessionState>>,
    revision_tx: Arc<watch::Sender<u64>>,
    revision: watch::Receiver<u64>,
    countdown: watch::Receiver<Countdown>,
    pump: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl SessionSync {
    #[tracing::instrument(skip(api))]
    pub async fn mount(
        api: DynAPI,
        user: User,
        session_id: Uuid,
        tick: Duration,
    ) -> Result<Self, Error> {
        let Subscription { id, inbox } = api.connect();

        // events queue up in the inbox until the snapshot is in place
        let state = match snapshot(&api, &user, id, session_id).await {
            Ok(state) => state,
            Err(err) => {
                api.disconnect(id);
                return Err(err);
            }
        };

        let initial = state.countdown(Utc::now());
        let state = Arc::new(Mutex::new(state));

        let (revision_tx, revision) = watch::channel(0);
        let revision_tx = Arc::new(revision_tx);

        let pump = pump::spawn(inbox, state.clone(), revision_tx.clone(), SessionState::apply);
        let (countdown, ticker) = spawn_ticker(state.clone(), initial, tick);

        tracing::info!(subscriber_id = %id, "session view mounted");

        Ok(Self {
            api,
            user,
            session_id,
            subscriber: id,
            state,
            revision_tx,
            revision,
            countdown,
            pump,
            ticker,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn bids(&self) -> Vec<Bid> {
        self.state.lock().await.book.ranked()
    }

    pub fn countdown(&self) -> Countdown {
        *self.countdown.borrow()
    }

    pub fn countdown_updates(&self) -> watch::Receiver<Countdown> {
        self.countdown.clone()
    }

    /// Changes whenever an event or a snapshot altered the state.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }

    /// Drops the old connection, joins again on a fresh one and replaces the
    /// state with a new snapshot. Anything missed while disconnected is
    /// covered by the snapshot.
    #[tracing::instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn reconnect(&mut self) -> Result<(), Error> {
        self.pump.abort();
        let _ = (&mut self.pump).await;
        self.api.disconnect(self.subscriber);

        let Subscription { id, inbox } = self.api.connect();

        let fresh = match snapshot(&self.api, &self.user, id, self.session_id).await {
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
            SessionState::apply,
        );

        tracing::info!(subscriber_id = %id, "session view reconnected");

        Ok(())
    }

    /// Leaves the session channel and stops the pump and the ticker.
    #[tracing::instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn teardown(mut self) {
        self.pump.abort();
        self.ticker.abort();
        let _ = (&mut self.pump).await;
        let _ = (&mut self.ticker).await;

        self.api.leave_session(self.subscriber, self.session_id);
        self.api.disconnect(self.subscriber);

        tracing::info!("session view torn down");
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.pump.abort();
        self.ticker.abort();
        // no-op after teardown
        self.api.disconnect(self.subscriber);
    }
}

async fn snapshot(
    api: &DynAPI,
    user: &User,
    subscriber: SubscriberId,
    session_id: Uuid,
) -> Result<SessionState, Error> {
    let session = api
        .join_session(user.clone(), subscriber, session_id)
        .await?;
    let bids = api.find_bids(user.clone(), session_id).await?;

    Ok(SessionState::new(session, bids))
}

fn spawn_ticker(
    state: Arc<Mutex<SessionState>>,
    initial: Countdown,
    tick: Duration,
) -> (watch::Receiver<Countdown>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);

        loop {
            interval.tick().await;

            let countdown = state.lock().await.countdown(Utc::now());
            tx.send_if_modified(|current| {
                if *current == countdown {
                    return false;
                }
                *current = countdown;
                true
            });

            if tx.is_closed() {
                break;
            }
        }
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Bounds, CloseReason};
    use chrono::Duration;

    fn state() -> SessionState {
        let now = Utc::now();
        let session = Session::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now + Duration::hours(1),
            Bounds::default(),
            now,
        )
        .unwrap();

        SessionState::new(session, vec![])
    }

    fn bid(state: &SessionState, amount: f64) -> Bid {
        Bid::new(
            state.session.id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            amount,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn replayed_events_are_no_ops() {
        let mut state = state();
        let bid = bid(&state, 100.0);
        let event = Event::new(state.session.id, 1, EventKind::BidPlaced { bid });

        assert!(state.apply(&event));
        let once = state.clone();

        assert!(!state.apply(&event));
        assert_eq!(state, once);
        assert_eq!(state.session.total_bids, 1);
        assert_eq!(state.last_sequence(), 1);
    }

    #[test]
    fn events_of_other_sessions_are_ignored() {
        let mut state = state();
        let event = Event::new(
            Uuid::new_v4(),
            1,
            EventKind::SessionClosed {
                reason: CloseReason::ClosedByOwner,
                winning_bid_id: None,
            },
        );

        assert!(!state.apply(&event));
        assert_eq!(state.session.close_reason(), None);
    }

    #[test]
    fn closure_marks_winner_and_stops_countdown() {
        let mut state = state();
        let bid = bid(&state, 100.0);

        state.apply(&Event::new(
            state.session.id,
            1,
            EventKind::BidPlaced { bid: bid.clone() },
        ));

        let closed = Event::new(
            state.session.id,
            2,
            EventKind::SessionClosed {
                reason: CloseReason::WinnerSelected,
                winning_bid_id: Some(bid.id),
            },
        );

        assert!(state.apply(&closed));
        assert!(!state.apply(&closed));

        assert_eq!(state.session.winning_bid_id, Some(bid.id));
        assert!(state.book.ranked()[0].is_winning);
        assert!(state.countdown(Utc::now()).is_over());
    }

    #[test]
    fn extension_only_moves_forward() {
        let mut state = state();
        let end_time = state.session.end_time;

        let earlier = Event::new(
            state.session.id,
            1,
            EventKind::SessionExtended {
                end_time: end_time - Duration::minutes(1),
            },
        );
        let later = Event::new(
            state.session.id,
            2,
            EventKind::SessionExtended {
                end_time: end_time + Duration::minutes(30),
            },
        );

        assert!(!state.apply(&earlier));
        assert!(state.apply(&later));
        assert_eq!(state.session.end_time, end_time + Duration::minutes(30));
    }
}
