use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Bid, CloseReason, Session};

/// A change pushed to realtime subscribers. `sequence` increases monotonically
/// per session, so consumers can drop duplicates and detect gaps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub session_id: Uuid,
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventKind {
    SessionOpened {
        session: Session,
    },
    BidPlaced {
        bid: Bid,
    },
    BidAmended {
        bid: Bid,
    },
    SessionExtended {
        end_time: DateTime<Utc>,
    },
    SessionClosed {
        reason: CloseReason,
        winning_bid_id: Option<Uuid>,
    },
    TransportRequested {
        bid_id: Uuid,
        message: Option<String>,
    },
}

impl Event {
    pub fn new(session_id: Uuid, sequence: u64, kind: EventKind) -> Self {
        Self {
            session_id,
            sequence,
            emitted_at: Utc::now(),
            kind,
        }
    }

    pub fn bid_id(&self) -> Option<Uuid> {
        match &self.kind {
            EventKind::BidPlaced { bid } | EventKind::BidAmended { bid } => Some(bid.id),
            EventKind::SessionClosed { winning_bid_id, .. } => *winning_bid_id,
            EventKind::TransportRequested { bid_id, .. } => Some(*bid_id),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::SessionOpened { .. } => "session-opened",
            EventKind::BidPlaced { .. } => "bid-placed",
            EventKind::BidAmended { .. } => "bid-amended",
            EventKind::SessionExtended { .. } => "session-extended",
            EventKind::SessionClosed { .. } => "session-closed",
            EventKind::TransportRequested { .. } => "transport-requested",
        }
    }
}
