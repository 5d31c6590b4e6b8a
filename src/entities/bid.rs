use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub session_id: Uuid,
    pub vehicle_owner_id: Uuid,
    pub vehicle_id: Uuid,
    pub amount: f64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_winning: bool,
}

impl Bid {
    pub fn new(
        session_id: Uuid,
        vehicle_owner_id: Uuid,
        vehicle_id: Uuid,
        amount: f64,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Bid {
            id: Uuid::new_v4(),
            session_id,
            vehicle_owner_id,
            vehicle_id,
            amount,
            message,
            created_at: now,
            updated_at: now,
            is_winning: false,
        }
    }

    /// Applies a resubmission from the same owner. `created_at` is kept; `updated_at`
    /// always moves forward, even if the clock reads the same instant twice.
    pub fn amend(
        &mut self,
        vehicle_id: Uuid,
        amount: f64,
        message: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.vehicle_id = vehicle_id;
        self.amount = amount;
        self.message = message;
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }
}

/// Highest amount first; at equal amounts the earliest bidder ranks higher.
pub fn rank(a: &Bid, b: &Bid) -> Ordering {
    b.amount
        .total_cmp(&a.amount)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn ranked(mut bids: Vec<Bid>, winning_bid_id: Option<Uuid>) -> Vec<Bid> {
    for bid in bids.iter_mut() {
        bid.is_winning = Some(bid.id) == winning_bid_id;
    }

    bids.sort_by(rank);
    bids
}
