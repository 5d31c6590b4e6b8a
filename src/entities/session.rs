use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{
    already_decided_error, invalid_window_error, out_of_range_error, session_closed_error, Error,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, PolarClass)]
pub struct Session {
    #[polar(attribute)]
    pub id: Uuid,
    #[polar(attribute)]
    pub load_id: Uuid,
    #[polar(attribute)]
    pub load_owner_id: Uuid,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub min_bid_amount: Option<f64>,
    pub max_bid_amount: Option<f64>,
    pub winning_bid_id: Option<Uuid>,
    pub total_bids: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Active,
    Closed {
        reason: CloseReason,
        closed_at: DateTime<Utc>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Expired,
    ClosedByOwner,
    WinnerSelected,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "active".into(),
            Self::Closed { .. } => "closed".into(),
        }
    }
}

/// Admission bounds for bids, validated once when the session is opened.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min_bid_amount: Option<f64>,
    pub max_bid_amount: Option<f64>,
}

impl Bounds {
    pub fn validate(&self) -> Result<(), Error> {
        for bound in [self.min_bid_amount, self.max_bid_amount].iter().flatten() {
            if !bound.is_finite() || *bound <= 0.0 {
                return Err(out_of_range_error());
            }
        }

        if let (Some(min), Some(max)) = (self.min_bid_amount, self.max_bid_amount) {
            if min > max {
                return Err(out_of_range_error());
            }
        }

        Ok(())
    }
}

impl Session {
    pub fn new(
        load_id: Uuid,
        load_owner_id: Uuid,
        end_time: DateTime<Utc>,
        bounds: Bounds,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if end_time <= now {
            return Err(invalid_window_error());
        }

        bounds.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            load_id,
            load_owner_id,
            status: Status::Active,
            start_time: now,
            end_time,
            min_bid_amount: bounds.min_bid_amount,
            max_bid_amount: bounds.max_bid_amount,
            winning_bid_id: None,
            total_bids: 0,
        })
    }

    /// True iff the stored flag is active and the window has not elapsed.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, Status::Active) && now < self.end_time
    }

    pub fn is_decided(&self) -> bool {
        self.winning_bid_id.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        match self.status {
            Status::Closed { reason, .. } => Some(reason),
            Status::Active => None,
        }
    }

    /// The session as a reader at `now` should see it: an expired session
    /// whose stored flag is still active reads as closed.
    pub fn observe(&self, now: DateTime<Utc>, total_bids: u64) -> Session {
        let mut session = self.clone();
        session.total_bids = total_bids;

        if matches!(session.status, Status::Active) && now >= session.end_time {
            session.status = Status::Closed {
                reason: CloseReason::Expired,
                closed_at: session.end_time,
            };
        }

        session
    }

    pub fn admits(&self, amount: f64) -> Result<(), Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(out_of_range_error());
        }

        if let Some(min) = self.min_bid_amount {
            if amount < min {
                return Err(out_of_range_error());
            }
        }

        if let Some(max) = self.max_bid_amount {
            if amount > max {
                return Err(out_of_range_error());
            }
        }

        Ok(())
    }

    /// Moves the stored flag to closed. Returns false if it already was.
    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub fn close(&mut self, reason: CloseReason, now: DateTime<Utc>) -> bool {
        match self.status {
            Status::Active => {
                self.status = Status::Closed {
                    reason,
                    closed_at: now,
                };
                true
            }
            Status::Closed { .. } => false,
        }
    }

    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub fn extend(&mut self, end_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), Error> {
        if !self.is_active(now) {
            return Err(session_closed_error());
        }

        if end_time <= self.end_time {
            return Err(invalid_window_error());
        }

        self.end_time = end_time;
        Ok(())
    }

    /// Records the winner and closes the session. Either both happen or neither.
    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    pub fn award(&mut self, bid_id: Uuid, now: DateTime<Utc>) -> Result<(), Error> {
        if self.is_decided() {
            return Err(already_decided_error());
        }

        self.winning_bid_id = Some(bid_id);

        // a session that already ran out keeps expiry as its closing reason
        if matches!(self.status, Status::Active) && now >= self.end_time {
            self.close(CloseReason::Expired, self.end_time);
        } else {
            self.close(CloseReason::WinnerSelected, now);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>, bounds: Bounds) -> Session {
        Session::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now + Duration::hours(1),
            bounds,
            now,
        )
        .unwrap()
    }

    #[test]
    fn window_must_end_in_the_future() {
        let now = Utc::now();

        let result = Session::new(Uuid::new_v4(), Uuid::new_v4(), now, Bounds::default(), now);
        assert_eq!(result.unwrap_err(), invalid_window_error());

        let result = Session::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now - Duration::seconds(1),
            Bounds::default(),
            now,
        );
        assert_eq!(result.unwrap_err(), invalid_window_error());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let bounds = Bounds {
            min_bid_amount: Some(2000.0),
            max_bid_amount: Some(1000.0),
        };

        assert_eq!(bounds.validate().unwrap_err(), out_of_range_error());
    }

    #[test]
    fn inactive_at_and_after_end_time_regardless_of_flag() {
        let now = Utc::now();
        let session = session(now, Bounds::default());

        assert!(session.is_active(now));
        assert!(session.is_active(session.end_time - Duration::milliseconds(1)));
        assert!(!session.is_active(session.end_time));
        assert!(!session.is_active(session.end_time + Duration::days(3)));
        assert_eq!(session.status, Status::Active);
    }

    #[test]
    fn observe_reports_expiry_without_mutating() {
        let now = Utc::now();
        let session = session(now, Bounds::default());

        let observed = session.observe(session.end_time, 3);

        assert_eq!(observed.total_bids, 3);
        assert_eq!(
            observed.status,
            Status::Closed {
                reason: CloseReason::Expired,
                closed_at: session.end_time,
            }
        );
        assert_eq!(session.status, Status::Active);
    }

    #[test]
    fn close_is_idempotent() {
        let now = Utc::now();
        let mut session = session(now, Bounds::default());

        assert!(session.close(CloseReason::ClosedByOwner, now));
        let first = session.status.clone();

        assert!(!session.close(CloseReason::WinnerSelected, now + Duration::seconds(5)));
        assert_eq!(session.status, first);
    }

    #[test]
    fn admission_bounds() {
        let now = Utc::now();
        let session = session(
            now,
            Bounds {
                min_bid_amount: Some(1000.0),
                max_bid_amount: Some(9000.0),
            },
        );

        assert!(session.admits(0.0).is_err());
        assert!(session.admits(-5.0).is_err());
        assert!(session.admits(f64::NAN).is_err());
        assert!(session.admits(500.0).is_err());
        assert!(session.admits(9000.5).is_err());
        assert!(session.admits(1000.0).is_ok());
        assert!(session.admits(9000.0).is_ok());
    }

    #[test]
    fn award_is_set_once() {
        let now = Utc::now();
        let mut session = session(now, Bounds::default());
        let first = Uuid::new_v4();

        session.award(first, now).unwrap();
        assert_eq!(session.winning_bid_id, Some(first));
        assert!(matches!(
            session.status,
            Status::Closed {
                reason: CloseReason::WinnerSelected,
                ..
            }
        ));

        let result = session.award(Uuid::new_v4(), now);
        assert_eq!(result.unwrap_err(), already_decided_error());
        assert_eq!(session.winning_bid_id, Some(first));
    }

    #[test]
    fn extend_only_moves_forward() {
        let now = Utc::now();
        let mut session = session(now, Bounds::default());
        let end_time = session.end_time;

        assert!(session.extend(end_time - Duration::minutes(1), now).is_err());
        assert!(session.extend(end_time + Duration::minutes(30), now).is_ok());
        assert_eq!(session.end_time, end_time + Duration::minutes(30));

        session.close(CloseReason::ClosedByOwner, now);
        let result = session.extend(end_time + Duration::hours(2), now);
        assert_eq!(result.unwrap_err(), session_closed_error());
    }
}
