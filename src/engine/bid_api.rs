use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{BidAPI, BidParams},
    auth::User,
    entities::{ranked, Bid, EventKind},
    error::{session_closed_error, Error},
    ledger::{Admission, Submission},
};

#[async_trait]
impl BidAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn place_bid(
        &self,
        user: User,
        session_id: Uuid,
        params: BidParams,
    ) -> Result<Bid, Error> {
        let vehicle_id = params.vehicle.id()?;

        let entry = self.fetch_entry(&session_id)?;
        let session = Self::fetch_session(&entry).await;

        self.authorize(user.clone(), "bid", session.clone())?;

        // admission is decided now, under the session lock, not when the
        // request was sent
        let now = Utc::now();

        if !session.is_active(now) {
            tracing::info!("rejecting bid, session is closed");
            return Err(session_closed_error());
        }

        session.admits(params.amount)?;

        let submission = Submission {
            vehicle_owner_id: user.id,
            vehicle_id,
            amount: params.amount,
            message: params.message,
        };

        let admission = self.ledger.submit(session_id, submission, now, |admission| {
            let kind = match admission {
                Admission::Placed(bid) => EventKind::BidPlaced { bid: bid.clone() },
                Admission::Amended(bid) => EventKind::BidAmended { bid: bid.clone() },
            };

            self.publish(&entry, session_id, kind);
        })?;

        drop(session);

        match &admission {
            Admission::Placed(bid) => {
                tracing::info!(bid_id = %bid.id, amount = bid.amount, "bid placed")
            }
            Admission::Amended(bid) => {
                tracing::info!(bid_id = %bid.id, amount = bid.amount, "bid amended")
            }
        }

        Ok(admission.into_bid())
    }

    #[tracing::instrument(skip(self))]
    async fn find_bids(&self, user: User, session_id: Uuid) -> Result<Vec<Bid>, Error> {
        let entry = self.fetch_entry(&session_id)?;
        let session = Self::fetch_session(&entry).await.clone();

        self.authorize(user.clone(), "read", session.clone())?;

        let bids = self.ledger.bids(&session_id)?;

        Ok(ranked(bids, session.winning_bid_id))
    }
}
