use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::AwardAPI,
    auth::User,
    entities::{
        Assignment, AssignmentStatus, Award, Bid, CloseReason, Event, EventKind, Session,
        TransportRequest,
    },
    error::{already_decided_error, bid_not_found_error, not_awarded_error, Error},
    realtime::Channel,
};

#[async_trait]
impl AwardAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn select_winner(
        &self,
        user: User,
        session_id: Uuid,
        bid_id: Uuid,
    ) -> Result<Session, Error> {
        let entry = self.fetch_entry(&session_id)?;
        let mut guard = Self::fetch_session_for_update(&entry).await;

        self.authorize(user.clone(), "select_winner", guard.clone())?;

        if guard.is_decided() {
            tracing::info!("winner already selected, returning early...");
            return Err(already_decided_error());
        }

        let bid = self.ledger.find_in_session(&session_id, &bid_id)?;

        // work on a copy and swap it in, so a failure leaves the stored
        // session untouched
        let mut session = guard.clone();
        session.award(bid.id, Utc::now())?;
        *guard = session;

        let reason = guard.close_reason().unwrap_or(CloseReason::WinnerSelected);

        tracing::info!(
            %session_id,
            bid_id = %bid.id,
            amount = bid.amount,
            "winner selected"
        );

        self.announce(
            &entry,
            session_id,
            EventKind::SessionClosed {
                reason,
                winning_bid_id: Some(bid.id),
            },
        );

        Ok(self.observe(&guard))
    }

    #[tracing::instrument(skip(self))]
    async fn accept_bid(&self, user: User, session_id: Uuid, bid_id: Uuid) -> Result<Award, Error> {
        let session = self.select_winner(user, session_id, bid_id).await?;

        let mut bid = self.ledger.find_in_session(&session_id, &bid_id)?;
        bid.is_winning = true;

        let assignment = assignment_for(&session, &bid);
        let status = self.assign(assignment).await;

        Ok(Award {
            session,
            bid,
            assignment: status,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn retry_assignment(&self, user: User, session_id: Uuid) -> Result<Award, Error> {
        let entry = self.fetch_entry(&session_id)?;
        let session = Self::fetch_session(&entry).await.clone();

        self.authorize(user.clone(), "select_winner", session.clone())?;

        let winning_bid_id = session
            .winning_bid_id
            .ok_or_else(not_awarded_error)?;

        let mut bid = self.ledger.find_in_session(&session_id, &winning_bid_id)?;
        bid.is_winning = true;

        let status = if self.confirmed_assignment(&session_id).is_some() {
            tracing::info!("assignment already confirmed, returning early...");
            AssignmentStatus::Assigned
        } else {
            let assignment = self
                .pending_assignment(&session_id)
                .unwrap_or_else(|| assignment_for(&session, &bid));
            self.assign(assignment).await
        };

        Ok(Award {
            session: self.observe(&session),
            bid,
            assignment: status,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn send_transport_request(
        &self,
        user: User,
        bid_id: Uuid,
        message: Option<String>,
    ) -> Result<TransportRequest, Error> {
        let bid = self
            .ledger
            .find(&bid_id)
            .ok_or_else(bid_not_found_error)?;

        let entry = self.fetch_entry(&bid.session_id)?;
        let session = Self::fetch_session(&entry).await.clone();

        self.authorize(user.clone(), "request_transport", session.clone())?;

        if session.winning_bid_id != Some(bid.id) {
            return Err(not_awarded_error());
        }

        let request = TransportRequest {
            session_id: session.id,
            load_id: session.load_id,
            bid_id: bid.id,
            vehicle_owner_id: bid.vehicle_owner_id,
            message: message.clone(),
        };

        self.fleet.send_transport_request(&request).await?;

        let event = Event::new(
            session.id,
            entry.next_sequence(),
            EventKind::TransportRequested {
                bid_id: bid.id,
                message,
            },
        );
        self.broadcaster
            .publish(&Channel::User(bid.vehicle_owner_id), &event);

        tracing::info!(bid_id = %bid.id, "transport request sent");

        Ok(request)
    }
}

impl Engine {
    /// Hands the award to the fleet. A failure does not undo the award; the
    /// assignment stays queued until a retry gets through.
    async fn assign(&self, assignment: Assignment) -> AssignmentStatus {
        match self.fleet.assign(&assignment).await {
            Ok(()) => {
                self.pending_assignments.remove(&assignment.session_id);
                tracing::info!(session_id = %assignment.session_id, "assignment confirmed");

                self.confirmed_assignments
                    .insert(assignment.session_id, assignment);

                AssignmentStatus::Assigned
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %assignment.session_id,
                    error = %err,
                    "assignment failed, queued for retry"
                );

                let reason = err.message.clone();
                self.pending_assignments
                    .insert(assignment.session_id, assignment);

                AssignmentStatus::Pending { reason }
            }
        }
    }
}

fn assignment_for(session: &Session, bid: &Bid) -> Assignment {
    Assignment {
        session_id: session.id,
        load_id: session.load_id,
        bid_id: bid.id,
        vehicle_id: bid.vehicle_id,
        vehicle_owner_id: bid.vehicle_owner_id,
        amount: bid.amount,
    }
}
