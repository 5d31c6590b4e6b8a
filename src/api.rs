use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Award, Bid, Bounds, Reference, Session, TransportRequest};
use crate::error::Error;
use crate::realtime::{SubscriberId, Subscription};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSession {
    pub load_id: Uuid,
    pub end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub bounds: Bounds,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidParams {
    pub vehicle: Reference,
    pub amount: f64,
    pub message: Option<String>,
}

/// Narrows `active_sessions` by who owns the load.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    pub owned_by: Option<Uuid>,
    pub excluding_owner: Option<Uuid>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        if let Some(owner) = self.owned_by {
            if session.load_owner_id != owner {
                return false;
            }
        }

        if let Some(owner) = self.excluding_owner {
            if session.load_owner_id == owner {
                return false;
            }
        }

        true
    }
}

#[async_trait]
pub trait SessionAPI {
    async fn create_session(&self, user: User, params: NewSession) -> Result<Session, Error>;
    async fn find_session(&self, user: User, id: Uuid) -> Result<Session, Error>;
    async fn find_session_by_load(&self, user: User, load_id: Uuid) -> Result<Session, Error>;
    async fn active_sessions(
        &self,
        user: User,
        filter: SessionFilter,
    ) -> Result<Vec<Session>, Error>;
    async fn close_session(&self, user: User, id: Uuid) -> Result<Session, Error>;
    async fn extend_session(
        &self,
        user: User,
        id: Uuid,
        end_time: DateTime<Utc>,
    ) -> Result<Session, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn place_bid(&self, user: User, session_id: Uuid, params: BidParams)
        -> Result<Bid, Error>;
    async fn find_bids(&self, user: User, session_id: Uuid) -> Result<Vec<Bid>, Error>;
}

#[async_trait]
pub trait AwardAPI {
    async fn select_winner(&self, user: User, session_id: Uuid, bid_id: Uuid)
        -> Result<Session, Error>;
    async fn accept_bid(&self, user: User, session_id: Uuid, bid_id: Uuid)
        -> Result<Award, Error>;
    async fn retry_assignment(&self, user: User, session_id: Uuid) -> Result<Award, Error>;
    async fn send_transport_request(
        &self,
        user: User,
        bid_id: Uuid,
        message: Option<String>,
    ) -> Result<TransportRequest, Error>;
}

#[async_trait]
pub trait RealtimeAPI {
    fn connect(&self) -> Subscription;
    async fn join_session(
        &self,
        user: User,
        subscriber: SubscriberId,
        session_id: Uuid,
    ) -> Result<Session, Error>;
    fn leave_session(&self, subscriber: SubscriberId, session_id: Uuid) -> bool;
    fn join_user(&self, user: &User, subscriber: SubscriberId) -> bool;
    fn leave_user(&self, user: &User, subscriber: SubscriberId) -> bool;
    fn disconnect(&self, subscriber: SubscriberId);
}

pub trait API: SessionAPI + BidAPI + AwardAPI + RealtimeAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
