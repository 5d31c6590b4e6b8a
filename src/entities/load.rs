use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The parts of an external load this service needs: who owns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, PolarClass)]
pub struct Load {
    #[polar(attribute)]
    pub id: Uuid,
    #[polar(attribute)]
    pub owner_id: Uuid,
}

/// Instruction for the fleet collaborator to attach a vehicle to a load once
/// its bidding session has a winner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub session_id: Uuid,
    pub load_id: Uuid,
    pub bid_id: Uuid,
    pub vehicle_id: Uuid,
    pub vehicle_owner_id: Uuid,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub session_id: Uuid,
    pub load_id: Uuid,
    pub bid_id: Uuid,
    pub vehicle_owner_id: Uuid,
    pub message: Option<String>,
}

/// How the downstream assignment went after a winner was accepted. The award
/// itself stands either way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Pending { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub session: super::Session,
    pub bid: super::Bid,
    pub assignment: AssignmentStatus,
}
