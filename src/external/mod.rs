mod fleet_api;
mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Assignment, Load, TransportRequest};
use crate::error::Error;

pub use fleet_api::FleetApi;
pub use memory::MemoryFleet;

/// The load and vehicle side of the product. This service reads load
/// ownership from it and hands it the outcome of an auction; it owns none of
/// that state.
#[async_trait]
pub trait Fleet {
    async fn find_load(&self, load_id: Uuid) -> Result<Load, Error>;
    async fn assign(&self, assignment: &Assignment) -> Result<(), Error>;
    async fn send_transport_request(&self, request: &TransportRequest) -> Result<(), Error>;
}

pub type DynFleet = std::sync::Arc<dyn Fleet + Send + Sync>;
