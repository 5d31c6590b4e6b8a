use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{Assignment, Load, TransportRequest};
use crate::error::{not_found_error, upstream_error, Error};

use super::Fleet;

/// Fleet collaborator kept in process. Used when no fleet service is
/// configured, and as the test double.
#[derive(Debug, Default)]
pub struct MemoryFleet {
    loads: DashMap<Uuid, Load>,
    assignments: Mutex<Vec<Assignment>>,
    transport_requests: Mutex<Vec<TransportRequest>>,
    unavailable: AtomicBool,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_load(&self, owner_id: Uuid) -> Load {
        let load = Load {
            id: Uuid::new_v4(),
            owner_id,
        };

        self.loads.insert(load.id, load.clone());
        load
    }

    /// While unavailable, assignments and transport requests fail upstream.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn assignments(&self) -> Vec<Assignment> {
        self.assignments.lock().await.clone()
    }

    pub async fn transport_requests(&self) -> Vec<TransportRequest> {
        self.transport_requests.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }

        Ok(())
    }
}

#[async_trait]
impl Fleet for MemoryFleet {
    async fn find_load(&self, load_id: Uuid) -> Result<Load, Error> {
        self.loads
            .get(&load_id)
            .map(|load| load.value().clone())
            .ok_or_else(not_found_error)
    }

    #[tracing::instrument(skip(self))]
    async fn assign(&self, assignment: &Assignment) -> Result<(), Error> {
        self.check_available()?;

        self.assignments.lock().await.push(assignment.clone());

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn send_transport_request(&self, request: &TransportRequest) -> Result<(), Error> {
        self.check_available()?;

        self.transport_requests.lock().await.push(request.clone());

        Ok(())
    }
}
