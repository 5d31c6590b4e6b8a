mod award_api;
mod bid_api;
mod helpers;
mod realtime_api;
mod session_api;


use dashmap::DashMap;
use oso::Oso;
use uuid::Uuid;

use crate::{
    api::API,
    auth::authorizor,
    entities::Assignment,
    error::{forbidden_error, Error},
    external::DynFleet,
    ledger::Ledger,
    realtime::Broadcaster,
    registry::Registry,
};

pub struct Engine {
    registry: Registry,
    ledger: Ledger,
    broadcaster: Broadcaster,
    // session id -> assignment the fleet has not confirmed yet
    pending_assignments: DashMap<Uuid, Assignment>,
    // session id -> assignment the fleet accepted
    confirmed_assignments: DashMap<Uuid, Assignment>,
    fleet: DynFleet,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(fleet: DynFleet) -> Result<Self, Error> {
        Ok(Self {
            registry: Registry::new(),
            ledger: Ledger::new(),
            broadcaster: Broadcaster::new(),
            pending_assignments: DashMap::new(),
            confirmed_assignments: DashMap::new(),
            fleet,
            authorizor: authorizor::new()?,
        })
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(forbidden_error())
    }

    pub fn pending_assignment(&self, session_id: &Uuid) -> Option<Assignment> {
        self.pending_assignments
            .get(session_id)
            .map(|assignment| assignment.value().clone())
    }

    pub fn confirmed_assignment(&self, session_id: &Uuid) -> Option<Assignment> {
        self.confirmed_assignments
            .get(session_id)
            .map(|assignment| assignment.value().clone())
    }
}

impl API for Engine {}
