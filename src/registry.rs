use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::Session;
use crate::error::{not_found_error, session_exists_error, Error};

/// A registered session. Bid admission holds `session` for reading; anything
/// that changes the session itself (close, extend, award) holds it for writing,
/// so no bid is admitted across a state change.
#[derive(Debug)]
pub struct Entry {
    pub session: RwLock<Session>,
    sequence: AtomicU64,
}

impl Entry {
    fn new(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
            sequence: AtomicU64::new(0),
        }
    }

    /// Allocates the next event sequence number for this session. Must be called
    /// inside the critical section of the write the event describes.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    sessions: DashMap<Uuid, Arc<Entry>>,
    by_load: DashMap<Uuid, Uuid>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip_all, fields(session_id = %session.id, load_id = %session.load_id))]
    pub fn insert(&self, session: Session) -> Result<Arc<Entry>, Error> {
        match self.by_load.entry(session.load_id) {
            MapEntry::Occupied(_) => {
                tracing::info!("load already has a bidding session");
                Err(session_exists_error())
            }
            MapEntry::Vacant(vacant) => {
                let id = session.id;
                let entry = Arc::new(Entry::new(session));

                self.sessions.insert(id, entry.clone());
                vacant.insert(id);

                Ok(entry)
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Entry>, Error> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found_error)
    }

    pub fn session_id_for_load(&self, load_id: &Uuid) -> Result<Uuid, Error> {
        self.by_load
            .get(load_id)
            .map(|id| *id.value())
            .ok_or_else(not_found_error)
    }

    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
