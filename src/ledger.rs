use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::entities::Bid;
use crate::error::{bid_not_found_error, not_found_error, Error};

/// Outcome of a submission: a first bid from this owner, or an amendment of
/// the one they already had.
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    Placed(Bid),
    Amended(Bid),
}

impl Admission {
    pub fn bid(&self) -> &Bid {
        match self {
            Self::Placed(bid) | Self::Amended(bid) => bid,
        }
    }

    pub fn into_bid(self) -> Bid {
        match self {
            Self::Placed(bid) | Self::Amended(bid) => bid,
        }
    }
}

/// What a bidder wants on the ledger.
#[derive(Clone, Debug)]
pub struct Submission {
    pub vehicle_owner_id: Uuid,
    pub vehicle_id: Uuid,
    pub amount: f64,
    pub message: Option<String>,
}

/// The bids of one session, keyed by owner.
#[derive(Debug, Default)]
pub struct Book {
    by_owner: DashMap<Uuid, Bid>,
    total_bids: AtomicU64,
}

impl Book {
    /// Places or amends the owner's bid. The owner's slot stays locked until
    /// `commit` returns, so whatever `commit` does (allocating a sequence
    /// number, publishing) is ordered with the write itself.
    pub fn upsert<F>(
        &self,
        session_id: Uuid,
        submission: Submission,
        now: DateTime<Utc>,
        commit: F,
    ) -> Admission
    where
        F: FnOnce(&Admission),
    {
        let Submission {
            vehicle_owner_id,
            vehicle_id,
            amount,
            message,
        } = submission;

        match self.by_owner.entry(vehicle_owner_id) {
            MapEntry::Occupied(mut occupied) => {
                let bid = occupied.get_mut();
                bid.amend(vehicle_id, amount, message, now);

                let admission = Admission::Amended(bid.clone());
                commit(&admission);
                admission
            }
            MapEntry::Vacant(vacant) => {
                let bid = Bid::new(session_id, vehicle_owner_id, vehicle_id, amount, message, now);
                self.total_bids.fetch_add(1, Ordering::SeqCst);

                let admission = Admission::Placed(bid.clone());
                let _slot = vacant.insert(bid);
                commit(&admission);
                admission
            }
        }
    }

    pub fn total_bids(&self) -> u64 {
        self.total_bids.load(Ordering::SeqCst)
    }

    pub fn bids(&self) -> Vec<Bid> {
        self.by_owner
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn bid_of(&self, vehicle_owner_id: &Uuid) -> Option<Bid> {
        self.by_owner
            .get(vehicle_owner_id)
            .map(|entry| entry.value().clone())
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    books: DashMap<Uuid, Arc<Book>>,
    // bid id -> (session id, owner id)
    index: DashMap<Uuid, (Uuid, Uuid)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, session_id: Uuid) -> Arc<Book> {
        self.books
            .entry(session_id)
            .or_insert_with(|| Arc::new(Book::default()))
            .value()
            .clone()
    }

    /// Drops a book that never became reachable.
    pub fn discard(&self, session_id: &Uuid) -> bool {
        self.books.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn book(&self, session_id: &Uuid) -> Result<Arc<Book>, Error> {
        self.books
            .get(session_id)
            .map(|book| book.value().clone())
            .ok_or_else(not_found_error)
    }

    #[tracing::instrument(skip(self, commit))]
    pub fn submit<F>(
        &self,
        session_id: Uuid,
        submission: Submission,
        now: DateTime<Utc>,
        commit: F,
    ) -> Result<Admission, Error>
    where
        F: FnOnce(&Admission),
    {
        let book = self.book(&session_id)?;
        let admission = book.upsert(session_id, submission, now, commit);

        if let Admission::Placed(bid) = &admission {
            self.index
                .insert(bid.id, (bid.session_id, bid.vehicle_owner_id));
        }

        Ok(admission)
    }

    pub fn find(&self, bid_id: &Uuid) -> Option<Bid> {
        let (session_id, owner_id) = *self.index.get(bid_id)?.value();
        self.books.get(&session_id)?.bid_of(&owner_id)
    }

    /// The bid, provided it was placed in `session_id`.
    pub fn find_in_session(&self, session_id: &Uuid, bid_id: &Uuid) -> Result<Bid, Error> {
        self.find(bid_id)
            .filter(|bid| bid.session_id == *session_id)
            .ok_or_else(bid_not_found_error)
    }

    pub fn bids(&self, session_id: &Uuid) -> Result<Vec<Bid>, Error> {
        Ok(self.book(session_id)?.bids())
    }

    pub fn total_bids(&self, session_id: &Uuid) -> u64 {
        self.books
            .get(session_id)
            .map(|book| book.total_bids())
            .unwrap_or(0)
    }
}
