use std::collections::HashMap;

use uuid::Uuid;

use crate::entities::{ranked, Bid};

/// Bids as a client has seen them, merged from snapshots and pushed events.
/// Keyed by bid id; an event only wins over what the book holds when its
/// `updated_at` is newer, so replays and reordered duplicates are no-ops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BidBook {
    bids: HashMap<Uuid, Bid>,
    winning_bid_id: Option<Uuid>,
}

impl BidBook {
    pub fn from_snapshot(bids: Vec<Bid>) -> Self {
        let mut book = Self::default();
        book.reset(bids);
        book
    }

    pub fn reset(&mut self, bids: Vec<Bid>) {
        self.winning_bid_id = bids.iter().find(|bid| bid.is_winning).map(|bid| bid.id);
        self.bids = bids.into_iter().map(|bid| (bid.id, bid)).collect();
    }

    pub fn apply(&mut self, bid: &Bid) -> bool {
        match self.bids.get(&bid.id) {
            Some(known) if known.updated_at >= bid.updated_at => false,
            _ => {
                self.bids.insert(bid.id, bid.clone());
                true
            }
        }
    }

    pub fn award(&mut self, bid_id: Uuid) -> bool {
        if self.winning_bid_id.is_some() {
            return false;
        }

        self.winning_bid_id = Some(bid_id);
        true
    }

    pub fn get(&self, bid_id: &Uuid) -> Option<&Bid> {
        self.bids.get(bid_id)
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn ranked(&self) -> Vec<Bid> {
        ranked(self.bids.values().cloned().collect(), self.winning_bid_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn bid(amount: f64) -> Bid {
        Bid::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            amount,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn stale_and_duplicate_updates_are_ignored() {
        let mut book = BidBook::default();
        let placed = bid(100.0);

        let mut amended = placed.clone();
        amended.amend(placed.vehicle_id, 80.0, None, placed.updated_at + Duration::seconds(1));

        assert!(book.apply(&placed));
        assert!(!book.apply(&placed));
        assert!(book.apply(&amended));

        // the placement arriving late must not roll the amendment back
        assert!(!book.apply(&placed));
        assert_eq!(book.get(&placed.id).map(|bid| bid.amount), Some(80.0));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn ranked_view_marks_the_winner() {
        let low = bid(100.0);
        let high = bid(300.0);
        let mut book = BidBook::from_snapshot(vec![low.clone(), high.clone()]);

        assert!(book.award(low.id));
        assert!(!book.award(high.id));

        let view = book.ranked();
        assert_eq!(view[0].id, high.id);
        assert!(!view[0].is_winning);
        assert_eq!(view[1].id, low.id);
        assert!(view[1].is_winning);
    }

    #[test]
    fn reset_replaces_everything() {
        let mut winner = bid(200.0);
        winner.is_winning = true;

        let mut book = BidBook::from_snapshot(vec![bid(100.0), bid(150.0)]);
        book.reset(vec![winner.clone()]);

        assert_eq!(book.len(), 1);
        assert!(!book.award(Uuid::new_v4()));
        assert_eq!(book.ranked(), vec![winner]);
    }
}
