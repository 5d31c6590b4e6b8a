//! Pub/sub fan-out of bidding events.
//!
//! Every connected client is a subscriber with its own inbox. Subscribers join
//! channels explicitly: a session channel carries the bids and lifecycle of one
//! session, a user channel carries notifications addressed to one identity.
//! Delivery is fire-and-forget: a subscriber that is gone when an event is
//! published simply misses it and has to re-read state after reconnecting.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::entities::Event;

pub type SubscriberId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", content = "id", rename_all = "snake_case")]
pub enum Channel {
    Session(Uuid),
    User(Uuid),
}

/// The receiving end held by a client. Dropping it (or calling
/// [`Broadcaster::disconnect`]) ends delivery.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub inbox: UnboundedReceiver<Event>,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: DashMap<SubscriberId, UnboundedSender<Event>>,
    channels: DashMap<Channel, HashSet<SubscriberId>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> Subscription {
        let (tx, inbox) = unbounded_channel();
        let id = Uuid::new_v4();

        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber_id = %id, "subscriber connected");

        Subscription { id, inbox }
    }

    /// Drops the subscriber's sender and removes it from every channel.
    pub fn disconnect(&self, id: &SubscriberId) {
        self.subscribers.remove(id);
        self.channels.retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });

        tracing::debug!(subscriber_id = %id, "subscriber disconnected");
    }

    pub fn is_connected(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    /// Returns false if the subscriber was already a member. Unknown
    /// subscribers cannot join.
    pub fn join(&self, id: SubscriberId, channel: Channel) -> bool {
        if !self.is_connected(&id) {
            return false;
        }

        self.channels.entry(channel).or_default().insert(id)
    }

    /// Returns false if the subscriber was not a member.
    pub fn leave(&self, id: &SubscriberId, channel: &Channel) -> bool {
        let left = match self.channels.get_mut(channel) {
            Some(mut members) => members.remove(id),
            None => false,
        };

        self.channels.remove_if(channel, |_, members| members.is_empty());
        left
    }

    pub fn members(&self, channel: &Channel) -> Vec<SubscriberId> {
        self.channels
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sends to a single subscriber, regardless of channel membership.
    pub fn deliver(&self, id: &SubscriberId, event: Event) -> bool {
        let delivered = match self.subscribers.get(id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        };

        if !delivered {
            self.prune(id);
        }

        delivered
    }

    /// Fans the event out to every member of the channel. Never blocks;
    /// returns how many inboxes accepted it.
    pub fn publish(&self, channel: &Channel, event: &Event) -> usize {
        let members = self.members(channel);

        let delivered = members
            .iter()
            .filter(|id| self.deliver(id, event.clone()))
            .count();

        tracing::debug!(
            ?channel,
            event = event.name(),
            sequence = event.sequence,
            delivered,
            "published"
        );

        delivered
    }

    /// Fans the event out to every user channel.
    pub fn publish_to_users(&self, event: &Event) -> usize {
        let channels: Vec<Channel> = self
            .channels
            .iter()
            .map(|entry| *entry.key())
            .filter(|channel| matches!(channel, Channel::User(_)))
            .collect();

        channels
            .iter()
            .map(|channel| self.publish(channel, event))
            .sum()
    }

    /// Sends a session lifecycle event to the session channel and to every
    /// user channel, so open-session listings can drop or keep the session.
    /// A subscriber on several of these channels gets it once.
    pub fn announce(&self, event: &Event) -> usize {
        let mut recipients: HashSet<SubscriberId> = self
            .members(&Channel::Session(event.session_id))
            .into_iter()
            .collect();

        for entry in self.channels.iter() {
            if let Channel::User(_) = entry.key() {
                recipients.extend(entry.value().iter().copied());
            }
        }

        let delivered = recipients
            .iter()
            .filter(|id| self.deliver(id, event.clone()))
            .count();

        tracing::debug!(
            session_id = %event.session_id,
            event = event.name(),
            sequence = event.sequence,
            delivered,
            "announced"
        );

        delivered
    }

    fn prune(&self, id: &SubscriberId) {
        if let Some((_, tx)) = self.subscribers.remove(id) {
            if !tx.is_closed() {
                // still alive, put it back
                self.subscribers.insert(*id, tx);
                return;
            }
        }

        tracing::info!(subscriber_id = %id, "pruning closed subscriber");
        self.disconnect(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CloseReason, EventKind};

    fn closed(session_id: Uuid, sequence: u64) -> Event {
        Event::new(
            session_id,
            sequence,
            EventKind::SessionClosed {
                reason: CloseReason::ClosedByOwner,
                winning_bid_id: None,
            },
        )
    }

    #[tokio::test]
    async fn join_and_leave_are_idempotent() {
        let broadcaster = Broadcaster::new();
        let subscription = broadcaster.connect();
        let channel = Channel::Session(Uuid::new_v4());

        assert!(broadcaster.join(subscription.id, channel));
        assert!(!broadcaster.join(subscription.id, channel));
        assert_eq!(broadcaster.members(&channel).len(), 1);

        assert!(broadcaster.leave(&subscription.id, &channel));
        assert!(!broadcaster.leave(&subscription.id, &channel));
        assert!(broadcaster.members(&channel).is_empty());
    }

    #[tokio::test]
    async fn publish_reaches_members_only() {
        let broadcaster = Broadcaster::new();
        let session_id = Uuid::new_v4();
        let channel = Channel::Session(session_id);

        let mut member = broadcaster.connect();
        let mut outsider = broadcaster.connect();
        broadcaster.join(member.id, channel);

        let delivered = broadcaster.publish(&channel, &closed(session_id, 1));

        assert_eq!(delivered, 1);
        assert_eq!(member.inbox.recv().await.unwrap().sequence, 1);
        assert!(outsider.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_fan_out_reaches_every_user_channel() {
        let broadcaster = Broadcaster::new();
        let mut alice = broadcaster.connect();
        let mut bob = broadcaster.connect();
        let session_only = broadcaster.connect();

        broadcaster.join(alice.id, Channel::User(Uuid::new_v4()));
        broadcaster.join(bob.id, Channel::User(Uuid::new_v4()));
        broadcaster.join(session_only.id, Channel::Session(Uuid::new_v4()));

        let delivered = broadcaster.publish_to_users(&closed(Uuid::new_v4(), 1));

        assert_eq!(delivered, 2);
        assert!(alice.inbox.recv().await.is_some());
        assert!(bob.inbox.recv().await.is_some());
    }

    #[tokio::test]
    async fn announcements_reach_each_subscriber_once() {
        let broadcaster = Broadcaster::new();
        let session_id = Uuid::new_v4();

        let mut both = broadcaster.connect();
        let mut viewer = broadcaster.connect();
        let mut elsewhere = broadcaster.connect();

        broadcaster.join(both.id, Channel::Session(session_id));
        broadcaster.join(both.id, Channel::User(Uuid::new_v4()));
        broadcaster.join(viewer.id, Channel::User(Uuid::new_v4()));
        broadcaster.join(elsewhere.id, Channel::Session(Uuid::new_v4()));

        assert_eq!(broadcaster.announce(&closed(session_id, 4)), 2);

        assert_eq!(both.inbox.recv().await.unwrap().sequence, 4);
        assert!(both.inbox.try_recv().is_err());
        assert_eq!(viewer.inbox.recv().await.unwrap().sequence, 4);
        assert!(elsewhere.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let broadcaster = Broadcaster::new();
        let channel = Channel::Session(Uuid::new_v4());

        let subscription = broadcaster.connect();
        let id = subscription.id;
        broadcaster.join(id, channel);
        drop(subscription);

        assert_eq!(broadcaster.publish(&channel, &closed(Uuid::new_v4(), 1)), 0);
        assert!(!broadcaster.is_connected(&id));
        assert!(broadcaster.members(&channel).is_empty());
    }

    #[tokio::test]
    async fn disconnect_closes_the_inbox() {
        let broadcaster = Broadcaster::new();
        let mut subscription = broadcaster.connect();
        broadcaster.join(subscription.id, Channel::User(Uuid::new_v4()));

        broadcaster.disconnect(&subscription.id);

        assert!(subscription.inbox.recv().await.is_none());
        assert!(!broadcaster.join(subscription.id, Channel::User(Uuid::new_v4())));
    }
}
