//! Scoped broadcast channel
//!
//! Realtime fan-out with the same isolation guarantee as storage: a
//! connection registered under organization A can never receive an event
//! broadcast for organization B. One tokio broadcast channel per
//! organization, held in a sharded concurrent map so registration and
//! lookup never contend on a global lock.
//!
//! Advisory signaling only: a dropped or lagging connection simply misses
//! events, and nothing is persisted.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::trace;
use uuid::Uuid;

use crate::tenancy::current_organization_id;
use crate::utils::AppResult;

/// Per-organization channel capacity. Slow consumers past this lag lose
/// events rather than applying backpressure to the publisher.
const CHANNEL_CAPACITY: usize = 256;

/// An event delivered to all live connections of one organization
#[derive(Debug, Clone)]
pub struct ScopedEvent {
    pub organization_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    /// Connection that caused the event; that connection filters it out so a
    /// user's own action is not echoed back at them.
    pub origin: Option<Uuid>,
}

/// Registry of live connections keyed by organization
pub struct ScopedBroadcaster {
    channels: DashMap<Uuid, broadcast::Sender<ScopedEvent>>,
}

impl ScopedBroadcaster {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Register a connection under the ambient organization
    pub fn register(&self, connection_id: Uuid) -> AppResult<Subscription> {
        let organization_id = current_organization_id()?;
        Ok(self.register_in(organization_id, connection_id))
    }

    /// Register a connection under an explicit organization
    ///
    /// Used where the organization is already pinned (tests, job workers);
    /// request handlers go through [`register`](Self::register).
    pub fn register_in(&self, organization_id: Uuid, connection_id: Uuid) -> Subscription {
        let rx = self
            .channels
            .entry(organization_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        trace!(%organization_id, %connection_id, "Connection registered");
        Subscription { connection_id, rx }
    }

    /// Broadcast an event to every connection of one organization
    ///
    /// `exclude` marks the originating connection; the exclusion only
    /// filters within the organization (receiver-side) and cannot address
    /// anything outside it. Returns the number of subscribed connections the
    /// event was handed to, the origin included.
    pub fn broadcast(
        &self,
        organization_id: Uuid,
        event: &str,
        payload: serde_json::Value,
        exclude: Option<Uuid>,
    ) -> usize {
        let Some(sender) = self.channels.get(&organization_id).map(|s| s.clone()) else {
            return 0;
        };

        let delivered = sender
            .send(ScopedEvent {
                organization_id,
                event: event.to_string(),
                payload,
                origin: exclude,
            })
            .unwrap_or(0);

        if delivered == 0 {
            // Last subscriber is gone; drop the channel entry.
            self.channels
                .remove_if(&organization_id, |_, s| s.receiver_count() == 0);
        }
        delivered
    }

    /// Broadcast under the ambient organization
    pub fn broadcast_current(
        &self,
        event: &str,
        payload: serde_json::Value,
        exclude: Option<Uuid>,
    ) -> AppResult<usize> {
        let organization_id = current_organization_id()?;
        Ok(self.broadcast(organization_id, event, payload, exclude))
    }

    /// Number of organizations with at least one registered connection
    pub fn organization_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ScopedBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// A live connection's view of its organization's event feed
pub struct Subscription {
    connection_id: Uuid,
    rx: broadcast::Receiver<ScopedEvent>,
}

impl Subscription {
    /// Receive the next event not originated by this connection
    ///
    /// Returns `None` once the channel is closed. Lag is tolerated by
    /// skipping ahead; this is advisory signaling, not a message log.
    pub async fn recv(&mut self) -> Option<ScopedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.origin == Some(self.connection_id) {
                        continue;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(connection_id = %self.connection_id, skipped, "Subscription lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a stream of events (for SSE handlers)
    pub fn into_stream(self) -> impl Stream<Item = ScopedEvent> {
        let connection_id = self.connection_id;
        BroadcastStream::new(self.rx).filter_map(move |item| match item {
            Ok(event) if event.origin != Some(connection_id) => Some(event),
            _ => None,
        })
    }
}
