//! Seams between the relay layer and whatever consumes or produces events.

use async_trait::async_trait;
use nostr::{PublishableEvent, TrustedEvent};

/// Receives every inbound event that verified and was not seen before.
///
/// Each call runs on its own task, so a slow handler never stalls a relay's
/// read loop.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, relay_url: &str, event: TrustedEvent);
}

/// Sends signed events out to the network.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Hand the event to every streaming relay and return their urls.
    /// Does not wait for acknowledgements.
    async fn publish(&self, event: &PublishableEvent) -> Vec<String>;
}
