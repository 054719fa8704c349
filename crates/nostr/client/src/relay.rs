//! Single relay connection management
//!
//! Each relay runs its own task cycling through
//! `Disconnected -> Connecting -> Subscribed -> Streaming`, and back to
//! `Disconnected` on any error, with a fixed delay before the next attempt.
//! Inbound events are verified and deduplicated here, then handed to the
//! [`EventHandler`] on a fresh task.

use crate::cache::SeenCache;
use crate::error::{ClientError, Result};
use crate::handler::EventHandler;
use crate::message::{ClientMessage, Filter, RelayMessage};
use crate::subscription::generate_subscription_id;
use crate::tasks::JobTracker;
use futures::{SinkExt, StreamExt};
use nostr::UntrustedEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; waiting to (re)connect or stopped
    Disconnected,
    /// Websocket handshake in progress
    Connecting,
    /// Connected, subscription request being sent
    Subscribed,
    /// Subscription active, frames flowing
    Streaming,
}

/// Relay connection configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Fixed delay between a disconnect and the next attempt
    pub reconnect_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Outbound frame queues of the relays currently streaming, keyed by url.
pub(crate) type Outboxes = RwLock<HashMap<String, mpsc::UnboundedSender<String>>>;

/// State shared by every relay task of a pool.
pub(crate) struct RelayContext {
    pub(crate) seen: Arc<SeenCache>,
    pub(crate) jobs: Arc<JobTracker>,
    pub(crate) outboxes: Arc<Outboxes>,
    pub(crate) handler: Arc<dyn EventHandler>,
}

/// Parse and check a relay url. Only `ws://` and `wss://` are accepted.
pub fn parse_relay_url(url: &str) -> Result<Url> {
    let url = Url::parse(url)?;

    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Relay connection
pub(crate) struct RelayConnection {
    url: Url,
    config: RelayConfig,
    filters: Vec<Filter>,
    state: Arc<RwLock<ConnectionState>>,
    ctx: Arc<RelayContext>,
}

impl RelayConnection {
    pub(crate) fn new(
        url: Url,
        config: RelayConfig,
        filters: Vec<Filter>,
        state: Arc<RwLock<ConnectionState>>,
        ctx: Arc<RelayContext>,
    ) -> Self {
        Self {
            url,
            config,
            filters,
            state,
            ctx,
        }
    }

    /// Get current connection state
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        if *current != state {
            debug!(relay = %self.url, from = ?*current, to = ?state, "connection state");
            *current = state;
        }
    }

    /// Connect, subscribe and stream until `shutdown` turns true.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect_and_stream(&mut shutdown).await {
                Ok(()) => info!(relay = %self.url, "relay connection closed"),
                Err(e) => warn!(relay = %self.url, error = %e, "relay connection failed"),
            }
            self.set_state(ConnectionState::Disconnected);

            if *shutdown.borrow() {
                break;
            }

            info!(
                relay = %self.url,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "reconnecting after delay"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(relay = %self.url, state = ?self.state(), "relay task stopped");
    }

    async fn connect_and_stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        self.set_state(ConnectionState::Connecting);
        info!(relay = %self.url, "connecting to relay");

        let ws = tokio::select! {
            res = timeout(self.config.connect_timeout, connect_async(self.url.as_str())) => {
                match res {
                    Ok(Ok((ws, _))) => ws,
                    Ok(Err(e)) => return Err(ClientError::WebSocket(e.to_string())),
                    Err(_) => {
                        return Err(ClientError::Timeout(format!(
                            "connection timeout after {:?}",
                            self.config.connect_timeout
                        )));
                    }
                }
            }
            _ = shutdown.changed() => return Ok(()),
        };

        let (mut sink, mut stream) = ws.split();
        self.set_state(ConnectionState::Subscribed);

        let subscription_id = generate_subscription_id();
        let req = ClientMessage::Req {
            subscription_id: subscription_id.clone(),
            filters: self.filters.clone(),
        }
        .to_json()?;
        sink.send(Message::Text(req.into()))
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        info!(relay = %self.url, subscription = %subscription_id, "subscribed");

        let (outbox_tx, mut outbox) = mpsc::unbounded_channel::<String>();
        self.ctx
            .outboxes
            .write()
            .insert(self.url.to_string(), outbox_tx);
        self.set_state(ConnectionState::Streaming);

        let result = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let close = ClientMessage::Close {
                            subscription_id: subscription_id.clone(),
                        };
                        if let Ok(close) = close.to_json() {
                            let _ = sink.send(Message::Text(close.into())).await;
                        }
                        let _ = sink.close().await;
                        break Ok(());
                    }
                }
                Some(frame) = outbox.recv() => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        break Err(ClientError::WebSocket(e.to_string()));
                    }
                }
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            break Err(ClientError::WebSocket(e.to_string()));
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(relay = %self.url, ?frame, "close frame");
                        break Err(ClientError::Closed("relay sent close frame".to_string()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(ClientError::WebSocket(e.to_string())),
                    None => break Err(ClientError::Closed("stream ended".to_string())),
                },
            }
        };

        self.ctx.outboxes.write().remove(self.url.as_str());
        result
    }

    /// Classify one inbound text frame. Never fails: bad frames are logged and dropped.
    pub(crate) fn handle_frame(&self, text: &str) {
        let msg = match RelayMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(relay = %self.url, error = %e, "dropping undecodable frame");
                return;
            }
        };

        match msg {
            RelayMessage::Event { event, .. } => self.dispatch(event),
            RelayMessage::Ok {
                event_id,
                success: true,
                ..
            } => info!(relay = %self.url, event_id = %event_id, "publish accepted"),
            RelayMessage::Ok {
                event_id,
                success: false,
                message,
            } => warn!(relay = %self.url, event_id = %event_id, reason = %message, "publish rejected"),
            RelayMessage::Eose { subscription_id } => {
                info!(relay = %self.url, subscription = %subscription_id, "end of stored events")
            }
            RelayMessage::Closed {
                subscription_id,
                message,
            } => warn!(
                relay = %self.url,
                subscription = %subscription_id,
                reason = %message,
                "subscription closed by relay"
            ),
            RelayMessage::Notice { message } => {
                info!(relay = %self.url, notice = %message, "relay notice")
            }
        }
    }

    fn dispatch(&self, event: UntrustedEvent) {
        let claimed_id = event.claimed_id().to_string();
        let trusted = match event.verify() {
            Ok(trusted) => trusted,
            Err(e) => {
                warn!(
                    relay = %self.url,
                    event_id = %claimed_id,
                    stage = %e.stage(),
                    error = %e,
                    "dropping unverified event"
                );
                return;
            }
        };

        // Only verified ids enter the cache.
        if !self.ctx.seen.mark_seen_if_new(&trusted.id) {
            debug!(relay = %self.url, event_id = %trusted.id, "duplicate event");
            return;
        }

        let handler = Arc::clone(&self.ctx.handler);
        let relay_url = self.url.to_string();
        let event_id = trusted.id.clone();
        let spawned = self.ctx.jobs.spawn(async move {
            handler.handle_event(&relay_url, trusted).await;
        });
        if spawned {
            debug!(relay = %self.url, event_id = %event_id, "event dispatched");
        } else {
            debug!(relay = %self.url, event_id = %event_id, "shutting down, event not dispatched");
        }
    }
}
