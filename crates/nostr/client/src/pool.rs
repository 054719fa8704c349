//! Relay pool for managing connections to multiple Nostr relays.
//!
//! One task per relay, all sharing a [`SeenCache`] so an event delivered by
//! several relays reaches the handler once. Publishing fans a frame out to
//! every relay that is currently streaming.

use crate::cache::SeenCache;
use crate::error::{ClientError, Result};
use crate::handler::{EventHandler, Publisher};
use crate::message::{ClientMessage, Filter};
use crate::relay::{
    ConnectionState, Outboxes, RelayConfig, RelayConnection, RelayContext, parse_relay_url,
};
use crate::tasks::JobTracker;
use async_trait::async_trait;
use nostr::PublishableEvent;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

/// Pool configuration, built once by the caller.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Relay urls (`ws://` or `wss://`)
    pub relays: Vec<String>,
    /// Filters sent in every relay's subscription
    pub filters: Vec<Filter>,
    /// Per-relay timing
    pub relay: RelayConfig,
    /// Upper bound on remembered event ids; `None` remembers all
    pub dedup_capacity: Option<usize>,
}

/// A pool of Nostr relay connections.
pub struct RelayPool {
    relays: Vec<Url>,
    filters: Vec<Filter>,
    relay_config: RelayConfig,
    seen: Arc<SeenCache>,
    jobs: Arc<JobTracker>,
    outboxes: Arc<Outboxes>,
    states: HashMap<String, Arc<RwLock<ConnectionState>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: Mutex<bool>,
}

impl RelayPool {
    /// Create a pool. Every relay url is validated; nothing connects yet.
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.relays.is_empty() {
            return Err(ClientError::InvalidUrl("no relays configured".to_string()));
        }

        let mut relays: Vec<Url> = Vec::with_capacity(config.relays.len());
        for raw in &config.relays {
            let url = parse_relay_url(raw)?;
            if !relays.contains(&url) {
                relays.push(url);
            }
        }

        let states = relays
            .iter()
            .map(|url| {
                (
                    url.to_string(),
                    Arc::new(RwLock::new(ConnectionState::Disconnected)),
                )
            })
            .collect();

        let seen = match config.dedup_capacity {
            Some(capacity) => SeenCache::with_capacity(capacity),
            None => SeenCache::new(),
        };
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            relays,
            filters: config.filters,
            relay_config: config.relay,
            seen: Arc::new(seen),
            jobs: Arc::new(JobTracker::new()),
            outboxes: Arc::new(Outboxes::default()),
            states,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            started: Mutex::new(false),
        })
    }

    /// Spawn one connection task per relay, delivering events to `handler`.
    pub fn start(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        {
            let mut started = self.started.lock();
            if *started {
                return Err(ClientError::PoolState("pool already started".to_string()));
            }
            if self.jobs.is_closed() {
                return Err(ClientError::PoolState("pool is shut down".to_string()));
            }
            *started = true;
        }

        // wss:// needs a process-wide provider; a no-op if one is installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let ctx = Arc::new(RelayContext {
            seen: Arc::clone(&self.seen),
            jobs: Arc::clone(&self.jobs),
            outboxes: Arc::clone(&self.outboxes),
            handler,
        });

        let mut tasks = self.tasks.lock();
        for url in &self.relays {
            let key = url.to_string();
            let state = match self.states.get(&key) {
                Some(state) => Arc::clone(state),
                None => continue,
            };
            let conn = RelayConnection::new(
                url.clone(),
                self.relay_config.clone(),
                self.filters.clone(),
                state,
                Arc::clone(&ctx),
            );
            tasks.push(tokio::spawn(conn.run(self.shutdown_tx.subscribe())));
        }

        info!(relays = self.relays.len(), "relay pool started");
        Ok(())
    }

    /// Get all relay URLs in the pool.
    pub fn relay_urls(&self) -> Vec<String> {
        self.relays.iter().map(Url::to_string).collect()
    }

    /// Get connection states for all relays.
    pub fn states(&self) -> HashMap<String, ConnectionState> {
        self.states
            .iter()
            .map(|(url, state)| (url.clone(), *state.read()))
            .collect()
    }

    /// Relays that currently accept publishes, sorted.
    pub fn streaming_relays(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.outboxes.read().keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Number of distinct events dispatched so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Queue an event on every streaming relay and return their urls.
    ///
    /// Never waits for `OK`; acknowledgements are logged by each relay task.
    pub fn publish(&self, event: &PublishableEvent) -> Vec<String> {
        let frame = match ClientMessage::Event(event.as_event().clone()).to_json() {
            Ok(frame) => frame,
            Err(e) => {
                error!(event_id = %event.id(), error = %e, "failed to encode event frame");
                return Vec::new();
            }
        };

        let mut sent: Vec<String> = {
            let outboxes = self.outboxes.read();
            outboxes
                .iter()
                .filter(|(_, tx)| tx.send(frame.clone()).is_ok())
                .map(|(url, _)| url.clone())
                .collect()
        };
        sent.sort();

        if sent.is_empty() {
            warn!(event_id = %event.id(), "no streaming relays, event not sent");
        } else {
            info!(event_id = %event.id(), relays = sent.len(), "event handed to relays");
        }
        sent
    }

    /// Wait for every dispatched handler task to finish.
    pub async fn wait_for_jobs(&self) {
        self.jobs.wait().await;
    }

    /// Stop dispatching, let in-flight handlers finish (up to `drain_timeout`),
    /// then close every relay connection and wait for the relay tasks.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        info!("shutting down relay pool");
        self.jobs.close();

        if tokio::time::timeout(drain_timeout, self.jobs.wait())
            .await
            .is_err()
        {
            warn!(
                timeout_ms = drain_timeout.as_millis() as u64,
                "handlers still running after drain timeout"
            );
        }

        let _ = self.shutdown_tx.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "relay task failed");
            }
        }
        info!("relay pool stopped");
    }
}

#[async_trait]
impl Publisher for RelayPool {
    async fn publish(&self, event: &PublishableEvent) -> Vec<String> {
        RelayPool::publish(self, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(relays: &[&str]) -> PoolConfig {
        PoolConfig {
            relays: relays.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pool_new_validates_urls() {
        assert!(RelayPool::new(config(&["wss://a.example", "ws://b.example:7777"])).is_ok());
        assert!(matches!(
            RelayPool::new(config(&["wss://a.example", "http://b.example"])),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            RelayPool::new(config(&[])),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_pool_dedups_relay_urls() {
        let pool = RelayPool::new(config(&["wss://a.example", "wss://a.example/"])).unwrap();
        assert_eq!(pool.relay_urls(), vec!["wss://a.example/".to_string()]);
    }

    #[test]
    fn test_new_pool_is_idle() {
        let pool = RelayPool::new(config(&["wss://a.example"])).unwrap();
        assert!(pool.streaming_relays().is_empty());
        assert!(
            pool.states()
                .values()
                .all(|s| *s == ConnectionState::Disconnected)
        );
        assert_eq!(pool.seen_count(), 0);
    }
}
