//! Nostr relay WebSocket client for the DVM service.
//!
//! This crate provides:
//! - Message parsing (NIP-01 relay protocol)
//! - One long-lived, self-reconnecting connection task per relay
//! - Verification and cross-relay deduplication of inbound events
//! - Fan-out publishing to every streaming relay
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use nostr::TrustedEvent;
//! use nostr_client::{EventHandler, Filter, PoolConfig, RelayPool};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Print;
//!
//! #[async_trait]
//! impl EventHandler for Print {
//!     async fn handle_event(&self, relay_url: &str, event: TrustedEvent) {
//!         println!("{relay_url}: {}", event.content);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> nostr_client::Result<()> {
//!     let pool = RelayPool::new(PoolConfig {
//!         relays: vec!["wss://relay.damus.io".to_string()],
//!         filters: vec![Filter::new().kinds(vec![1]).limit(10)],
//!         ..Default::default()
//!     })?;
//!     pool.start(Arc::new(Print))?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     pool.shutdown(Duration::from_secs(5)).await;
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod handler;
mod message;
mod pool;
mod relay;
mod subscription;
mod tasks;

pub use cache::SeenCache;
pub use error::{ClientError, Result};
pub use handler::{EventHandler, Publisher};
pub use message::{ClientMessage, Filter, MessageError, RelayMessage};
pub use pool::{PoolConfig, RelayPool};
pub use relay::{ConnectionState, RelayConfig, parse_relay_url};
pub use subscription::{SubscriptionBuilder, generate_subscription_id};

/// Default relays used when none are configured.
pub const DEFAULT_RELAYS: &[&str] = &["wss://relay.damus.io", "wss://nos.lol", "wss://nostr.wine"];
