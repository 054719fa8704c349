//! In-process mock relay for client integration tests.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use nostr::{Event, EventTemplate, Keypair, finalize_event};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
enum Control {
    Frame(String),
    Drop,
}

/// A relay that records what clients send, answers `EVENT` with `OK`, and
/// pushes frames on demand.
pub struct MockRelay {
    pub url: String,
    received: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    control: broadcast::Sender<Control>,
    accept_task: JoinHandle<()>,
}

impl MockRelay {
    pub async fn start() -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (control, _) = broadcast::channel(256);
        let received = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));

        let accept_task = {
            let control = control.clone();
            let received = Arc::clone(&received);
            let accepted = Arc::clone(&accepted);
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    let Ok(ws) = accept_async(tcp).await else {
                        continue;
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let control_rx = control.subscribe();
                    tokio::spawn(serve(ws, control_rx, Arc::clone(&received)));
                }
            })
        };

        Self {
            url: format!("ws://{addr}"),
            received,
            accepted,
            control,
            accept_task,
        }
    }

    /// Push a raw frame to every connected client.
    pub fn send(&self, frame: impl Into<String>) {
        let _ = self.control.send(Control::Frame(frame.into()));
    }

    /// Push `["EVENT", sub, event]` to every connected client.
    pub fn send_event(&self, event: &Event) {
        self.send(json!(["EVENT", "mock-sub", event]).to_string());
    }

    /// Drop every open connection without a close handshake.
    pub fn drop_connections(&self) {
        let _ = self.control.send(Control::Drop);
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    fn frames_of(&self, kind: &str) -> Vec<Value> {
        self.received()
            .iter()
            .filter_map(|f| serde_json::from_str::<Value>(f).ok())
            .filter(|v| v[0] == kind)
            .collect()
    }

    pub fn reqs(&self) -> Vec<Value> {
        self.frames_of("REQ")
    }

    /// Event objects clients published here.
    pub fn published(&self) -> Vec<Value> {
        self.frames_of("EVENT").into_iter().map(|v| v[1].clone()).collect()
    }

    pub fn connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.accept_task.abort();
        let _ = self.control.send(Control::Drop);
    }
}

async fn serve(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    mut control: broadcast::Receiver<Control>,
    received: Arc<Mutex<Vec<String>>>,
) {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            ctl = control.recv() => match ctl {
                Ok(Control::Frame(frame)) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Ok(Control::Drop) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_string();
                    let ack = serde_json::from_str::<Value>(&text)
                        .ok()
                        .filter(|v| v[0] == "EVENT")
                        .and_then(|v| v[1]["id"].as_str().map(str::to_string))
                        .map(|id| json!(["OK", id, true, ""]).to_string());
                    received.lock().push(text);
                    if let Some(ack) = ack {
                        let _ = sink.send(Message::Text(ack.into())).await;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Poll `cond` until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

/// A freshly signed job request.
pub fn signed_request(keys: &Keypair, prompt: &str) -> Event {
    finalize_event(
        &EventTemplate {
            created_at: 1700000000,
            kind: 5050,
            tags: vec![vec!["i".to_string(), prompt.to_string(), "text".to_string()]],
            content: String::new(),
        },
        keys,
    )
    .unwrap()
    .into_event()
}
