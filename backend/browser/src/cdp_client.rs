//! Chrome DevTools Protocol Client
//!
//! A WebSocket binding to a running headless Chromium. Commands are JSON-RPC
//! frames matched to responses by id; events are fanned out on a broadcast
//! channel. Page targets are addressed through flattened sessions, so a single
//! connection drives the whole browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use restabot_core::RestabotError;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::{Message, WebSocketConfig};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>>;

/// Full-page screenshots arrive as one base64 text frame.
const MAX_MESSAGE_BYTES: usize = 256 << 20;

/// An unsolicited protocol notification, e.g. `Page.loadEventFired`.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Incoming {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<ProtocolError>,
    method: Option<String>,
    params: Option<Value>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProtocolError {
    code: i64,
    message: String,
}

pub struct CdpClient {
    writer: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    events: broadcast::Sender<CdpEvent>,
    next_id: AtomicU64,
    command_timeout: Duration,
    reader: JoinHandle<()>,
}

impl CdpClient {
    /// Attaches to the browser endpoint and starts the read loop.
    pub async fn connect(ws_endpoint: &str) -> Result<Self> {
        info!("Connecting to CDP websocket at {}", ws_endpoint);
        let config = WebSocketConfig {
            max_message_size: Some(MAX_MESSAGE_BYTES),
            max_frame_size: Some(MAX_MESSAGE_BYTES),
            ..Default::default()
        };
        let (stream, _response) =
            tokio_tungstenite::connect_async_with_config(ws_endpoint, Some(config), false)
                .await
                .with_context(|| format!("Failed to connect to {ws_endpoint}"))?;
        let (writer, mut read) = stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(256);

        let reader_pending = Arc::clone(&pending);
        let reader_events = events.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch(&text, &reader_pending, &reader_events),
                    Ok(Message::Close(reason)) => {
                        debug!(?reason, "CDP connection closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "CDP connection error");
                        break;
                    }
                }
            }
            fail_pending(&reader_pending, "connection closed");
        });

        Ok(Self {
            writer: tokio::sync::Mutex::new(writer),
            pending,
            events,
            next_id: AtomicU64::new(1),
            command_timeout: Duration::from_secs(30),
            reader,
        })
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Receive every event that arrives from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }

    /// Dispatches a command and waits for its result.
    ///
    /// `session_id` targets an attached page; `None` addresses the browser.
    pub async fn send_command(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        debug!(id, method, "Sending CDP command");
        let frame = encode_command(id, method, params, session_id);
        let sent = self.writer.lock().await.send(Message::Text(frame)).await;
        if let Err(e) = sent {
            lock(&self.pending).remove(&id);
            return Err(RestabotError::Browser(format!("{method}: send failed: {e}")).into());
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => {
                Err(RestabotError::Browser(format!("{method}: {message}")).into())
            }
            Ok(Err(_)) => Err(RestabotError::Browser(format!("{method}: connection closed")).into()),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err(RestabotError::Browser(format!(
                    "{method}: no response within {:?}",
                    self.command_timeout
                ))
                .into())
            }
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Serialize a command frame.
pub(crate) fn encode_command(id: u64, method: &str, params: Value, session_id: Option<&str>) -> String {
    let mut frame = json!({ "id": id, "method": method, "params": params });
    if let Some(session) = session_id {
        frame["sessionId"] = Value::String(session.to_string());
    }
    frame.to_string()
}

/// Route one incoming frame to its waiting command or to event subscribers.
fn dispatch(text: &str, pending: &Pending, events: &broadcast::Sender<CdpEvent>) {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "Unparsable CDP frame");
            return;
        }
    };

    if let Some(id) = incoming.id {
        let Some(waiter) = lock(pending).remove(&id) else {
            debug!(id, "Response for unknown command");
            return;
        };
        let outcome = match incoming.error {
            Some(err) => Err(format!("{} (code {})", err.message, err.code)),
            None => Ok(incoming.result.unwrap_or(Value::Null)),
        };
        let _ = waiter.send(outcome);
    } else if let Some(method) = incoming.method {
        // No subscribers is fine; events are only awaited when needed.
        let _ = events.send(CdpEvent {
            method,
            params: incoming.params.unwrap_or(Value::Null),
            session_id: incoming.session_id,
        });
    }
}

fn fail_pending(pending: &Pending, reason: &str) {
    for (_, waiter) in lock(pending).drain() {
        let _ = waiter.send(Err(reason.to_string()));
    }
}
