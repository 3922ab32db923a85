//! In-memory transport for driving `SensorConnection` without a network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sensordash_ws_client::{Dialer, TransportError, TransportSession};
use tokio::sync::mpsc;

#[derive(Default)]
struct ServerState {
    dials: usize,
    refuse: bool,
    sent: Vec<String>,
    live: Option<mpsc::UnboundedSender<String>>,
}

/// Fake gateway. Cloning shares state, so the test keeps one handle and the
/// connection owns another as its dialer.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<ServerState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make further dials fail (or succeed again).
    pub fn refuse(&self, refuse: bool) {
        self.state.lock().unwrap().refuse = refuse;
    }

    pub fn dials(&self) -> usize {
        self.state.lock().unwrap().dials
    }

    /// Every frame the client has sent, across sessions.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    /// Deliver a text frame on the live session.
    pub fn push(&self, text: impl Into<String>) {
        let state = self.state.lock().unwrap();
        let live = state.live.as_ref().expect("no live session");
        live.send(text.into()).expect("session already closed");
    }

    /// Close the live session from the server side.
    pub fn close(&self) {
        self.state.lock().unwrap().live = None;
    }

    pub fn has_live_session(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .live
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl Dialer for MockGateway {
    async fn dial(&self, url: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.dials += 1;
        if state.refuse {
            return Err(TransportError::connect(url, "connection refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.live = Some(tx);
        Ok(Box::new(MockSession {
            inbound: rx,
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    inbound: mpsc::UnboundedReceiver<String>,
    state: Arc<Mutex<ServerState>>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.state.lock().unwrap().sent.push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound.recv().await)
    }
}

/// Let every ready task run. With paused time this only advances the clock
/// by a millisecond, far below any reconnect delay.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// A canonical frame with one scalar value.
pub fn scalar_frame(client: &str, sensor: &str, value: f64) -> String {
    serde_json::json!({
        "topic": format!("user/{client}/{sensor}"),
        "values": serde_json::to_string(&serde_json::json!([{ "type": "value", "value": value }])).unwrap(),
    })
    .to_string()
}
