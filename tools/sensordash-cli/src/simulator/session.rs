//! Per-connection session of the simulated gateway.
//!
//! A session forwards generated frames whose topic matches one of the
//! patterns the dashboard subscribed to. When the server was started with a
//! token, nothing is forwarded until a matching `{"token": ...}` frame
//! arrives, and a wrong token closes the socket.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use sensordash_ws_protocol::{topic_matches, Action, ClientMessage};
use tokio::sync::broadcast::error::RecvError;

use super::server::ServerState;

/// What the session should do after a client frame.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Close,
}

/// Session-local view of one dashboard connection.
#[derive(Debug, Default)]
struct Subscriber {
    authenticated: bool,
    patterns: Vec<String>,
}

impl Subscriber {
    fn wants(&self, topic: &str) -> bool {
        self.authenticated && self.patterns.iter().any(|p| topic_matches(p, topic))
    }

    fn handle(&mut self, text: &str, expected_token: Option<&str>) -> Control {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Ignoring unrecognised client frame: {}", e);
                return Control::Continue;
            }
        };

        match msg {
            ClientMessage::Auth(auth) => match expected_token {
                Some(expected) if auth.token.as_deref() != Some(expected) => {
                    tracing::warn!("Rejecting session: bad token");
                    Control::Close
                }
                _ => {
                    self.authenticated = true;
                    Control::Continue
                }
            },
            ClientMessage::Subscription(sub) => {
                match sub.action {
                    Action::Subscribe => {
                        if !self.patterns.contains(&sub.sensor) {
                            self.patterns.push(sub.sensor);
                        }
                    }
                    Action::Unsubscribe => self.patterns.retain(|p| *p != sub.sensor),
                }
                Control::Continue
            }
        }
    }
}

/// Drive one WebSocket connection to completion.
pub(crate) async fn run_session(socket: WebSocket, remote_addr: SocketAddr, state: &ServerState) {
    let expected_token = state.token.as_deref();
    let mut subscriber = Subscriber {
        authenticated: expected_token.is_none(),
        patterns: Vec::new(),
    };
    let mut frames = state.frames.subscribe();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    tracing::info!("{}: session started", remote_addr);

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("{}: receive failed: {}", remote_addr, e);
                        break;
                    }
                };
                if subscriber.handle(&text, expected_token) == Control::Close {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
            frame = frames.recv() => {
                match frame {
                    Ok(frame) if subscriber.wants(&frame.topic) => {
                        if ws_sender.send(Message::Text(frame.text.clone())).await.is_err() {
                            tracing::debug!("{}: send failed, closing", remote_addr);
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("{}: slow consumer, skipped {} frames", remote_addr, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!("{}: session ended", remote_addr);
}
