//! Realtime channel: one websocket per subscriber, fed from the broadcast hub.
//!
//! The writer side drains the subscriber's bounded queue; a subscriber the hub
//! dropped for falling behind sees its queue end and the socket is closed.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use pulse_core::Envelope;
use pulse_pipeline::Subscription;

use super::AppState;

pub(super) async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let pipeline = Arc::clone(&state.pipeline);
    ws.on_upgrade(move |socket| async move {
        let subscription = pipeline.hub().register();
        serve_subscriber(socket, subscription).await;
    })
}

fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

async fn serve_subscriber(socket: WebSocket, mut subscription: Subscription) {
    let id = subscription.id();
    tracing::debug!(subscriber = id, "realtime subscriber connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            envelope = subscription.recv() => {
                let Some(envelope) = envelope else {
                    tracing::debug!(subscriber = id, "subscriber removed by hub");
                    break;
                };
                let text = match encode_envelope(&envelope) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(subscriber = id, error = %e, "failed to encode envelope");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    None | Some(Err(_) | Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = sink.close().await;
    tracing::debug!(subscriber = id, "realtime subscriber disconnected");
}
