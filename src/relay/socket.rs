use std::sync::Arc;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::models::{PeerId, ReceivedMessage, SendMessage, WelcomeMessage};
use crate::relay::{RelayState, RoutedFrame};

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(relay): State<Arc<RelayState>>) -> Response {
    info!("New relay connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: Arc<RelayState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before joining so no frame addressed to the new peer is missed
    let mut rbc = relay.subscribe();
    let Some((peer_id, master_id)) = relay.join().await else {
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let welcome = SendMessage::Welcome(WelcomeMessage { peer_id, master_id });
    let sent = match serde_json::to_string(&welcome) {
        Ok(content) => sender.send(Message::Text(content)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize welcome for peer {}: {}", peer_id, e);
            false
        }
    };
    if !sent {
        relay.leave(peer_id).await;
        return;
    }

    // Client frames go to the relay
    let inbound_relay = relay.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ReceivedMessage>(&text) {
                Ok(ReceivedMessage::Event(event)) => {
                    debug!("Peer {} sent event {} to {:?}", peer_id, event.code, event.targets);
                    inbound_relay.route(peer_id, event).await;
                }
                Err(e) => {
                    error!("Failed to parse frame from peer {}: {}", peer_id, e);
                }
            }
        }
    });

    // Routed frames addressed to this peer go back down the socket
    let outbound_relay = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        forward_frames(&outbound_relay, peer_id, &mut rbc, &mut sender).await;
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    relay.leave(peer_id).await;
    info!("Relay connection of peer {} terminated", peer_id);
}

/// Pumps frames addressed to `peer_id` into `sink` until the channel closes,
/// the sink fails or the peer lags. A lagging peer has lost frames it cannot
/// recover, so its connection is dropped.
pub(crate) async fn forward_frames<S>(
    relay: &RelayState,
    peer_id: PeerId,
    frames: &mut broadcast::Receiver<RoutedFrame>,
    sink: &mut S,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        let frame = match frames.recv().await {
            Ok(frame) => frame,
            Err(RecvError::Lagged(n)) => {
                warn!("Peer {} lagged behind by {} frames; closing its connection", peer_id, n);
                relay.record_dropped(n);
                break;
            }
            Err(RecvError::Closed) => break,
        };
        if !frame.recipients.contains(&peer_id) {
            continue;
        }
        if sink.send(Message::Text(frame.content)).await.is_err() {
            break;
        }
    }
}
