use futures_util::{SinkExt, StreamExt};
use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::Transport;
use crate::error::{AnchorError, AnchorResult};
use crate::models::{EventMessage, PeerId, ReceivedMessage, SendMessage, WelcomeMessage};
use crate::service::NetworkAnchorService;

/// Client side of the relay.
///
/// Socket writes happen on a runtime task. Inbound frames are read on a local
/// task and handed to the service on its own thread, so
/// [`WebSocketTransport::connect`] must run inside a
/// [`tokio::task::LocalSet`].
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Message>,
    peer_id: PeerId,
    master_id: Rc<Cell<PeerId>>,
    reader: AbortHandle,
}

impl WebSocketTransport {
    /// Connects to the relay at `url`, waits for the peer id it assigns and
    /// starts pumping inbound events into `service`.
    pub async fn connect(url: &str, service: &NetworkAnchorService) -> AnchorResult<Rc<Self>> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| AnchorError::Transport(format!("failed to connect to {}: {}", url, e)))?;
        let (mut sink, mut source) = stream.split();

        let welcome = read_welcome(&mut source).await?;
        info!("Relay assigned peer id {} (master {})", welcome.peer_id, welcome.master_id);

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Failed to write to relay: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let master_id = Rc::new(Cell::new(welcome.master_id));
        let weak_service = service.downgrade();
        let reader_master_id = master_id.clone();
        let reader = tokio::task::spawn_local(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                };
                match serde_json::from_str::<SendMessage>(text.as_str()) {
                    Ok(SendMessage::Event(event)) => {
                        let Some(service) = weak_service.upgrade() else {
                            break;
                        };
                        service.process_network_event(event.code, &event.payload);
                    }
                    Ok(SendMessage::MasterChanged(changed)) => {
                        info!("Relay master is now peer {}", changed.master_id);
                        reader_master_id.set(changed.master_id);
                    }
                    Ok(SendMessage::Welcome(_)) => debug!("Ignoring repeated welcome"),
                    Err(e) => debug!("Dropping unparseable relay frame: {}", e),
                }
            }
            info!("Relay connection closed");
        })
        .abort_handle();

        let transport = Rc::new(Self {
            outbound,
            peer_id: welcome.peer_id,
            master_id,
            reader,
        });
        service.attach_transport(transport.clone());
        Ok(transport)
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn master_id(&self) -> PeerId {
        self.master_id.get()
    }

    pub fn is_master(&self) -> bool {
        self.peer_id == self.master_id.get()
    }

    /// Closes the socket. Later sends are dropped.
    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
        self.reader.abort();
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, code: u8, json: &str, targets: &[i32]) {
        let frame = ReceivedMessage::Event(EventMessage {
            code,
            payload: json.to_string(),
            targets: targets.to_vec(),
            sender: self.peer_id,
        });
        match serde_json::to_string(&frame) {
            Ok(text) => {
                if self.outbound.send(Message::Text(text.into())).is_err() {
                    warn!("Relay connection closed; dropping event {}", code);
                }
            }
            Err(e) => error!("Failed to serialize relay frame: {}", e),
        }
    }
}

async fn read_welcome<S>(source: &mut S) -> AnchorResult<WelcomeMessage>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<SendMessage>(text.as_str()) {
                Ok(SendMessage::Welcome(welcome)) => return Ok(welcome),
                Ok(other) => debug!("Skipping frame before welcome: {:?}", other),
                Err(e) => return Err(AnchorError::Transport(format!("unexpected relay frame: {}", e))),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(AnchorError::Transport(e.to_string())),
        }
    }
    Err(AnchorError::Transport("relay closed before assigning a peer id".to_string()))
}
