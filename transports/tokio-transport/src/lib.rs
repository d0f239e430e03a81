/// Tokio-based WebSocket transport for the pairing console
///
/// This crate provides a concrete implementation of the Transport trait
/// using tokio-tungstenite text frames.
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use paircore::net::{Transport, TransportEvent, TransportFactory};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type RawWs = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<RawWs, Message>;
type WsStream = SplitStream<RawWs>;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Tokio-based WebSocket transport
pub struct TokioWebSocketTransport {
    ws_sink: Mutex<Option<WsSink>>,
}

impl TokioWebSocketTransport {
    fn new(sink: WsSink) -> Self {
        Self {
            ws_sink: Mutex::new(Some(sink)),
        }
    }
}

#[async_trait]
impl Transport for TokioWebSocketTransport {
    async fn send(&self, text: &str) -> Result<(), anyhow::Error> {
        let mut sink_guard = self.ws_sink.lock().await;
        let sink = sink_guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Socket is closed"))?;

        debug!("--> Sending text frame: {} bytes", text.len());
        sink.send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send error: {}", e))?;
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(mut sink) = self.ws_sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("Error while closing websocket: {e}");
            }
        }
    }
}

/// Factory for creating Tokio WebSocket transports to a fixed endpoint
pub struct TokioWebSocketTransportFactory {
    url: String,
}

impl TokioWebSocketTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl TransportFactory for TokioWebSocketTransportFactory {
    async fn create_transport(
        &self,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), anyhow::Error> {
        info!("Dialing {}", self.url);
        let (client, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect failed: {}", e))?;

        let (sink, stream) = client.split();

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = Arc::new(TokioWebSocketTransport::new(sink));

        let _ = event_tx.send(TransportEvent::Connected).await;
        tokio::task::spawn(read_pump(stream, event_tx));

        Ok((transport, event_rx))
    }
}

async fn read_pump(mut stream: WsStream, event_tx: mpsc::Sender<TransportEvent>) {
    loop {
        let event = match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                trace!("<-- Received text frame: {} bytes", text.len());
                TransportEvent::TextReceived(text.to_string())
            }
            Some(Ok(Message::Close(frame))) => {
                trace!("Received close frame: {frame:?}");
                break;
            }
            Some(Ok(other)) => {
                trace!("Ignoring non-text frame: {other:?}");
                continue;
            }
            Some(Err(e)) => {
                error!("Error reading from websocket: {e}");
                let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                break;
            }
            None => {
                trace!("Websocket stream ended");
                break;
            }
        };

        if event_tx.send(event).await.is_err() {
            warn!("Event receiver dropped, closing read pump");
            break;
        }
    }

    let _ = event_tx.send(TransportEvent::Disconnected).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_unreachable_endpoint_fails() {
        // Port 9 (discard) is closed on test machines; the dial must fail fast.
        let factory = TokioWebSocketTransportFactory::new("ws://127.0.0.1:9");
        let result = factory.create_transport().await;
        assert!(result.is_err());
    }
}
