//! Live connection to the pairing-events endpoint.
//!
//! A single [`PairingSocket`] exists per console. Opening it spawns one
//! supervisor task that dials the endpoint, subscribes, reads frames and,
//! when the connection drops, waits out the reconnect backoff before dialing
//! again. Only [`PairingSocket::close`] stops the supervisor for good;
//! running out of reconnect attempts leaves the socket closed until the next
//! [`PairingSocket::open`].

use crate::error::PairingError;
use crate::task::{SessionToken, SessionTracker, TaskHandle};
use log::{debug, error, info, warn};
use paircore::events::dispatch;
use paircore::net::{Transport, TransportEvent, TransportFactory};
use paircore::protocol::{self, InboundEvent, OutboundFrame};
use paircore::{PairingEventHandler, ReconnectPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketState {
    #[default]
    Closed,
    Connecting,
    Open,
    /// Waiting for the backoff delay before the next dial.
    Reconnecting,
}

#[derive(Default)]
struct SocketInner {
    state: SocketState,
    transport: Option<Arc<dyn Transport>>,
    /// Number the next (re)connection subscribes to.
    phone_number: Option<String>,
    /// Number the live connection is subscribed to. `qrCode` events are
    /// matched against it.
    subscribed_number: Option<String>,
    /// Re-subscriptions requested while a dial was still in flight.
    pending_subscriptions: Vec<String>,
    reconnect_attempts: u32,
    supervisor: Option<TaskHandle>,
    keepalive: Option<TaskHandle>,
}

pub struct PairingSocket {
    transport_factory: Arc<dyn TransportFactory>,
    handler: Arc<dyn PairingEventHandler>,
    policy: ReconnectPolicy,
    pub(crate) keepalive_interval: Duration,
    inner: Mutex<SocketInner>,
    liveness: SessionTracker,
}

impl PairingSocket {
    pub fn new(
        transport_factory: Arc<dyn TransportFactory>,
        handler: Arc<dyn PairingEventHandler>,
        policy: ReconnectPolicy,
        keepalive_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport_factory,
            handler,
            policy,
            keepalive_interval,
            inner: Mutex::new(SocketInner::default()),
            liveness: SessionTracker::new(),
        })
    }

    /// Subscribes to `phone_number`'s pairing events.
    ///
    /// While a connection is open or being dialed this only sends (or queues)
    /// a new `subscribe` frame. Otherwise a fresh connection is started with
    /// the reconnect counter reset.
    pub async fn open(self: &Arc<Self>, phone_number: &str) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SocketState::Open => {
                if let Some(transport) = inner.transport.clone() {
                    info!(target: "Pairing/Socket", "Socket already open, re-subscribing to {phone_number}");
                    send_frame(transport.as_ref(), &OutboundFrame::subscribe(phone_number)).await;
                    inner.subscribed_number = Some(phone_number.to_string());
                    inner.phone_number = Some(phone_number.to_string());
                    return;
                }
            }
            SocketState::Connecting => {
                debug!(target: "Pairing/Socket", "Socket still connecting, queueing subscription to {phone_number}");
                inner.pending_subscriptions.push(phone_number.to_string());
                return;
            }
            SocketState::Closed | SocketState::Reconnecting => {}
        }

        if let Some(previous) = inner.supervisor.take() {
            previous.cancel();
        }
        let token = self.liveness.begin();
        inner.state = SocketState::Connecting;
        inner.phone_number = Some(phone_number.to_string());
        inner.subscribed_number = None;
        inner.pending_subscriptions.clear();
        inner.reconnect_attempts = 0;

        let this = self.clone();
        inner.supervisor = Some(TaskHandle::spawn(async move { this.run(token).await }));
    }

    /// Terminates the connection and cancels any scheduled reconnect.
    pub async fn close(&self) {
        let transport = {
            let mut inner = self.inner.lock().await;
            self.liveness.invalidate();
            if let Some(supervisor) = inner.supervisor.take() {
                supervisor.cancel();
            }
            if let Some(keepalive) = inner.keepalive.take() {
                keepalive.cancel();
            }
            if inner.state != SocketState::Closed {
                info!(target: "Pairing/Socket", "Closing pairing socket (was {:?})", inner.state);
            }
            std::mem::take(&mut *inner).transport
        };

        if let Some(transport) = transport {
            transport.disconnect().await;
        }
    }

    pub async fn state(&self) -> SocketState {
        self.inner.lock().await.state
    }

    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().await.reconnect_attempts
    }

    pub async fn subscribed_number(&self) -> Option<String> {
        self.inner.lock().await.subscribed_number.clone()
    }

    /// Connect, read until the connection drops, back off, repeat.
    async fn run(self: Arc<Self>, token: SessionToken) {
        loop {
            match self.transport_factory.create_transport().await {
                Ok((transport, events)) => {
                    if !self.on_open(&token, transport.clone()).await {
                        transport.disconnect().await;
                        return;
                    }
                    self.read_loop(events).await;
                }
                Err(e) => {
                    let e = PairingError::Transport(e);
                    warn!(target: "Pairing/Socket", "Failed to connect to pairing events: {e}");
                }
            }

            let Some(delay) = self.on_close(&token).await else {
                return;
            };
            tokio::time::sleep(delay).await;

            if !self.begin_reconnect(&token).await {
                return;
            }
        }
    }

    async fn on_open(self: &Arc<Self>, token: &SessionToken, transport: Arc<dyn Transport>) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(number) = inner.phone_number.clone() else {
            return false;
        };
        if !token.is_live() {
            return false;
        }

        inner.state = SocketState::Open;
        inner.reconnect_attempts = 0;
        inner.transport = Some(transport.clone());

        info!(target: "Pairing/Socket", "Pairing socket open, subscribing to {number}");
        send_frame(transport.as_ref(), &OutboundFrame::subscribe(&number)).await;
        inner.subscribed_number = Some(number);

        for pending in std::mem::take(&mut inner.pending_subscriptions) {
            send_frame(transport.as_ref(), &OutboundFrame::subscribe(&pending)).await;
            inner.phone_number = Some(pending.clone());
            inner.subscribed_number = Some(pending);
        }

        inner.keepalive = Some(self.spawn_keepalive(token.clone()));
        true
    }

    async fn read_loop(&self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::TextReceived(text) => self.handle_frame(&text).await,
                TransportEvent::Error(e) => {
                    warn!(target: "Pairing/Socket", "WebSocket error observed: {e}");
                }
                TransportEvent::Connected => {
                    debug!(target: "Pairing/Socket", "Transport connected event received");
                }
                TransportEvent::Disconnected => break,
            }
        }
        info!(target: "Pairing/Socket", "Pairing socket disconnected");
    }

    /// Returns the delay before the next dial, or `None` when the session is
    /// over (closed explicitly or out of attempts).
    async fn on_close(&self, token: &SessionToken) -> Option<Duration> {
        let mut inner = self.inner.lock().await;
        if !token.is_live() {
            return None;
        }

        if let Some(keepalive) = inner.keepalive.take() {
            keepalive.cancel();
        }
        inner.transport = None;
        inner.subscribed_number = None;

        if !self.policy.should_retry(inner.reconnect_attempts) {
            inner.state = SocketState::Closed;
            warn!(
                target: "Pairing/Socket",
                "Maximum reconnect attempts ({}) reached, giving up",
                self.policy.max_attempts
            );
            return None;
        }

        let delay = self.policy.delay(inner.reconnect_attempts);
        inner.reconnect_attempts += 1;
        inner.state = SocketState::Reconnecting;
        info!(
            target: "Pairing/Socket",
            "Will attempt to reconnect in {:?} (attempt {})",
            delay,
            inner.reconnect_attempts
        );
        Some(delay)
    }

    async fn begin_reconnect(&self, token: &SessionToken) -> bool {
        let mut inner = self.inner.lock().await;
        if !token.is_live() || inner.phone_number.is_none() {
            return false;
        }
        inner.state = SocketState::Connecting;
        // The dial these were queued behind never opened; redial for the latest.
        if let Some(latest) = inner.pending_subscriptions.pop() {
            inner.phone_number = Some(latest);
        }
        inner.pending_subscriptions.clear();
        true
    }

    async fn handle_frame(&self, text: &str) {
        let event = match protocol::parse_inbound(text) {
            Ok(event) => event,
            Err(e) => {
                let e = PairingError::from(e);
                error!(target: "Pairing/Socket", "Error processing socket message: {e}");
                return;
            }
        };

        if let InboundEvent::QrCode { number, qr } = &event {
            let subscribed = self.inner.lock().await.subscribed_number.clone();
            let matches = subscribed
                .as_deref()
                .is_some_and(|expected| protocol::numbers_match(number, expected));
            if !matches || qr.is_empty() {
                debug!(target: "Pairing/Socket", "Dropping qrCode event for {number:?} (subscribed: {subscribed:?})");
                return;
            }
        }

        debug!(target: "Pairing/Socket", "Dispatching {} event", event.event_type());
        dispatch(self.handler.as_ref(), &event);
    }

    /// The transport of the open connection, if any.
    pub(crate) async fn open_transport(&self) -> Option<Arc<dyn Transport>> {
        let inner = self.inner.lock().await;
        match inner.state {
            SocketState::Open => inner.transport.clone(),
            _ => None,
        }
    }
}

/// Sends a frame, logging instead of failing when the transport is gone.
pub(crate) async fn send_frame(transport: &dyn Transport, frame: &OutboundFrame) -> bool {
    match transport.send(&frame.encode()).await {
        Ok(()) => true,
        Err(e) => {
            debug!(target: "Pairing/Socket", "Dropping {frame:?}: {e}");
            false
        }
    }
}
