//! Drives the pairing dialog: checks whether the number is already paired,
//! otherwise opens the socket and starts the QR fetch, and tears both down
//! when the dialog closes.

use crate::config::PairingConfig;
use crate::poller::StatusPoller;
use crate::socket::PairingSocket;
use crate::task::{SessionTracker, TaskHandle};
use crate::view::{Notification, PairingView};
use log::{info, warn};
use paircore::PairingEventHandler;
use paircore::net::{HttpClient, TransportFactory};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Checking,
    Authenticated,
    AwaitingQr,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Routes socket and poller events to the view while the dialog is open.
struct DialogEvents {
    view: Arc<dyn PairingView>,
    state: Arc<Mutex<DialogState>>,
}

impl DialogEvents {
    /// Moves AWAITING_QR to AUTHENTICATED. Returns false once the dialog is closed.
    fn mark_authenticated(&self) -> bool {
        let mut state = lock(&self.state);
        match *state {
            DialogState::Closed => false,
            DialogState::AwaitingQr => {
                *state = DialogState::Authenticated;
                true
            }
            DialogState::Checking | DialogState::Authenticated => true,
        }
    }
}

impl PairingEventHandler for DialogEvents {
    fn on_qr_code(&self, qr: &str) {
        if *lock(&self.state) == DialogState::Closed {
            return;
        }
        self.view.render_qr(qr);
    }

    fn on_authenticated(&self, number: &str) {
        if self.mark_authenticated() {
            info!(target: "Pairing/Coordinator", "Number {number} authenticated");
            self.view.notify(Notification::authenticated(number));
        }
    }

    fn on_ready(&self, number: &str) {
        if self.mark_authenticated() {
            info!(target: "Pairing/Coordinator", "WhatsApp client for {number} is ready");
            self.view.notify(Notification::ready(number));
        }
    }
}

pub struct PairingCoordinator {
    socket: Arc<PairingSocket>,
    poller: Arc<StatusPoller>,
    view: Arc<dyn PairingView>,
    state: Arc<Mutex<DialogState>>,
    sessions: SessionTracker,
    qr_task: Mutex<Option<TaskHandle>>,
    /// Held while the dialog starts the socket or tears it down, so a close
    /// never lands between the liveness check and `socket.open`.
    transition: tokio::sync::Mutex<()>,
}

impl PairingCoordinator {
    pub fn new(
        transport_factory: Arc<dyn TransportFactory>,
        http_client: Arc<dyn HttpClient>,
        view: Arc<dyn PairingView>,
        config: PairingConfig,
    ) -> Arc<Self> {
        let state = Arc::new(Mutex::new(DialogState::Closed));
        let events = Arc::new(DialogEvents {
            view: view.clone(),
            state: state.clone(),
        });

        let socket = PairingSocket::new(
            transport_factory,
            events.clone(),
            config.reconnect,
            config.keepalive_interval,
        );
        let poller = StatusPoller::new(http_client, events, config);

        Arc::new(Self {
            socket,
            poller,
            view,
            state,
            sessions: SessionTracker::new(),
            qr_task: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        })
    }

    /// Opens the pairing dialog for `phone_number` and returns the state it
    /// settled in.
    pub async fn open_dialog(&self, phone_number: &str) -> DialogState {
        let token = self.sessions.begin();
        self.cancel_qr_task();
        self.set_state(DialogState::Checking);
        info!(target: "Pairing/Coordinator", "Opening pairing dialog for {phone_number}");

        let authenticated = match self.poller.check_status(phone_number).await {
            Ok(status) => status.is_authenticated,
            Err(e) => {
                warn!(target: "Pairing/Coordinator", "Status check failed, falling back to QR pairing: {e}");
                false
            }
        };

        let _transition = self.transition.lock().await;
        if !token.is_live() {
            // Closed or reopened while the status request was in flight.
            return self.state();
        }

        if authenticated {
            self.set_state(DialogState::Authenticated);
            self.view.render_authenticated(phone_number);
            self.view
                .notify(Notification::already_authenticated(phone_number));
            return DialogState::Authenticated;
        }

        self.set_state(DialogState::AwaitingQr);
        self.socket.open(phone_number).await;
        let task = self.poller.spawn_fetch_qr(phone_number.to_string(), token);
        *lock(&self.qr_task) = Some(task);
        DialogState::AwaitingQr
    }

    /// Closes the dialog: stops the socket and abandons any pending QR retry.
    pub async fn close_dialog(&self) {
        let _transition = self.transition.lock().await;
        self.sessions.invalidate();
        self.cancel_qr_task();
        if self.state() != DialogState::Closed {
            info!(target: "Pairing/Coordinator", "Closing pairing dialog");
        }
        self.set_state(DialogState::Closed);
        self.socket.close().await;
    }

    pub fn state(&self) -> DialogState {
        *lock(&self.state)
    }

    pub fn socket(&self) -> &Arc<PairingSocket> {
        &self.socket
    }

    pub fn poller(&self) -> &Arc<StatusPoller> {
        &self.poller
    }

    fn set_state(&self, state: DialogState) {
        *lock(&self.state) = state;
    }

    fn cancel_qr_task(&self) {
        if let Some(task) = lock(&self.qr_task).take() {
            task.cancel();
        }
    }
}
