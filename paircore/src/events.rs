use crate::protocol::InboundEvent;
use log::debug;

/// Receives the typed events of a pairing session.
///
/// The socket client forwards `qrCode` events only after matching the number
/// against its subscription. `authenticated` and `ready` are forwarded for any
/// number.
pub trait PairingEventHandler: Send + Sync {
    fn on_qr_code(&self, qr: &str);
    fn on_authenticated(&self, number: &str);
    fn on_ready(&self, number: &str);
}

/// Routes an already-filtered event to the matching handler method.
pub fn dispatch(handler: &dyn PairingEventHandler, event: &InboundEvent) {
    match event {
        InboundEvent::QrCode { qr, .. } => handler.on_qr_code(qr),
        InboundEvent::Authenticated { number } => handler.on_authenticated(number),
        InboundEvent::Ready { number } => handler.on_ready(number),
        InboundEvent::Unknown(kind) => {
            debug!(target: "Pairing/Events", "Ignoring unknown event type {kind:?}");
        }
    }
}
