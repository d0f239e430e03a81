//! Runtime-agnostic pieces of the pairing console: the wire protocol spoken
//! over the pairing-events socket, the reconnect policy, the handler traits
//! and the network seams implemented by the transport and HTTP backends.

pub mod backoff;
pub mod events;
pub mod net;
pub mod protocol;

pub use backoff::ReconnectPolicy;
pub use events::{PairingEventHandler, dispatch};
pub use protocol::{InboundEvent, OutboundFrame, ProtocolError};
