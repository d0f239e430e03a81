pub use paircore;
pub use paircore::{events, protocol};

pub mod config;
pub mod connections;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod keepalive;
pub mod poller;
pub mod socket;
pub mod task;
pub mod transport;
pub mod view;

#[cfg(test)]
mod test_utils;

pub use config::PairingConfig;
pub use connections::{Connection, ConnectionForm, ConnectionsApi, CreatedConnection};
pub use console::{PairingConsole, PairingConsoleBuilder};
pub use coordinator::{DialogState, PairingCoordinator};
pub use error::PairingError;
pub use poller::{ConnectionStatus, QrPoll, StatusPoller};
pub use socket::{PairingSocket, SocketState};
pub use view::{ConsoleView, Notification, NotificationLevel, PairingView};
