use crate::socket::{PairingSocket, send_frame};
use crate::task::{SessionToken, TaskHandle};
use log::{debug, info};
use paircore::OutboundFrame;
use std::sync::Arc;

impl PairingSocket {
    /// Sends a single `ping` frame on the open connection.
    /// Returns false when there is no open connection or the send failed.
    async fn send_keepalive(&self) -> bool {
        let Some(transport) = self.open_transport().await else {
            return false;
        };

        debug!(target: "Pairing/Keepalive", "Sending keepalive ping");
        send_frame(transport.as_ref(), &OutboundFrame::Ping).await
    }

    /// Spawns the periodic ping for the connection identified by `token`.
    /// The task ends as soon as the token goes stale.
    pub(crate) fn spawn_keepalive(self: &Arc<Self>, token: SessionToken) -> TaskHandle {
        let this = self.clone();
        TaskHandle::spawn(async move {
            loop {
                tokio::time::sleep(this.keepalive_interval).await;
                if !token.is_live() {
                    debug!(target: "Pairing/Keepalive", "Session closed, exiting keepalive loop.");
                    return;
                }
                if !this.send_keepalive().await {
                    info!(target: "Pairing/Keepalive", "Connection no longer open, exiting keepalive loop.");
                    return;
                }
            }
        })
    }
}
