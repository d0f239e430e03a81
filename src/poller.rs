//! Request/response side of pairing: the authentication status check and the
//! QR fetch that keeps retrying while the server has not issued a code yet.

use crate::config::PairingConfig;
use crate::error::{PairingError, Result};
use crate::task::{SessionToken, TaskHandle};
use log::{debug, error, info, warn};
use paircore::PairingEventHandler;
use paircore::net::{HttpClient, HttpRequest};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionStatus {
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,
    /// Whatever else the server reports alongside the flag.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct QrResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    qr: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of a single QR request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPoll {
    Ready(String),
    /// 404: the server has not issued a code for this number yet.
    NotReady,
    /// 2xx without a QR or an error message.
    Empty,
}

pub struct StatusPoller {
    http_client: Arc<dyn HttpClient>,
    handler: Arc<dyn PairingEventHandler>,
    config: PairingConfig,
}

impl StatusPoller {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        handler: Arc<dyn PairingEventHandler>,
        config: PairingConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            http_client,
            handler,
            config,
        })
    }

    /// Asks the server whether `phone_number` is already paired. No retry.
    pub async fn check_status(&self, phone_number: &str) -> Result<ConnectionStatus> {
        let url = self.config.api_url(&format!(
            "api/status_connection/{}",
            urlencoding::encode(phone_number)
        ));

        let result = self.get_status(url).await;
        if let Err(e) = &result {
            error!(target: "Pairing/Poller", "Error checking client status for {phone_number}: {e}");
        }
        result
    }

    async fn get_status(&self, url: String) -> Result<ConnectionStatus> {
        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .await
            .map_err(PairingError::Http)?;
        if !response.is_success() {
            return Err(PairingError::HttpStatus(response.status_code));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Issues one request to the QR endpoint.
    pub async fn request_qr(&self, phone_number: &str) -> Result<QrPoll> {
        let url = self
            .config
            .api_url(&format!("api/qr/{}", urlencoding::encode(phone_number)));
        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .await
            .map_err(PairingError::Http)?;

        if response.status_code == 404 {
            return Ok(QrPoll::NotReady);
        }
        if !response.is_success() {
            return Err(PairingError::HttpStatus(response.status_code));
        }

        let body: QrResponse = serde_json::from_slice(&response.body)?;
        match body {
            QrResponse {
                success: true,
                qr: Some(qr),
                ..
            } if !qr.is_empty() => Ok(QrPoll::Ready(qr)),
            QrResponse {
                error: Some(message),
                ..
            } => Err(PairingError::Server(message)),
            _ => Ok(QrPoll::Empty),
        }
    }

    /// Fetches the QR for `phone_number`, retrying every `qr_retry_interval`
    /// for as long as the server answers 404. A received code is forwarded to
    /// the handler unless `token` went stale in the meantime.
    pub async fn fetch_qr(&self, phone_number: &str, token: &SessionToken) -> Result<Option<String>> {
        loop {
            if !token.is_live() {
                return Err(PairingError::Cancelled);
            }

            match self.request_qr(phone_number).await {
                Ok(QrPoll::Ready(qr)) => {
                    if !token.is_live() {
                        return Err(PairingError::Cancelled);
                    }
                    info!(target: "Pairing/Poller", "QR code fetched for {phone_number}");
                    self.handler.on_qr_code(&qr);
                    return Ok(Some(qr));
                }
                Ok(QrPoll::NotReady) => {
                    debug!(
                        target: "Pairing/Poller",
                        "QR not issued yet for {phone_number}, retrying in {:?}",
                        self.config.qr_retry_interval
                    );
                    tokio::time::sleep(self.config.qr_retry_interval).await;
                }
                Ok(QrPoll::Empty) => {
                    debug!(target: "Pairing/Poller", "QR response for {phone_number} carried no code");
                    return Ok(None);
                }
                Err(PairingError::Server(message)) => {
                    warn!(target: "Pairing/Poller", "Error in QR response for {phone_number}: {message}");
                    return Err(PairingError::Server(message));
                }
                Err(e) => {
                    error!(target: "Pairing/Poller", "Error fetching QR code for {phone_number}: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// Runs [`StatusPoller::fetch_qr`] in the background.
    pub fn spawn_fetch_qr(self: &Arc<Self>, phone_number: String, token: SessionToken) -> TaskHandle {
        let this = self.clone();
        TaskHandle::spawn(async move {
            let _ = this.fetch_qr(&phone_number, &token).await;
        })
    }
}
