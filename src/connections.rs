//! Client for the connection CRUD endpoints backing the connections table.

use crate::config::PairingConfig;
use crate::error::{PairingError, Result};
use log::{info, warn};
use paircore::net::{HttpClient, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_CREATE_ERROR: &str = "There was a problem creating the connection.";
const UNKNOWN_ERROR: &str = "Unknown error.";

/// A pairing-capable connection as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub name: String,
    /// Country code and national number, concatenated.
    pub phone_number: String,
    /// Display colour, e.g. `#25d366`.
    pub color: String,
}

/// Result of a successful add: the stored connection and the server's
/// confirmation text, when it sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedConnection {
    pub connection: Connection,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionForm {
    pub name: String,
    pub country_code: String,
    pub phone_number: String,
    pub color: String,
}

impl ConnectionForm {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            &self.name,
            &self.country_code,
            &self.phone_number,
            &self.color,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(PairingError::Validation(
                "All fields are required.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn full_number(&self) -> String {
        format!("{}{}", self.country_code.trim(), self.phone_number.trim())
    }

    fn encode(&self) -> Vec<u8> {
        [
            ("name", self.name.trim().to_string()),
            ("phone_number", self.full_number()),
            ("color", self.color.trim().to_string()),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
    }
}

#[derive(Debug, Deserialize)]
struct AddConnectionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    connection: Option<Connection>,
}

/// Pulls a human-readable reason out of a failed response: the JSON
/// `message` field when there is one, otherwise the raw body.
pub fn extract_error_message(response: &HttpResponse) -> String {
    if let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(&response.body)
        && let Some(Value::String(message)) = body.get("message")
    {
        return message.clone();
    }

    let text = response.body_string();
    if text.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        text
    }
}

pub struct ConnectionsApi {
    http_client: Arc<dyn HttpClient>,
    config: PairingConfig,
}

impl ConnectionsApi {
    pub fn new(http_client: Arc<dyn HttpClient>, config: PairingConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Validates `form` and registers the connection.
    pub async fn add(&self, form: &ConnectionForm) -> Result<CreatedConnection> {
        form.validate()?;

        let request = HttpRequest::post(self.config.api_url("api/connection/add"))
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(form.encode());
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(PairingError::Http)?;

        if !response.is_success() {
            let reason = extract_error_message(&response);
            warn!(target: "Pairing/Connections", "Creating connection failed ({}): {reason}", response.status_code);
            return Err(PairingError::Server(reason));
        }

        let body: AddConnectionResponse = serde_json::from_slice(&response.body)?;
        match body {
            AddConnectionResponse {
                success: true,
                connection: Some(connection),
                message,
            } => {
                info!(
                    target: "Pairing/Connections",
                    "Connection {} created for {}",
                    connection.id,
                    connection.phone_number
                );
                Ok(CreatedConnection {
                    connection,
                    message,
                })
            }
            AddConnectionResponse { message, .. } => Err(PairingError::Server(
                message.unwrap_or_else(|| DEFAULT_CREATE_ERROR.to_string()),
            )),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let request = HttpRequest::post(self.config.api_url(&format!("api/connection/delete/{id}")));
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(PairingError::Http)?;

        if !response.is_success() {
            let reason = extract_error_message(&response);
            warn!(target: "Pairing/Connections", "Deleting connection {id} failed ({}): {reason}", response.status_code);
            return Err(PairingError::Server(reason));
        }

        info!(target: "Pairing/Connections", "Connection {id} deleted");
        Ok(())
    }
}
