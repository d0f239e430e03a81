use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An event produced by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport has successfully connected.
    Connected,
    /// A text frame has been received from the server.
    TextReceived(String),
    /// The transport observed an error. Recovery is driven by the
    /// `Disconnected` event that follows.
    Error(String),
    /// The connection was lost.
    Disconnected,
}

/// Represents an active duplex connection to the pairing-events endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a text frame to the server. Fails once the transport is closed.
    async fn send(&self, text: &str) -> Result<(), anyhow::Error>;

    /// Closes the connection.
    async fn disconnect(&self);
}

/// A factory responsible for creating new transport instances.
/// The endpoint the transport dials belongs to the factory.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Creates a new transport and returns it, along with a stream of events.
    async fn create_transport(
        &self,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), anyhow::Error>;
}

/// A simple structure to represent an HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: String, // "GET" or "POST"
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A buffered HTTP response. Non-2xx statuses are ordinary responses,
/// only transport failures surface as errors from [`HttpClient::execute`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// Creates an HTTP response with an empty body and the given status code.
    pub fn empty(status_code: u16) -> Self {
        Self::new(status_code, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Trait for executing HTTP requests in a runtime-agnostic way
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes a given HTTP request and returns the response.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::post("http://localhost:5000/api/connection/add")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(b"name=Sales".to_vec());

        assert_eq!(req.method, "POST");
        assert_eq!(
            req.headers.get("Content-Type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(req.body.as_deref(), Some(&b"name=Sales"[..]));
        assert!(HttpRequest::get("http://x").body.is_none());
    }

    #[test]
    fn test_response_status_classes() {
        assert!(HttpResponse::empty(200).is_success());
        assert!(HttpResponse::empty(204).is_success());
        assert!(!HttpResponse::empty(404).is_success());
        assert!(!HttpResponse::empty(500).is_success());
        assert_eq!(HttpResponse::new(200, "ok").body_string(), "ok");
    }
}
