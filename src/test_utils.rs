use crate::view::{Notification, PairingView};
use async_trait::async_trait;
use paircore::PairingEventHandler;
use paircore::net::{
    HttpClient, HttpRequest, HttpResponse, Transport, TransportEvent, TransportFactory,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Lets every spawned task run until it blocks on I/O or a timer.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// A transport that records what is sent and lets tests inject server frames.
pub struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: AtomicBool,
    events: mpsc::Sender<TransportEvent>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, text: &str) -> Result<(), anyhow::Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Socket is closed"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.try_send(TransportEvent::Disconnected);
        }
    }
}

#[derive(Default)]
pub struct MockTransportFactory {
    attempts: AtomicUsize,
    fail: AtomicBool,
    sent: Arc<Mutex<Vec<String>>>,
    transports: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent dial fail.
    pub fn fail_connects(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of dials, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of connections actually established.
    pub fn created(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    fn latest(&self) -> Arc<MockTransport> {
        self.transports
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport was created")
    }

    pub fn push_text(&self, text: &str) {
        self.latest()
            .events
            .try_send(TransportEvent::TextReceived(text.to_string()))
            .expect("event channel full or closed");
    }

    /// Simulates the server dropping the latest connection.
    pub fn drop_connection(&self) {
        let transport = self.latest();
        transport.closed.store(true, Ordering::SeqCst);
        let _ = transport.events.try_send(TransportEvent::Disconnected);
    }

    pub fn last_transport_closed(&self) -> bool {
        self.latest().closed.load(Ordering::SeqCst)
    }

    pub fn sent_frames(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).expect("client sent invalid JSON"))
            .collect()
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.sent_frames()
            .iter()
            .filter(|frame| frame["action"] == action)
            .count()
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create_transport(
        &self,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), anyhow::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused"));
        }

        let (tx, rx) = mpsc::channel(64);
        let transport = Arc::new(MockTransport {
            sent: self.sent.clone(),
            closed: AtomicBool::new(false),
            events: tx,
        });
        self.transports.lock().unwrap().push(transport.clone());
        Ok((transport, rx))
    }
}

struct Route {
    prefix: String,
    responses: VecDeque<Result<HttpResponse, String>>,
}

/// Scripted HTTP client. Responses are queued per URL fragment; the last
/// queued response for a route keeps being returned once the others are used.
#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, prefix: &str, response: Result<HttpResponse, String>) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.prefix == prefix) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                prefix: prefix.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
    }

    pub fn respond(&self, prefix: &str, response: HttpResponse) {
        self.push(prefix, Ok(response));
    }

    pub fn fail(&self, prefix: &str) {
        self.push(prefix, Err("connection refused".to_string()));
    }

    /// Delays every response by `delay`.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(prefix))
            .count()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, anyhow::Error> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| request.url.contains(&r.prefix))
            .ok_or_else(|| anyhow::anyhow!("no mock route for {}", request.url))?;

        let response = if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        };
        match response {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no mock response for {}", request.url)),
        }
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    qr_codes: Mutex<Vec<String>>,
    authenticated: Mutex<Vec<String>>,
    ready: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn qr_codes(&self) -> Vec<String> {
        self.qr_codes.lock().unwrap().clone()
    }

    pub fn authenticated(&self) -> Vec<String> {
        self.authenticated.lock().unwrap().clone()
    }

    pub fn ready(&self) -> Vec<String> {
        self.ready.lock().unwrap().clone()
    }
}

impl PairingEventHandler for RecordingHandler {
    fn on_qr_code(&self, qr: &str) {
        self.qr_codes.lock().unwrap().push(qr.to_string());
    }

    fn on_authenticated(&self, number: &str) {
        self.authenticated.lock().unwrap().push(number.to_string());
    }

    fn on_ready(&self, number: &str) {
        self.ready.lock().unwrap().push(number.to_string());
    }
}

#[derive(Default)]
pub struct RecordingView {
    qr_renders: Mutex<Vec<String>>,
    authenticated_renders: Mutex<Vec<String>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingView {
    pub fn qr_renders(&self) -> Vec<String> {
        self.qr_renders.lock().unwrap().clone()
    }

    pub fn authenticated_renders(&self) -> Vec<String> {
        self.authenticated_renders.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl PairingView for RecordingView {
    fn render_qr(&self, payload: &str) {
        self.qr_renders.lock().unwrap().push(payload.to_string());
    }

    fn render_authenticated(&self, number: &str) {
        self.authenticated_renders
            .lock()
            .unwrap()
            .push(number.to_string());
    }

    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
