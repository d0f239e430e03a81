//! Rendering hooks the pairing core calls into. The concrete view is owned
//! by whatever front end hosts the dialog; [`ConsoleView`] is the one used by
//! the CLI.

use log::{error, info, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub text: String,
    /// Dismiss automatically after this long; `None` waits for the user.
    pub auto_close: Option<Duration>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            text: text.into(),
            auto_close: None,
        }
    }

    pub fn with_auto_close(mut self, after: Duration) -> Self {
        self.auto_close = Some(after);
        self
    }

    pub fn authenticated(number: &str) -> Self {
        Self::new(
            NotificationLevel::Success,
            "Authentication successful!",
            format!("The number {number} has been authenticated."),
        )
        .with_auto_close(Duration::from_secs(6))
    }

    pub fn ready(number: &str) -> Self {
        Self::new(
            NotificationLevel::Info,
            "WhatsApp ready",
            format!("The WhatsApp client for {number} is ready to use."),
        )
        .with_auto_close(Duration::from_secs(6))
    }

    pub fn already_authenticated(number: &str) -> Self {
        Self::new(
            NotificationLevel::Success,
            "Already authenticated",
            format!("The number {number} is already authenticated and ready to use."),
        )
        .with_auto_close(Duration::from_secs(3))
    }

    pub fn connection_created(message: Option<&str>) -> Self {
        Self::new(
            NotificationLevel::Success,
            "Success",
            message.unwrap_or("Connection created successfully."),
        )
    }

    pub fn connection_deleted() -> Self {
        Self::new(
            NotificationLevel::Success,
            "Deleted!",
            "The connection has been deleted.",
        )
    }

    pub fn create_failed(reason: &str) -> Self {
        Self::new(
            NotificationLevel::Error,
            "Error",
            format!("There was a problem creating the connection: {reason}"),
        )
    }

    pub fn delete_failed(reason: &str) -> Self {
        Self::new(
            NotificationLevel::Error,
            "Error",
            format!("There was a problem deleting the connection: {reason}"),
        )
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, "Warning!", text)
    }
}

pub trait PairingView: Send + Sync {
    /// Draws `payload` as a QR code, replacing whatever was shown before.
    fn render_qr(&self, payload: &str);

    /// Replaces the QR area with a "connected" state.
    fn render_authenticated(&self, number: &str);

    fn notify(&self, notification: Notification);
}

/// Prints everything through the logger, like the CLI prints pairing codes.
#[derive(Debug, Default, Clone)]
pub struct ConsoleView;

impl PairingView for ConsoleView {
    fn render_qr(&self, payload: &str) {
        info!("----------------------------------------");
        info!("QR code received, scan it from WhatsApp > Linked Devices:");
        info!("\n{}\n", payload);
        info!("----------------------------------------");
    }

    fn render_authenticated(&self, number: &str) {
        info!("========================================");
        info!("WhatsApp connected ({number})");
        info!("========================================");
    }

    fn notify(&self, notification: Notification) {
        let Notification { level, title, text, .. } = notification;
        match level {
            NotificationLevel::Success | NotificationLevel::Info => info!("{title}: {text}"),
            NotificationLevel::Warning => warn!("{title}: {text}"),
            NotificationLevel::Error => error!("{title}: {text}"),
        }
    }
}
