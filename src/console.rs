use crate::config::PairingConfig;
use crate::connections::{ConnectionForm, ConnectionsApi, CreatedConnection};
use crate::coordinator::PairingCoordinator;
use crate::error::PairingError;
use crate::view::{ConsoleView, Notification, PairingView};
use anyhow::Result;
use log::info;
use paircore::net::{HttpClient, TransportFactory};
use std::sync::Arc;

/// Wires the pairing dialog and the connections client to one view.
pub struct PairingConsole {
    coordinator: Arc<PairingCoordinator>,
    connections: ConnectionsApi,
    view: Arc<dyn PairingView>,
}

impl PairingConsole {
    pub fn builder() -> PairingConsoleBuilder {
        PairingConsoleBuilder::new()
    }

    pub fn coordinator(&self) -> Arc<PairingCoordinator> {
        self.coordinator.clone()
    }

    pub fn connections(&self) -> &ConnectionsApi {
        &self.connections
    }

    /// Creates a connection and reports the outcome on the view.
    pub async fn add_connection(
        &self,
        form: &ConnectionForm,
    ) -> crate::error::Result<CreatedConnection> {
        match self.connections.add(form).await {
            Ok(created) => {
                self.view
                    .notify(Notification::connection_created(created.message.as_deref()));
                Ok(created)
            }
            Err(PairingError::Validation(message)) => {
                self.view.notify(Notification::warning(message.clone()));
                Err(PairingError::Validation(message))
            }
            Err(e) => {
                self.view.notify(Notification::create_failed(&e.to_string()));
                Err(e)
            }
        }
    }

    pub async fn delete_connection(&self, id: i64) -> crate::error::Result<()> {
        match self.connections.delete(id).await {
            Ok(()) => {
                self.view.notify(Notification::connection_deleted());
                Ok(())
            }
            Err(e) => {
                self.view.notify(Notification::delete_failed(&e.to_string()));
                Err(e)
            }
        }
    }
}

#[derive(Default)]
pub struct PairingConsoleBuilder {
    config: Option<PairingConfig>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    http_client: Option<Arc<dyn HttpClient>>,
    view: Option<Arc<dyn PairingView>>,
}

impl PairingConsoleBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PairingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the factory used to dial the pairing-events endpoint.
    pub fn with_transport_factory<F>(mut self, transport_factory: F) -> Self
    where
        F: TransportFactory + 'static,
    {
        self.transport_factory = Some(Arc::new(transport_factory));
        self
    }

    pub fn with_http_client<C>(mut self, http_client: C) -> Self
    where
        C: HttpClient + 'static,
    {
        self.http_client = Some(Arc::new(http_client));
        self
    }

    /// Replaces the default [`ConsoleView`].
    pub fn with_view(mut self, view: Arc<dyn PairingView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn build(self) -> Result<PairingConsole> {
        let transport_factory = self.transport_factory.ok_or_else(|| {
            anyhow::anyhow!("Transport factory is required. Use with_transport_factory() to set it.")
        })?;
        let http_client = self.http_client.ok_or_else(|| {
            anyhow::anyhow!("HTTP client is required. Use with_http_client() to set it.")
        })?;
        let config = self.config.unwrap_or_default();
        let view = self.view.unwrap_or_else(|| Arc::new(ConsoleView));

        info!(
            "Pairing console using API at {} and events at {}",
            config.api_base_url, config.events_url
        );

        let coordinator = PairingCoordinator::new(
            transport_factory,
            http_client.clone(),
            view.clone(),
            config.clone(),
        );
        let connections = ConnectionsApi::new(http_client, config);

        Ok(PairingConsole {
            coordinator,
            connections,
            view,
        })
    }
}
