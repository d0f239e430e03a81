pub use paircore::net::{
    HttpClient, HttpRequest, HttpResponse, Transport, TransportEvent, TransportFactory,
};
pub use whatsapp_pairing_tokio_transport::TokioWebSocketTransportFactory;
pub use whatsapp_pairing_ureq_http_client::UreqHttpClient;
