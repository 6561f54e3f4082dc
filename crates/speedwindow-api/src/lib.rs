// speedwindow-api: Async Rust client for the qBittorrent Web API (transfer limits)

pub mod error;
pub mod qbittorrent;
pub mod transport;
pub mod webhook;

pub use error::Error;
pub use qbittorrent::{QbitClient, TransferLimits};
pub use transport::{TlsMode, TransportConfig};
pub use webhook::WebhookClient;
