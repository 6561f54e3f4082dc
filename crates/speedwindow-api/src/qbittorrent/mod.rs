// qBittorrent Web API client modules
//
// Hand-written client for the handful of `/api/v2` endpoints the limiter
// needs: session auth, a version probe, and the global transfer limits.

pub mod auth;
pub mod client;
pub mod transfer;

pub use client::QbitClient;
pub use transfer::TransferLimits;
