// ── Ports ──
//
// The traits the enforcer talks through. Production implementations live
// in `directory` and `notify`; tests substitute in-memory fakes.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServiceKind;
use crate::error::CoreError;
use crate::limit::SpeedLimits;

/// Read/write access to one downloader's global speed limits (KiB/s).
#[async_trait]
pub trait LimitPort: Send + Sync {
    /// Current live limits. A transport or auth failure is an error.
    async fn get_speed_limit(&self) -> Result<SpeedLimits, CoreError>;

    /// Apply both limits. Returns `false` when the downloader did not take
    /// them; never errors.
    async fn set_speed_limit(&self, download: i64, upload: i64) -> bool;
}

/// A downloader that is eligible for this cycle.
///
/// Holds a transient handle to its port; directories hand out fresh values
/// every cycle and the enforcer drops them when the cycle ends.
#[derive(Clone)]
pub struct ManagedService {
    pub name: String,
    pub kind: ServiceKind,
    pub port: Arc<dyn LimitPort>,
}

impl fmt::Debug for ManagedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedService")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Resolves configured service names to the subset that can be driven now.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    /// Only active services of the qBittorrent kind are returned. Anything
    /// else is left out silently; an empty name set yields an empty list.
    async fn resolve_eligible(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<Vec<ManagedService>, CoreError>;
}

/// Operator-facing alert delivery. Best effort from the engine's side.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, title: &str, body: &str) -> Result<(), CoreError>;
}
