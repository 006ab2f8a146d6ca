pub mod config;
pub mod error;
pub mod http;
pub mod response;
pub mod stats;

pub use config::{ClientBuilderHook, Encoding, ProxyConfig, TransportConfig};
pub use error::{ConnectionFailure, TransportError};
pub use http::{HttpTransport, SendReport};
pub use response::ResponseOutcome;
pub use stats::{TransportStats, TransportStatsSnapshot};

#[cfg(test)]
use mockall::automock;

/// Delivers one already-encoded envelope.
///
/// Implementations hold no per-request mutable state beyond atomic counters,
/// so a single instance is shared by every worker thread.
#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync {
    fn send_envelope(&self, data: &[u8]) -> Result<SendReport, TransportError>;
}
