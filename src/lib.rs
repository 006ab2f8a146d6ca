// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and sizes stay within realistic bounds
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. TransportError in transport module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod client;
pub mod domain;
pub mod dsn;
pub mod envelope;
pub mod transport;
pub mod worker;

// Re-export main types for easy access
pub use app::{Config, ConfigError};
pub use client::Client;
pub use domain::{Attachment, DeliveryError, Event, Level};
pub use dsn::{Dsn, DsnError};
pub use envelope::{EncodeError, Envelope, EnvelopeItem};
pub use transport::{HttpTransport, Transport, TransportConfig, TransportError};
pub use worker::{BackgroundWorker, WorkerConfig};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target used by every log line this crate emits.
pub const LOG_TARGET: &str = "sentry";

/// SDK identifier sent in the `User-Agent` and `X-Sentry-Auth` headers.
pub fn sdk_name() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), VERSION)
}
