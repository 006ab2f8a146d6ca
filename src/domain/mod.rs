//! Domain layer for sentry-delivery.
//!
//! Contains the canonical types handed to the delivery pipeline:
//! - `Event`: an error or transaction ready to be enveloped
//! - `Level`: event severity (debug/info/warning/error/fatal)
//! - `Attachment`: a file shipped alongside an event
//! - `DeliveryError`: top-level error type

pub mod error;
pub mod event;
pub mod level;

pub use error::DeliveryError;
pub use event::{Attachment, Event, EventKind, SdkInfo};
pub use level::Level;
