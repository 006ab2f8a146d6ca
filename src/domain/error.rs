use crate::app::ConfigError;
use crate::dsn::DsnError;
use crate::envelope::EncodeError;
use crate::transport::TransportError;
use thiserror::Error;

/// Top-level error type for the delivery pipeline.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid DSN: {0}")]
    Dsn(#[from] DsnError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
