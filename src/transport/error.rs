use thiserror::Error;

/// What went wrong before any HTTP status was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    Timeout,
    Connect,
    Request,
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionFailure::Timeout => f.write_str("timed out"),
            ConnectionFailure::Connect => f.write_str("could not connect"),
            ConnectionFailure::Request => f.write_str("request failed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Connection error ({kind}): {source}")]
    Connection {
        kind: ConnectionFailure,
        #[source]
        source: reqwest::Error,
    },

    #[error("the server responded with status {status}: {message}")]
    External { status: u16, message: String },

    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(String),
}

impl TransportError {
    pub fn connection(source: reqwest::Error) -> Self {
        let kind = if source.is_timeout() {
            ConnectionFailure::Timeout
        } else if source.is_connect() {
            ConnectionFailure::Connect
        } else {
            ConnectionFailure::Request
        };
        TransportError::Connection { kind, source }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::External { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::Connection {
                kind: ConnectionFailure::Timeout,
                ..
            }
        )
    }
}
