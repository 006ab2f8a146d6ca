//! HTTP outcome classification.

use super::error::TransportError;

/// Header the collector uses to explain a rejected envelope.
pub const SENTRY_ERROR_HEADER: &str = "x-sentry-error";

// Keeps log lines and error messages bounded
pub(crate) const MAX_BODY_IN_MESSAGE: usize = 512;

/// Result of one HTTP exchange that produced a status code.
///
/// Failures before a status is known never reach this type; they surface as
/// `TransportError::Connection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success {
        status: u16,
    },
    ClientError {
        status: u16,
        server_error: Option<String>,
        body: Option<String>,
    },
    ServerError {
        status: u16,
        server_error: Option<String>,
        body: Option<String>,
    },
    Unexpected {
        status: u16,
    },
}

impl ResponseOutcome {
    pub fn classify(status: u16, server_error: Option<String>, body: Option<String>) -> Self {
        let body = body.filter(|b| !b.trim().is_empty());
        match status {
            200..=299 => ResponseOutcome::Success { status },
            400..=499 => ResponseOutcome::ClientError {
                status,
                server_error,
                body,
            },
            500..=599 => ResponseOutcome::ServerError {
                status,
                server_error,
                body,
            },
            _ => ResponseOutcome::Unexpected { status },
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ResponseOutcome::Success { status }
            | ResponseOutcome::ClientError { status, .. }
            | ResponseOutcome::ServerError { status, .. }
            | ResponseOutcome::Unexpected { status } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success { .. })
    }

    /// Failure detail: the server error header verbatim, else the body.
    pub fn message(&self) -> String {
        match self {
            ResponseOutcome::Success { .. } => "ok".to_string(),
            ResponseOutcome::ClientError {
                server_error, body, ..
            }
            | ResponseOutcome::ServerError {
                server_error, body, ..
            } => match (server_error, body) {
                (Some(header), _) => header.clone(),
                (None, Some(body)) => truncate(body),
                (None, None) => "no response body".to_string(),
            },
            ResponseOutcome::Unexpected { .. } => "unexpected response status".to_string(),
        }
    }

    pub fn into_result(self) -> Result<u16, TransportError> {
        if self.is_success() {
            return Ok(self.status());
        }
        Err(TransportError::External {
            status: self.status(),
            message: self.message(),
        })
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_BODY_IN_MESSAGE {
        return body.to_string();
    }
    let mut end = MAX_BODY_IN_MESSAGE;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_status_ranges() {
        assert!(ResponseOutcome::classify(200, None, None).is_success());
        assert!(ResponseOutcome::classify(299, None, None).is_success());
        assert!(matches!(
            ResponseOutcome::classify(404, None, None),
            ResponseOutcome::ClientError { status: 404, .. }
        ));
        assert!(matches!(
            ResponseOutcome::classify(503, None, None),
            ResponseOutcome::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            ResponseOutcome::classify(304, None, None),
            ResponseOutcome::Unexpected { status: 304 }
        ));
    }

    #[test]
    fn test_header_takes_precedence_over_body() {
        let outcome = ResponseOutcome::classify(
            500,
            Some("error_in_header".to_string()),
            Some("Internal Server Error".to_string()),
        );
        let err = outcome.into_result().unwrap_err();
        let message = err.to_string();

        assert!(message.contains("500"));
        assert!(message.contains("error_in_header"));
        assert!(!message.contains("Internal Server Error"));
    }

    #[test]
    fn test_body_used_without_header() {
        let outcome = ResponseOutcome::classify(400, None, Some("bad envelope".to_string()));
        assert_eq!(outcome.message(), "bad envelope");

        let blank = ResponseOutcome::classify(404, None, Some("   ".to_string()));
        assert_eq!(blank.message(), "no response body");
        assert_eq!(
            blank.into_result().unwrap_err().to_string(),
            "the server responded with status 404: no response body"
        );
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(MAX_BODY_IN_MESSAGE);
        let message = ResponseOutcome::classify(502, None, Some(body)).message();

        assert!(message.ends_with("..."));
        assert!(message.len() <= MAX_BODY_IN_MESSAGE + 3);
    }

    #[test]
    fn test_success_into_result() {
        assert_eq!(
            ResponseOutcome::classify(202, None, None).into_result().unwrap(),
            202
        );
    }
}
