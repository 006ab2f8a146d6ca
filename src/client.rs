use crate::LOG_TARGET;
use crate::app::Config;
use crate::domain::{Attachment, DeliveryError, Event};
use crate::dsn::Dsn;
use crate::envelope::Envelope;
use crate::transport::{HttpTransport, Transport};
use crate::worker::{BackgroundWorker, WorkerConfig};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Hands captured events to the background worker, which encodes and sends
/// them through the shared transport.
pub struct Client {
    dsn: Dsn,
    transport: Arc<dyn Transport>,
    worker: BackgroundWorker,
    environment: Option<String>,
    release: Option<String>,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        config.validate()?;
        let dsn = config.dsn()?;
        let transport = HttpTransport::new(&dsn, config.transport_config()?)?;

        let mut client = Self::with_parts(dsn, Arc::new(transport), &config.worker_config());
        client.environment.clone_from(&config.environment);
        client.release.clone_from(&config.release);
        Ok(client)
    }

    pub fn with_parts(dsn: Dsn, transport: Arc<dyn Transport>, worker: &WorkerConfig) -> Self {
        Self {
            dsn,
            transport,
            worker: BackgroundWorker::new(worker),
            environment: None,
            release: None,
        }
    }

    pub fn capture_message(&self, message: impl Into<String>) -> anyhow::Result<Uuid> {
        self.capture_event(Event::from_message(message))
    }

    pub fn capture_event(&self, event: Event) -> anyhow::Result<Uuid> {
        self.capture_event_with_attachments(event, Vec::new())
    }

    /// Queues `event` for delivery and returns its id.
    ///
    /// In immediate mode the envelope has been sent when this returns and any
    /// encode or transport error is returned. In pooled mode errors are logged
    /// on the worker thread.
    pub fn capture_event_with_attachments(
        &self,
        mut event: Event,
        attachments: Vec<Attachment>,
    ) -> anyhow::Result<Uuid> {
        if event.environment.is_none() {
            event.environment.clone_from(&self.environment);
        }
        if event.release.is_none() {
            event.release.clone_from(&self.release);
        }

        let event_id = event.event_id;
        let dsn = self.dsn.clone();
        let transport = Arc::clone(&self.transport);

        self.worker.perform(move || {
            let mut envelope = Envelope::from_event(&event, Some(&dsn))?;
            for attachment in attachments {
                envelope.add_attachment(attachment);
            }
            let data = envelope.to_bytes()?;
            let report = transport.send_envelope(&data)?;
            debug!(
                target: LOG_TARGET,
                event_id = %event_id.simple(),
                status = report.status_code,
                "event sent"
            );
            Ok(())
        })?;

        Ok(event_id)
    }

    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    pub fn worker(&self) -> &BackgroundWorker {
        &self.worker
    }

    pub fn shutdown(&self) {
        info!(target: LOG_TARGET, "shutting down, flushing pending events");
        self.worker.shutdown();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("dsn", &self.dsn)
            .field("worker", &self.worker)
            .field("environment", &self.environment)
            .field("release", &self.release)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, SendReport, TransportError};
    use std::time::Duration;

    fn dsn() -> Dsn {
        Dsn::parse("http://12345@sentry.localdomain/42").unwrap()
    }

    fn ok_report() -> SendReport {
        SendReport {
            status_code: 200,
            bytes_sent: 10,
            compressed: false,
            latency: Duration::from_millis(1),
        }
    }

    fn immediate() -> WorkerConfig {
        WorkerConfig {
            background_worker_threads: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_immediate_capture_sends_envelope_with_event_id() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_envelope()
            .times(1)
            .withf(|data| {
                let text = String::from_utf8_lossy(data);
                text.contains("foobarbaz") && text.contains("\"type\":\"event\"")
            })
            .returning(|_| Ok(ok_report()));

        let client = Client::with_parts(dsn(), Arc::new(transport), &immediate());
        let id = client.capture_message("foobarbaz").unwrap();
        assert!(!id.is_nil());
    }

    #[test]
    fn test_immediate_capture_propagates_transport_error() {
        let mut transport = MockTransport::new();
        transport.expect_send_envelope().returning(|_| {
            Err(TransportError::External {
                status: 500,
                message: "boom".to_string(),
            })
        });

        let client = Client::with_parts(dsn(), Arc::new(transport), &immediate());
        let err = client.capture_message("foobarbaz").unwrap_err();
        let transport_error = err.downcast_ref::<TransportError>().unwrap();
        assert_eq!(transport_error.status(), Some(500));
    }

    #[test]
    fn test_pooled_capture_swallows_failures() {
        let mut transport = MockTransport::new();
        transport.expect_send_envelope().times(1).returning(|_| {
            Err(TransportError::External {
                status: 404,
                message: "no response body".to_string(),
            })
        });

        let worker = WorkerConfig {
            background_worker_threads: 1,
            ..Default::default()
        };
        let client = Client::with_parts(dsn(), Arc::new(transport), &worker);
        assert!(client.capture_message("foobarbaz").is_ok());

        client.shutdown();
        let metrics = client.worker().metrics().unwrap();
        assert_eq!(metrics.failed, 1);
    }

    #[test]
    fn test_defaults_fill_missing_environment_only() {
        let mut transport = MockTransport::new();
        transport
            .expect_send_envelope()
            .times(2)
            .withf(|data| {
                let text = String::from_utf8_lossy(data);
                text.contains("\"release\":\"1.0.0\"")
                    && (text.contains("\"environment\":\"production\"")
                        || text.contains("\"environment\":\"staging\""))
            })
            .returning(|_| Ok(ok_report()));

        let mut client = Client::with_parts(dsn(), Arc::new(transport), &immediate());
        client.environment = Some("production".to_string());
        client.release = Some("1.0.0".to_string());

        client.capture_message("first").unwrap();
        client
            .capture_event(Event::from_message("second").with_environment("staging"))
            .unwrap();
    }
}
