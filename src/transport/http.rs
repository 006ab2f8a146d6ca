use super::Transport;
use super::config::{Encoding, TransportConfig};
use super::error::TransportError;
use super::response::{MAX_BODY_IN_MESSAGE, ResponseOutcome, SENTRY_ERROR_HEADER};
use super::stats::{TransportStats, TransportStatsSnapshot};
use crate::dsn::Dsn;
use crate::envelope::ENVELOPE_CONTENT_TYPE;
use crate::{LOG_TARGET, sdk_name};
use flate2::{Compression, write::GzEncoder};
use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Proxy};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const SENTRY_AUTH_HEADER: &str = "x-sentry-auth";
const SENTRY_PROTOCOL_VERSION: u8 = 7;

/// Summary of a delivered envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub status_code: u16,
    pub bytes_sent: usize,
    pub compressed: bool,
    pub latency: Duration,
}

/// Blocking HTTP transport for encoded envelopes.
///
/// Each `send_envelope` call blocks the calling thread for one POST, bounded
/// by the configured timeouts.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
    endpoint: Url,
    public_key: String,
    secret_key: Option<String>,
    stats: Arc<TransportStats>,
}

impl HttpTransport {
    pub fn new(dsn: &Dsn, config: TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;

        let endpoint: Url = dsn.envelope_url().parse().map_err(|e| {
            TransportError::InvalidConfiguration(format!("Invalid endpoint URL: {e}"))
        })?;

        let mut builder = Self::configure_builder(&config)?;
        if let Some(hook) = &config.client_builder {
            builder = hook(builder);
        }

        let client = builder.build().map_err(|e| {
            TransportError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
        })?;

        debug!(
            target: LOG_TARGET,
            "Sentry HTTP Transport connecting to {}",
            dsn.server()
        );

        Ok(Self {
            client,
            config,
            endpoint,
            public_key: dsn.public_key().to_string(),
            secret_key: dsn.secret_key().map(str::to_string),
            stats: Arc::new(TransportStats::new()),
        })
    }

    fn configure_builder(config: &TransportConfig) -> Result<ClientBuilder, TransportError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.open_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.ssl_verification);

        if let Some(proxy_config) = &config.proxy {
            let mut proxy = Proxy::all(proxy_config.uri.as_str()).map_err(|e| {
                TransportError::InvalidConfiguration(format!("Invalid proxy: {e}"))
            })?;
            if let Some(user) = &proxy_config.user {
                proxy = proxy.basic_auth(user, proxy_config.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(proxy);
        }

        if let Some(ca_file) = &config.ssl_ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                TransportError::InvalidConfiguration(format!(
                    "Failed to read CA file {}: {e}",
                    ca_file.display()
                ))
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                TransportError::InvalidConfiguration(format!(
                    "Invalid CA file {}: {e}",
                    ca_file.display()
                ))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        Ok(builder)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Settings applied to every request this transport sends.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn stats(&self) -> TransportStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn should_compress(&self, payload_len: usize) -> bool {
        self.config.encoding == Encoding::Gzip && payload_len > self.config.compression_threshold
    }

    /// Returns the body to transmit and whether it was gzipped.
    pub fn prepare_payload(&self, data: &[u8]) -> Result<(Vec<u8>, bool), TransportError> {
        if !self.should_compress(data.len()) {
            return Ok((data.to_vec(), false));
        }

        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::fast());
        encoder.write_all(data)?;
        Ok((encoder.finish()?, true))
    }

    pub fn auth_header(&self) -> String {
        let mut value = format!(
            "Sentry sentry_version={}, sentry_client={}, sentry_timestamp={}, sentry_key={}",
            SENTRY_PROTOCOL_VERSION,
            sdk_name(),
            chrono::Utc::now().timestamp(),
            self.public_key
        );
        if let Some(secret) = &self.secret_key {
            value.push_str(", sentry_secret=");
            value.push_str(secret);
        }
        value
    }

    pub fn build_headers(&self, compressed: bool) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(ENVELOPE_CONTENT_TYPE),
        );

        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        headers.insert(
            HeaderName::from_static(SENTRY_AUTH_HEADER),
            HeaderValue::from_str(&self.auth_header())
                .map_err(|e| TransportError::InvalidHeaderValue(format!("Invalid auth header: {e}")))?,
        );

        Ok(headers)
    }

    pub fn send_data(&self, data: &[u8]) -> Result<SendReport, TransportError> {
        let start = Instant::now();
        let (body, compressed) = self.prepare_payload(data)?;
        let bytes_sent = body.len();
        let headers = self.build_headers(compressed)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .map_err(|e| {
                self.stats.record_connection_failure();
                let error = TransportError::connection(e);
                warn!(target: LOG_TARGET, error = %error, "envelope delivery failed before a response");
                error
            })?;

        let status_code = response.status().as_u16();
        let outcome = if response.status().is_success() {
            ResponseOutcome::classify(status_code, None, None)
        } else {
            let server_error = response
                .headers()
                .get(SENTRY_ERROR_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = read_body_prefix(response);
            ResponseOutcome::classify(status_code, server_error, body)
        };
        let latency = start.elapsed();

        self.stats
            .record_response(outcome.is_success(), bytes_sent, compressed, latency);

        if outcome.is_success() {
            debug!(
                target: LOG_TARGET,
                status = status_code,
                bytes = bytes_sent,
                compressed,
                "envelope delivered in {:?}",
                latency
            );
        } else {
            warn!(
                target: LOG_TARGET,
                status = status_code,
                detail = %outcome.message(),
                "envelope rejected by server"
            );
        }

        outcome.into_result()?;

        Ok(SendReport {
            status_code,
            bytes_sent,
            compressed,
            latency,
        })
    }
}

/// Reads just enough of an error body for the failure message. The extra
/// bytes let truncation notice that the body went on.
fn read_body_prefix(response: Response) -> Option<String> {
    let limit = MAX_BODY_IN_MESSAGE as u64 + 4;
    let mut buffer = Vec::with_capacity(limit as usize);
    response.take(limit).read_to_end(&mut buffer).ok()?;
    Some(String::from_utf8_lossy(&buffer).into_owned())
}

impl Transport for HttpTransport {
    fn send_envelope(&self, data: &[u8]) -> Result<SendReport, TransportError> {
        self.send_data(data)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}
