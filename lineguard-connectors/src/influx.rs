//! InfluxDB v2 Writer
//!
//! ## Overview
//!
//! [`InfluxSink`] turns each annotated point into one line of line protocol
//! and posts it to the v2 write endpoint:
//!
//! ```text
//! POST {url}/api/v2/write?org={org}&bucket={bucket}&precision=ms
//! Authorization: Token {token}
//! Content-Type: text/plain; charset=utf-8
//! ```
//!
//! ## Batching
//!
//! With `batch_size` above 1, lines are buffered and sent together once the
//! buffer is full, once the oldest buffered line is older than
//! `flush_interval_ms` (checked on write), or when [`InfluxSink::flush`] is
//! called. Dropping the sink flushes whatever is still buffered. A failed
//! batch is dropped and every point in it counts as failed; the write that
//! triggered the flush reports the error.
//!
//! ## Environment
//!
//! [`InfluxConfig::from_env`] reads `INFLUX_HOST`, `INFLUX_PORT`,
//! `INFLUX_ORG`, `INFLUX_BUCKET_NAME`, `INFLUX_TOKEN` and optionally
//! `INFLUX_BATCH_SIZE` and `INFLUX_FLUSH_INTERVAL` (milliseconds).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lineguard_core::{AnnotatedPoint, SinkError, StorageSink};

use crate::line_protocol;
use crate::ConnectionStats;

/// InfluxDB-specific errors
#[derive(Debug, Error)]
pub enum InfluxError {
    /// Network or transport failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Server answered with an error status
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl InfluxError {
    /// Whether sending the same request again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InfluxError::Request(_) => true,
            InfluxError::ServerError { status, .. } => *status >= 500 || *status == 429,
            InfluxError::Config(_) => false,
        }
    }
}

impl From<InfluxError> for SinkError {
    fn from(err: InfluxError) -> Self {
        if err.is_retryable() {
            SinkError::Unavailable(err.to_string())
        } else {
            SinkError::Rejected(err.to_string())
        }
    }
}

/// Connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://influxdb:8086`
    pub url: String,
    /// Organization
    pub org: String,
    /// Target bucket
    pub bucket: String,
    /// API token
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles per retry
    pub retry_base_ms: u64,
    /// Points per request
    pub batch_size: usize,
    /// Longest a buffered line waits before the next write sends it
    pub flush_interval_ms: Option<u64>,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".into(),
            org: String::new(),
            bucket: String::new(),
            token: None,
            timeout_ms: 10_000,
            max_retries: 3,
            retry_base_ms: 100,
            batch_size: 1,
            flush_interval_ms: None,
        }
    }
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .field("batch_size", &self.batch_size)
            .field("flush_interval_ms", &self.flush_interval_ms)
            .finish()
    }
}

impl InfluxConfig {
    /// Configuration for a server, organization and bucket
    pub fn new(url: impl Into<String>, org: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            org: org.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Read settings from the environment
    pub fn from_env() -> Result<Self, InfluxError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from any source keyed by environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InfluxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| InfluxError::Config(format!("{} is not set", key)));

        let host = required("INFLUX_HOST")?;
        let port = required("INFLUX_PORT")?;
        let mut config = Self::new(format!("http://{}:{}", host, port), required("INFLUX_ORG")?, required("INFLUX_BUCKET_NAME")?);
        config.token = lookup("INFLUX_TOKEN");

        if let Some(raw) = lookup("INFLUX_BATCH_SIZE") {
            config.batch_size = parse_number("INFLUX_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("INFLUX_FLUSH_INTERVAL") {
            config.flush_interval_ms = Some(parse_number("INFLUX_FLUSH_INTERVAL", &raw)?);
        }

        Ok(config)
    }

    /// Set the API token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the first retry delay
    pub fn retry_base(mut self, delay: Duration) -> Self {
        self.retry_base_ms = delay.as_millis() as u64;
        self
    }

    /// Set points per request
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Send buffered lines once the oldest has waited this long
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Full write endpoint URL without query string
    pub fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.url.trim_end_matches('/'))
    }

    fn validate(&self) -> Result<(), InfluxError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(InfluxError::Config("URL must start with http:// or https://".into()));
        }
        if self.org.is_empty() || self.bucket.is_empty() {
            return Err(InfluxError::Config("org and bucket are required".into()));
        }
        if self.batch_size == 0 {
            return Err(InfluxError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, InfluxError> {
    raw.trim()
        .parse()
        .map_err(|_| InfluxError::Config(format!("{} is not a number: {:?}", key, raw)))
}

/// Delay before retry number `attempt` (1-based)
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[derive(Debug, Default)]
struct PendingBatch {
    lines: Vec<String>,
    oldest: Option<Instant>,
}

impl PendingBatch {
    fn take(&mut self) -> Vec<String> {
        self.oldest = None;
        std::mem::take(&mut self.lines)
    }
}

/// [`StorageSink`] writing to InfluxDB over HTTP
pub struct InfluxSink {
    config: InfluxConfig,
    agent: ureq::Agent,
    buffer: Mutex<PendingBatch>,
    stats: Mutex<ConnectionStats>,
}

impl std::fmt::Debug for InfluxSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSink").field("config", &self.config).finish_non_exhaustive()
    }
}

impl InfluxSink {
    /// Create a sink; no connection is made until the first write
    pub fn new(config: InfluxConfig) -> Result<Self, InfluxError> {
        config.validate()?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&format!("LineGuard/{}", env!("CARGO_PKG_VERSION")))
            .build();

        Ok(Self {
            config,
            agent,
            buffer: Mutex::new(PendingBatch::default()),
            stats: Mutex::new(ConnectionStats::default()),
        })
    }

    /// Settings in use
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Snapshot of write statistics
    pub fn stats(&self) -> ConnectionStats {
        lock(&self.stats).clone()
    }

    /// Lines waiting for the next batch
    pub fn pending(&self) -> usize {
        lock(&self.buffer).lines.len()
    }

    /// Send any buffered lines now
    pub fn flush(&self) -> Result<(), InfluxError> {
        let lines = lock(&self.buffer).take();
        if lines.is_empty() {
            return Ok(());
        }
        self.send(&lines)
    }

    fn send(&self, lines: &[String]) -> Result<(), InfluxError> {
        let body = lines.join("\n");
        let points = lines.len() as u64;

        match self.post_with_retry(&body) {
            Ok(()) => {
                let mut stats = lock(&self.stats);
                stats.points_sent += points;
                stats.bytes_sent += body.len() as u64;
                debug!("Wrote {} points to {}", points, self.config.bucket);
                Ok(())
            }
            Err(e) => {
                let mut stats = lock(&self.stats);
                stats.points_failed += points;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn post_with_retry(&self, body: &str) -> Result<(), InfluxError> {
        let mut attempt = 0;

        loop {
            match self.post(body) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    lock(&self.stats).retries += 1;

                    let delay = backoff_delay(self.config.retry_base_ms, attempt);
                    warn!("InfluxDB write failed ({}), retry {} in {:?}", e, attempt, delay);
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn post(&self, body: &str) -> Result<(), InfluxError> {
        let mut request = self
            .agent
            .post(&self.config.write_url())
            .query("org", &self.config.org)
            .query("bucket", &self.config.bucket)
            .query("precision", "ms")
            .set("Content-Type", "text/plain; charset=utf-8");

        if let Some(token) = &self.config.token {
            request = request.set("Authorization", &format!("Token {}", token));
        }

        match request.send_string(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, response)) => Err(InfluxError::ServerError {
                status,
                message: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(InfluxError::Request(e.to_string())),
        }
    }
}

impl StorageSink for InfluxSink {
    fn write(&self, point: &AnnotatedPoint) -> Result<(), SinkError> {
        let line = line_protocol::encode(point);

        let batch = {
            let mut buffer = lock(&self.buffer);
            let oldest = *buffer.oldest.get_or_insert_with(Instant::now);
            buffer.lines.push(line);

            let stale = self
                .config
                .flush_interval_ms
                .is_some_and(|ms| oldest.elapsed() >= Duration::from_millis(ms));
            if buffer.lines.len() < self.config.batch_size && !stale {
                return Ok(());
            }
            buffer.take()
        };

        self.send(&batch).map_err(SinkError::from)
    }

    fn name(&self) -> &'static str {
        "influxdb"
    }
}

impl Drop for InfluxSink {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending == 0 {
            return;
        }
        if let Err(e) = self.flush() {
            warn!("Dropping InfluxDB sink lost {} buffered points: {}", pending, e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
