//! Resilient HTTP health probes.
//!
//! A probe is one bounded-time GET against a target's `/health`
//! endpoint. The transport is a capability trait so the scheduler can be
//! tested with fault-injected fakes; the bundled [`HttpTransport`] does a
//! plain HTTP/1.1 request over a fresh TCP connection.
//!
//! Transport failures and 5xx responses are retried with exponential
//! backoff (0.3s base, doubling) inside the probe's own time budget.
//! Nothing escapes as an error: every way a probe can go wrong collapses
//! into `ProbeOutcome::Failure`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;
use tracing::debug;
use url::Url;

use pulsewatch_state::ProbeOutcome;

/// Retries after the initial attempt on 5xx/transport failures.
pub const DEFAULT_PROBE_RETRIES: u32 = 1;

/// First retry delay; doubles per subsequent retry.
const BACKOFF_BASE: Duration = Duration::from_millis(300);

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid probe target `{0}`")]
    InvalidTarget(String),

    #[error("unsupported scheme `{0}` (inject a TLS-capable transport for https)")]
    UnsupportedScheme(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// GET capability consumed by the prober. Implementations report the
/// response status or a transport-level error; they do not classify.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<StatusCode, TransportError>;
}

/// Build the health URL for a registered target: `{url}/health`, with
/// bare IP literals wrapped into an http URL (IPv6 bracketed).
pub fn health_endpoint(target: &str) -> String {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => format!("http://{v4}/health"),
            IpAddr::V6(v6) => format!("http://[{v6}]/health"),
        };
    }
    format!("{}/health", target.trim_end_matches('/'))
}

// ── Default transport ──────────────────────────────────────────────

/// Plain HTTP/1.1 transport: TCP connect + hyper handshake, one request
/// per probe with `connection: close`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<StatusCode, TransportError> {
        let parsed =
            Url::parse(url).map_err(|e| TransportError::InvalidTarget(e.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(TransportError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| TransportError::InvalidTarget(url.to_string()))?;
        let port = parsed.port_or_known_default().unwrap_or(80);
        let address = format!("{host}:{port}");

        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(url)
            .header("host", address)
            .header("user-agent", "pulsewatch-probe/0.1")
            .header("accept", "application/health+json")
            .header("cache-control", "max-age=3600")
            .header("connection", "close")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(resp.status())
    }
}

// ── Prober ─────────────────────────────────────────────────────────

/// Performs one resilient health check per call.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn ProbeTransport>,
    retries: u32,
}

impl Prober {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            transport,
            retries: DEFAULT_PROBE_RETRIES,
        }
    }

    /// Override the retry count (retries after the initial attempt).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Probe `url`, bounding total wall-clock time — attempts, backoff
    /// sleeps, and all — by `timeout`.
    pub async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        match tokio::time::timeout(timeout, self.attempt(url)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(%url, timeout_ms = timeout.as_millis() as u64, "probe timed out");
                ProbeOutcome::Failure
            }
        }
    }

    async fn attempt(&self, url: &str) -> ProbeOutcome {
        let mut backoff = BACKOFF_BASE;
        for attempt in 0..=self.retries {
            match self.transport.get(url).await {
                Ok(status) if status.is_success() || status.is_redirection() => {
                    return ProbeOutcome::Success;
                }
                Ok(status) if status.is_server_error() => {
                    debug!(%url, %status, attempt, "probe got server error");
                }
                Ok(status) => {
                    // Client errors are the target's verdict; no retry.
                    debug!(%url, %status, "probe got error status");
                    return ProbeOutcome::Failure;
                }
                Err(e) => {
                    debug!(%url, error = %e, attempt, "probe transport failed");
                }
            }
            if attempt < self.retries {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        ProbeOutcome::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Transport that replays a script of responses; once the script is
    /// exhausted it answers 200.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<StatusCode, TransportError>>>,
        attempts: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<StatusCode, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                attempts: AtomicU32::new(0),
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProbeTransport for ScriptedTransport {
        async fn get(&self, _url: &str) -> Result<StatusCode, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(StatusCode::OK))
        }
    }

    /// Transport that never answers within any timeout.
    struct BlackholeTransport;

    #[async_trait]
    impl ProbeTransport for BlackholeTransport {
        async fn get(&self, _url: &str) -> Result<StatusCode, TransportError> {
            std::future::pending().await
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    #[test]
    fn health_endpoint_appends_path() {
        assert_eq!(
            health_endpoint("http://example.com:8080"),
            "http://example.com:8080/health"
        );
        assert_eq!(
            health_endpoint("http://example.com/"),
            "http://example.com/health"
        );
    }

    #[test]
    fn health_endpoint_wraps_ip_literals() {
        assert_eq!(health_endpoint("10.0.0.1"), "http://10.0.0.1/health");
        assert_eq!(health_endpoint("::1"), "http://[::1]/health");
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_2xx() {
        let transport = ScriptedTransport::new(vec![Ok(StatusCode::OK)]);
        let prober = Prober::new(transport.clone());
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Success
        );
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn redirects_count_as_success() {
        let transport = ScriptedTransport::new(vec![Ok(StatusCode::FOUND)]);
        let prober = Prober::new(transport);
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Success
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_after_server_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::OK),
        ]);
        let prober = Prober::new(transport.clone());
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Success
        );
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_after_transport_error() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Ok(StatusCode::OK),
        ]);
        let prober = Prober::new(transport.clone());
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Success
        );
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Ok(StatusCode::BAD_GATEWAY),
        ]);
        let prober = Prober::new(transport.clone());
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Failure
        );
        // Initial attempt + the single default retry.
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_do_not_retry() {
        let transport = ScriptedTransport::new(vec![Ok(StatusCode::NOT_FOUND)]);
        let prober = Prober::new(transport.clone());
        assert_eq!(
            prober.probe("http://t/health", timeout()).await,
            ProbeOutcome::Failure
        );
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_classifies_as_failure() {
        // A transport that never responds is indistinguishable from a
        // non-2xx answer to the caller.
        let prober = Prober::new(Arc::new(BlackholeTransport));
        let started = tokio::time::Instant::now();
        let outcome = prober.probe("http://t/health", Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Failure);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_never_exceeds_the_time_budget() {
        // Both attempts fail instantly; the 300ms backoff sleep is cut
        // short by the 250ms overall budget.
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
        ]);
        let prober = Prober::new(transport.clone());
        let started = tokio::time::Instant::now();
        let outcome = prober
            .probe("http://t/health", Duration::from_millis(250))
            .await;
        assert_eq!(outcome, ProbeOutcome::Failure);
        assert_eq!(started.elapsed(), Duration::from_millis(250));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn extra_retries_back_off_exponentially() {
        let transport = ScriptedTransport::new(vec![
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(StatusCode::OK),
        ]);
        let prober = Prober::new(transport.clone()).with_retries(3);
        let started = tokio::time::Instant::now();
        let outcome = prober.probe("http://t/health", timeout()).await;
        assert_eq!(outcome, ProbeOutcome::Success);
        assert_eq!(transport.attempts(), 4);
        // 300ms + 600ms + 1200ms of backoff between the four attempts.
        assert_eq!(started.elapsed(), Duration::from_millis(2100));
    }

    #[tokio::test]
    async fn probe_against_closed_port_fails() {
        // Nothing listens on port 1 on loopback; the connect error is
        // absorbed into a plain failure outcome.
        let prober = Prober::new(Arc::new(HttpTransport));
        let outcome = prober
            .probe("http://127.0.0.1:1/health", Duration::from_millis(100))
            .await;
        assert_eq!(outcome, ProbeOutcome::Failure);
    }

    #[tokio::test]
    async fn http_transport_rejects_https() {
        let err = HttpTransport
            .get("https://example.com/health")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(_)));
    }
}
