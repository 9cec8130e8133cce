//! Transport-level retry.
//!
//! The coordinator never retries: a failed remote call is the terminal
//! outcome for every caller coalesced onto that key. Transient node
//! hiccups are absorbed below the provider instead, by wrapping the HTTP
//! transport in a `tower` retry middleware with a fixed backoff and a
//! bounded attempt count.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use alloy::providers::RootProvider;
use alloy::rpc::client::ClientBuilder;
use alloy::rpc::json_rpc::{RequestPacket, ResponsePacket};
use alloy::transports::http::ReqwestTransport;
use alloy::transports::TransportError;
use tower::retry::Policy;
use tower::{Layer, Service};

/// Fixed-backoff, bounded-attempt retry policy over JSON-RPC request
/// packets.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    delay: Duration,
    attempts: u32,
    max_attempts: u32,
}

impl RetryPolicy {
    /// A policy that retries up to `max_attempts` times, sleeping `delay`
    /// between attempts. `max_attempts == 0` disables retrying.
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            attempts: 0,
            max_attempts,
        }
    }
}

impl Policy<RequestPacket, ResponsePacket, TransportError> for RetryPolicy {
    type Future = Pin<Box<dyn Future<Output = Self> + Send + 'static>>;

    fn retry(
        &self,
        _req: &RequestPacket,
        result: Result<&ResponsePacket, &TransportError>,
    ) -> Option<Self::Future> {
        if result.is_err() && self.attempts < self.max_attempts {
            let mut policy = self.clone();
            Some(Box::pin(async move {
                tokio::time::sleep(policy.delay).await;
                policy.attempts += 1;
                policy
            }))
        } else {
            None
        }
    }

    fn clone_request(&self, req: &RequestPacket) -> Option<RequestPacket> {
        Some(req.clone())
    }
}

/// `tower` layer applying a [`RetryPolicy`] to a transport.
pub struct RetryLayer {
    policy: RetryPolicy,
}

impl RetryLayer {
    /// Wraps transports in a [`RetryService`] driven by `policy`.
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// A transport service that replays failed requests per its policy.
#[derive(Clone, Debug)]
pub struct RetryService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Service<RequestPacket> for RetryService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Send
        + 'static
        + Clone,
    S::Future: Send + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let clone = self.inner.clone();
        let mut policy = self.policy.clone();
        // Take the service that was driven to readiness, leave the clone.
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move {
            let mut res = inner.call(req.clone()).await;
            while let Some(next) = policy.retry(&req, res.as_ref()) {
                policy = next.await;
                res = inner.call(req.clone()).await;
            }
            res
        })
    }
}

/// An HTTP provider whose transport retries per the given knobs.
pub fn build_http_retry_provider(
    rpc_url: url::Url,
    backoff_millis: u64,
    max_retries: u32,
) -> RootProvider<RetryService<ReqwestTransport>> {
    let retry_layer = RetryLayer::new(RetryPolicy::new(
        Duration::from_millis(backoff_millis),
        max_retries,
    ));
    let client = ClientBuilder::default().layer(retry_layer).http(rpc_url);
    RootProvider::new(client)
}
