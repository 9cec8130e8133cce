use std::borrow::Cow;
use std::collections::BTreeMap;
use std::future::ready;
use std::task::{Context, Poll};

use alloy::providers::RootProvider;
use alloy::rpc::json_rpc::{RequestMeta, RequestPacket, Response, ResponsePacket, ResponsePayload};
use alloy::transports::{BoxTransport, TransportConnect, TransportError, TransportErrorKind};
use futures::future::BoxFuture;
use futures::FutureExt as _;
use serde::Serialize;
use serde_json::Value;
use tower::Service;

/// Fixed ("canned") responses to JSON-RPC method calls.
///
/// Stands in for a real node in integration tests: every method answers
/// with its registered value regardless of parameters, and unregistered
/// methods fail with a transport error.
#[derive(Clone, Default)]
pub struct Canned {
    responses: BTreeMap<String, Value>,
}

impl Canned {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn respond(mut self, method: impl Into<String>, response: impl Serialize) -> Self {
        let clobbered = self.responses.insert(
            method.into(),
            serde_json::to_value(response).expect("serialization failure"),
        );
        assert!(
            clobbered.is_none(),
            "duplicate response registered - this is probably not what you want"
        );
        self
    }

    pub fn into_provider(self) -> RootProvider<BoxTransport> {
        RootProvider::connect_boxed(self)
            .now_or_never()
            .expect("Canned::get_transport is non blocking")
            .expect("Canned::get_transport is infallible")
    }
}

impl TransportConnect for Canned {
    type Transport = Self;

    fn is_local(&self) -> bool {
        true
    }

    fn get_transport<'a: 'b, 'b>(
        &'a self,
    ) -> BoxFuture<'b, Result<Self::Transport, TransportError>> {
        ready(Ok(self.clone())).boxed()
    }
}

impl Service<RequestPacket> for Canned {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        fn error(message: impl Into<Cow<'static, str>>) -> TransportError {
            let message: Cow<'static, str> = message.into();
            TransportErrorKind::custom_str(&message)
        }

        match req {
            RequestPacket::Single(it) => {
                let (RequestMeta { method, id, .. }, _params) = it.decompose();
                ready(
                    self.responses
                        .get(&*method)
                        .map(|it| {
                            ResponsePacket::Single(Response {
                                id,
                                payload: ResponsePayload::Success(
                                    serde_json::value::to_raw_value(it).unwrap(),
                                ),
                            })
                        })
                        .ok_or_else(|| error(format!("method {method} not implemented"))),
                )
                .boxed()
            }
            RequestPacket::Batch(_) => {
                ready(Err(error("batched messages are not supported"))).boxed()
            }
        }
    }
}
