//! Transport collaborator
//!
//! The engine never talks HTTP directly. Every wire call goes through a
//! [`Transport`], which performs exactly one logical request per call and
//! reports failures as a [`TransportError`] with a machine-readable code.
//!
//! - [`http`] - reqwest-backed implementation
//!
//! A [`CallContext`] travels with every call. It carries the caller's
//! cancellation signal, which both the transport and the async-operation
//! poller observe.

pub mod http;

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::watch;

pub use http::HttpTransport;

/// HTTP verbs used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

/// A single wire call
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Absolute URL, or a path relative to the transport's base URL
    pub path: String,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(method: HttpMethod, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Decoded response body
///
/// APIs answer with either a JSON object or a JSON array; exactly one of the
/// two fields is populated (both are empty for an empty body).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub body: Map<String, Value>,
    pub body_array: Vec<Value>,
}

impl TransportResponse {
    pub fn object(body: Map<String, Value>) -> Self {
        Self {
            body,
            body_array: Vec::new(),
        }
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self {
            body: Map::new(),
            body_array: items,
        }
    }

    /// Build from an arbitrary JSON value (scalars and null become empty)
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::object(map),
            Value::Array(items) => Self::array(items),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.body_array.is_empty()
    }

    /// Object body as a JSON value
    pub fn body_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// The populated body as one JSON value (array wins over object)
    pub fn into_value(self) -> Value {
        if self.body_array.is_empty() {
            Value::Object(self.body)
        } else {
            Value::Array(self.body_array)
        }
    }
}

/// Performs one logical HTTP request per call
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        ctx: &CallContext,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// Per-call context carrying the caller's cancellation signal
#[derive(Debug, Clone)]
pub struct CallContext {
    cancel: watch::Receiver<bool>,
}

/// Trigger side of a [`CallContext`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that is never cancelled
    pub fn new() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { cancel: rx }
    }

    /// A context paired with a handle that cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: rx }, CancelHandle { tx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once the context is cancelled; never resolves otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without cancelling: nothing can cancel us anymore
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `false` when the sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
