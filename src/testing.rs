//! In-memory transport double for unit tests

use crate::error::{TransportError, TransportErrorCode};
use crate::transport::{CallContext, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// Replays queued responses in order and records every request
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<(TransportRequest, Instant)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&self, body: Value) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse::from_value(body)));
        self
    }

    pub(crate) fn push_err(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }

    pub(crate) fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        _ctx: &CallContext,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push((request, Instant::now()));
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorCode::Internal,
                "script exhausted",
            ))
        })
    }
}
