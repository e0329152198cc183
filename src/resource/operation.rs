//! Async-operation handling
//!
//! Some APIs answer a mutation with an operation handle instead of the
//! resource. [`OperationConfig`] says whether a resource type's mutations are
//! synchronous and, if not, how to find the operation id, where to poll it and
//! how to read its status. [`poll_operation`] drives the polling loop:
//! exponential backoff from 2s, doubling, capped at 30s per round, with a hard
//! overall timeout. The wait between rounds observes the caller's
//! cancellation.

use super::path::{encode_segment, PathBuilder, PathContext, TemplatePathBuilder};
use super::payload::id_string;
use crate::config::PollConfig;
use crate::error::TransportError;
use crate::provisioner::OperationKind;
use crate::transport::{CallContext, HttpMethod, Transport, TransportRequest};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("operation poll failed: {0}")]
    Transport(TransportError),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("operation did not complete within {0:?}")]
    Timeout(Duration),

    #[error("operation polling cancelled")]
    Cancelled,
}

/// Finds the operation id in a mutation response
pub trait OperationIdExtractor: Send + Sync {
    fn extract(&self, response: &Value) -> Option<String>;
}

/// Renders the path of the operation status endpoint
pub trait OperationUrlBuilder: Send + Sync {
    fn build(&self, ctx: &PathContext, operation_id: &str) -> String;
}

/// Reads an operation body: `Ok(true)` done, `Ok(false)` pending, `Err` failed
pub trait OperationStatusChecker: Send + Sync {
    fn check(&self, body: &Value) -> Result<bool, String>;
}

/// Derives the native id from a mutation response
pub trait NativeIdExtractor: Send + Sync {
    fn extract(&self, body: &Value, ctx: &PathContext) -> Option<String>;
}

/// Everything a post-mutation hook may look at
#[derive(Clone)]
pub struct HookContext {
    pub path: PathContext,
    pub operation: OperationKind,
    pub native_id: String,
    pub transport: Arc<dyn Transport>,
    pub call: CallContext,
}

/// Side effect after a successful mutation (e.g. a DNS zone refresh)
///
/// Failures are logged by the engine and never fail the mutation.
#[async_trait]
pub trait PostMutationHook: Send + Sync {
    async fn run(&self, ctx: &HookContext) -> Result<(), TransportError>;
}

impl<F> OperationIdExtractor for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn extract(&self, response: &Value) -> Option<String> {
        self(response)
    }
}

impl<F> OperationUrlBuilder for F
where
    F: Fn(&PathContext, &str) -> String + Send + Sync,
{
    fn build(&self, ctx: &PathContext, operation_id: &str) -> String {
        self(ctx, operation_id)
    }
}

impl<F> OperationStatusChecker for F
where
    F: Fn(&Value) -> Result<bool, String> + Send + Sync,
{
    fn check(&self, body: &Value) -> Result<bool, String> {
        self(body)
    }
}

impl<F> NativeIdExtractor for F
where
    F: Fn(&Value, &PathContext) -> Option<String> + Send + Sync,
{
    fn extract(&self, body: &Value, ctx: &PathContext) -> Option<String> {
        self(body, ctx)
    }
}

/// Reads the operation id from a top-level field
#[derive(Debug, Clone)]
pub struct FieldOperationId {
    field: String,
}

impl FieldOperationId {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Default for FieldOperationId {
    fn default() -> Self {
        Self::new("id")
    }
}

impl OperationIdExtractor for FieldOperationId {
    fn extract(&self, response: &Value) -> Option<String> {
        response.get(&self.field).and_then(id_string)
    }
}

/// Operation endpoint from a path template with an `{operation}` placeholder
///
/// The remaining placeholders are those of [`TemplatePathBuilder`].
#[derive(Debug, Clone)]
pub struct OperationPath {
    template: String,
}

impl OperationPath {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl OperationUrlBuilder for OperationPath {
    fn build(&self, ctx: &PathContext, operation_id: &str) -> String {
        let template = self.template.replace("{operation}", &encode_segment(operation_id));
        TemplatePathBuilder::new(template).build(ctx)
    }
}

/// Status checker over a single status field
///
/// Matching is case-insensitive. Any value in `error` is terminal failure.
#[derive(Debug, Clone)]
pub struct StatusFieldChecker {
    field: String,
    done: Vec<String>,
    error: Vec<String>,
}

impl StatusFieldChecker {
    pub fn new<I, S>(field: impl Into<String>, done: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            done: done.into_iter().map(|s| s.into().to_lowercase()).collect(),
            error: vec!["error".to_string()],
        }
    }

    pub fn with_error_states<I, S>(mut self, error: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error = error.into_iter().map(|s| s.into().to_lowercase()).collect();
        self
    }
}

impl Default for StatusFieldChecker {
    fn default() -> Self {
        Self::new("status", ["completed", "done"])
    }
}

impl OperationStatusChecker for StatusFieldChecker {
    fn check(&self, body: &Value) -> Result<bool, String> {
        let Some(status) = body.get(&self.field).and_then(|v| v.as_str()) else {
            return Ok(false);
        };
        let status = status.to_lowercase();

        if self.error.contains(&status) {
            let detail = body
                .get("error")
                .or_else(|| body.get("message"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| format!("{} is {}", self.field, status));
            return Err(detail);
        }

        Ok(self.done.contains(&status))
    }
}

/// POSTs to a path derived from the mutated resource's context
///
/// e.g. `/domain/zone/{zone}/refresh` after a DNS record change.
#[derive(Clone)]
pub struct PostRequestHook {
    path: Arc<dyn PathBuilder>,
    base_url: String,
}

impl PostRequestHook {
    pub fn new(base_url: impl Into<String>, path: impl PathBuilder + 'static) -> Self {
        Self {
            path: Arc::new(path),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PostMutationHook for PostRequestHook {
    async fn run(&self, ctx: &HookContext) -> Result<(), TransportError> {
        let path = self.path.build(&ctx.path);
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        tracing::debug!("post-{} hook: POST {}", ctx.operation, url);
        ctx.transport
            .execute(
                &ctx.call,
                TransportRequest::with_body(HttpMethod::Post, url, Value::Object(Map::new())),
            )
            .await
            .map(|_| ())
    }
}

/// How a resource type's mutations complete
#[derive(Clone)]
pub struct OperationConfig {
    pub synchronous: bool,
    pub operation_id: Arc<dyn OperationIdExtractor>,
    pub operation_url: Option<Arc<dyn OperationUrlBuilder>>,
    pub status_checker: Arc<dyn OperationStatusChecker>,
    pub native_id: Option<Arc<dyn NativeIdExtractor>>,
    /// Field of the operation body naming the created resource
    pub resource_id_field: String,
    pub post_mutation: Option<Arc<dyn PostMutationHook>>,
}

impl OperationConfig {
    /// Mutations complete inline
    pub fn synchronous() -> Self {
        Self {
            synchronous: true,
            operation_id: Arc::new(FieldOperationId::default()),
            operation_url: None,
            status_checker: Arc::new(StatusFieldChecker::default()),
            native_id: None,
            resource_id_field: "resourceId".to_string(),
            post_mutation: None,
        }
    }

    /// Mutations return an operation that is polled at `operation_url`
    pub fn asynchronous(operation_url: impl OperationUrlBuilder + 'static) -> Self {
        Self {
            synchronous: false,
            operation_url: Some(Arc::new(operation_url)),
            ..Self::synchronous()
        }
    }

    pub fn with_operation_id(mut self, extractor: impl OperationIdExtractor + 'static) -> Self {
        self.operation_id = Arc::new(extractor);
        self
    }

    pub fn with_status_checker(mut self, checker: impl OperationStatusChecker + 'static) -> Self {
        self.status_checker = Arc::new(checker);
        self
    }

    pub fn with_native_id(mut self, extractor: impl NativeIdExtractor + 'static) -> Self {
        self.native_id = Some(Arc::new(extractor));
        self
    }

    pub fn with_resource_id_field(mut self, field: impl Into<String>) -> Self {
        self.resource_id_field = field.into();
        self
    }

    pub fn with_post_mutation(mut self, hook: impl PostMutationHook + 'static) -> Self {
        self.post_mutation = Some(Arc::new(hook));
        self
    }

    /// Operation id to poll, when this response calls for polling
    pub fn pending_operation(&self, response: &Value) -> Option<String> {
        if self.synchronous || self.operation_url.is_none() {
            return None;
        }
        self.operation_id.extract(response)
    }
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self::synchronous()
    }
}

impl std::fmt::Debug for OperationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationConfig")
            .field("synchronous", &self.synchronous)
            .field("resource_id_field", &self.resource_id_field)
            .field("has_post_mutation", &self.post_mutation.is_some())
            .finish_non_exhaustive()
    }
}

/// Shortest wait between two polls of the same operation
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait sequence between poll rounds: `initial`, doubling, capped at `max`
///
/// Both bounds are raised to at least one second.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    next: Duration,
    max: Duration,
}

impl PollBackoff {
    pub fn new(config: &PollConfig) -> Self {
        let next = config.initial_interval().max(MIN_POLL_INTERVAL);
        Self {
            next,
            max: config.max_interval().max(next),
        }
    }
}

impl Iterator for PollBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}

/// Poll `url` until `checker` reports a terminal state
///
/// The first GET is immediate; later ones follow [`PollBackoff`]. A wait that
/// would cross the overall timeout ends the loop with [`PollError::Timeout`].
/// Returns the final operation body.
pub async fn poll_operation(
    transport: &dyn Transport,
    call: &CallContext,
    url: &str,
    checker: &dyn OperationStatusChecker,
    config: &PollConfig,
) -> Result<Value, PollError> {
    let started = Instant::now();
    let timeout = config.timeout();
    let mut backoff = PollBackoff::new(config);
    let mut round = 0u32;

    loop {
        round += 1;
        let response = transport
            .execute(call, TransportRequest::get(url))
            .await
            .map_err(PollError::Transport)?;
        let body = response.body_value();

        match checker.check(&body) {
            Ok(true) => {
                tracing::debug!("operation {} done after {} round(s)", url, round);
                return Ok(body);
            }
            Ok(false) => {}
            Err(message) => {
                tracing::warn!("operation {} failed: {}", url, message);
                return Err(PollError::OperationFailed(message));
            }
        }

        let delay = backoff.next().unwrap_or(MIN_POLL_INTERVAL);
        if started.elapsed() + delay > timeout {
            tracing::warn!("operation {} timed out after {:?}", url, started.elapsed());
            return Err(PollError::Timeout(timeout));
        }

        tracing::debug!("operation {} pending, next poll in {:?}", url, delay);
        if !call.sleep(delay).await {
            return Err(PollError::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<u64> = PollBackoff::new(&PollConfig::default())
            .take(7)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_backoff_never_waits_zero() {
        let zero = PollConfig {
            initial_interval_secs: 0,
            max_interval_secs: 0,
            timeout_secs: 300,
        };
        let delays: Vec<u64> = PollBackoff::new(&zero).take(3).map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![1, 1, 1]);

        let no_cap = PollConfig {
            max_interval_secs: 0,
            ..PollConfig::default()
        };
        let delays: Vec<u64> = PollBackoff::new(&no_cap).take(3).map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![2, 2, 2]);
    }

    #[test]
    fn test_status_field_checker() {
        let checker = StatusFieldChecker::default();
        assert_eq!(checker.check(&json!({"status": "todo"})), Ok(false));
        assert_eq!(checker.check(&json!({"status": "completed"})), Ok(true));
        assert_eq!(checker.check(&json!({"status": "DONE"})), Ok(true));
        assert_eq!(checker.check(&json!({})), Ok(false));
        assert_eq!(
            checker.check(&json!({"status": "error", "message": "quota"})),
            Err("quota".to_string())
        );
    }

    #[test]
    fn test_operation_path() {
        let url = OperationPath::new("/cloud/project/{project}/operation/{operation}");
        let ctx = PathContext::new("network").with_project("p");
        assert_eq!(url.build(&ctx, "op-7"), "/cloud/project/p/operation/op-7");
        assert_eq!(url.build(&ctx, "op/../x"), "/cloud/project/p/operation/op%2F..%2Fx");
    }

    #[test]
    fn test_pending_operation_only_when_async() {
        let response = json!({"id": "op-1"});
        assert_eq!(OperationConfig::synchronous().pending_operation(&response), None);

        let config = OperationConfig::asynchronous(OperationPath::new("/op/{operation}"));
        assert_eq!(config.pending_operation(&response).as_deref(), Some("op-1"));
        assert_eq!(config.pending_operation(&json!({})), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_waits_follow_backoff() {
        let transport = ScriptedTransport::new();
        for _ in 0..4 {
            transport.push_ok(json!({"status": "in-progress"}));
        }
        transport.push_ok(json!({"status": "completed", "resourceId": "net-1"}));

        let body = poll_operation(
            &transport,
            &CallContext::new(),
            "/op/1",
            &StatusFieldChecker::default(),
            &PollConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(body["resourceId"], "net-1");

        let times = transport.request_times();
        let waits: Vec<u64> = times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(waits, vec![2, 4, 8, 16]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out() {
        let checker = |_: &Value| -> Result<bool, String> { Ok(false) };
        let transport = ScriptedTransport::new();
        for _ in 0..64 {
            transport.push_ok(json!({"status": "running"}));
        }

        let started = Instant::now();
        let err = poll_operation(
            &transport,
            &CallContext::new(),
            "/op/1",
            &checker,
            &PollConfig::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err, PollError::Timeout(Duration::from_secs(300)));
        assert!(started.elapsed() <= Duration::from_secs(300));
        // 2+4+8+16 then 30s rounds up to the limit
        assert_eq!(transport.requests().len(), 14);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_operation_error_immediately() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!({"status": "error", "message": "no capacity"}));

        let err = poll_operation(
            &transport,
            &CallContext::new(),
            "/op/1",
            &StatusFieldChecker::default(),
            &PollConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, PollError::OperationFailed("no capacity".to_string()));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_wait_is_cancellable() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..8 {
            transport.push_ok(json!({"status": "running"}));
        }
        let (call, handle) = CallContext::cancellable();

        let task = {
            let transport = transport.clone();
            tokio::spawn(async move {
                poll_operation(
                    transport.as_ref(),
                    &call,
                    "/op/1",
                    &StatusFieldChecker::default(),
                    &PollConfig::default(),
                )
                .await
            })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.cancel();
        assert_eq!(task.await.unwrap(), Err(PollError::Cancelled));
        assert_eq!(transport.requests().len(), 2);
    }
}
