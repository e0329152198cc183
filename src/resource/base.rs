//! Generic resource orchestrator
//!
//! A [`ResourceDefinition`] is the immutable, declarative description of one
//! resource type: where its API lives, how its native ids look, how payloads
//! are mapped and how mutations complete. [`BaseResource`] binds a definition
//! to a transport and engine configuration and implements [`Provisioner`] on
//! top of it.
//!
//! Every call rebuilds its [`PathContext`] from, in priority order, the
//! resource properties (or the native id), caller-supplied extras and the
//! ambient target configuration. Missing required coordinates short-circuit
//! with `InvalidRequest` before anything goes on the wire.

use super::native_id::NativeIdScheme;
use super::operation::{poll_operation, HookContext, OperationConfig, PollError, StatusFieldChecker};
use super::path::{is_root_path, ApiConfig, PathContext, UrlBuilder};
use super::payload::{filter_nil_value, id_string, unwrap, wrap};
use super::registry::ProvisionerFactory;
use super::scope::{fill_scope, region_code, ScopeKind};
use super::transform::{PassThrough, RequestTransformer, ResponseTransformer, TransformContext};
use crate::config::{EngineConfig, PollConfig};
use crate::error::{ErrorCode, Result, TransportError};
use crate::provisioner::{
    CreateRequest, CreateResult, DeleteRequest, DeleteResult, ListRequest, ListResult,
    OperationKind, ProgressResult, Provisioner, ReadRequest, ReadResult, StatusRequest,
    StatusResult, UpdateRequest, UpdateResult,
};
use crate::transport::{CallContext, HttpMethod, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// A parent resource whose id must be known to address this one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRequirement {
    /// Platform type of the parent (e.g. `network`)
    pub parent_type: String,
    /// Property carrying the parent id (e.g. `networkId`)
    pub property: String,
}

/// Version field copied from the live resource into every update body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticLock {
    pub version_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

impl UpdateMethod {
    fn http_method(self) -> HttpMethod {
        match self {
            UpdateMethod::Put => HttpMethod::Put,
            UpdateMethod::Patch => HttpMethod::Patch,
        }
    }
}

/// Static per-type settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Platform path segment, distinct from the registered type name
    pub resource_type: String,
    pub scope: ScopeKind,
    pub parent: Option<ParentRequirement>,
    /// Properties rendered as the `{0}`, `{1}`, ... path segments
    pub custom_segment_properties: Vec<String>,
    pub updatable: bool,
    pub update_method: UpdateMethod,
    pub optimistic_lock: Option<OptimisticLock>,
    /// Mutation bodies are sent as `{key: body}`
    pub request_wrapper: Option<String>,
    /// Reduce the region to its code (`GRA11` -> `GRA`)
    pub use_region_code: bool,
    /// Response field holding the resource id
    pub id_field: String,
}

impl ResourceConfig {
    pub fn new(resource_type: impl Into<String>, scope: ScopeKind) -> Self {
        Self {
            resource_type: resource_type.into(),
            scope,
            parent: None,
            custom_segment_properties: Vec::new(),
            updatable: true,
            update_method: UpdateMethod::Put,
            optimistic_lock: None,
            request_wrapper: None,
            use_region_code: false,
            id_field: "id".to_string(),
        }
    }

    pub fn with_parent(
        mut self,
        parent_type: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.parent = Some(ParentRequirement {
            parent_type: parent_type.into(),
            property: property.into(),
        });
        self
    }

    pub fn with_custom_segments<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_segment_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    pub fn with_optimistic_lock(mut self, version_field: impl Into<String>) -> Self {
        self.optimistic_lock = Some(OptimisticLock {
            version_field: version_field.into(),
        });
        self
    }

    pub fn with_request_wrapper(mut self, key: impl Into<String>) -> Self {
        self.request_wrapper = Some(key.into());
        self
    }

    pub fn with_region_code(mut self) -> Self {
        self.use_region_code = true;
        self
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }
}

/// Readiness gate on a resource body: `Ok(true)` ready, `Ok(false)` not yet
pub trait StatusChecker: Send + Sync {
    fn check(&self, body: &Value) -> std::result::Result<bool, String>;
}

impl<F> StatusChecker for F
where
    F: Fn(&Value) -> std::result::Result<bool, String> + Send + Sync,
{
    fn check(&self, body: &Value) -> std::result::Result<bool, String> {
        self(body)
    }
}

impl StatusChecker for StatusFieldChecker {
    fn check(&self, body: &Value) -> std::result::Result<bool, String> {
        super::operation::OperationStatusChecker::check(self, body)
    }
}

/// Declarative description of one resource type
#[derive(Clone)]
pub struct ResourceDefinition {
    config: ResourceConfig,
    api: ApiConfig,
    native_id: NativeIdScheme,
    operation: OperationConfig,
    request_transformer: Arc<dyn RequestTransformer>,
    response_transformer: Arc<dyn ResponseTransformer>,
    status_checker: Option<Arc<dyn StatusChecker>>,
}

impl ResourceDefinition {
    pub fn new(
        config: ResourceConfig,
        api: ApiConfig,
        native_id: impl Into<NativeIdScheme>,
    ) -> Self {
        Self {
            config,
            api,
            native_id: native_id.into(),
            operation: OperationConfig::synchronous(),
            request_transformer: Arc::new(PassThrough),
            response_transformer: Arc::new(PassThrough),
            status_checker: None,
        }
    }

    pub fn with_operation(mut self, operation: OperationConfig) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_request_transformer(
        mut self,
        transformer: impl RequestTransformer + 'static,
    ) -> Self {
        self.request_transformer = Arc::new(transformer);
        self
    }

    pub fn with_response_transformer(
        mut self,
        transformer: impl ResponseTransformer + 'static,
    ) -> Self {
        self.response_transformer = Arc::new(transformer);
        self
    }

    /// Use one value for both directions
    pub fn with_transformer<T>(self, transformer: T) -> Self
    where
        T: RequestTransformer + ResponseTransformer + Clone + 'static,
    {
        self.with_request_transformer(transformer.clone())
            .with_response_transformer(transformer)
    }

    pub fn with_status_checker(mut self, checker: impl StatusChecker + 'static) -> Self {
        self.status_checker = Some(Arc::new(checker));
        self
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Factory suitable for [`ResourceRegistry::register`](super::registry::ResourceRegistry::register)
    pub fn into_factory(self) -> impl ProvisionerFactory {
        move |transport: Arc<dyn Transport>, config: Arc<EngineConfig>| -> Arc<dyn Provisioner> {
            Arc::new(BaseResource::new(self.clone(), transport, &config))
        }
    }
}

impl std::fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("config", &self.config)
            .field("api", &self.api)
            .field("native_id", &self.native_id)
            .field("operation", &self.operation)
            .field("has_status_checker", &self.status_checker.is_some())
            .finish_non_exhaustive()
    }
}

/// Early-return channel for operation bodies: `Err` carries a finished
/// failure result.
type Outcome = std::result::Result<ProgressResult, ProgressResult>;

fn invalid(op: OperationKind, message: impl Into<String>) -> ProgressResult {
    let message = message.into();
    tracing::debug!("{} rejected: {}", op, message);
    ProgressResult::failure(op, ErrorCode::InvalidRequest, message)
}

fn transport_failure(op: OperationKind, err: &TransportError) -> ProgressResult {
    tracing::warn!("{} failed: {}", op, err);
    ProgressResult::failure(op, ErrorCode::from_transport(err.code), err.message.clone())
}

fn poll_failure(op: OperationKind, err: PollError) -> ProgressResult {
    let code = match &err {
        PollError::Transport(e) => ErrorCode::from_transport(e.code),
        PollError::OperationFailed(_) | PollError::Timeout(_) | PollError::Cancelled => {
            ErrorCode::ServiceInternalError
        }
    };
    ProgressResult::failure(op, code, err.to_string())
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// A [`ResourceDefinition`] bound to a transport
pub struct BaseResource {
    definition: ResourceDefinition,
    urls: UrlBuilder,
    transport: Arc<dyn Transport>,
    poll: PollConfig,
}

impl BaseResource {
    pub fn new(
        definition: ResourceDefinition,
        transport: Arc<dyn Transport>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            urls: UrlBuilder::new(definition.api.clone()),
            definition,
            transport,
            poll: config.poll.clone(),
        }
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    fn config(&self) -> &ResourceConfig {
        &self.definition.config
    }

    fn wrapper(&self) -> Option<&str> {
        self.config().request_wrapper.as_deref()
    }

    /// Complete `ctx` from `sources` (earlier wins) and validate it
    fn resolve_context(
        &self,
        mut ctx: PathContext,
        sources: &[&Value],
    ) -> std::result::Result<PathContext, String> {
        let config = self.config();
        ctx.resource_type = config.resource_type.clone();
        for source in sources {
            fill_scope(&mut ctx, *source);
        }

        if config.use_region_code {
            ctx.region = ctx
                .region
                .take()
                .map(|region| region_code(&region))
                .filter(|code| !code.is_empty());
        }

        if let Some(parent) = &config.parent {
            if ctx.parent_resource.is_none() {
                ctx.parent_resource = sources
                    .iter()
                    .find_map(|source| source.get(&parent.property).and_then(id_string));
            }
            if ctx.parent_resource.is_none() {
                return Err(format!(
                    "missing required parent {} id ({})",
                    parent.parent_type, parent.property
                ));
            }
            ctx.parent_type = Some(parent.parent_type.clone());
        }

        if ctx.custom_segments.is_empty() {
            for property in &config.custom_segment_properties {
                let Some(segment) = sources
                    .iter()
                    .find_map(|source| source.get(property).and_then(id_string))
                else {
                    return Err(format!("missing required property {}", property));
                };
                ctx.custom_segments.push(segment);
            }
        }

        if let Some(field) = config.scope.missing_field(&ctx) {
            return Err(format!("missing required {} for {}", field, config.resource_type));
        }

        Ok(ctx)
    }

    /// Context of an existing resource, addressed by native id
    fn id_context(
        &self,
        native_id: &str,
        target_config: &Value,
    ) -> std::result::Result<PathContext, String> {
        let parsed = self.definition.native_id.parse(native_id).map_err(|e| e.to_string())?;
        if parsed.resource_name.is_none() {
            return Err(format!("identifier {:?} names no resource", native_id));
        }
        self.resolve_context(parsed, &[target_config])
    }

    fn transform_context(
        &self,
        ctx: &PathContext,
        operation: OperationKind,
        call: &CallContext,
    ) -> TransformContext {
        TransformContext {
            project: ctx.project.clone(),
            region: ctx.region.clone(),
            zone: ctx.zone.clone(),
            location: ctx.location.clone(),
            resource_type: ctx.resource_type.clone(),
            operation,
            transport: self.transport.clone(),
            call: call.clone(),
        }
    }

    async fn send(
        &self,
        call: &CallContext,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        tracing::debug!("{} {}", request.method, request.path);
        self.transport.execute(call, request).await
    }

    /// GET the resource addressed by `ctx`, unwrapped
    async fn fetch(
        &self,
        call: &CallContext,
        ctx: &PathContext,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.urls.join(&self.urls.path(ctx));
        let response = self.send(call, TransportRequest::get(url)).await?;
        Ok(unwrap(response.into_value(), self.wrapper()))
    }

    /// Drive a pending operation to completion
    ///
    /// Returns the operation id and final operation body, or `None` when the
    /// mutation completed inline.
    async fn settle(
        &self,
        call: &CallContext,
        ctx: &PathContext,
        response: &Value,
    ) -> std::result::Result<Option<(String, Value)>, PollError> {
        let operation = &self.definition.operation;
        let Some(operation_id) = operation.pending_operation(response) else {
            return Ok(None);
        };
        let Some(url_builder) = &operation.operation_url else {
            return Ok(None);
        };

        let url = self.urls.join(&url_builder.build(ctx, &operation_id));
        tracing::info!("{}: waiting on operation {}", self.config().resource_type, operation_id);
        let body = poll_operation(
            self.transport.as_ref(),
            call,
            &url,
            operation.status_checker.as_ref(),
            &self.poll,
        )
        .await?;
        Ok(Some((operation_id, body)))
    }

    async fn run_hook(
        &self,
        call: &CallContext,
        ctx: &PathContext,
        operation: OperationKind,
        native_id: &str,
    ) {
        let Some(hook) = &self.definition.operation.post_mutation else {
            return;
        };
        let hook_ctx = HookContext {
            path: ctx.clone(),
            operation,
            native_id: native_id.to_string(),
            transport: self.transport.clone(),
            call: call.clone(),
        };
        if let Err(e) = hook.run(&hook_ctx).await {
            tracing::warn!("post-{} hook for {} failed: {}", operation, native_id, e);
        }
    }

    fn readiness(&self, body: &Value) -> std::result::Result<bool, String> {
        match &self.definition.status_checker {
            Some(checker) => checker.check(body),
            None => Ok(true),
        }
    }

    async fn run_create(&self, call: &CallContext, request: &CreateRequest) -> Outcome {
        let op = OperationKind::Create;
        if !request.properties.is_object() {
            return Err(invalid(op, "properties must be a JSON object"));
        }

        let ctx = self
            .resolve_context(PathContext::default(), &[&request.properties, &request.target_config])
            .map_err(|m| invalid(op, m))?;
        let tctx = self.transform_context(&ctx, op, call);

        let body = self
            .definition
            .request_transformer
            .transform(request.properties.clone(), &tctx)
            .await
            .map_err(|e| invalid(op, e.to_string()))?;
        let body = wrap(filter_nil_value(body), self.wrapper());

        let url = self.urls.collection_url(&ctx);
        tracing::info!("creating {} {:?}", self.config().resource_type, request.label);
        let response = self
            .send(call, TransportRequest::with_body(HttpMethod::Post, url, body))
            .await
            .map_err(|e| transport_failure(op, &e))?
            .into_value();

        let mut request_id = new_request_id();
        let mut name_hint = None;
        let body = match self.settle(call, &ctx, &response).await {
            Err(e) => return Err(poll_failure(op, e)),
            Ok(None) => unwrap(response, self.wrapper()),
            Ok(Some((operation_id, final_body))) => {
                request_id = operation_id;
                let field = &self.definition.operation.resource_id_field;
                let name = [&final_body, &response]
                    .iter()
                    .find_map(|b| b.get(field).and_then(id_string))
                    .or_else(|| request.properties.get("name").and_then(id_string));
                match name {
                    Some(name) => match self.fetch(call, &ctx.resource(&name)).await {
                        Ok(resource) => resource,
                        Err(e) => {
                            tracing::warn!(
                                "re-fetch of created {} {} failed: {}",
                                ctx.resource_type,
                                name,
                                e
                            );
                            name_hint = Some(name);
                            final_body
                        }
                    },
                    None => final_body,
                }
            }
        };

        let name = name_hint.or_else(|| body.get(&self.config().id_field).and_then(id_string));
        let path = match &name {
            Some(name) => ctx.resource(name),
            None => ctx.clone(),
        };
        let native_id = self
            .definition
            .operation
            .native_id
            .as_ref()
            .and_then(|extractor| extractor.extract(&body, &path))
            .or_else(|| name.as_ref().map(|_| self.definition.native_id.build(&path)))
            .ok_or_else(|| {
                ProgressResult::failure(
                    op,
                    ErrorCode::GeneralServiceException,
                    format!(
                        "no {} in {} create response",
                        self.config().id_field,
                        ctx.resource_type
                    ),
                )
                .with_request_id(request_id.clone())
            })?;

        self.run_hook(call, &path, op, &native_id).await;

        let readiness = self.readiness(&body);
        let properties = self.definition.response_transformer.transform(body, &tctx).await;
        let progress = match readiness {
            Ok(true) => ProgressResult::success(op, native_id),
            Ok(false) => ProgressResult::in_progress(op, native_id),
            Err(message) => {
                ProgressResult::failure(op, ErrorCode::GeneralServiceException, message)
                    .with_native_id(native_id)
            }
        };
        tracing::info!(
            "created {} {} ({:?})",
            ctx.resource_type,
            progress.native_id,
            progress.operation_status
        );
        Ok(progress.with_properties(properties).with_request_id(request_id))
    }

    async fn run_read(&self, call: &CallContext, request: &ReadRequest) -> Outcome {
        let op = OperationKind::Read;
        let ctx = self
            .id_context(&request.native_id, &request.target_config)
            .map_err(|m| invalid(op, m))?;

        let body = self.fetch(call, &ctx).await.map_err(|e| {
            transport_failure(op, &e).with_native_id(request.native_id.clone())
        })?;

        let tctx = self.transform_context(&ctx, op, call);
        let properties = self.definition.response_transformer.transform(body, &tctx).await;
        Ok(ProgressResult::success(op, request.native_id.clone())
            .with_properties(properties)
            .with_request_id(new_request_id()))
    }

    async fn run_update(&self, call: &CallContext, request: &UpdateRequest) -> Outcome {
        let op = OperationKind::Update;
        let native_id = request.native_id.clone();
        if !self.config().updatable {
            return Err(ProgressResult::failure(
                op,
                ErrorCode::NotUpdatable,
                format!("{} does not support updates", self.config().resource_type),
            )
            .with_native_id(native_id));
        }

        let ctx = self
            .id_context(&native_id, &request.target_config)
            .map_err(|m| invalid(op, m))?;
        let tctx = self.transform_context(&ctx, op, call);

        let mut body = self
            .definition
            .request_transformer
            .transform(request.desired_properties.clone(), &tctx)
            .await
            .map_err(|e| invalid(op, e.to_string()))?;
        body = filter_nil_value(body);

        if let Some(lock) = &self.config().optimistic_lock {
            let current = self
                .fetch(call, &ctx)
                .await
                .map_err(|e| transport_failure(op, &e).with_native_id(native_id.clone()))?;
            if let (Some(version), Value::Object(map)) =
                (current.get(&lock.version_field), &mut body)
            {
                map.insert(lock.version_field.clone(), version.clone());
            }
        }

        let sent = body.clone();
        let url = self.urls.join(&self.urls.path(&ctx));
        let method = self.config().update_method.http_method();
        tracing::info!("updating {} {}", ctx.resource_type, native_id);
        let response = self
            .send(call, TransportRequest::with_body(method, url, wrap(body, self.wrapper())))
            .await
            .map_err(|e| transport_failure(op, &e).with_native_id(native_id.clone()))?
            .into_value();

        let mut request_id = new_request_id();
        let mut body = match self.settle(call, &ctx, &response).await {
            Err(e) => return Err(poll_failure(op, e).with_native_id(native_id)),
            Ok(None) => unwrap(response, self.wrapper()),
            Ok(Some((operation_id, _))) => {
                request_id = operation_id;
                self.fetch(call, &ctx).await.unwrap_or_else(|e| {
                    tracing::warn!(
                        "re-fetch of updated {} {} failed: {}",
                        ctx.resource_type,
                        native_id,
                        e
                    );
                    Value::Null
                })
            }
        };
        if is_empty_body(&body) {
            body = sent;
        }

        self.run_hook(call, &ctx, op, &native_id).await;

        let properties = self.definition.response_transformer.transform(body, &tctx).await;
        Ok(ProgressResult::success(op, native_id)
            .with_properties(properties)
            .with_request_id(request_id))
    }

    async fn run_delete(&self, call: &CallContext, request: &DeleteRequest) -> Outcome {
        let op = OperationKind::Delete;
        let native_id = request.native_id.clone();
        let ctx = self
            .id_context(&native_id, &request.target_config)
            .map_err(|m| invalid(op, m))?;

        let url = self.urls.join(&self.urls.path(&ctx));
        tracing::info!("deleting {} {}", ctx.resource_type, native_id);
        let response = match self.send(call, TransportRequest::delete(url)).await {
            Ok(response) => response.into_value(),
            Err(e) if e.is_not_found() => {
                tracing::info!("{} {} already gone", ctx.resource_type, native_id);
                return Ok(ProgressResult::success(op, native_id).with_request_id(new_request_id()));
            }
            Err(e) => return Err(transport_failure(op, &e).with_native_id(native_id)),
        };

        let request_id = match self.settle(call, &ctx, &response).await {
            Err(e) => return Err(poll_failure(op, e).with_native_id(native_id)),
            Ok(Some((operation_id, _))) => operation_id,
            Ok(None) => new_request_id(),
        };

        self.run_hook(call, &ctx, op, &native_id).await;
        Ok(ProgressResult::success(op, native_id).with_request_id(request_id))
    }

    async fn run_status(&self, call: &CallContext, request: &StatusRequest) -> Outcome {
        let op = OperationKind::Status;
        let native_id = request.native_id.clone();
        let request_id = if request.request_id.is_empty() {
            new_request_id()
        } else {
            request.request_id.clone()
        };

        let Some(checker) = &self.definition.status_checker else {
            return Ok(ProgressResult::success(op, native_id).with_request_id(request_id));
        };

        let ctx = self
            .id_context(&native_id, &request.target_config)
            .map_err(|m| invalid(op, m).with_request_id(request_id.clone()))?;
        let path = self.urls.path(&ctx);
        if is_root_path(&path) {
            return Err(invalid(op, format!("empty resource URL for {}", ctx.resource_type))
                .with_native_id(native_id)
                .with_request_id(request_id));
        }

        let response = self
            .send(call, TransportRequest::get(self.urls.join(&path)))
            .await
            .map_err(|e| {
                transport_failure(op, &e)
                    .with_native_id(native_id.clone())
                    .with_request_id(request_id.clone())
            })?;
        let body = unwrap(response.into_value(), self.wrapper());

        let progress = match checker.check(&body) {
            Ok(true) => {
                let tctx = self.transform_context(&ctx, op, call);
                let properties = self.definition.response_transformer.transform(body, &tctx).await;
                ProgressResult::success(op, native_id).with_properties(properties)
            }
            Ok(false) => ProgressResult::in_progress(op, native_id),
            Err(message) => {
                ProgressResult::failure(op, ErrorCode::GeneralServiceException, message)
                    .with_native_id(native_id)
            }
        };
        Ok(progress.with_request_id(request_id))
    }

    /// Split one list page into items and the next page token
    fn page_items(&self, response: TransportResponse) -> (Vec<Value>, Option<String>) {
        if !response.body_array.is_empty() {
            return (response.body_array, None);
        }

        let pagination = self.urls.api().pagination.as_ref();
        let items_field = pagination.map(|p| p.items_field.as_str()).unwrap_or("items");
        let mut body = response.body;
        let items = match body.remove(items_field) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let next = pagination
            .and_then(|p| body.get(&p.next_page_field))
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        (items, next)
    }

    fn item_id(&self, item: &Value) -> Option<String> {
        match item {
            Value::Object(map) => map.get(&self.config().id_field).and_then(id_string),
            other => id_string(other),
        }
    }

    async fn run_list(
        &self,
        call: &CallContext,
        request: &ListRequest,
    ) -> std::result::Result<Vec<String>, ProgressResult> {
        let op = OperationKind::List;
        let extras: Map<String, Value> = request
            .additional_properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let extras = Value::Object(extras);
        let ctx = self
            .resolve_context(PathContext::default(), &[&extras, &request.target_config])
            .map_err(|m| invalid(op, m))?;

        let base = self.urls.collection_url(&ctx);
        let param = self
            .urls
            .api()
            .pagination
            .as_ref()
            .map(|p| p.page_token_param.clone())
            .unwrap_or_default();

        let mut native_ids = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        loop {
            let url = match &token {
                Some(token) => {
                    let sep = if base.contains('?') { '&' } else { '?' };
                    format!("{}{}{}={}", base, sep, param, urlencoding::encode(token))
                }
                None => base.clone(),
            };
            let response = self
                .send(call, TransportRequest::get(url))
                .await
                .map_err(|e| transport_failure(op, &e))?;

            let (items, next) = self.page_items(response);
            native_ids.extend(
                items
                    .iter()
                    .filter_map(|item| self.item_id(item))
                    .map(|id| self.definition.native_id.build(&ctx.resource(&id))),
            );

            match next {
                Some(next) if seen_tokens.insert(next.clone()) => token = Some(next),
                Some(next) => {
                    tracing::warn!(
                        "list of {} repeated page token {}, stopping",
                        ctx.resource_type,
                        next
                    );
                    break;
                }
                None => break,
            }
        }

        tracing::debug!("listed {} {} resource(s)", native_ids.len(), ctx.resource_type);
        Ok(native_ids)
    }
}

#[async_trait]
impl Provisioner for BaseResource {
    async fn create(&self, ctx: &CallContext, request: CreateRequest) -> Result<CreateResult> {
        let progress = self.run_create(ctx, &request).await.unwrap_or_else(|failure| failure);
        Ok(CreateResult { progress })
    }

    async fn read(&self, ctx: &CallContext, request: ReadRequest) -> Result<ReadResult> {
        let progress = self.run_read(ctx, &request).await.unwrap_or_else(|failure| failure);
        Ok(ReadResult { progress })
    }

    async fn update(&self, ctx: &CallContext, request: UpdateRequest) -> Result<UpdateResult> {
        let progress = self.run_update(ctx, &request).await.unwrap_or_else(|failure| failure);
        Ok(UpdateResult { progress })
    }

    async fn delete(&self, ctx: &CallContext, request: DeleteRequest) -> Result<DeleteResult> {
        let progress = self.run_delete(ctx, &request).await.unwrap_or_else(|failure| failure);
        Ok(DeleteResult { progress })
    }

    async fn status(&self, ctx: &CallContext, request: StatusRequest) -> Result<StatusResult> {
        let progress = self.run_status(ctx, &request).await.unwrap_or_else(|failure| failure);
        Ok(StatusResult { progress })
    }

    async fn list(&self, ctx: &CallContext, request: ListRequest) -> Result<ListResult> {
        Ok(match self.run_list(ctx, &request).await {
            Ok(native_ids) => ListResult {
                native_ids,
                error: None,
            },
            Err(failure) => ListResult {
                native_ids: Vec::new(),
                error: Some(failure),
            },
        })
    }
}
