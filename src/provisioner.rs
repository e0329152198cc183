//! Provisioner interface
//!
//! The surface a host orchestrator drives: one method per operation, each
//! taking a typed request and returning a typed result. Outcomes, including
//! business failures such as "not found" or "invalid request", travel inside
//! [`ProgressResult`]; `Err` is reserved for engine failures.

use crate::error::{ErrorCode, Result};
use crate::transport::CallContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Which operation produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    List,
    Status,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::List => "list",
            OperationKind::Status => "status",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    Success,
    Failure,
    InProgress,
}

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResult {
    pub operation: OperationKind,
    pub operation_status: OperationStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub native_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status_message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_properties: Option<Value>,
}

impl ProgressResult {
    fn new(operation: OperationKind, status: OperationStatus) -> Self {
        Self {
            operation,
            operation_status: status,
            native_id: String::new(),
            error_code: None,
            status_message: String::new(),
            request_id: String::new(),
            resource_properties: None,
        }
    }

    pub fn success(operation: OperationKind, native_id: impl Into<String>) -> Self {
        Self {
            native_id: native_id.into(),
            ..Self::new(operation, OperationStatus::Success)
        }
    }

    pub fn in_progress(operation: OperationKind, native_id: impl Into<String>) -> Self {
        Self {
            native_id: native_id.into(),
            ..Self::new(operation, OperationStatus::InProgress)
        }
    }

    pub fn failure(operation: OperationKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code),
            status_message: message.into(),
            ..Self::new(operation, OperationStatus::Failure)
        }
    }

    pub fn with_native_id(mut self, native_id: impl Into<String>) -> Self {
        self.native_id = native_id.into();
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.resource_properties = Some(properties);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = message.into();
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.operation_status == OperationStatus::Success
    }

    /// Resource properties serialized as a JSON string
    pub fn properties_json(&self) -> Result<Option<String>> {
        self.resource_properties
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub resource_type: String,
    pub label: String,
    pub properties: Value,
    #[serde(default)]
    pub target_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub resource_type: String,
    pub native_id: String,
    #[serde(default)]
    pub target_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub resource_type: String,
    pub native_id: String,
    pub desired_properties: Value,
    #[serde(default)]
    pub target_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub resource_type: String,
    pub native_id: String,
    #[serde(default)]
    pub target_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub request_id: String,
    pub native_id: String,
    #[serde(default)]
    pub target_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub resource_type: String,
    #[serde(default)]
    pub target_config: Value,
    #[serde(default)]
    pub additional_properties: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResult {
    pub progress: ProgressResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub progress: ProgressResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub progress: ProgressResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub progress: ProgressResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    pub progress: ProgressResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub native_ids: Vec<String>,
    /// Set when discovery failed; `native_ids` is then empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProgressResult>,
}

/// CRUD + discovery + status for one resource type
///
/// Every wire call made on behalf of a method observes `ctx` for
/// cancellation.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create(&self, ctx: &CallContext, request: CreateRequest) -> Result<CreateResult>;
    async fn read(&self, ctx: &CallContext, request: ReadRequest) -> Result<ReadResult>;
    async fn update(&self, ctx: &CallContext, request: UpdateRequest) -> Result<UpdateResult>;
    async fn delete(&self, ctx: &CallContext, request: DeleteRequest) -> Result<DeleteResult>;
    async fn status(&self, ctx: &CallContext, request: StatusRequest) -> Result<StatusResult>;
    async fn list(&self, ctx: &CallContext, request: ListRequest) -> Result<ListResult>;
}
