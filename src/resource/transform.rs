//! Request/response field mapping
//!
//! Transformers bridge the plugin-facing property schema and the wire schema.
//! They are pure over the property bag: the [`TransformContext`] is read-only
//! and nothing survives between calls.

use super::payload::id_string;
use crate::provisioner::OperationKind;
use crate::transport::{CallContext, Transport};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Read-only context handed to every transformer call
#[derive(Clone)]
pub struct TransformContext {
    pub project: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub location: Option<String>,
    pub resource_type: String,
    pub operation: OperationKind,
    pub transport: Arc<dyn Transport>,
    pub call: CallContext,
}

impl std::fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("project", &self.project)
            .field("region", &self.region)
            .field("zone", &self.zone)
            .field("location", &self.location)
            .field("resource_type", &self.resource_type)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Maps plugin properties to a wire request body
#[async_trait]
pub trait RequestTransformer: Send + Sync {
    async fn transform(
        &self,
        properties: Value,
        ctx: &TransformContext,
    ) -> Result<Value, TransformError>;
}

/// Maps a wire response body to plugin properties
#[async_trait]
pub trait ResponseTransformer: Send + Sync {
    async fn transform(&self, body: Value, ctx: &TransformContext) -> Value;
}

/// Identity transformer
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl RequestTransformer for PassThrough {
    async fn transform(
        &self,
        properties: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformError> {
        Ok(properties)
    }
}

#[async_trait]
impl ResponseTransformer for PassThrough {
    async fn transform(&self, body: Value, _ctx: &TransformContext) -> Value {
        body
    }
}

/// Removes fields that belong in the URL path, not the body
#[derive(Debug, Clone, Default)]
pub struct StripFields {
    fields: Vec<String>,
}

impl StripFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RequestTransformer for StripFields {
    async fn transform(
        &self,
        mut properties: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformError> {
        if let Value::Object(map) = &mut properties {
            for field in &self.fields {
                map.remove(field);
            }
        }
        Ok(properties)
    }
}

/// Renames fields between plugin and wire vocabulary
///
/// Pairs are `(plugin, wire)`. As a request transformer it renames plugin →
/// wire; as a response transformer wire → plugin.
#[derive(Debug, Clone, Default)]
pub struct RenameFields {
    pairs: Vec<(String, String)>,
}

impl RenameFields {
    pub fn new<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect(),
        }
    }

    fn rename(map: &mut Map<String, Value>, from: &str, to: &str) {
        if let Some(value) = map.remove(from) {
            map.insert(to.to_string(), value);
        }
    }
}

#[async_trait]
impl RequestTransformer for RenameFields {
    async fn transform(
        &self,
        mut properties: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformError> {
        if let Value::Object(map) = &mut properties {
            for (plugin, wire) in &self.pairs {
                Self::rename(map, plugin, wire);
            }
        }
        Ok(properties)
    }
}

#[async_trait]
impl ResponseTransformer for RenameFields {
    async fn transform(&self, mut body: Value, _ctx: &TransformContext) -> Value {
        if let Value::Object(map) = &mut body {
            for (plugin, wire) in &self.pairs {
                Self::rename(map, wire, plugin);
            }
        }
        body
    }
}

/// Runs request transformers in order
#[derive(Clone, Default)]
pub struct Chain {
    steps: Vec<Arc<dyn RequestTransformer>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: impl RequestTransformer + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

#[async_trait]
impl RequestTransformer for Chain {
    async fn transform(
        &self,
        mut properties: Value,
        ctx: &TransformContext,
    ) -> Result<Value, TransformError> {
        for step in &self.steps {
            properties = step.transform(properties, ctx).await?;
        }
        Ok(properties)
    }
}

/// Allocation range of a CIDR block
///
/// Reserves the network address, the gateway (first host) and the broadcast
/// address: `10.0.3.0/24` -> `10.0.3.2`..`10.0.3.254`.
pub fn allocation_range(cidr: &str) -> Result<(Ipv4Addr, Ipv4Addr), TransformError> {
    let invalid = |reason: &str| TransformError::InvalidField {
        field: "cidr".to_string(),
        reason: format!("{} ({})", reason, cidr),
    };

    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| invalid("missing prefix length"))?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid("not an IPv4 address"))?;
    let prefix: u32 = prefix.parse().map_err(|_| invalid("bad prefix length"))?;
    if prefix > 29 {
        return Err(invalid("prefix too long to leave an allocation range"));
    }

    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let network = u32::from(addr) & mask;
    let broadcast = network | !mask;

    Ok((Ipv4Addr::from(network + 2), Ipv4Addr::from(broadcast - 1)))
}

fn network_address(cidr: &str) -> Result<String, TransformError> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| TransformError::InvalidField {
        field: "cidr".to_string(),
        reason: format!("missing prefix length ({})", cidr),
    })?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| TransformError::InvalidField {
        field: "cidr".to_string(),
        reason: format!("not an IPv4 address ({})", cidr),
    })?;
    let prefix: u32 = prefix.parse().unwrap_or(32).min(32);
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    Ok(format!("{}/{}", Ipv4Addr::from(u32::from(addr) & mask), prefix))
}

/// Private-network subnet mapping
///
/// Request: `cidr` becomes `network` plus a derived `start`/`end` range,
/// `enableDhcp` becomes `dhcp` and `enableGatewayIp` is inverted into
/// `noGateway`. The name and parent network id are path/plugin-only and are not
/// sent. Response: the first `ipPools` entry is flattened and the same fields
/// are mapped back.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubnetTransformer;

#[async_trait]
impl RequestTransformer for SubnetTransformer {
    async fn transform(
        &self,
        properties: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformError> {
        let cidr = properties
            .get("cidr")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TransformError::MissingField("cidr".to_string()))?;

        let (start, end) = allocation_range(cidr)?;
        let mut body = Map::new();
        body.insert("network".to_string(), Value::String(network_address(cidr)?));
        body.insert("start".to_string(), Value::String(start.to_string()));
        body.insert("end".to_string(), Value::String(end.to_string()));

        let dhcp = properties.get("enableDhcp").and_then(|v| v.as_bool()).unwrap_or(true);
        body.insert("dhcp".to_string(), Value::Bool(dhcp));

        let gateway = properties
            .get("enableGatewayIp")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        body.insert("noGateway".to_string(), Value::Bool(!gateway));

        if let Some(region) = properties.get("region").filter(|v| !v.is_null()) {
            body.insert("region".to_string(), region.clone());
        }

        Ok(Value::Object(body))
    }
}

#[async_trait]
impl ResponseTransformer for SubnetTransformer {
    async fn transform(&self, body: Value, _ctx: &TransformContext) -> Value {
        let Value::Object(wire) = body else {
            return body;
        };

        let pool = wire
            .get("ipPools")
            .and_then(|v| v.as_array())
            .and_then(|pools| pools.first())
            .and_then(|p| p.as_object())
            .cloned()
            .unwrap_or_default();
        let field = |key: &str| wire.get(key).or_else(|| pool.get(key)).cloned();

        let mut props = Map::new();
        if let Some(id) = wire.get("id").and_then(id_string) {
            props.insert("id".to_string(), Value::String(id));
        }
        for key in ["name", "region"] {
            if let Some(v) = field(key) {
                props.insert(key.to_string(), v);
            }
        }
        if let Some(cidr) = field("cidr").or_else(|| field("network")) {
            props.insert("cidr".to_string(), cidr);
        }
        if let Some(dhcp) = field("dhcp").and_then(|v| v.as_bool()) {
            props.insert("enableDhcp".to_string(), Value::Bool(dhcp));
        }
        match (field("noGateway").and_then(|v| v.as_bool()), wire.get("gatewayIp")) {
            (Some(no_gateway), _) => {
                props.insert("enableGatewayIp".to_string(), Value::Bool(!no_gateway));
            }
            (None, Some(gateway)) => {
                props.insert("enableGatewayIp".to_string(), Value::Bool(!gateway.is_null()));
            }
            (None, None) => {}
        }
        if let Some(gateway) = wire.get("gatewayIp").filter(|v| !v.is_null()) {
            props.insert("gatewayIp".to_string(), gateway.clone());
        }

        Value::Object(props)
    }
}
