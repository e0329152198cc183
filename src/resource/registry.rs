//! Resource Registry - maps resource type names to provisioner factories
//!
//! Built once at startup and handed to the host integration by reference.
//! Registration takes the write lock; lookups only ever read.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::provisioner::Provisioner;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// What the host orchestrator may do with a resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub type_name: String,
    /// Instances can be found through List
    #[serde(default)]
    pub discoverable: bool,
    /// Instances can be read back into properties
    #[serde(default)]
    pub extractable: bool,
    #[serde(default)]
    pub parent_types: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            discoverable: true,
            extractable: true,
            parent_types: Vec::new(),
        }
    }

    pub fn with_parent_type(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_types.push(parent_type.into());
        self
    }
}

/// Per-field hints exposed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHint {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Changing the field requires replacement
    #[serde(default)]
    pub create_only: bool,
    /// Never returned by Read
    #[serde(default)]
    pub write_only: bool,
}

impl FieldHint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            create_only: false,
            write_only: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn create_only(mut self) -> Self {
        self.create_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    /// Property that identifies an instance
    pub identifier: String,
    #[serde(default)]
    pub fields: Vec<FieldHint>,
}

impl ResourceSchema {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldHint) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldHint> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builds a provisioner for one transport and engine configuration
pub trait ProvisionerFactory: Send + Sync {
    fn create(
        &self,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Arc<dyn Provisioner>;
}

impl<F> ProvisionerFactory for F
where
    F: Fn(Arc<dyn Transport>, Arc<EngineConfig>) -> Arc<dyn Provisioner> + Send + Sync,
{
    fn create(
        &self,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Arc<dyn Provisioner> {
        self(transport, config)
    }
}

struct Registration {
    descriptor: ResourceDescriptor,
    schema: ResourceSchema,
    factory: Box<dyn ProvisionerFactory>,
}

fn poison_err<T>(_: PoisonError<T>) -> EngineError {
    EngineError::RegistryPoisoned
}

/// Resource type name -> (descriptor, schema, factory)
#[derive(Default)]
pub struct ResourceRegistry {
    entries: RwLock<HashMap<String, Registration>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type; names must be unique
    pub fn register(
        &self,
        type_name: impl Into<String>,
        descriptor: ResourceDescriptor,
        schema: ResourceSchema,
        factory: impl ProvisionerFactory + 'static,
    ) -> Result<()> {
        let type_name = type_name.into();
        let mut entries = self.entries.write().map_err(poison_err)?;
        if entries.contains_key(&type_name) {
            return Err(EngineError::DuplicateResourceType(type_name));
        }
        tracing::debug!("registered resource type {}", type_name);
        entries.insert(
            type_name,
            Registration {
                descriptor,
                schema,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Provisioner for `type_name` bound to `transport`
    pub fn get(
        &self,
        type_name: &str,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Result<Arc<dyn Provisioner>> {
        let entries = self.entries.read().map_err(poison_err)?;
        let Some(registration) = entries.get(type_name) else {
            return Err(EngineError::UnknownResourceType(type_name.to_string()));
        };
        Ok(registration.factory.create(transport, config))
    }

    /// Registered type names, sorted
    pub fn list_resource_types(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(poison_err)?;
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn descriptor(&self, type_name: &str) -> Result<ResourceDescriptor> {
        let entries = self.entries.read().map_err(poison_err)?;
        entries
            .get(type_name)
            .map(|r| r.descriptor.clone())
            .ok_or_else(|| EngineError::UnknownResourceType(type_name.to_string()))
    }

    pub fn schema(&self, type_name: &str) -> Result<ResourceSchema> {
        let entries = self.entries.read().map_err(poison_err)?;
        entries
            .get(type_name)
            .map(|r| r.schema.clone())
            .ok_or_else(|| EngineError::UnknownResourceType(type_name.to_string()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poison_err)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
