//! Declarative resource engine
//!
//! A resource type is described once, as data plus a few small strategy
//! objects, and the generic [`BaseResource`] turns that description into a
//! full [`Provisioner`](crate::provisioner::Provisioner).
//!
//! # Architecture
//!
//! - [`path`] - Path context and URL building
//! - [`native_id`] - Native identifier formats and codecs
//! - [`scope`] - Project/region/zone resolution from properties and target config
//! - [`payload`] - Nil filtering and request wrapping
//! - [`transform`] - Request/response field mapping
//! - [`operation`] - Async-operation polling and post-mutation hooks
//! - [`base`] - The CRUD/List/Status orchestrator
//! - [`registry`] - Resource type name to provisioner factory
//!
//! # Example
//!
//! ```ignore
//! use restform::resource::*;
//!
//! let subnet = ResourceDefinition::new(
//!     ResourceConfig::new("subnet", ScopeKind::Project).with_parent("network", "networkId"),
//!     ApiConfig::new(
//!         "https://api.example.com/1.0",
//!         TemplatePathBuilder::new("/cloud/project/{project}/network/private/{parent}/subnet/{name}"),
//!     ),
//!     NativeIdFormat::ProjectNested,
//! )
//! .with_transformer(SubnetTransformer);
//!
//! registry.register("Subnet", ResourceDescriptor::new("Subnet"), ResourceSchema::new("id"), subnet.into_factory())?;
//! ```

pub mod base;
pub mod native_id;
pub mod operation;
pub mod path;
pub mod payload;
pub mod registry;
pub mod scope;
pub mod transform;

pub use base::{
    BaseResource, OptimisticLock, ParentRequirement, ResourceConfig, ResourceDefinition,
    StatusChecker, UpdateMethod,
};
pub use native_id::{NativeIdCodec, NativeIdError, NativeIdFormat, NativeIdScheme, ZoneNameCodec};
pub use operation::{
    poll_operation, FieldOperationId, HookContext, NativeIdExtractor, OperationConfig,
    OperationIdExtractor, OperationPath, OperationStatusChecker, OperationUrlBuilder, PollBackoff,
    PollError, PostMutationHook, PostRequestHook, StatusFieldChecker,
};
pub use path::{ApiConfig, Pagination, PathBuilder, PathContext, TemplatePathBuilder, UrlBuilder};
pub use registry::{
    FieldHint, ProvisionerFactory, ResourceDescriptor, ResourceRegistry, ResourceSchema,
};
pub use scope::ScopeKind;
pub use transform::{
    Chain, PassThrough, RenameFields, RequestTransformer, ResponseTransformer, StripFields,
    SubnetTransformer, TransformContext, TransformError,
};
