//! restform - declarative resource provisioning over REST APIs
//!
//! Each resource type is a [`ResourceDefinition`](resource::ResourceDefinition):
//! paths, native id shape, scope requirements, payload transformers and
//! async-operation handling. The generic [`BaseResource`](resource::BaseResource)
//! turns a definition into a [`Provisioner`](provisioner::Provisioner) with
//! Create, Read, Update, Delete, List and Status. A
//! [`ResourceRegistry`](resource::ResourceRegistry) maps type names to
//! provisioner factories for the host orchestrator.
//!
//! All wire traffic goes through a [`Transport`](transport::Transport);
//! [`HttpTransport`](transport::HttpTransport) is the reqwest-backed default.

pub mod config;
pub mod error;
pub mod logging;
pub mod provisioner;
pub mod resource;
pub mod transport;

#[cfg(test)]
mod testing;

/// Crate version, used in the default user agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::EngineConfig;
pub use error::{EngineError, ErrorCode, TransportError, TransportErrorCode};
pub use provisioner::{OperationKind, OperationStatus, ProgressResult, Provisioner};
pub use transport::{CallContext, CancelHandle, HttpTransport, Transport};
