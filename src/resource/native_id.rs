//! Native identifier codec
//!
//! A native id is the opaque string a caller uses to address a resource after
//! creation. Most APIs fit one of the fixed `/`-delimited [`NativeIdFormat`]s;
//! irregular ones plug in a [`NativeIdCodec`].
//!
//! | Format | Shape |
//! |---|---|
//! | `SimpleName` | `name` |
//! | `FullPath` | whole string kept verbatim |
//! | `FullUrl` | absolute `http(s)://` URL kept verbatim |
//! | `Hierarchical` | `parent/name` |
//! | `ProjectHierarchical` | `project/name` |
//! | `ProjectNested` | `project/parent/name` |
//! | `ProjectRegional` | `project/region/name` |
//! | `ProjectRegionalNested` | `project/region/parent/name` |
//!
//! Building degrades to shorter shapes when optional context is missing;
//! parsing is strict and never returns a partially populated context.

use super::path::PathContext;
use std::sync::Arc;
use thiserror::Error;

/// Native id parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeIdError {
    #[error("invalid identifier {id:?} for {format}: expected {expected} segments, found {found}")]
    SegmentCount {
        id: String,
        format: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid identifier {id:?} for {format}: empty segment")]
    EmptySegment { id: String, format: &'static str },

    #[error("invalid identifier {id:?}: {reason}")]
    Malformed { id: String, reason: String },
}

/// Fixed native id formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeIdFormat {
    SimpleName,
    FullPath,
    FullUrl,
    Hierarchical,
    ProjectHierarchical,
    ProjectNested,
    ProjectRegional,
    ProjectRegionalNested,
}

impl NativeIdFormat {
    pub const ALL: [NativeIdFormat; 8] = [
        NativeIdFormat::SimpleName,
        NativeIdFormat::FullPath,
        NativeIdFormat::FullUrl,
        NativeIdFormat::Hierarchical,
        NativeIdFormat::ProjectHierarchical,
        NativeIdFormat::ProjectNested,
        NativeIdFormat::ProjectRegional,
        NativeIdFormat::ProjectRegionalNested,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeIdFormat::SimpleName => "SimpleName",
            NativeIdFormat::FullPath => "FullPath",
            NativeIdFormat::FullUrl => "FullURL",
            NativeIdFormat::Hierarchical => "Hierarchical",
            NativeIdFormat::ProjectHierarchical => "ProjectHierarchical",
            NativeIdFormat::ProjectNested => "ProjectNested",
            NativeIdFormat::ProjectRegional => "ProjectRegional",
            NativeIdFormat::ProjectRegionalNested => "ProjectRegionalNested",
        }
    }

    /// Number of `/`-delimited segments
    pub fn arity(self) -> usize {
        match self {
            NativeIdFormat::SimpleName | NativeIdFormat::FullPath | NativeIdFormat::FullUrl => 1,
            NativeIdFormat::Hierarchical | NativeIdFormat::ProjectHierarchical => 2,
            NativeIdFormat::ProjectNested | NativeIdFormat::ProjectRegional => 3,
            NativeIdFormat::ProjectRegionalNested => 4,
        }
    }

    /// Encode `ctx` into a native id
    ///
    /// Falls back to shorter shapes when context is missing, e.g.
    /// `ProjectRegionalNested` -> `ProjectNested` -> `ProjectHierarchical` -> name.
    pub fn build(self, ctx: &PathContext) -> String {
        let name = ctx.resource_name.as_deref().unwrap_or_default();
        let project = ctx.project.as_deref();
        let region = ctx.region.as_deref();
        let parent = ctx.parent_resource.as_deref();

        match self {
            NativeIdFormat::SimpleName | NativeIdFormat::FullPath | NativeIdFormat::FullUrl => {
                name.to_string()
            }
            NativeIdFormat::Hierarchical => match parent {
                Some(parent) => format!("{}/{}", parent, name),
                None => name.to_string(),
            },
            NativeIdFormat::ProjectHierarchical => match project {
                Some(project) => format!("{}/{}", project, name),
                None => name.to_string(),
            },
            NativeIdFormat::ProjectNested => match (project, parent) {
                (Some(project), Some(parent)) => format!("{}/{}/{}", project, parent, name),
                _ => NativeIdFormat::ProjectHierarchical.build(ctx),
            },
            NativeIdFormat::ProjectRegional => match (project, region) {
                (Some(project), Some(region)) => format!("{}/{}/{}", project, region, name),
                _ => NativeIdFormat::ProjectHierarchical.build(ctx),
            },
            NativeIdFormat::ProjectRegionalNested => match (project, region, parent) {
                (Some(project), Some(region), Some(parent)) => {
                    format!("{}/{}/{}/{}", project, region, parent, name)
                }
                _ => NativeIdFormat::ProjectNested.build(ctx),
            },
        }
    }

    /// Decode a native id; the segment count must match exactly
    pub fn parse(self, id: &str) -> Result<PathContext, NativeIdError> {
        if id.is_empty() {
            return Err(NativeIdError::EmptySegment {
                id: id.to_string(),
                format: self.name(),
            });
        }

        if self == NativeIdFormat::FullUrl
            && !(id.starts_with("https://") || id.starts_with("http://"))
        {
            return Err(NativeIdError::Malformed {
                id: id.to_string(),
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }

        let arity = self.arity();
        let segments: Vec<&str> = id.splitn(arity, '/').collect();
        if segments.len() != arity {
            return Err(NativeIdError::SegmentCount {
                id: id.to_string(),
                format: self.name(),
                expected: arity,
                found: segments.len(),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(NativeIdError::EmptySegment {
                id: id.to_string(),
                format: self.name(),
            });
        }

        let ctx = PathContext::default();
        let ctx = match (self, segments.as_slice()) {
            (
                NativeIdFormat::SimpleName | NativeIdFormat::FullPath | NativeIdFormat::FullUrl,
                [name],
            ) => ctx.with_name(*name),
            (NativeIdFormat::Hierarchical, [parent, name]) => {
                ctx.with_parent(*parent).with_name(*name)
            }
            (NativeIdFormat::ProjectHierarchical, [project, name]) => {
                ctx.with_project(*project).with_name(*name)
            }
            (NativeIdFormat::ProjectNested, [project, parent, name]) => ctx
                .with_project(*project)
                .with_parent(*parent)
                .with_name(*name),
            (NativeIdFormat::ProjectRegional, [project, region, name]) => ctx
                .with_project(*project)
                .with_region(*region)
                .with_name(*name),
            (NativeIdFormat::ProjectRegionalNested, [project, region, parent, name]) => ctx
                .with_project(*project)
                .with_region(*region)
                .with_parent(*parent)
                .with_name(*name),
            _ => {
                return Err(NativeIdError::SegmentCount {
                    id: id.to_string(),
                    format: self.name(),
                    expected: arity,
                    found: segments.len(),
                })
            }
        };

        Ok(ctx)
    }
}

impl std::fmt::Display for NativeIdFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Custom native id encoding for APIs with irregular ids
pub trait NativeIdCodec: Send + Sync {
    fn build(&self, ctx: &PathContext) -> String;
    fn parse(&self, id: &str) -> Result<PathContext, NativeIdError>;
}

/// Ids keyed by DNS zone name only
///
/// The zone name is both the resource name and the `zone` scope coordinate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneNameCodec;

impl NativeIdCodec for ZoneNameCodec {
    fn build(&self, ctx: &PathContext) -> String {
        ctx.resource_name
            .clone()
            .or_else(|| ctx.zone.clone())
            .unwrap_or_default()
    }

    fn parse(&self, id: &str) -> Result<PathContext, NativeIdError> {
        if id.is_empty() || id.contains('/') {
            return Err(NativeIdError::Malformed {
                id: id.to_string(),
                reason: "expected a bare zone name".to_string(),
            });
        }
        Ok(PathContext::default().with_zone(id).with_name(id))
    }
}

/// Either a fixed format or a custom codec
#[derive(Clone)]
pub enum NativeIdScheme {
    Format(NativeIdFormat),
    Custom(Arc<dyn NativeIdCodec>),
}

impl NativeIdScheme {
    pub fn custom(codec: impl NativeIdCodec + 'static) -> Self {
        NativeIdScheme::Custom(Arc::new(codec))
    }

    pub fn build(&self, ctx: &PathContext) -> String {
        match self {
            NativeIdScheme::Format(format) => format.build(ctx),
            NativeIdScheme::Custom(codec) => codec.build(ctx),
        }
    }

    pub fn parse(&self, id: &str) -> Result<PathContext, NativeIdError> {
        match self {
            NativeIdScheme::Format(format) => format.parse(id),
            NativeIdScheme::Custom(codec) => codec.parse(id),
        }
    }
}

impl From<NativeIdFormat> for NativeIdScheme {
    fn from(format: NativeIdFormat) -> Self {
        NativeIdScheme::Format(format)
    }
}

impl std::fmt::Debug for NativeIdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeIdScheme::Format(format) => write!(f, "Format({})", format),
            NativeIdScheme::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
