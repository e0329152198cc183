//! Scope resolution
//!
//! Scope coordinates come from three places: resource properties, the ambient
//! target configuration, and the native id. Each coordinate is looked up
//! through a fixed, ordered alias list; the first non-empty string wins.

use super::path::PathContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const PROJECT_KEYS: &[&str] = &["ProjectId", "projectId", "ServiceName", "serviceName"];
pub const REGION_KEYS: &[&str] = &["Region", "region", "RegionName", "regionName"];
pub const ZONE_KEYS: &[&str] = &["Zone", "zone", "ZoneName", "zoneName"];
pub const LOCATION_KEYS: &[&str] = &["Location", "location"];
pub const ENGINE_KEYS: &[&str] = &["Engine", "engine"];

/// Which scope coordinates a resource type needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Nothing resolved, nothing required
    #[default]
    None,
    /// Account-wide collection, nothing required
    Global,
    /// Needs project
    Project,
    /// Needs project and region
    Regional,
    /// Needs project and availability zone
    Zonal,
    /// Needs project and location
    Location,
    /// Needs a DNS zone name
    Zone,
}

impl ScopeKind {
    /// Name of the first required coordinate missing from `ctx`
    pub fn missing_field(self, ctx: &PathContext) -> Option<&'static str> {
        let needs_project = matches!(
            self,
            ScopeKind::Project | ScopeKind::Regional | ScopeKind::Zonal | ScopeKind::Location
        );
        if needs_project && ctx.project.is_none() {
            return Some("project");
        }
        match self {
            ScopeKind::Regional if ctx.region.is_none() => Some("region"),
            ScopeKind::Zonal | ScopeKind::Zone if ctx.zone.is_none() => Some("zone"),
            ScopeKind::Location if ctx.location.is_none() => Some("location"),
            _ => None,
        }
    }
}

/// Key/value source for scope lookups
pub trait ScopeSource {
    fn lookup(&self, key: &str) -> Option<&str>;

    /// First non-empty value among `keys`, in order
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.lookup(k))
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    }
}

impl ScopeSource for Map<String, Value> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

impl ScopeSource for Value {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

impl ScopeSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.as_str())
    }
}

/// Resolve project from target configuration
pub fn resolve_project(source: &impl ScopeSource) -> Option<String> {
    source.first_of(PROJECT_KEYS)
}

/// Resolve region from target configuration
pub fn resolve_region(source: &impl ScopeSource) -> Option<String> {
    source.first_of(REGION_KEYS)
}

/// Strip the trailing datacenter number from a region name
///
/// `GRA11` -> `GRA`, `US-EAST-VA-1` -> `US-EAST-VA`, `DE` -> `DE`.
pub fn region_code(region: &str) -> String {
    region
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .trim_end_matches('-')
        .to_string()
}

/// Fill the scope coordinates of `ctx` that are still missing from `source`
///
/// Already-set fields are never overwritten, so callers apply sources in
/// priority order.
pub fn fill_scope(ctx: &mut PathContext, source: &impl ScopeSource) {
    if ctx.project.is_none() {
        ctx.project = source.first_of(PROJECT_KEYS);
    }
    if ctx.region.is_none() {
        ctx.region = source.first_of(REGION_KEYS);
    }
    if ctx.zone.is_none() {
        ctx.zone = source.first_of(ZONE_KEYS);
    }
    if ctx.location.is_none() {
        ctx.location = source.first_of(LOCATION_KEYS);
    }
    if ctx.engine.is_none() {
        ctx.engine = source.first_of(ENGINE_KEYS);
    }
}
