//! Path context and URL building
//!
//! A [`PathContext`] holds the scoping coordinates of one request. The
//! resource type supplies a [`PathBuilder`] that renders them into a path;
//! [`UrlBuilder`] prefixes the API base URL and produces either the collection
//! URL (no resource name) or a resource URL.
//!
//! No validation happens here. An empty or malformed path is the caller's
//! problem (see the Status guard in [`base`](super::base)).

use std::sync::Arc;

/// Scoping coordinates of a single request
///
/// Rebuilt for every call, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathContext {
    pub project: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub location: Option<String>,
    pub engine: Option<String>,
    /// Platform path segment (e.g. `network`, `record`)
    pub resource_type: String,
    pub resource_name: Option<String>,
    pub parent_resource: Option<String>,
    pub parent_type: Option<String>,
    pub custom_segments: Vec<String>,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl PathContext {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = non_empty(project);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = non_empty(region);
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = non_empty(zone);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_empty(location);
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = non_empty(engine);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = non_empty(name);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_resource = non_empty(parent);
        self
    }

    pub fn with_parent_type(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_type = non_empty(parent_type);
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.custom_segments.push(segment.into());
        self
    }

    /// Same context addressing the collection
    pub fn collection(&self) -> Self {
        Self {
            resource_name: None,
            ..self.clone()
        }
    }

    /// Same context addressing the resource `name`
    pub fn resource(&self, name: &str) -> Self {
        Self {
            resource_name: non_empty(name),
            ..self.clone()
        }
    }
}

/// Renders a [`PathContext`] into a URL path
pub trait PathBuilder: Send + Sync {
    fn build(&self, ctx: &PathContext) -> String;
}

impl<F> PathBuilder for F
where
    F: Fn(&PathContext) -> String + Send + Sync,
{
    fn build(&self, ctx: &PathContext) -> String {
        self(ctx)
    }
}

/// Percent-encode one substituted path segment
///
/// `/`, `?` and `#` never survive, and the dot segments `.` and `..` are
/// escaped so a value cannot climb out of its position in the path.
pub(crate) fn encode_segment(value: &str) -> String {
    match value {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        other => urlencoding::encode(other).into_owned(),
    }
}

/// Template-driven path builder
///
/// Placeholders: `{project}`, `{region}`, `{zone}`, `{location}`, `{engine}`,
/// `{type}`, `{parent}`, `{parentType}`, `{name}` and `{0}`, `{1}`, ... for
/// custom segments. Values are percent-encoded as single path segments.
/// Missing values render as empty strings, except a trailing
/// `/{name}` which is dropped entirely when no resource name is set, so one
/// template serves both collection and resource URLs.
///
/// ```ignore
/// let builder = TemplatePathBuilder::new("/cloud/project/{project}/network/{parent}/subnet/{name}");
/// ```
#[derive(Debug, Clone)]
pub struct TemplatePathBuilder {
    resource: String,
    collection: Option<String>,
}

impl TemplatePathBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            resource: template.into(),
            collection: None,
        }
    }

    /// Use a different template for collection URLs (create/list)
    pub fn with_collection(mut self, template: impl Into<String>) -> Self {
        self.collection = Some(template.into());
        self
    }

    fn render(template: &str, ctx: &PathContext) -> String {
        let mut template = template.to_string();
        if ctx.resource_name.is_none() {
            if let Some(stripped) = template.strip_suffix("/{name}") {
                template = stripped.to_string();
            }
        }

        let mut out = String::with_capacity(template.len() + 32);
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let Some(len) = rest[start..].find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = &rest[start + 1..start + len];
            out.push_str(&Self::lookup(key, ctx));
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(key: &str, ctx: &PathContext) -> String {
        let value = match key {
            "project" => ctx.project.as_deref(),
            "region" => ctx.region.as_deref(),
            "zone" => ctx.zone.as_deref(),
            "location" => ctx.location.as_deref(),
            "engine" => ctx.engine.as_deref(),
            "type" => Some(ctx.resource_type.as_str()),
            "parent" => ctx.parent_resource.as_deref(),
            "parentType" => ctx.parent_type.as_deref(),
            "name" => ctx.resource_name.as_deref(),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(|idx| ctx.custom_segments.get(idx))
                .map(|s| s.as_str()),
        };
        value.map(encode_segment).unwrap_or_default()
    }
}

impl PathBuilder for TemplatePathBuilder {
    fn build(&self, ctx: &PathContext) -> String {
        match (&self.collection, &ctx.resource_name) {
            (Some(collection), None) => Self::render(collection, ctx),
            _ => Self::render(&self.resource, ctx),
        }
    }
}

/// List pagination settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// Field holding the page items in an object-shaped list response
    pub items_field: String,
    /// Field holding the next page token
    pub next_page_field: String,
    /// Query parameter carrying the token on the next request
    pub page_token_param: String,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            items_field: "items".to_string(),
            next_page_field: "nextPageToken".to_string(),
            page_token_param: "pageToken".to_string(),
        }
    }
}

/// How to reach a resource type's API
#[derive(Clone)]
pub struct ApiConfig {
    /// Prefix for every path (may be empty when the transport has a base URL)
    pub base_url: String,
    pub path_builder: Arc<dyn PathBuilder>,
    /// `None` disables pagination
    pub pagination: Option<Pagination>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, path_builder: impl PathBuilder + 'static) -> Self {
        Self {
            base_url: base_url.into(),
            path_builder: Arc::new(path_builder),
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

/// Renders collection and resource URLs for one [`ApiConfig`]
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    api: ApiConfig,
}

impl UrlBuilder {
    pub fn new(api: ApiConfig) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Path only, without the base URL
    pub fn path(&self, ctx: &PathContext) -> String {
        self.api.path_builder.build(ctx)
    }

    /// Prefix `path` with the base URL
    pub fn join(&self, path: &str) -> String {
        let base = self.api.base_url.trim_end_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Collection URL (resource name cleared)
    pub fn collection_url(&self, ctx: &PathContext) -> String {
        self.join(&self.path(&ctx.collection()))
    }

    /// URL of the resource `id`
    pub fn resource_url(&self, ctx: &PathContext, id: &str) -> String {
        self.join(&self.path(&ctx.resource(id)))
    }
}

/// True when `path` addresses nothing (empty or just slashes)
pub fn is_root_path(path: &str) -> bool {
    path.trim_matches('/').is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet_builder() -> TemplatePathBuilder {
        TemplatePathBuilder::new(
            "/cloud/project/{project}/network/private/{parent}/subnet/{name}",
        )
    }

    #[test]
    fn test_template_collection_drops_trailing_name() {
        let ctx = PathContext::new("subnet")
            .with_project("p1")
            .with_parent("net-1");
        assert_eq!(
            subnet_builder().build(&ctx),
            "/cloud/project/p1/network/private/net-1/subnet"
        );
    }

    #[test]
    fn test_template_resource_path() {
        let ctx = PathContext::new("subnet")
            .with_project("p1")
            .with_parent("net-1")
            .with_name("sub-9");
        assert_eq!(
            subnet_builder().build(&ctx),
            "/cloud/project/p1/network/private/net-1/subnet/sub-9"
        );
    }

    #[test]
    fn test_template_custom_segments_and_type() {
        let builder =
            TemplatePathBuilder::new("/cloud/project/{project}/database/{0}/{type}/{name}");
        let ctx = PathContext::new("cluster")
            .with_project("p")
            .with_segment("mongodb")
            .with_name("c1");
        assert_eq!(builder.build(&ctx), "/cloud/project/p/database/mongodb/cluster/c1");
    }

    #[test]
    fn test_separate_collection_template() {
        let builder = TemplatePathBuilder::new("/cloud/project/{project}/instance/{name}")
            .with_collection("/cloud/project/{project}/instance/bulk");
        let ctx = PathContext::new("instance").with_project("p");
        assert_eq!(builder.build(&ctx), "/cloud/project/p/instance/bulk");
        assert_eq!(builder.build(&ctx.resource("i1")), "/cloud/project/p/instance/i1");
    }

    #[test]
    fn test_url_builder_collection_and_resource() {
        let urls =
            UrlBuilder::new(ApiConfig::new("https://api.example.com/1.0/", subnet_builder()));
        let ctx = PathContext::new("subnet")
            .with_project("p1")
            .with_parent("net-1")
            .with_name("ignored");

        assert_eq!(
            urls.collection_url(&ctx),
            "https://api.example.com/1.0/cloud/project/p1/network/private/net-1/subnet"
        );
        assert_eq!(
            urls.resource_url(&ctx, "sub-2"),
            "https://api.example.com/1.0/cloud/project/p1/network/private/net-1/subnet/sub-2"
        );
    }

    #[test]
    fn test_closure_path_builder() {
        let urls = UrlBuilder::new(ApiConfig::new("", |ctx: &PathContext| {
            format!("/domain/zone/{}", ctx.resource_name.clone().unwrap_or_default())
        }));
        let ctx = PathContext::new("zone");
        assert_eq!(urls.resource_url(&ctx, "example.com"), "/domain/zone/example.com");
    }

    #[test]
    fn test_template_values_stay_in_their_segment() {
        let builder = TemplatePathBuilder::new("/cloud/project/{project}/network/private/{name}");
        let ctx = PathContext::new("network").with_project("proj");

        assert_eq!(
            builder.build(&ctx.resource("a?x=1")),
            "/cloud/project/proj/network/private/a%3Fx%3D1"
        );
        assert_eq!(
            builder.build(&ctx.resource("../../../me")),
            "/cloud/project/proj/network/private/..%2F..%2F..%2Fme"
        );
        assert_eq!(
            builder.build(&ctx.resource("..")),
            "/cloud/project/proj/network/private/%2E%2E"
        );
        assert_eq!(
            builder.build(&ctx.resource("a#b")),
            "/cloud/project/proj/network/private/a%23b"
        );
        assert_eq!(
            builder.build(&ctx.resource("example.com")),
            "/cloud/project/proj/network/private/example.com"
        );
    }

    #[test]
    fn test_is_root_path() {
        assert!(is_root_path(""));
        assert!(is_root_path("/"));
        assert!(is_root_path("//"));
        assert!(!is_root_path("/cloud"));
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let ctx = PathContext::new("x").with_project("").with_region("GRA11");
        assert_eq!(ctx.project, None);
        assert_eq!(ctx.region.as_deref(), Some("GRA11"));
    }
}
