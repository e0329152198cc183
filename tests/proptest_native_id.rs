//! Property-based tests using proptest
//!
//! These tests verify native id encoding, nil filtering, region code
//! derivation and the stock transformers using randomized inputs.

use proptest::prelude::*;
use restform::config::HttpConfig;
use restform::provisioner::OperationKind;
use restform::resource::payload::filter_nil_values;
use restform::resource::scope::region_code;
use restform::resource::{
    NativeIdError, NativeIdFormat, PathContext, RenameFields, RequestTransformer,
    ResponseTransformer, SubnetTransformer, TransformContext,
};
use restform::{CallContext, HttpTransport};
use serde_json::{json, Map, Value};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio_test::block_on;

/// Formats whose ids are `/`-delimited segments
const STRUCTURED: [NativeIdFormat; 6] = [
    NativeIdFormat::SimpleName,
    NativeIdFormat::Hierarchical,
    NativeIdFormat::ProjectHierarchical,
    NativeIdFormat::ProjectNested,
    NativeIdFormat::ProjectRegional,
    NativeIdFormat::ProjectRegionalNested,
];

/// A single id segment (never empty, never contains `/`)
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,20}"
}

fn arb_format() -> impl Strategy<Value = NativeIdFormat> {
    prop::sample::select(STRUCTURED.to_vec())
}

/// Fully populated context for a format
fn arb_context() -> impl Strategy<Value = PathContext> {
    (arb_segment(), arb_segment(), arb_segment(), arb_segment()).prop_map(
        |(project, region, parent, name)| {
            PathContext::default()
                .with_project(project)
                .with_region(region)
                .with_parent(parent)
                .with_name(name)
        },
    )
}

/// Arbitrary JSON with plenty of nulls
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        3 => Just(Value::Null),
        1 => any::<bool>().prop_map(Value::Bool),
        1 => any::<i32>().prop_map(Value::from),
        1 => "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,4}", arb_json(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

/// Lists nested directly in lists pass through the filter untouched
fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items
            .iter()
            .any(|item| !item.is_array() && contains_null(item)),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

/// Only the fields each format encodes survive a round trip
fn encoded_fields(format: NativeIdFormat, ctx: &PathContext) -> PathContext {
    let mut expected =
        PathContext::default().with_name(ctx.resource_name.clone().unwrap_or_default());
    match format {
        NativeIdFormat::Hierarchical => expected.parent_resource = ctx.parent_resource.clone(),
        NativeIdFormat::ProjectHierarchical => expected.project = ctx.project.clone(),
        NativeIdFormat::ProjectNested => {
            expected.project = ctx.project.clone();
            expected.parent_resource = ctx.parent_resource.clone();
        }
        NativeIdFormat::ProjectRegional => {
            expected.project = ctx.project.clone();
            expected.region = ctx.region.clone();
        }
        NativeIdFormat::ProjectRegionalNested => {
            expected.project = ctx.project.clone();
            expected.region = ctx.region.clone();
            expected.parent_resource = ctx.parent_resource.clone();
        }
        _ => {}
    }
    expected
}

fn transform_ctx() -> TransformContext {
    TransformContext {
        project: Some("proj".to_string()),
        region: None,
        zone: None,
        location: None,
        resource_type: "subnet".to_string(),
        operation: OperationKind::Create,
        transport: Arc::new(HttpTransport::new(&HttpConfig::default()).unwrap()),
        call: CallContext::new(),
    }
}

fn ip(value: &Value) -> u32 {
    u32::from(value.as_str().unwrap().parse::<Ipv4Addr>().unwrap())
}

proptest! {
    /// Building then parsing recovers the encoded fields
    #[test]
    fn build_parse_round_trip(format in arb_format(), ctx in arb_context()) {
        let id = format.build(&ctx);
        let parsed = format.parse(&id).unwrap();
        prop_assert_eq!(parsed, encoded_fields(format, &ctx));
    }

    /// Built ids have exactly the format's segment count
    #[test]
    fn built_ids_have_format_arity(format in arb_format(), ctx in arb_context()) {
        let id = format.build(&ctx);
        prop_assert_eq!(id.split('/').count(), format.arity());
    }

    /// Ids with too few segments are rejected, never partially parsed
    #[test]
    fn short_ids_rejected(
        format in arb_format(),
        segments in prop::collection::vec(arb_segment(), 1..4),
    ) {
        prop_assume!(segments.len() < format.arity());
        let id = segments.join("/");
        let err = format.parse(&id).unwrap_err();
        let is_segment_count = matches!(err, NativeIdError::SegmentCount { .. });
        prop_assert!(is_segment_count);
    }

    /// An empty segment anywhere is rejected
    #[test]
    fn empty_segments_rejected(
        format in arb_format(),
        segments in prop::collection::vec(arb_segment(), 4),
        hole in 0usize..4,
    ) {
        let arity = format.arity();
        prop_assume!(arity > 1);
        let mut segments: Vec<String> = segments.into_iter().take(arity).collect();
        segments[hole % arity] = String::new();
        prop_assert!(format.parse(&segments.join("/")).is_err());
    }

    /// Missing region degrades ProjectRegionalNested to ProjectNested
    #[test]
    fn missing_region_degrades(ctx in arb_context()) {
        let ctx = PathContext { region: None, ..ctx };
        prop_assert_eq!(
            NativeIdFormat::ProjectRegionalNested.build(&ctx),
            NativeIdFormat::ProjectNested.build(&ctx)
        );
    }

    /// Filtering leaves no nulls behind
    #[test]
    fn filter_removes_all_nulls(map in arb_object()) {
        let filtered = filter_nil_values(&map);
        prop_assert!(!contains_null(&Value::Object(filtered)));
    }

    /// Filtering is idempotent
    #[test]
    fn filter_is_idempotent(map in arb_object()) {
        let once = filter_nil_values(&map);
        let twice = filter_nil_values(&once);
        prop_assert_eq!(once, twice);
    }

    /// Top-level scalars are never dropped
    #[test]
    fn filter_keeps_scalars(map in arb_object()) {
        let filtered = filter_nil_values(&map);
        for (key, value) in &map {
            if matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_)) {
                prop_assert_eq!(filtered.get(key), Some(value));
            }
        }
    }

    /// Region codes carry no trailing datacenter number and are stable
    #[test]
    fn region_code_is_stable(region in "[A-Z]{2,4}(-[A-Z]{1,4}){0,2}-?[0-9]{0,3}") {
        let code = region_code(&region);
        prop_assert!(!code.ends_with(|c: char| c.is_ascii_digit()));
        prop_assert_eq!(region_code(&code), code.clone());
        prop_assert!(region.starts_with(&code));
    }

    /// The allocation range stays inside the block and skips network, gateway and broadcast
    #[test]
    fn subnet_range_inside_block(addr in any::<u32>(), prefix in 0u32..=29) {
        let cidr = format!("{}/{}", Ipv4Addr::from(addr), prefix);
        let properties = json!({"cidr": cidr});
        let ctx = transform_ctx();
        let body = block_on(RequestTransformer::transform(&SubnetTransformer, properties, &ctx))
            .unwrap();

        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        let network = addr & mask;
        let broadcast = network | !mask;
        let expected_network = format!("{}/{}", Ipv4Addr::from(network), prefix);
        prop_assert_eq!(body["network"].as_str().unwrap(), expected_network);
        prop_assert_eq!(ip(&body["start"]), network + 2);
        prop_assert_eq!(ip(&body["end"]), broadcast - 1);
        prop_assert!(ip(&body["start"]) <= ip(&body["end"]));
    }

    /// Renaming to wire names and back restores the properties
    #[test]
    fn rename_round_trip(map in arb_object()) {
        let renames = RenameFields::new([("name", "displayName"), ("size", "capacityGb")]);
        prop_assume!(!map.contains_key("displayName") && !map.contains_key("capacityGb"));

        let ctx = transform_ctx();
        let original = Value::Object(map);
        let wire = block_on(RequestTransformer::transform(&renames, original.clone(), &ctx))
            .unwrap();
        prop_assert!(wire.get("name").is_none());
        let back = block_on(ResponseTransformer::transform(&renames, wire, &ctx));
        prop_assert_eq!(back, original);
    }
}
