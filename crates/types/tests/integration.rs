//! Integration tests for types

use proptest::prelude::*;
use sprig_types::*;

#[test]
fn test_spec_pins_survive_display_and_reparse() {
    let spec = Spec::parse("gaudi@:34.99 +optional ~docs cxxstd=17").unwrap();
    let reparsed = Spec::parse(&spec.to_string()).unwrap();
    assert_eq!(spec, reparsed);
}

#[test]
fn test_condition_sees_only_consumer_state() {
    // A condition context is built from one node's own candidates and
    // variants; there is no way to reference another node's assignment.
    let condition: Condition = "@:2.3.3 +shared".parse().unwrap();
    let mut variants = VariantAssignment::new();
    variants.set("shared", VariantValue::Bool(true));
    let versions = ["2.3.3".parse::<Version>().unwrap()];

    let ctx = ConditionContext {
        versions: &versions,
        variants: &variants,
        compiler: None,
    };
    assert_eq!(condition.eval(&ctx), Ternary::True);
}

#[test]
fn test_variant_assignment_serde() {
    let mut assignment = VariantAssignment::new();
    assignment.set("shared", VariantValue::Bool(true));
    assignment.set("cxxstd", VariantValue::Choice("17".to_string()));

    let json = serde_json::to_string(&assignment).unwrap();
    let back: VariantAssignment = serde_json::from_str(&json).unwrap();
    assert_eq!(assignment, back);
}

proptest! {
    /// Range membership must agree with version ordering: any release
    /// between the endpoints of a well-formed range lies in the range.
    #[test]
    fn prop_between_contains_endpoints_and_midpoints(
        lo in proptest::collection::vec(0u64..50, 1..4),
        hi_bump in 0u64..50,
        mid_bump in 0u64..50,
    ) {
        let lo_v = Version::release(lo.clone());
        let mut hi = lo.clone();
        *hi.last_mut().unwrap() += hi_bump + mid_bump;
        let hi_v = Version::release(hi.clone());
        let mut mid = lo;
        *mid.last_mut().unwrap() += mid_bump;
        let mid_v = Version::release(mid);

        let range = VersionRange::Between(lo_v.clone(), hi_v.clone());
        prop_assert!(range.contains(&lo_v));
        prop_assert!(range.contains(&hi_v));
        prop_assert!(range.contains(&mid_v));
    }

    /// Parse/Display is stable for release versions.
    #[test]
    fn prop_version_display_reparses(parts in proptest::collection::vec(0u64..1000, 1..5)) {
        let version = Version::release(parts);
        let reparsed: Version = version.to_string().parse().unwrap();
        prop_assert_eq!(version, reparsed);
    }
}
