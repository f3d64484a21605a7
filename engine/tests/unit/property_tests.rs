//! Property-based tests for version comparison and error classification.
//!
//! Uses `proptest` to verify invariants across many random inputs.

use std::cmp::Ordering;

use proptest::prelude::*;

use catnip_engine::domain::{
    ContainerRuntime, ErrorCategory, classify, compare_versions, extract_output, format_generic,
    must_recreate,
};

fn version() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..50, 0u64..50, 0u64..50)
}

// ============================================================================
// compare_versions() property tests
// ============================================================================

proptest! {
    /// Comparison follows the numeric triple.
    #[test]
    fn prop_compare_matches_numeric_order(a in version(), b in version()) {
        let left = format!("{}.{}.{}", a.0, a.1, a.2);
        let right = format!("{}.{}.{}", b.0, b.1, b.2);
        prop_assert_eq!(compare_versions(&left, &right), a.cmp(&b));
    }

    /// Swapping the arguments reverses the result.
    #[test]
    fn prop_compare_is_antisymmetric(a in version(), b in version()) {
        let left = format!("{}.{}.{}", a.0, a.1, a.2);
        let right = format!("{}.{}.{}", b.0, b.1, b.2);
        prop_assert_eq!(
            compare_versions(&left, &right),
            compare_versions(&right, &left).reverse()
        );
    }

    /// A `v` prefix and a pre-release suffix never change the result.
    #[test]
    fn prop_prefix_and_suffix_are_ignored(a in version(), suffix in "[a-z]{1,8}") {
        let plain = format!("{}.{}.{}", a.0, a.1, a.2);
        let decorated = format!("v{plain}-{suffix}");
        prop_assert_eq!(compare_versions(&plain, &decorated), Ordering::Equal);
    }

    /// Arbitrary strings never panic and compare equal to themselves.
    #[test]
    fn prop_garbage_is_reflexive(s in ".{0,24}") {
        prop_assert_eq!(compare_versions(&s, &s), Ordering::Equal);
    }

    /// Equal tags never force a recreate of a same-mode container.
    #[test]
    fn prop_same_tag_keeps_container(a in version()) {
        let image = format!("wandb/catnip:{}.{}.{}", a.0, a.1, a.2);
        prop_assert!(!must_recreate(&image, &image, false));
    }
}

#[test]
fn test_missing_components_count_as_zero() {
    assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
    assert_eq!(compare_versions("2", "1.9.9"), Ordering::Greater);
    assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
}

// ============================================================================
// classify() property tests
// ============================================================================

proptest! {
    /// A port signature anywhere in the error, in any case, is a port conflict.
    #[test]
    fn prop_port_signature_detected(prefix in "[0-9 ]{0,20}", upper in any::<bool>()) {
        let signature = if upper { "PORT IS ALREADY ALLOCATED" } else { "port is already allocated" };
        let raw = format!("{prefix}{signature}");
        let classified = classify(&raw, "docker run", "img", ContainerRuntime::Docker)
            .expect("classified");
        prop_assert_eq!(classified.category, ErrorCategory::PortConflict);
    }

    /// Errors made only of digits never match a signature.
    #[test]
    fn prop_unrelated_errors_are_unclassified(raw in "[0-9]{0,40}") {
        prop_assert!(classify(&raw, "docker run", "img", ContainerRuntime::Docker).is_none());
    }

    /// The generic format always names the command and keeps the output intact.
    #[test]
    fn prop_generic_format_names_command(
        base in "[a-zA-Z ]{1,30}",
        output in "[a-z0-9 ]{0,30}",
    ) {
        let raw = format!("{base}\nOutput: {output}");
        let formatted = format_generic(&raw, "docker run -d");
        prop_assert_eq!(
            formatted,
            format!("{base}\nCommand: docker run -d\nOutput: {output}")
        );
        prop_assert_eq!(extract_output(&raw), output);
    }
}

#[test]
fn test_missing_cli_only_counts_for_docker() {
    let raw = "exec: \"docker\": executable file not found: no such file or directory";
    let docker = classify(raw, "docker run", "img", ContainerRuntime::Docker).expect("docker");
    assert_eq!(docker.category, ErrorCategory::DaemonUnreachable);
    assert!(classify(raw, "container run", "img", ContainerRuntime::Apple).is_none());
}
