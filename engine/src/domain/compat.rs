//! Compatibility rules between the desired container and what already exists.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use std::cmp::Ordering;

use crate::domain::request::{DEV_TAG, base_container_name, parse_image_and_tag};
use crate::domain::version::compare_versions;

/// Outcome of comparing a running sibling container against the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityVerdict {
    /// Base names agree once any `-dev` suffix is stripped.
    pub names_match: bool,
    /// The sibling reported a version numerically equal to the caller's.
    pub version_matches: bool,
    /// Safe to reuse the sibling as-is.
    pub compatible: bool,
}

/// Compare a running sibling with the desired container.
///
/// `reported_version` is what the sibling's info endpoint returned, or `None`
/// when it could not be reached; an unreachable sibling is never compatible.
#[must_use]
pub fn verdict(
    running_name: &str,
    desired_name: &str,
    reported_version: Option<&str>,
    cli_version: &str,
) -> CompatibilityVerdict {
    let names_match = base_container_name(running_name) == base_container_name(desired_name);
    let version_matches = names_match
        && reported_version.is_some_and(|v| compare_versions(v, cli_version) == Ordering::Equal);
    CompatibilityVerdict {
        names_match,
        version_matches,
        compatible: names_match && version_matches,
    }
}

/// Whether a stopped container built from `existing_image` must be recreated
/// to run `desired_image`.
///
/// A dev/production mismatch always recreates. Otherwise only a newer desired
/// tag does; equal or older tags keep the existing container.
#[must_use]
pub fn must_recreate(desired_image: &str, existing_image: &str, dev_mode: bool) -> bool {
    let (_, desired_tag) = parse_image_and_tag(desired_image);
    let (_, existing_tag) = parse_image_and_tag(existing_image);

    if (existing_tag == DEV_TAG) != dev_mode {
        return true;
    }
    if desired_tag == existing_tag {
        return false;
    }
    compare_versions(desired_tag, existing_tag) == Ordering::Greater
}
