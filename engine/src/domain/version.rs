//! Permissive version comparison for image tags and runtime versions.
//!
//! Tags seen in the wild are not always valid semver (`1.0`, `v2`, `2.x`), so
//! comparison is best-effort: three numeric components, anything unparsable
//! counts as zero. [`parse_strict`] is the explicit path for callers that want
//! to know when that coercion happened.

use std::cmp::Ordering;

use crate::domain::error::VersionError;

/// Three numeric components extracted from a version string.
type Triple = [u64; 3];

/// Reduce a version string to `[major, minor, patch]`.
///
/// A leading `v` and any pre-release/build suffix (from the first `-` or `+`)
/// are dropped. Each component contributes its leading digits only.
fn normalize(version: &str) -> Triple {
    let version = version.strip_prefix('v').unwrap_or(version);
    let core = version
        .find(['-', '+'])
        .map_or(version, |idx| &version[..idx]);

    let mut triple = [0; 3];
    for (slot, part) in triple.iter_mut().zip(core.split('.')) {
        *slot = part
            .chars()
            .map_while(|c| c.to_digit(10))
            .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d)));
    }
    triple
}

/// Compare two version strings permissively.
///
/// `compare_versions("v1.0.0-dev", "1.0")` is `Equal`;
/// `compare_versions("1.10.0", "1.9.9")` is `Greater`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b))
}

/// Parse a version strictly as semver after stripping a leading `v`.
///
/// # Errors
///
/// Returns [`VersionError::Unparsable`] when the string is not valid semver,
/// i.e. whenever [`compare_versions`] would have to coerce components.
pub fn parse_strict(version: &str) -> Result<semver::Version, VersionError> {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(trimmed).map_err(|e| VersionError::Unparsable {
        version: version.to_string(),
        reason: e.to_string(),
    })
}
