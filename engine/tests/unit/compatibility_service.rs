//! Tests for the compatibility resolver and the post-start version check.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use catnip_engine::application::VersionProbe;
use catnip_engine::application::services::{check_upgrade, resolve};
use catnip_engine::domain::LifecycleRequest;
use mockall::mock;

use crate::helpers::{CLI_VERSION, FakeDriver, FixedVersion, IMAGE, NAME, request};

const LIMIT: Duration = Duration::from_millis(200);

mock! {
    pub Versions {}

    #[async_trait]
    impl VersionProbe for Versions {
        async fn fetch_version(&self) -> Result<String>;
    }
}

/// Version endpoint that never answers.
struct Hanging;

#[async_trait]
impl VersionProbe for Hanging {
    async fn fetch_version(&self) -> Result<String> {
        std::future::pending().await
    }
}

// ── resolve ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_desired_running_needs_nothing() {
    let driver = FakeDriver::new().with_running(NAME);
    let mut versions = MockVersions::new();
    versions.expect_fetch_version().never();

    let resolution = resolve(&driver, &versions, &request(), LIMIT).await;

    assert!(resolution.reuse.is_none());
    assert!(resolution.replace.is_none());
    assert!(!resolution.force_remove_existing);
}

#[tokio::test]
async fn test_compatible_sibling_is_reused() {
    let sibling = format!("{NAME}-dev");
    let driver = FakeDriver::new().with_sibling(&sibling, IMAGE);
    let mut versions = MockVersions::new();
    versions
        .expect_fetch_version()
        .times(1)
        .returning(|| Ok("1.2.0-dev".to_string()));

    let resolution = resolve(&driver, &versions, &request(), LIMIT).await;

    let reused = resolution.reuse.expect("sibling reused");
    assert_eq!(reused.name, sibling);
    assert!(resolution.replace.is_none());
}

#[tokio::test]
async fn test_sibling_with_short_version_is_reused() {
    let sibling = format!("{NAME}-dev");
    let driver = FakeDriver::new().with_sibling(&sibling, IMAGE);

    let resolution = resolve(&driver, &FixedVersion(Some("1.2")), &request(), LIMIT).await;

    assert_eq!(resolution.reuse.expect("sibling reused").name, sibling);
    assert!(resolution.replace.is_none());
}

#[tokio::test]
async fn test_sibling_with_other_version_is_replaced() {
    let sibling = format!("{NAME}-dev");
    let driver = FakeDriver::new().with_sibling(&sibling, "wandb/catnip:1.1.0");

    let resolution = resolve(&driver, &FixedVersion(Some("1.1.0")), &request(), LIMIT).await;

    assert!(resolution.reuse.is_none());
    assert_eq!(resolution.replace.expect("replaced").name, sibling);
}

#[tokio::test]
async fn test_sibling_of_other_project_skips_version_check() {
    let driver = FakeDriver::new().with_sibling("catnip-elsewhere", IMAGE);
    let mut versions = MockVersions::new();
    versions.expect_fetch_version().never();

    let resolution = resolve(&driver, &versions, &request(), LIMIT).await;

    assert_eq!(resolution.replace.expect("replaced").name, "catnip-elsewhere");
}

#[tokio::test]
async fn test_unreachable_sibling_is_replaced() {
    let driver = FakeDriver::new().with_sibling(&format!("{NAME}-dev"), IMAGE);

    let resolution = resolve(&driver, &FixedVersion(None), &request(), LIMIT).await;

    assert!(resolution.reuse.is_none());
    assert!(resolution.replace.is_some());
}

#[tokio::test]
async fn test_hanging_sibling_check_is_bounded() {
    let driver = FakeDriver::new().with_sibling(&format!("{NAME}-dev"), IMAGE);

    let resolution = tokio::time::timeout(
        Duration::from_secs(5),
        resolve(&driver, &Hanging, &request(), Duration::from_millis(50)),
    )
    .await
    .expect("resolve returned");

    assert!(resolution.replace.is_some());
}

#[tokio::test]
async fn test_stopped_container_with_custom_image_is_recreated() {
    let driver = FakeDriver::new().with_existing(NAME, IMAGE);
    let req = LifecycleRequest {
        image: "ghcr.io/me/catnip:edge".to_string(),
        ..request()
    };

    let resolution = resolve(&driver, &FixedVersion(None), &req, LIMIT).await;

    assert!(resolution.force_remove_existing);
}

#[tokio::test]
async fn test_stopped_container_with_older_tag_is_recreated() {
    let driver = FakeDriver::new().with_existing(NAME, "wandb/catnip:1.1.9");

    let resolution = resolve(&driver, &FixedVersion(None), &request(), LIMIT).await;

    assert!(resolution.force_remove_existing);
}

#[tokio::test]
async fn test_stopped_container_with_newer_tag_is_kept() {
    let driver = FakeDriver::new().with_existing(NAME, "wandb/catnip:1.3.0");

    let resolution = resolve(&driver, &FixedVersion(None), &request(), LIMIT).await;

    assert!(!resolution.force_remove_existing);
}

#[tokio::test]
async fn test_stopped_dev_container_is_recreated_for_production() {
    let driver = FakeDriver::new().with_existing(NAME, "catnip-dev:dev");

    let resolution = resolve(&driver, &FixedVersion(None), &request(), LIMIT).await;

    assert!(resolution.force_remove_existing);
}

#[tokio::test]
async fn test_remove_flag_carries_through() {
    let driver = FakeDriver::new();
    let req = LifecycleRequest {
        remove_existing: true,
        ..request()
    };

    let resolution = resolve(&driver, &FixedVersion(None), &req, LIMIT).await;

    assert!(resolution.force_remove_existing);
}

// ── check_upgrade ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upgrade_available_when_cli_is_newer() {
    let report = check_upgrade(&FixedVersion(Some("1.1.0")), CLI_VERSION, LIMIT).await;

    assert!(report.upgrade_available);
    assert_eq!(report.container_version, "1.1.0");
    assert_eq!(report.cli_version, CLI_VERSION);
}

#[tokio::test]
async fn test_no_upgrade_when_versions_match() {
    let report = check_upgrade(&FixedVersion(Some("v1.2.0")), CLI_VERSION, LIMIT).await;

    assert!(!report.upgrade_available);
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_unknown() {
    let report = check_upgrade(&FixedVersion(None), CLI_VERSION, LIMIT).await;

    assert!(!report.upgrade_available);
    assert_eq!(report.container_version, "unknown");
}

#[tokio::test]
async fn test_hanging_endpoint_reports_unknown() {
    let report = check_upgrade(&Hanging, CLI_VERSION, Duration::from_millis(50)).await;

    assert_eq!(report.container_version, "unknown");
}
