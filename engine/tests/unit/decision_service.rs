//! Tests for the decision service.

use std::path::PathBuf;

use catnip_engine::application::services::{DecideContext, decide};
use catnip_engine::domain::Action;
use catnip_engine::domain::request::DEV_IMAGE;

use crate::helpers::{FakeDriver, IMAGE, NAME, dev_request, request};

#[tokio::test]
async fn test_quit_request_wins() {
    let driver = FakeDriver::new().with_running(NAME);
    let ctx = DecideContext {
        quit_requested: true,
        ..DecideContext::default()
    };

    let decision = decide(&driver, &request(), &ctx).await;

    assert_eq!(decision.action, Action::None);
    assert_eq!(decision.status, "Initialization cancelled");
}

#[tokio::test]
async fn test_running_container_skips_to_ready() {
    let driver = FakeDriver::new().with_running(NAME);

    let decision = decide(&driver, &request(), &DecideContext::default()).await;

    assert_eq!(decision.action, Action::SkipToReady);
    assert_eq!(decision.status, "Container already running");
}

#[tokio::test]
async fn test_missing_image_is_pulled() {
    let driver = FakeDriver::new();

    let decision = decide(&driver, &request(), &DecideContext::default()).await;

    assert_eq!(decision.action, Action::Pull(IMAGE.to_string()));
    assert_eq!(decision.current_action, format!("Pulling {IMAGE}"));
}

#[tokio::test]
async fn test_present_image_starts_container() {
    let driver = FakeDriver::new().with_image(IMAGE);

    let decision = decide(&driver, &request(), &DecideContext::default()).await;

    assert_eq!(decision.action, Action::StartContainer);
    assert_eq!(decision.status, "Starting container...");
}

#[tokio::test]
async fn test_force_refresh_pulls_present_image_once() {
    let driver = FakeDriver::new().with_image(IMAGE);
    let req = catnip_engine::domain::LifecycleRequest {
        force_refresh: true,
        ..request()
    };

    let first = decide(&driver, &req, &DecideContext::default()).await;
    let after_refresh = decide(
        &driver,
        &req,
        &DecideContext {
            image_refreshed: true,
            ..DecideContext::default()
        },
    )
    .await;

    assert_eq!(first.action, Action::Pull(IMAGE.to_string()));
    assert_eq!(after_refresh.action, Action::StartContainer);
}

#[tokio::test]
async fn test_dev_mode_builds_missing_dev_image() {
    let driver = FakeDriver::new().with_image(IMAGE);

    let decision = decide(&driver, &dev_request(), &DecideContext::default()).await;

    assert_eq!(decision.action, Action::Build(PathBuf::from("/src/project")));
    assert_eq!(decision.status, "Building development image...");
}

#[tokio::test]
async fn test_dev_mode_with_dev_image_starts() {
    let driver = FakeDriver::new().with_image(DEV_IMAGE);

    let decision = decide(&driver, &dev_request(), &DecideContext::default()).await;

    assert_eq!(decision.action, Action::StartContainer);
}

#[tokio::test]
async fn test_decision_is_repeatable_for_same_state() {
    let driver = FakeDriver::new();
    let req = request();

    let a = decide(&driver, &req, &DecideContext::default()).await;
    let b = decide(&driver, &req, &DecideContext::default()).await;

    assert_eq!(a, b);
}
