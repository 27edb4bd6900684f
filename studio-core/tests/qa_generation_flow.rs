//! QA tests for the proposal browsing flow.
//!
//! These tests drive a full session through the scripted harness:
//! - Generating a proposal set into fresh state
//! - Selecting, rejecting and accepting items
//! - Regenerating over an existing session
//!
//! Run with: `cargo test -p studio-core --test qa_generation_flow`

use studio_core::engine::BackendError;
use studio_core::testing::{sample_proposal_json, TestHarness};
use studio_core::{Category, Constraints, ProposalError, StudioError, View};

fn constraints() -> Constraints {
    Constraints::new("A lighthouse keeper who talks to storms", 3, 6, 10_000.0)
        .expect("valid constraints")
}

// =============================================================================
// GENERATION
// =============================================================================

#[tokio::test]
async fn test_generation_fills_visible_slots_and_reserve() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(5, 4));
    harness.generate(&constraints()).await.unwrap();

    harness.assert_view(View::Home);
    harness.assert_visible_count(Category::Achievable, 3);
    harness.assert_hidden_count(Category::Achievable, 2);
    harness.assert_visible_count(Category::Demo, 2);
    harness.assert_hidden_count(Category::Demo, 2);
    assert_eq!(
        harness.visible_names(Category::Achievable),
        vec!["Genre 1", "Genre 2", "Genre 3"]
    );
}

#[tokio::test]
async fn test_short_lists_leave_slots_empty() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(1, 0));
    harness.generate(&constraints()).await.unwrap();

    harness.assert_visible_count(Category::Achievable, 1);
    harness.assert_visible_count(Category::Demo, 0);
    harness.assert_hidden_count(Category::Achievable, 0);
}

#[tokio::test]
async fn test_backend_failure_surfaces_as_proposal_error() {
    let mut harness = TestHarness::new();
    harness.expect_failure(BackendError::Timeout);

    let result = harness.generate(&constraints()).await;
    assert!(matches!(
        result,
        Err(StudioError::Proposal(ProposalError::Backend(BackendError::Timeout)))
    ));
    assert!(harness.state.proposals.is_none());
    assert!(harness.state.pool.is_empty());
}

// =============================================================================
// REJECT AND SWAP
// =============================================================================

#[tokio::test]
async fn test_reject_promotes_reserve_items_in_order() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(5, 2));
    harness.generate(&constraints()).await.unwrap();

    harness.select(Category::Achievable, 1).unwrap();
    let promoted = harness.state.reject_selected().unwrap();
    let promoted_name = promoted
        .and_then(|id| harness.state.pool.find(id))
        .map(|item| item.name.clone());
    assert_eq!(promoted_name.as_deref(), Some("Genre 4"));

    harness.assert_view(View::Home);
    harness.assert_not_visible(Category::Achievable, "Genre 2");
    harness.assert_visible(Category::Achievable, "Genre 4");
    harness.assert_visible_count(Category::Achievable, 3);
    harness.assert_hidden_count(Category::Achievable, 1);

    harness.select(Category::Achievable, 0).unwrap();
    harness.state.reject_selected().unwrap();
    harness.select(Category::Achievable, 0).unwrap();
    let promoted = harness.state.reject_selected().unwrap();

    // Reserve exhausted: the slot stays empty.
    assert!(promoted.is_none());
    harness.assert_visible_count(Category::Achievable, 2);
    harness.assert_hidden_count(Category::Achievable, 0);
}

#[tokio::test]
async fn test_reject_does_not_touch_other_category() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(3, 3));
    harness.generate(&constraints()).await.unwrap();
    let demos_before = harness.visible_names(Category::Demo);

    harness.select(Category::Achievable, 0).unwrap();
    harness.state.reject_selected().unwrap();

    assert_eq!(harness.visible_names(Category::Demo), demos_before);
}

#[tokio::test]
async fn test_reject_without_selection_fails() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(3, 2));
    harness.generate(&constraints()).await.unwrap();

    assert!(matches!(
        harness.state.reject_selected(),
        Err(StudioError::NoSelection)
    ));
}

// =============================================================================
// ACCEPT AND REGENERATE
// =============================================================================

#[tokio::test]
async fn test_accept_opens_detail_view() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(3, 2));
    harness.generate(&constraints()).await.unwrap();

    harness.select(Category::Demo, 0).unwrap();
    harness.state.accept_selected().unwrap();
    harness.assert_view(View::Detail);

    let item = harness.selected().expect("selection survives accept");
    assert_eq!(item.name, "Demo 1");
    let prediction = item
        .details
        .full_game_prediction
        .as_ref()
        .expect("demo carries a projection");
    assert_eq!(prediction.budget, "$500,000");
}

#[tokio::test]
async fn test_regenerate_replaces_session() {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(3, 2));
    harness.generate(&constraints()).await.unwrap();
    let first_id = harness.select(Category::Achievable, 0).unwrap();
    harness.state.accept_selected().unwrap();

    harness.expect_json(sample_proposal_json(4, 2));
    harness.generate(&constraints()).await.unwrap();

    harness.assert_view(View::Home);
    assert!(harness.selected().is_none());
    assert!(harness.state.pool.find(first_id).is_none());
    harness.assert_hidden_count(Category::Achievable, 1);
}
