//! QA tests for design-document export through the studio.
//!
//! Run with: `cargo test -p studio-core --test qa_export`

use studio_core::engine::BackendError;
use std::sync::Arc;
use studio_core::export::enrichment::enrich;
use studio_core::export::{export_file_name, plan_sections, EnrichmentProfile};
use studio_core::testing::{sample_proposal_json, ScriptedBackend, TestHarness};
use studio_core::{Category, Constraints, Exporter, ProposalItem, TextBackend};

async fn harness_with_selection() -> TestHarness {
    let mut harness = TestHarness::new();
    harness.expect_json(sample_proposal_json(3, 2));
    let constraints = Constraints::new("Story", 2, 6, 12_000.0).unwrap();
    harness.generate(&constraints).await.unwrap();
    harness.select(Category::Achievable, 0).unwrap();
    harness.state.accept_selected().unwrap();
    harness
}

#[tokio::test]
async fn test_fixed_layout_export_with_enrichment() {
    let mut harness = harness_with_selection().await;
    harness.expect_json(
        r#"{"pillars": ["Weather as a rival"],
            "key_features": ["Storm forecasting", "Lighthouse upgrades"],
            "production_plan": [{"phase": "Prototype", "duration": "1 month", "deliverables": ["Core loop"]}],
            "risks": "Scope creep"}"#,
    );

    let pdf = harness
        .studio
        .export_selected(&harness.state, false)
        .await
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    // Enrichment only; no design call when the rich flag is off.
    assert_eq!(harness.backend.prompts().len(), 2);
}

#[tokio::test]
async fn test_rich_export_falls_back_when_design_fails() {
    let mut harness = harness_with_selection().await;
    harness
        .expect_json("{}")
        .expect_failure(BackendError::Request("overloaded".into()));

    let pdf = harness
        .studio
        .export_selected(&harness.state, true)
        .await
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(harness.backend.prompts().len(), 3);
}

#[tokio::test]
async fn test_rich_export_uses_returned_markup() {
    let mut harness = harness_with_selection().await;
    harness
        .expect_json("{}")
        .expect_json("<h1>Genre 1</h1><h2>1. Summary</h2><p>A drowned city.</p>");

    let pdf = harness
        .studio
        .export_selected(&harness.state, true)
        .await
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(harness.backend.remaining(), 0);
}

#[tokio::test]
async fn test_export_survives_enrichment_failure() {
    let mut harness = harness_with_selection().await;
    harness.expect_failure(BackendError::Timeout);

    let pdf = harness
        .studio
        .export_selected(&harness.state, false)
        .await
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_selected_item_sections_and_file_name() {
    let harness = harness_with_selection().await;
    let item = harness.selected().unwrap();

    let numbers: Vec<usize> = plan_sections(item, &EnrichmentProfile::default())
        .iter()
        .map(|s| s.number)
        .collect();
    assert_eq!(numbers, vec![1, 4, 5, 12, 17]);
    assert_eq!(export_file_name(item), "Genre_1_GDD.pdf");
}

fn concept() -> ProposalItem {
    ProposalItem::new("Tide Runner")
        .with_reason("Fills a niche")
        .with_cycle("6 months")
}

#[tokio::test]
async fn test_array_enrichment_leaves_fixed_sections_untouched() {
    let item = concept();
    let baseline = plan_sections(&item, &EnrichmentProfile::default());

    let backend = ScriptedBackend::new().with_response(r#"["Pillar one", ["Feature"]]"#);
    let profile = enrich(Some(&backend as &dyn TextBackend), &item).await;
    assert!(profile.is_empty());
    assert_eq!(plan_sections(&item, &profile), baseline);
}

#[tokio::test]
async fn test_partially_typed_enrichment_keeps_only_usable_fields() {
    let item = concept();
    let backend = ScriptedBackend::new().with_response(
        r#"{"pillars": {"first": "Speed"},
            "risks": ["Scope creep", {"severity": "high"}],
            "production_plan": "soon"}"#,
    );
    let profile = enrich(Some(&backend as &dyn TextBackend), &item).await;

    let numbers: Vec<usize> = plan_sections(&item, &profile)
        .iter()
        .map(|s| s.number)
        .collect();
    // Only the risk list is added to what the concept already carries.
    assert_eq!(numbers, vec![12, 13, 17]);
}

#[tokio::test]
async fn test_export_with_unusable_enrichment_still_renders() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response("[1, 2]")
            .with_response(r#"{"pillars": 7, "risks": {"a": "b"}}"#),
    );
    let exporter = Exporter::new(Some(backend.clone() as Arc<dyn TextBackend>));

    for _ in 0..2 {
        let pdf = exporter.export(&concept(), None, false).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
    assert_eq!(backend.prompts().len(), 2);
}
