//! Testing utilities for the studio.
//!
//! This module provides tools for integration testing:
//! - `ScriptedBackend` for deterministic testing without API calls
//! - `FailingStrategy` for exercising the audio fallback chain
//! - `TestHarness` for scripted studio sessions
//! - Assertion helpers for verifying application state

use crate::config::AudioSettings;
use crate::constraints::Constraints;
use crate::engine::{BackendError, ProposalEngine, TextBackend};
use crate::export::Exporter;
use crate::media::audio::{
    AudioChain, AudioRequest, AudioStrategy, MusicDuration, ProceduralStrategy, TierError,
};
use crate::media::{ImageClient, MediaGenerator};
use crate::pool::Category;
use crate::proposal::{ItemId, ProposalItem};
use crate::studio::{AppState, Studio, StudioError, View};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A text backend that returns scripted responses in order.
///
/// Every prompt it receives is recorded so tests can inspect what was asked.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.queue_response(text);
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, error: BackendError) -> Self {
        self.queue_failure(error);
        self
    }

    pub fn queue_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    pub fn queue_failure(&self, error: BackendError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(prompts) => prompts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, BackendError>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Request("no scripted responses left".into())))
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_json(&self, prompt: &str) -> Result<String, BackendError> {
        self.next(prompt)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        self.next(prompt)
    }
}

/// An audio tier that always fails with the same error.
pub struct FailingStrategy {
    name: String,
    error: TierError,
}

impl FailingStrategy {
    pub fn new(name: impl Into<String>, error: TierError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl AudioStrategy for FailingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(&self, _request: &AudioRequest) -> Result<Vec<u8>, TierError> {
        Err(self.error.clone())
    }
}

/// A well-formed proposal response with `achievable` genres named
/// `Genre 1..` and `demo` ideas named `Demo 1..`.
pub fn sample_proposal_json(achievable: usize, demo: usize) -> String {
    let achievable_items: Vec<serde_json::Value> = (1..=achievable)
        .map(|i| {
            serde_json::json!({
                "name": format!("Genre {i}"),
                "reason": format!("Fits the team for reason {i}"),
                "cycle": "4 months",
                "visual_prompt": format!("Concept art for genre {i}, neon lighting"),
                "classic_references": [
                    {"title": format!("Classic {i}"), "url": format!("https://example.com/{i}")}
                ],
                "details": {
                    "optimized_outline": "Tight scope, three biomes",
                    "protagonist": "A courier",
                    "storyline": "Deliver the last letter",
                    "release_blurb": format!("Genre {i} in a drowned city."),
                    "core_loop": "Explore, deliver, upgrade"
                }
            })
        })
        .collect();

    let demo_items: Vec<serde_json::Value> = (1..=demo)
        .map(|i| {
            serde_json::json!({
                "name": format!("Demo {i}"),
                "reason": "Too large for the budget, a slice proves it",
                "cycle": "2 months",
                "visual_prompt": format!("Key art for demo {i}"),
                "classic_references": [],
                "details": {
                    "release_blurb": format!("A vertical slice of demo {i}."),
                    "full_game_prediction": {"cycle": "24 months", "budget": "$500,000"}
                }
            })
        })
        .collect();

    serde_json::json!({
        "achievable_genres": achievable_items,
        "demo_ideas": demo_items,
    })
    .to_string()
}

/// Test harness for scripted studio sessions.
///
/// The studio uses a [`ScriptedBackend`] for text, an unconfigured image
/// client and a procedural-only audio chain, so nothing leaves the process.
pub struct TestHarness {
    pub state: AppState,
    pub studio: Studio,
    pub backend: Arc<ScriptedBackend>,
}

impl TestHarness {
    pub fn new() -> Self {
        let backend = Arc::new(ScriptedBackend::new());
        let text: Arc<dyn TextBackend> = backend.clone();

        let settings = AudioSettings {
            duration: MusicDuration::from_secs(1),
            ..AudioSettings::default()
        };
        let media = MediaGenerator::new(
            ImageClient::new(None),
            AudioChain::new(vec![Box::new(ProceduralStrategy)]),
            settings,
        );
        let studio = Studio::new(
            ProposalEngine::new(text.clone()),
            media,
            Exporter::new(Some(text)),
        );

        Self {
            state: AppState::new(),
            studio,
            backend,
        }
    }

    /// Queue a JSON response for the next backend call.
    pub fn expect_json(&mut self, json: impl Into<String>) -> &mut Self {
        self.backend.queue_response(json);
        self
    }

    /// Queue a backend failure for the next call.
    pub fn expect_failure(&mut self, error: BackendError) -> &mut Self {
        self.backend.queue_failure(error);
        self
    }

    pub async fn generate(&mut self, constraints: &Constraints) -> Result<(), StudioError> {
        self.studio.generate(&mut self.state, constraints).await
    }

    /// Id of the visible item at `index` in `category`.
    pub fn visible_id(&self, category: Category, index: usize) -> Option<ItemId> {
        self.state.pool.visible(category).get(index).map(|item| item.id)
    }

    /// Names of the visible items in `category`, in display order.
    pub fn visible_names(&self, category: Category) -> Vec<String> {
        self.state
            .pool
            .visible(category)
            .iter()
            .map(|item| item.name.clone())
            .collect()
    }

    /// Select the visible item at `index` in `category`.
    pub fn select(&mut self, category: Category, index: usize) -> Result<ItemId, StudioError> {
        let id = self
            .visible_id(category, index)
            .ok_or(StudioError::NoSelection)?;
        self.state.select(category, id)?;
        Ok(id)
    }

    pub fn selected(&self) -> Option<&ProposalItem> {
        self.state.selected_item()
    }

    // ===== Assertion Helpers =====

    /// Assert the current view.
    #[track_caller]
    pub fn assert_view(&self, expected: View) {
        assert_eq!(
            self.state.view, expected,
            "Expected view {:?}, got {:?}",
            expected, self.state.view
        );
    }

    /// Assert how many items are visible in a category.
    #[track_caller]
    pub fn assert_visible_count(&self, category: Category, expected: usize) {
        let actual = self.state.pool.visible(category).len();
        assert_eq!(
            actual, expected,
            "Expected {expected} visible {category} items, got {actual}"
        );
    }

    /// Assert how many items wait in a category's hidden queue.
    #[track_caller]
    pub fn assert_hidden_count(&self, category: Category, expected: usize) {
        let actual = self.state.pool.hidden_len(category);
        assert_eq!(
            actual, expected,
            "Expected {expected} hidden {category} items, got {actual}"
        );
    }

    /// Assert that an item with this name is visible in the category.
    #[track_caller]
    pub fn assert_visible(&self, category: Category, name: &str) {
        let names = self.visible_names(category);
        assert!(
            names.iter().any(|n| n == name),
            "Expected '{name}' to be visible in {category}, visible: {names:?}"
        );
    }

    /// Assert that no item with this name is visible in the category.
    #[track_caller]
    pub fn assert_not_visible(&self, category: Category, name: &str) {
        let names = self.visible_names(category);
        assert!(
            !names.iter().any(|n| n == name),
            "Expected '{name}' not to be visible in {category}, visible: {names:?}"
        );
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
