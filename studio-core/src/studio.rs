//! Application state and the services that act on it.
//!
//! [`AppState`] is owned by the UI layer and only changes between user
//! actions. [`Studio`] holds no per-session state; each method takes the
//! state it should update.

use crate::config::StudioConfig;
use crate::constraints::Constraints;
use crate::engine::{Evaluation, GenreInfo, ProposalEngine, ProposalError, TextBackend};
use crate::export::{ExportError, Exporter};
use crate::media::{MediaCache, MediaGenerator, MediaKind};
use crate::pool::{Category, ItemPool, PoolError};
use crate::proposal::{ItemId, ProposalItem, ProposalSet};
use gemini::Gemini;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from studio actions.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Proposal generation failed: {0}")]
    Proposal(#[from] ProposalError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("No item selected")]
    NoSelection,
}

/// Which screen the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Both category lists.
    #[default]
    Home,
    /// Summary of the selected item with accept/reject.
    Preview,
    /// Full detail of an accepted item.
    Detail,
}

/// The item the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub category: Category,
    pub id: ItemId,
}

/// Everything the UI needs to redraw.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub proposals: Option<ProposalSet>,
    pub pool: ItemPool,
    pub media: MediaCache,
    pub view: View,
    pub selection: Option<Selection>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything derived from the previous proposal set.
    pub fn apply_proposals(&mut self, set: ProposalSet) {
        self.pool.populate(&set);
        self.media.clear();
        self.selection = None;
        self.view = View::Home;
        self.proposals = Some(set);
    }

    /// Open the preview of a visible item.
    pub fn select(&mut self, category: Category, id: ItemId) -> Result<(), StudioError> {
        if !self.pool.is_visible(category, id) {
            return Err(PoolError::NotVisible { category, id }.into());
        }
        self.selection = Some(Selection { category, id });
        self.view = View::Preview;
        Ok(())
    }

    pub fn selected_item(&self) -> Option<&ProposalItem> {
        self.selection.and_then(|s| self.pool.find(s.id))
    }

    /// Reject the selected item and return to the lists. Returns the id of
    /// the item promoted into the freed slot, if any.
    pub fn reject_selected(&mut self) -> Result<Option<ItemId>, StudioError> {
        let selection = self.selection.ok_or(StudioError::NoSelection)?;
        let promoted = self.pool.reject(selection.category, selection.id)?;
        self.selection = None;
        self.view = View::Home;
        Ok(promoted)
    }

    /// Accept the selected item and open its detail view.
    pub fn accept_selected(&mut self) -> Result<(), StudioError> {
        if self.selection.is_none() {
            return Err(StudioError::NoSelection);
        }
        self.view = View::Detail;
        Ok(())
    }

    pub fn go_home(&mut self) {
        self.selection = None;
        self.view = View::Home;
    }
}

/// Studio services: proposal engine, media and export.
pub struct Studio {
    engine: ProposalEngine,
    media: MediaGenerator,
    exporter: Exporter,
}

impl Studio {
    pub fn new(engine: ProposalEngine, media: MediaGenerator, exporter: Exporter) -> Self {
        Self {
            engine,
            media,
            exporter,
        }
    }

    /// Wire every service from a config. Without an API key the text
    /// features report themselves unavailable.
    pub fn from_config(config: &StudioConfig) -> Self {
        let backend: Option<Arc<dyn TextBackend>> = config.google_api_key.as_ref().map(|key| {
            let mut client = Gemini::new(key.clone());
            if let Some(model) = &config.gemini_model {
                client = client.with_model(model.clone());
            }
            Arc::new(client) as Arc<dyn TextBackend>
        });
        if backend.is_none() {
            info!("GOOGLE_API_KEY not set, text generation disabled");
        }

        Self::new(
            ProposalEngine::with_backend(backend.clone()),
            MediaGenerator::from_config(config),
            Exporter::new(backend),
        )
    }

    pub fn from_env() -> Self {
        Self::from_config(&StudioConfig::from_env())
    }

    pub fn engine(&self) -> &ProposalEngine {
        &self.engine
    }

    pub fn media(&self) -> &MediaGenerator {
        &self.media
    }

    /// Generate a fresh proposal set into `state`. On failure the state is
    /// left as it was.
    pub async fn generate(
        &self,
        state: &mut AppState,
        constraints: &Constraints,
    ) -> Result<(), StudioError> {
        let set = self.engine.generate_proposal(constraints).await?;
        state.apply_proposals(set);
        Ok(())
    }

    fn selected(state: &AppState) -> Result<ProposalItem, StudioError> {
        state.selected_item().cloned().ok_or(StudioError::NoSelection)
    }

    /// Concept art for the selected item, generated once per item.
    pub async fn image_for_selected<'a>(
        &self,
        state: &'a mut AppState,
    ) -> Result<Option<&'a [u8]>, StudioError> {
        let item = Self::selected(state)?;
        if !state.media.contains(item.id, MediaKind::Image) {
            debug!(item = %item.name, "generating concept art");
            let bytes = self.media.generate_image(item.image_prompt()).await;
            state.media.insert(item.id, MediaKind::Image, bytes);
        }
        Ok(state.media.get(item.id, MediaKind::Image))
    }

    /// Soundtrack clip for the selected item, generated once per item.
    pub async fn soundtrack_for_selected<'a>(
        &self,
        state: &'a mut AppState,
    ) -> Result<Option<&'a [u8]>, StudioError> {
        let item = Self::selected(state)?;
        if !state.media.contains(item.id, MediaKind::Audio) {
            let backend = self.engine.backend();
            let prompt = self.media.soundtrack_prompt(backend.as_deref(), &item).await;
            debug!(item = %item.name, prompt = %prompt, "generating soundtrack");
            let bytes = self.media.generate_audio(&prompt).await;
            state.media.insert(item.id, MediaKind::Audio, bytes);
        }
        Ok(state.media.get(item.id, MediaKind::Audio))
    }

    /// Export the selected item, embedding its cached concept art if any.
    pub async fn export_selected(
        &self,
        state: &AppState,
        use_rich_design: bool,
    ) -> Result<Vec<u8>, StudioError> {
        let item = Self::selected(state)?;
        let image = state.media.get(item.id, MediaKind::Image);
        Ok(self.exporter.export(&item, image, use_rich_design).await?)
    }

    pub async fn evaluate_genre(
        &self,
        genre: &str,
        constraints: &Constraints,
    ) -> Result<Evaluation, StudioError> {
        Ok(self.engine.evaluate_specific_genre(genre, constraints).await?)
    }

    pub async fn genre_info(&self, genre: &str) -> GenreInfo {
        self.engine.get_genre_wiki_info(genre).await
    }
}
