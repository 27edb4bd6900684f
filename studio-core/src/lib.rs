//! Game concept studio core.
//!
//! This crate provides:
//! - AI-driven game proposal generation with typed, validated decoding
//! - A visible/hidden item pool with reject-and-swap promotion
//! - Image generation and a tiered audio synthesis fallback chain
//! - Design-document (PDF) export with a deterministic fallback layout
//! - Explicit application state for the UI layer to own
//!
//! # Quick Start
//!
//! ```ignore
//! use studio_core::{AppState, Category, Constraints, Studio};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let studio = Studio::from_env();
//!     let mut state = AppState::new();
//!
//!     let constraints = Constraints::new("A hacker in a drowned city", 3, 6, 10_000.0)?;
//!     studio.generate(&mut state, &constraints).await?;
//!
//!     let first = state.pool.visible(Category::Achievable)[0].id;
//!     state.select(Category::Achievable, first)?;
//!     state.accept_selected()?;
//!
//!     let pdf = studio.export_selected(&state, false).await?;
//!     std::fs::write("design.pdf", pdf)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constraints;
pub mod engine;
pub mod export;
pub mod media;
pub mod pool;
pub mod proposal;
pub mod studio;
pub mod task;
pub mod testing;

// Primary public API
pub use config::StudioConfig;
pub use constraints::{ConstraintError, Constraints};
pub use engine::{BackendError, Evaluation, GenreInfo, ProposalEngine, ProposalError, TextBackend};
pub use export::{ExportError, Exporter};
pub use media::audio::{generate_local_music, AudioChain, ChainFailure, MusicDuration};
pub use media::{MediaCache, MediaGenerator, MediaKind};
pub use pool::{Category, ItemPool, PoolError};
pub use proposal::{Details, FullGamePrediction, ItemId, ProposalItem, ProposalSet, Reference};
pub use studio::{AppState, Selection, Studio, StudioError, View};
pub use task::{GenerationTask, TaskOutcome};
pub use testing::{ScriptedBackend, TestHarness};
