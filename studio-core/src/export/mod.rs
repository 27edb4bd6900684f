//! Design-document export.
//!
//! [`Exporter::export`] always produces a PDF unless PDF serialization
//! itself fails. Enrichment and the rich layout are optional extras that
//! need a text backend; when either fails the deterministic layout is used.

pub mod enrichment;
pub mod layout;
pub mod markup;
pub mod pdf;

pub use enrichment::{EnrichmentProfile, ProductionPhase};
pub use layout::{plan_sections, Section, SectionBody, SECTION_TITLES};

use crate::engine::{strip_code_fence, BackendError, TextBackend};
use crate::proposal::ProposalItem;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from document export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Design markup unusable: {0}")]
    Markup(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// File name for an exported document.
pub fn export_file_name(item: &ProposalItem) -> String {
    let name: String = item
        .name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let name = if name.is_empty() { "Untitled".to_string() } else { name };
    format!("{name}_GDD.pdf")
}

/// Builds design documents for proposal items.
#[derive(Clone, Default)]
pub struct Exporter {
    backend: Option<Arc<dyn TextBackend>>,
}

impl Exporter {
    pub fn new(backend: Option<Arc<dyn TextBackend>>) -> Self {
        Self { backend }
    }

    /// Export `item` as PDF bytes.
    ///
    /// With `use_rich_design` and a backend, the backend designs the
    /// document first; any failure there falls back to the fixed layout.
    pub async fn export(
        &self,
        item: &ProposalItem,
        image: Option<&[u8]>,
        use_rich_design: bool,
    ) -> Result<Vec<u8>, ExportError> {
        let enrichment = enrichment::enrich(self.backend.as_deref(), item).await;

        if use_rich_design {
            if let Some(backend) = self.backend.as_deref() {
                match self.rich(backend, item, image, &enrichment).await {
                    Ok(bytes) => {
                        info!(item = %item.name, "exported with rich layout");
                        return Ok(bytes);
                    }
                    Err(e) => {
                        warn!(item = %item.name, error = %e, "rich layout failed, using fixed layout")
                    }
                }
            }
        }

        let bytes = layout::render_document(item, image, &enrichment)?;
        info!(item = %item.name, bytes = bytes.len(), "exported with fixed layout");
        Ok(bytes)
    }

    async fn rich(
        &self,
        backend: &dyn TextBackend,
        item: &ProposalItem,
        image: Option<&[u8]>,
        enrichment: &EnrichmentProfile,
    ) -> Result<Vec<u8>, ExportError> {
        let prompt = markup::design_prompt(item, enrichment, image.is_some());
        let html = backend.generate_text(&prompt).await?;
        let html = strip_code_fence(&html);
        if html.is_empty() {
            return Err(ExportError::Markup("empty response".into()));
        }

        let blocks = markup::parse_blocks(html);
        let bytes = markup::render_blocks(&item.name, &blocks, image)?;
        if bytes.is_empty() {
            return Err(ExportError::Pdf("empty document".into()));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(&ProposalItem::new("Neon  Drift Rally")),
            "Neon__Drift_Rally_GDD.pdf"
        );
        assert_eq!(export_file_name(&ProposalItem::new("  ")), "Untitled_GDD.pdf");
    }

    #[tokio::test]
    async fn test_export_without_backend() {
        let bytes = Exporter::default()
            .export(&ProposalItem::new("Solo"), None, true)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_rich_layout_used_when_markup_renders() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response("{}")
                .with_response("```html\n<h1>Solo</h1><p>Designed.</p>\n```"),
        );
        let exporter = Exporter::new(Some(backend.clone() as Arc<dyn TextBackend>));
        let bytes = exporter
            .export(&ProposalItem::new("Solo"), None, true)
            .await
            .unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("HTML"));
    }

    #[tokio::test]
    async fn test_rich_failures_fall_back() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_failure(BackendError::Timeout)
                .with_response("no markup here")
                .with_response("{}")
                .with_failure(BackendError::Request("503".into())),
        );
        let exporter = Exporter::new(Some(backend.clone() as Arc<dyn TextBackend>));
        let item = ProposalItem::new("Solo");

        assert!(exporter.export(&item, None, true).await.is_ok());
        assert!(exporter.export(&item, None, true).await.is_ok());
        assert_eq!(backend.prompts().len(), 4);
    }

    #[tokio::test]
    async fn test_rich_flag_off_skips_design_call() {
        let backend = Arc::new(ScriptedBackend::new().with_response("{}"));
        let exporter = Exporter::new(Some(backend.clone() as Arc<dyn TextBackend>));
        exporter
            .export(&ProposalItem::new("Solo"), None, false)
            .await
            .unwrap();
        assert_eq!(backend.prompts().len(), 1);
    }
}
