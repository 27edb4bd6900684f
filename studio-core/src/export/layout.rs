//! Deterministic design-document layout.
//!
//! A dark cover page followed by up to seventeen numbered sections. Section
//! numbers are fixed, so a document with missing data skips numbers rather
//! than renumbering.

use super::enrichment::EnrichmentProfile;
use super::pdf::{Align, PdfWriter, Rgb8};
use super::ExportError;
use crate::proposal::ProposalItem;
use tracing::debug;

/// Section titles in document order. Section `n` uses `SECTION_TITLES[n - 1]`.
pub const SECTION_TITLES: [&str; 17] = [
    "Executive Summary",
    "Design Pillars",
    "Target Audience & Experience",
    "Narrative Overview",
    "Core Gameplay Loop",
    "Key Features",
    "Progression & Content Scope",
    "Art & Audio Direction",
    "UI/UX & Accessibility",
    "Technical Scope",
    "Production Plan",
    "Schedule & Budget Outlook",
    "Risks & Mitigations",
    "Success Metrics",
    "Monetization & Live Ops",
    "Marketing Hooks",
    "References & Positioning",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Text(String),
    List(Vec<String>),
}

/// One document section that has content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub number: usize,
    pub body: SectionBody,
}

impl Section {
    pub fn title(&self) -> &'static str {
        SECTION_TITLES[self.number - 1]
    }

    /// Numbered heading, e.g. `4. Narrative Overview`.
    pub fn heading(&self) -> String {
        format!("{}. {}", self.number, self.title())
    }
}

/// Join the non-empty parts with newlines.
fn lines(parts: impl IntoIterator<Item = Option<String>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn labelled(label: &str, value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| format!("{label}: {value}"))
}

fn plain(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Choose the sections that have content, in order.
pub fn plan_sections(item: &ProposalItem, enrichment: &EnrichmentProfile) -> Vec<Section> {
    let details = &item.details;

    let summary = if enrichment.executive_summary.trim().is_empty() {
        if details.release_blurb.trim().is_empty() {
            String::new()
        } else {
            format!("Genre: {}\nConcept: {}", item.name, details.release_blurb)
        }
    } else {
        enrichment.executive_summary.clone()
    };

    let (projected_cycle, projected_budget) = details
        .full_game_prediction
        .as_ref()
        .map(|p| (p.cycle.as_str(), p.budget.as_str()))
        .unwrap_or(("", ""));

    let mut references: Vec<Option<String>> = vec![labelled("Market Fit", &item.reason)];
    references.extend(item.references.iter().map(|r| {
        match (r.title.trim().is_empty(), r.url.trim().is_empty()) {
            (false, false) => Some(format!("{} - {}", r.title, r.url)),
            (false, true) => Some(r.title.clone()),
            _ => None,
        }
    }));

    let bodies = [
        SectionBody::Text(summary),
        SectionBody::List(enrichment.pillars.clone()),
        SectionBody::Text(lines([
            labelled("Target Audience", &enrichment.target_audience),
            plain(&enrichment.player_experience),
        ])),
        SectionBody::Text(lines([
            plain(&details.release_blurb),
            labelled("Protagonist", &details.protagonist),
            plain(&details.storyline),
            plain(&details.optimized_outline),
        ])),
        SectionBody::Text(details.core_loop.clone()),
        SectionBody::List(enrichment.key_features.clone()),
        SectionBody::Text(lines([
            labelled("Progression", &enrichment.progression),
            labelled("Content Scope", &enrichment.content_scope),
        ])),
        SectionBody::Text(lines([
            labelled("Art Direction", &enrichment.art_direction),
            labelled("Audio Direction", &enrichment.audio_direction),
        ])),
        SectionBody::Text(lines([
            labelled("UI/UX", &enrichment.ui_ux),
            labelled("Accessibility", &enrichment.accessibility),
        ])),
        SectionBody::Text(enrichment.tech_scope.clone()),
        SectionBody::List(enrichment.production_plan.iter().map(|p| p.line()).collect()),
        SectionBody::Text(lines([
            labelled("Initial Cycle", &item.estimated_cycle),
            labelled("Projected Full Cycle", projected_cycle),
            labelled("Projected Budget", projected_budget),
        ])),
        SectionBody::List(enrichment.risks.clone()),
        SectionBody::List(enrichment.success_metrics.clone()),
        SectionBody::Text(lines([
            plain(&enrichment.monetization),
            plain(&enrichment.live_ops),
        ])),
        SectionBody::List(enrichment.marketing_hooks.clone()),
        SectionBody::Text(lines(references)),
    ];

    bodies
        .into_iter()
        .enumerate()
        .filter_map(|(idx, body)| {
            let body = match body {
                SectionBody::Text(text) if text.trim().is_empty() => return None,
                SectionBody::List(items) => {
                    let items: Vec<String> =
                        items.into_iter().filter(|i| !i.trim().is_empty()).collect();
                    if items.is_empty() {
                        return None;
                    }
                    SectionBody::List(items)
                }
                text => text,
            };
            Some(Section {
                number: idx + 1,
                body,
            })
        })
        .collect()
}

const COVER_IMAGE_WIDTH: f32 = 120.0;

/// Render the cover and every planned section.
pub fn render_document(
    item: &ProposalItem,
    image: Option<&[u8]>,
    enrichment: &EnrichmentProfile,
) -> Result<Vec<u8>, ExportError> {
    let title = if item.name.trim().is_empty() {
        "Untitled"
    } else {
        item.name.as_str()
    };
    let mut pdf = PdfWriter::new(title)?;

    pdf.fill_page(Rgb8::NAVY);
    pdf.set_color(Rgb8::WHITE);
    pdf.move_to(80.0);
    pdf.text("GAME DESIGN", 32.0, true, Align::Center);
    pdf.text("SPECIFICATION", 32.0, true, Align::Center);
    pdf.spacer(20.0);
    pdf.text(title, 20.0, false, Align::Center);

    if let Some(bytes) = image {
        pdf.move_to(160.0);
        if !pdf.image(bytes, COVER_IMAGE_WIDTH) {
            debug!("cover image could not be decoded, skipped");
        }
    }

    pdf.new_page();
    pdf.set_color(Rgb8::BLACK);
    for section in plan_sections(item, enrichment) {
        pdf.heading(&section.heading(), 14.0);
        match &section.body {
            SectionBody::Text(text) => pdf.paragraph(text, 11.0),
            SectionBody::List(items) => {
                for entry in items {
                    pdf.bullet(entry, 11.0);
                }
                pdf.spacer(2.0);
            }
        }
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::enrichment::ProductionPhase;
    use crate::proposal::{Details, FullGamePrediction};

    fn numbers(sections: &[Section]) -> Vec<usize> {
        sections.iter().map(|s| s.number).collect()
    }

    #[test]
    fn test_empty_item_has_no_sections() {
        let sections = plan_sections(&ProposalItem::new("Bare"), &EnrichmentProfile::default());
        assert!(sections.is_empty());
    }

    #[test]
    fn test_sections_keep_fixed_numbers() {
        let item = ProposalItem::new("Tide Runner")
            .with_reason("Fills a niche")
            .with_cycle("6 months")
            .with_reference("Journey", "https://example.com/journey")
            .with_reference("Abzu", "")
            .with_details(Details {
                release_blurb: "Surf a drowned world.".into(),
                core_loop: "Ride, collect, upgrade".into(),
                full_game_prediction: Some(FullGamePrediction {
                    cycle: "18 months".into(),
                    budget: "$60,000".into(),
                }),
                ..Details::default()
            });
        let enrichment = EnrichmentProfile {
            risks: vec!["Scope creep".into(), " ".into()],
            production_plan: vec![ProductionPhase::Note("Vertical slice".into())],
            ..EnrichmentProfile::default()
        };

        let sections = plan_sections(&item, &enrichment);
        assert_eq!(numbers(&sections), vec![1, 4, 5, 11, 12, 13, 17]);

        assert_eq!(
            sections[0].body,
            SectionBody::Text("Genre: Tide Runner\nConcept: Surf a drowned world.".into())
        );
        assert_eq!(sections[3].heading(), "11. Production Plan");
        assert_eq!(
            sections[4].body,
            SectionBody::Text(
                "Initial Cycle: 6 months\nProjected Full Cycle: 18 months\nProjected Budget: $60,000"
                    .into()
            )
        );
        assert_eq!(sections[5].body, SectionBody::List(vec!["Scope creep".into()]));
        assert_eq!(
            sections[6].body,
            SectionBody::Text(
                "Market Fit: Fills a niche\nJourney - https://example.com/journey\nAbzu".into()
            )
        );
    }

    #[test]
    fn test_enrichment_summary_wins() {
        let item = ProposalItem::new("X").with_details(Details {
            release_blurb: "blurb".into(),
            ..Details::default()
        });
        let enrichment = EnrichmentProfile {
            executive_summary: "Custom summary".into(),
            ..EnrichmentProfile::default()
        };
        let sections = plan_sections(&item, &enrichment);
        assert_eq!(sections[0].body, SectionBody::Text("Custom summary".into()));
    }

    #[test]
    fn test_render_bare_item() {
        let bytes = render_document(&ProposalItem::new(""), None, &EnrichmentProfile::default())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_survives_bad_image_and_unicode() {
        let item = ProposalItem::new("龍の塔 – Tower").with_details(Details {
            storyline: "“Climb” the tower… 🚀".repeat(200),
            ..Details::default()
        });
        let bytes = render_document(&item, Some(b"\x89PNG broken"), &EnrichmentProfile::default())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
