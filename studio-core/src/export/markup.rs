//! Rich layout: an HTML design document from the text backend, reduced to
//! a flat list of blocks and rendered with the house style.
//!
//! Only headings, paragraphs, list items and images are recognised; other
//! markup is ignored. Style and script bodies are dropped.

use super::enrichment::EnrichmentProfile;
use super::pdf::{Align, PdfWriter, Rgb8};
use super::ExportError;
use crate::proposal::ProposalItem;
use once_cell::sync::Lazy;
use regex::Regex;

static STRIPPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<style\b.*?</style\s*>|<script\b.*?</script\s*>|<head\b.*?</head\s*>")
        .expect("valid regex")
});

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)[^>]*>").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Subheading(String),
    Paragraph(String),
    Bullet(String),
    /// Placeholder for the concept art.
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Open {
    H1,
    H2,
    H3,
    P,
    Li,
}

impl Open {
    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "h1" => Some(Open::H1),
            "h2" => Some(Open::H2),
            "h3" | "h4" | "h5" | "h6" => Some(Open::H3),
            "p" => Some(Open::P),
            "li" => Some(Open::Li),
            _ => None,
        }
    }

    fn block(self, text: String) -> Block {
        match self {
            Open::H1 => Block::Title(text),
            Open::H2 => Block::Heading(text),
            Open::H3 => Block::Subheading(text),
            Open::P => Block::Paragraph(text),
            Open::Li => Block::Bullet(text),
        }
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&amp;", "&")
}

fn clean(text: &str) -> String {
    WHITESPACE
        .replace_all(&decode_entities(text), " ")
        .trim()
        .to_string()
}

/// Flatten HTML into renderable blocks.
pub fn parse_blocks(html: &str) -> Vec<Block> {
    let html = STRIPPED.replace_all(html, "");
    let mut blocks = Vec::new();
    let mut current: Option<(Open, String)> = None;
    let mut last = 0;

    let flush = |current: &mut Option<(Open, String)>, blocks: &mut Vec<Block>| {
        if let Some((kind, text)) = current.take() {
            let text = clean(&text);
            if !text.is_empty() {
                blocks.push(kind.block(text));
            }
        }
    };

    for caps in TAG.captures_iter(&html) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if let Some((_, text)) = current.as_mut() {
            text.push_str(&html[last..whole.start]);
        }
        last = whole.end;

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();

        if name == "img" {
            flush(&mut current, &mut blocks);
            blocks.push(Block::Image);
            continue;
        }
        if name == "br" {
            if let Some((_, text)) = current.as_mut() {
                text.push(' ');
            }
            continue;
        }

        match (Open::from_tag(&name), closing) {
            (Some(kind), false) => {
                flush(&mut current, &mut blocks);
                current = Some((kind, String::new()));
            }
            (Some(kind), true) if current.as_ref().is_some_and(|(open, _)| *open == kind) => {
                flush(&mut current, &mut blocks);
            }
            _ => {}
        }
    }

    if let Some((_, text)) = current.as_mut() {
        text.push_str(&html[last..]);
    }
    flush(&mut current, &mut blocks);
    blocks
}

/// Instruction asking the backend for an HTML design document.
pub fn design_prompt(item: &ProposalItem, enrichment: &EnrichmentProfile, has_image: bool) -> String {
    let concept = serde_json::to_string_pretty(item).unwrap_or_else(|_| item.name.clone());
    let extra = serde_json::to_string_pretty(enrichment).unwrap_or_default();
    let image_rule = if has_image {
        "Place a single <img src=\"cover\"> right after the title where the concept art belongs."
    } else {
        "Do not include any images."
    };
    format!(
        r#"Act as a senior graphic designer and game director. Write a polished game design document
for the concept below as a single self-contained HTML document.

Use <h1> for the game title, <h2> for numbered section headings, <h3> for sub-headings,
<p> for prose and <ul><li> for lists. {image_rule} Return only the HTML.

Concept:
{concept}

Additional design notes:
{extra}"#
    )
}

/// Render parsed blocks. Fails if nothing renderable was found.
pub fn render_blocks(
    title: &str,
    blocks: &[Block],
    image: Option<&[u8]>,
) -> Result<Vec<u8>, ExportError> {
    if !blocks.iter().any(|b| !matches!(b, Block::Image)) {
        return Err(ExportError::Markup("no renderable blocks".into()));
    }

    let mut pdf = PdfWriter::new(title)?;
    pdf.band(0.0, 12.0, Rgb8::ACCENT);
    pdf.move_to(28.0);

    for block in blocks {
        match block {
            Block::Title(text) => {
                pdf.set_color(Rgb8::NAVY);
                pdf.text(text, 26.0, true, Align::Center);
                pdf.spacer(6.0);
            }
            Block::Heading(text) => {
                pdf.spacer(3.0);
                pdf.set_color(Rgb8::ACCENT);
                pdf.heading(text, 16.0);
            }
            Block::Subheading(text) => {
                pdf.set_color(Rgb8::SLATE);
                pdf.heading(text, 13.0);
            }
            Block::Paragraph(text) => {
                pdf.set_color(Rgb8::BLACK);
                pdf.paragraph(text, 11.0);
            }
            Block::Bullet(text) => {
                pdf.set_color(Rgb8::BLACK);
                pdf.bullet(text, 11.0);
            }
            Block::Image => {
                if let Some(bytes) = image {
                    pdf.image(bytes, 140.0);
                }
            }
        }
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks() {
        let html = r#"<!DOCTYPE html><html><head><title>ignored</title>
            <style>h1 { color: red; }</style></head>
            <body>
              <h1>Tide <em>Runner</em></h1>
              <img src="cover" alt="art">
              <h2>1. Overview</h2>
              <p>Surf a   drowned&nbsp;world &amp; survive.<br>Line two.</p>
              <ul><li>Dash</li><li>Grapple</li></ul>
              <div>loose text</div>
              <h3>Notes</h3><p>Unclosed paragraph
            </body></html>"#;

        assert_eq!(
            parse_blocks(html),
            vec![
                Block::Title("Tide Runner".into()),
                Block::Image,
                Block::Heading("1. Overview".into()),
                Block::Paragraph("Surf a drowned world & survive. Line two.".into()),
                Block::Bullet("Dash".into()),
                Block::Bullet("Grapple".into()),
                Block::Subheading("Notes".into()),
                Block::Paragraph("Unclosed paragraph".into()),
            ]
        );
    }

    #[test]
    fn test_plain_text_has_no_blocks() {
        assert!(parse_blocks("Sorry, I cannot help with that.").is_empty());
    }

    #[test]
    fn test_render_requires_content() {
        assert!(matches!(
            render_blocks("X", &[Block::Image], None),
            Err(ExportError::Markup(_))
        ));
        let bytes = render_blocks(
            "X",
            &[Block::Title("X".into()), Block::Paragraph("Body".into())],
            None,
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_prompt_mentions_image_only_when_present() {
        let item = ProposalItem::new("Tide Runner");
        let with = design_prompt(&item, &EnrichmentProfile::default(), true);
        let without = design_prompt(&item, &EnrichmentProfile::default(), false);
        assert!(with.contains("<img src=\"cover\">"));
        assert!(without.contains("Do not include any images"));
        assert!(with.contains("Tide Runner"));
    }
}
