//! A small flowing-text writer over `printpdf`.
//!
//! Tracks a cursor down an A4 page, wraps text to the usable width and
//! starts a new page when the bottom margin is reached. Only the built-in
//! Helvetica faces are used, so all text is reduced to Latin-1 first.

use super::ExportError;
use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb,
};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 15.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const LINE_SPACING: f32 = 1.45;

/// RGB colour in 0-255 components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8(255, 255, 255);
    pub const NAVY: Rgb8 = Rgb8(15, 23, 42);
    pub const ACCENT: Rgb8 = Rgb8(37, 99, 235);
    pub const SLATE: Rgb8 = Rgb8(51, 65, 85);

    fn color(self) -> Color {
        Color::Rgb(Rgb::new(
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
            None,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Center,
}

/// Replace typographic punctuation with ASCII and anything else outside
/// Latin-1 with `?`.
pub fn latin1_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2026}' => out.push_str("..."),
            '\u{2018}' | '\u{2019}' | '\u{201B}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' | '\u{2022}' => out.push('-'),
            '\u{00A0}' => out.push(' '),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap to at most `width` characters per line. Words longer
/// than a line are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line.is_empty() {
                word.len()
            } else {
                line.chars().count() + 1 + word.len()
            };
            if needed > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

fn chars_per_line(size: f32, width_mm: f32) -> usize {
    (width_mm / (size * PT_TO_MM * AVG_GLYPH_WIDTH)).floor() as usize
}

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_WIDTH
}

pub struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    /// Baseline of the next line, in mm from the bottom edge.
    cursor: f32,
    color: Rgb8,
    pages: usize,
}

impl PdfWriter {
    pub fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(
            latin1_safe(title),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            regular,
            bold,
            layer,
            cursor: PAGE_HEIGHT - MARGIN_TOP,
            color: Rgb8::BLACK,
            pages: 1,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN_TOP;
        self.pages += 1;
        self.layer.set_fill_color(self.color.color());
    }

    /// Move the cursor to `y` mm from the top edge.
    pub fn move_to(&mut self, from_top: f32) {
        self.cursor = PAGE_HEIGHT - from_top;
    }

    pub fn spacer(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    pub fn set_color(&mut self, color: Rgb8) {
        self.color = color;
        self.layer.set_fill_color(color.color());
    }

    /// Fill the whole current page with a colour.
    pub fn fill_page(&mut self, color: Rgb8) {
        self.band(0.0, PAGE_HEIGHT, color);
    }

    /// Fill a full-width band starting `from_top` mm below the top edge.
    pub fn band(&mut self, from_top: f32, height: f32, color: Rgb8) {
        let top = PAGE_HEIGHT - from_top;
        self.layer.set_fill_color(color.color());
        self.layer
            .add_rect(Rect::new(Mm(0.0), Mm(top - height), Mm(PAGE_WIDTH), Mm(top)));
        self.layer.set_fill_color(self.color.color());
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < MARGIN_BOTTOM {
            self.new_page();
        }
    }

    /// Write wrapped text at the cursor.
    pub fn text(&mut self, text: &str, size: f32, bold: bool, align: Align) {
        self.indented_text(text, size, bold, align, 0.0);
    }

    fn indented_text(&mut self, text: &str, size: f32, bold: bool, align: Align, indent: f32) {
        let width = PAGE_WIDTH - 2.0 * MARGIN_X - indent;
        let height = line_height(size);
        let safe = latin1_safe(text);

        for line in wrap(&safe, chars_per_line(size, width)) {
            self.ensure_room(height);
            self.cursor -= height;
            let x = match align {
                Align::Left => MARGIN_X + indent,
                Align::Center => ((PAGE_WIDTH - approx_text_width(&line, size)) / 2.0).max(MARGIN_X),
            };
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(x), Mm(self.cursor), font);
        }
    }

    pub fn heading(&mut self, text: &str, size: f32) {
        // Keep a heading on the same page as at least two body lines.
        self.ensure_room(line_height(size) + 2.0 * line_height(11.0));
        self.text(text, size, true, Align::Left);
        self.spacer(1.5);
    }

    pub fn paragraph(&mut self, text: &str, size: f32) {
        self.text(text, size, false, Align::Left);
        self.spacer(2.0);
    }

    pub fn bullet(&mut self, text: &str, size: f32) {
        self.indented_text(&format!("- {text}"), size, false, Align::Left, 4.0);
        self.spacer(0.5);
    }

    /// Embed an image centred at `width` mm wide. Returns false if the bytes
    /// are not a decodable image.
    pub fn image(&mut self, bytes: &[u8], width: f32) -> bool {
        let Ok(decoded) = image_crate::load_from_memory(bytes) else {
            return false;
        };
        let buffer = decoded.to_rgb8();
        let (px_w, px_h) = buffer.dimensions();
        if px_w == 0 || px_h == 0 {
            return false;
        }
        let rgb = image_crate::DynamicImage::ImageRgb8(buffer);
        let (px_w, px_h) = (px_w as f32, px_h as f32);

        let dpi = 300.0;
        let natural_width = px_w / dpi * 25.4;
        let scale = width / natural_width;
        let height = px_h / dpi * 25.4 * scale;

        self.ensure_room(height);
        self.cursor -= height;
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm((PAGE_WIDTH - width) / 2.0)),
                translate_y: Some(Mm(self.cursor)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.spacer(4.0);
        true
    }

    pub fn finish(self) -> Result<Vec<u8>, ExportError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| ExportError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_safe() {
        assert_eq!(latin1_safe("Café – “ok”…"), "Café - \"ok\"...");
        assert_eq!(latin1_safe("龍 quest 🚀"), "? quest ?");
    }

    #[test]
    fn test_ellipsis_is_spelled_out() {
        assert_eq!(latin1_safe("wait…"), "wait...");
        assert_eq!(latin1_safe("…and… then"), "...and... then");
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_paragraphs() {
        let lines = wrap("abcdefghijkl\nnext", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl", "next"]);
    }

    #[test]
    fn test_long_text_paginates() {
        let mut writer = PdfWriter::new("Test").unwrap();
        let paragraph = "Lorem ipsum dolor sit amet. ".repeat(400);
        writer.paragraph(&paragraph, 11.0);
        assert!(writer.page_count() > 1);

        let bytes = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_invalid_image_is_skipped() {
        let mut writer = PdfWriter::new("Test").unwrap();
        assert!(!writer.image(b"not an image", 120.0));
    }
}
