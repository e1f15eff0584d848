// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fonts for the invisible text layer.
//
// A glyph-complete font (CJK coverage) is preferred. When it cannot be
// obtained, the standard Helvetica font with WinAnsi encoding is used and
// text is reduced to what that encoding can represent.

pub mod resolver;

use std::sync::Arc;

use ocrlayer_core::error::{OcrLayerError, Result};
use ttf_parser::Face;

pub use resolver::{FontResolver, FontSource, HttpFontSource};

/// Base font name used when no glyph-complete font is available.
pub const FALLBACK_FONT_NAME: &str = "Helvetica";

/// A parsed, embeddable TrueType or OpenType font program.
#[derive(Debug)]
pub struct EmbeddedFont {
    data: Vec<u8>,
    postscript_name: String,
    units_per_em: u16,
    cff: bool,
}

impl EmbeddedFont {
    /// Parse a font program. Fails if the bytes are not a usable font.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let (postscript_name, units_per_em) = {
            let face = Face::parse(&data, 0)
                .map_err(|err| OcrLayerError::Font(format!("failed to parse font: {err}")))?;
            let name = face
                .names()
                .into_iter()
                .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
                .and_then(|name| name.to_string())
                .unwrap_or_else(|| "OcrLayerFont".to_string());
            (pdf_name(&name), face.units_per_em())
        };

        if units_per_em == 0 {
            return Err(OcrLayerError::Font("font reports zero units per em".into()));
        }

        // "OTTO" marks an OpenType font with CFF outlines.
        let cff = data.starts_with(b"OTTO");

        Ok(Self {
            data,
            postscript_name,
            units_per_em,
            cff,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// PostScript name, reduced to characters valid in a PDF name.
    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Whether outlines are CFF (embedded as FontFile3) rather than TrueType.
    pub fn is_cff(&self) -> bool {
        self.cff
    }

    /// Borrow a parsed view of the font. Parsing only reads table offsets.
    pub fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0)
            .map_err(|err| OcrLayerError::Font(format!("failed to parse font: {err}")))
    }
}

/// The font a composition pass draws with.
#[derive(Debug, Clone)]
pub enum ResolvedFont {
    Embedded(Arc<EmbeddedFont>),
    Fallback,
}

impl ResolvedFont {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    /// Reduce `text` to what this font can encode.
    ///
    /// A no-op for an embedded font. For the fallback, keeps printable ASCII
    /// and the Latin-1 supplement.
    pub fn sanitize(&self, text: &str) -> String {
        match self {
            Self::Embedded(_) => text.to_string(),
            Self::Fallback => sanitize_for_fallback(text),
        }
    }
}

/// Keep only characters in U+0020..=U+007E and U+00A0..=U+00FF.
pub fn sanitize_for_fallback(text: &str) -> String {
    text.chars()
        .filter(|ch| matches!(*ch as u32, 0x20..=0x7E | 0xA0..=0xFF))
        .collect()
}

fn pdf_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "OcrLayerFont".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A system TrueType font for tests that need real glyph data.
    pub(crate) fn system_font() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/Library/Fonts/Arial Unicode.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
    }

    #[test]
    fn fallback_sanitize_keeps_latin1() {
        assert_eq!(sanitize_for_fallback("Café déjà"), "Café déjà");
        assert_eq!(sanitize_for_fallback("tab\there"), "tabhere");
    }

    #[test]
    fn fallback_sanitize_strips_cjk() {
        assert_eq!(sanitize_for_fallback("日本語"), "");
        assert_eq!(sanitize_for_fallback("PDF 変換 OK"), "PDF  OK");
    }

    #[test]
    fn embedded_sanitize_is_passthrough() {
        let Some(bytes) = system_font() else {
            return;
        };
        let font = ResolvedFont::Embedded(Arc::new(EmbeddedFont::from_bytes(bytes).unwrap()));
        assert_eq!(font.sanitize("日本語"), "日本語");
        assert!(!font.is_fallback());
    }

    #[test]
    fn garbage_is_not_a_font() {
        let err = EmbeddedFont::from_bytes(b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, OcrLayerError::Font(_)));
    }

    #[test]
    fn truetype_font_metadata() {
        let Some(bytes) = system_font() else {
            return;
        };
        let font = EmbeddedFont::from_bytes(bytes).unwrap();
        assert!(!font.is_cff());
        assert!(font.units_per_em() > 0);
        assert!(!font.postscript_name().contains(' '));
    }

    #[test]
    fn pdf_name_strips_spaces() {
        assert_eq!(pdf_name("Noto Sans CJK"), "NotoSansCJK");
        assert_eq!(pdf_name("  "), "OcrLayerFont");
    }
}
