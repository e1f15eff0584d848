// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compositor: merges invisible text layers into an existing document.
//
// Each text run is drawn with fill opacity 0 through an ExtGState, so the
// page renders exactly as before while its text becomes searchable and
// selectable. Existing page content is bracketed in q/Q so any graphics
// state it leaves behind cannot displace the overlay.

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use ocrlayer_core::error::{OcrLayerError, Result};
use ocrlayer_core::{TextLayer, TextLayerItem};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use ttf_parser::{Face, GlyphId};

use crate::font::{EmbeddedFont, FALLBACK_FONT_NAME, FontResolver, ResolvedFont};

/// Depth limit when following references and the page tree.
const MAX_DEPTH: usize = 16;

/// Resource name prefixes for the objects this module adds.
const FONT_RESOURCE: &str = "OcrLayerF";
const GSTATE_RESOURCE: &str = "OcrLayerGS";

/// Counters for one composition pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionStats {
    pub total_items: usize,
    pub added_items: usize,
    pub skipped_items: usize,
}

/// Output of a composition pass.
#[derive(Debug, Clone)]
pub struct Composition {
    pub pdf_bytes: Vec<u8>,
    pub stats: CompositionStats,
    /// Whether the fallback font was used.
    pub used_fallback_font: bool,
}

/// Merges text layers into PDFs, sharing one font resolver across passes.
pub struct Compositor {
    resolver: Arc<FontResolver>,
}

impl Compositor {
    pub fn new(resolver: Arc<FontResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<FontResolver> {
        &self.resolver
    }

    /// Resolve the font once, then merge every layer into `original`.
    ///
    /// The font is only resolved when some item has drawable text.
    #[instrument(skip_all, fields(bytes_len = original.len(), layers = layers.len()))]
    pub async fn compose(&self, original: &[u8], layers: &[TextLayer]) -> Result<Composition> {
        let has_text = layers
            .iter()
            .flat_map(|layer| &layer.items)
            .any(|item| !item.text.trim().is_empty());

        let font = if has_text {
            self.resolver.resolve().await
        } else {
            ResolvedFont::Fallback
        };

        let original = original.to_vec();
        let layers = layers.to_vec();
        tokio::task::spawn_blocking(move || compose_with_font(&original, &layers, &font))
            .await
            .map_err(|err| OcrLayerError::Composition(format!("composition task failed: {err}")))?
    }
}

/// Merge `layers` into `original` using an already-resolved font.
///
/// A page number outside the document fails the whole pass before anything is
/// modified. A single item that cannot be drawn is counted as skipped. When no
/// item is drawn the original bytes are returned untouched.
pub fn compose_with_font(
    original: &[u8],
    layers: &[TextLayer],
    font: &ResolvedFont,
) -> Result<Composition> {
    let mut doc = Document::load_mem(original)
        .map_err(|err| OcrLayerError::load(format!("failed to load PDF for composition: {err}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    for layer in layers {
        if layer.page_number == 0 || layer.page_number > page_count {
            return Err(OcrLayerError::PageOutOfRange {
                page: layer.page_number,
                page_count,
            });
        }
    }

    let embedded = match font {
        ResolvedFont::Embedded(embedded) => match embedded.face() {
            Ok(_) => Some(Arc::clone(embedded)),
            Err(err) => {
                warn!(%err, "Embedded font unusable at draw time; using fallback");
                None
            }
        },
        ResolvedFont::Fallback => None,
    };
    let effective_font = match &embedded {
        Some(font) => ResolvedFont::Embedded(Arc::clone(font)),
        None => ResolvedFont::Fallback,
    };

    let mut encoder = match &embedded {
        Some(font) => TextEncoder::Embedded(GlyphEncoder::new(font)?),
        None => TextEncoder::Fallback,
    };

    let mut stats = CompositionStats::default();
    let mut draws: BTreeMap<u32, Vec<Operation>> = BTreeMap::new();

    for layer in layers {
        for item in &layer.items {
            stats.total_items += 1;

            if item.text.trim().is_empty() {
                stats.skipped_items += 1;
                continue;
            }
            let text = effective_font.sanitize(&item.text);
            if text.trim().is_empty() {
                debug!(page = layer.page_number, "Item emptied by sanitization");
                stats.skipped_items += 1;
                continue;
            }

            match text_run(item, &text, &mut encoder) {
                Ok(ops) => {
                    draws.entry(layer.page_number).or_default().extend(ops);
                    stats.added_items += 1;
                }
                Err(reason) => {
                    warn!(page = layer.page_number, %reason, "Skipping text-layer item");
                    stats.skipped_items += 1;
                }
            }
        }
    }

    if stats.added_items == 0 {
        info!(
            total = stats.total_items,
            skipped = stats.skipped_items,
            "No text-layer items drawn; document unchanged"
        );
        return Ok(Composition {
            pdf_bytes: original.to_vec(),
            stats,
            used_fallback_font: effective_font.is_fallback(),
        });
    }

    let font_id = match encoder {
        TextEncoder::Embedded(glyphs) => add_type0_font(&mut doc, &glyphs)?,
        TextEncoder::Fallback => add_fallback_font(&mut doc),
    };
    let gstate_id = doc.add_object(lopdf::dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(0.0),
        "CA" => Object::Real(0.0),
    });

    for (page_number, ops) in draws {
        let page_id = *pages.get(&page_number).ok_or(OcrLayerError::PageOutOfRange {
            page: page_number,
            page_count,
        })?;
        let (font_name, gs_name) = install_resources(&mut doc, page_id, font_id, gstate_id)?;
        append_overlay(&mut doc, page_id, &font_name, &gs_name, ops)?;
    }

    let mut pdf_bytes = Vec::new();
    doc.save_to(&mut pdf_bytes)
        .map_err(|err| OcrLayerError::Composition(format!("failed to serialise PDF: {err}")))?;

    info!(
        total = stats.total_items,
        added = stats.added_items,
        skipped = stats.skipped_items,
        fallback_font = effective_font.is_fallback(),
        output_bytes = pdf_bytes.len(),
        "Text layer composed"
    );

    Ok(Composition {
        pdf_bytes,
        stats,
        used_fallback_font: effective_font.is_fallback(),
    })
}

// -- Text runs ----------------------------------------------------------------

/// Operations for one invisible run. The font operand is patched per page in
/// [`append_overlay`], since the resource name depends on the page.
fn text_run(
    item: &TextLayerItem,
    text: &str,
    encoder: &mut TextEncoder<'_>,
) -> std::result::Result<Vec<Operation>, String> {
    if !item.x.is_finite() || !item.y.is_finite() {
        return Err(format!("non-finite position ({}, {})", item.x, item.y));
    }
    if !item.font_size.is_finite() || item.font_size <= 0.0 {
        return Err(format!("invalid font size {}", item.font_size));
    }

    let encoded = encoder
        .encode(text)
        .ok_or_else(|| format!("no glyphs for {text:?}"))?;

    Ok(vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(item.font_size as f32),
            ],
        ),
        Operation::new(
            "Td",
            vec![Object::Real(item.x as f32), Object::Real(item.y as f32)],
        ),
        Operation::new("Tj", vec![encoded]),
        Operation::new("ET", vec![]),
    ])
}

enum TextEncoder<'a> {
    Fallback,
    Embedded(GlyphEncoder<'a>),
}

impl TextEncoder<'_> {
    fn encode(&mut self, text: &str) -> Option<Object> {
        match self {
            // Sanitized text is within Latin-1, which WinAnsi matches for
            // every character kept.
            Self::Fallback => {
                let bytes: Vec<u8> = text
                    .chars()
                    .filter_map(|ch| u8::try_from(ch as u32).ok())
                    .collect();
                (!bytes.is_empty()).then(|| Object::String(bytes, StringFormat::Literal))
            }
            Self::Embedded(glyphs) => glyphs.encode(text),
        }
    }
}

/// Maps characters to two-byte character codes for an Identity-H font and
/// records which codes were used.
struct GlyphEncoder<'a> {
    font: &'a EmbeddedFont,
    face: Face<'a>,
    /// code -> (unicode text, advance in glyph units)
    used: BTreeMap<u16, (String, u16)>,
}

impl<'a> GlyphEncoder<'a> {
    fn new(font: &'a EmbeddedFont) -> Result<Self> {
        Ok(Self {
            font,
            face: font.face()?,
            used: BTreeMap::new(),
        })
    }

    /// Code for a glyph: the glyph id for TrueType outlines, the CID for
    /// CID-keyed CFF outlines.
    fn code(&self, gid: GlyphId) -> u16 {
        if self.font.is_cff() {
            self.face
                .tables()
                .cff
                .as_ref()
                .and_then(|cff| cff.glyph_cid(gid))
                .unwrap_or(gid.0)
        } else {
            gid.0
        }
    }

    /// Characters without a glyph are dropped. `None` if nothing remains.
    fn encode(&mut self, text: &str) -> Option<Object> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let Some(gid) = self.face.glyph_index(ch) else {
                continue;
            };
            let code = self.code(gid);
            let advance = self.face.glyph_hor_advance(gid).unwrap_or(0);
            self.used
                .entry(code)
                .or_insert_with(|| (ch.to_string(), advance));
            bytes.extend_from_slice(&code.to_be_bytes());
        }
        (!bytes.is_empty()).then(|| Object::String(bytes, StringFormat::Hexadecimal))
    }
}

// -- Font objects ---------------------------------------------------------------

fn add_fallback_font(doc: &mut Document) -> ObjectId {
    doc.add_object(lopdf::dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => FALLBACK_FONT_NAME,
        "Encoding" => "WinAnsiEncoding",
    })
}

fn pdf_units(value: f64, units_per_em: u16) -> i64 {
    (value * 1000.0 / f64::from(units_per_em)).round() as i64
}

/// Embed the font as a Type0 composite font with Identity-H encoding, a /W
/// array for the used codes and a ToUnicode CMap so extracted text round-trips.
fn add_type0_font(doc: &mut Document, glyphs: &GlyphEncoder<'_>) -> Result<ObjectId> {
    let font = glyphs.font;
    let face = &glyphs.face;
    let upem = font.units_per_em();
    let name = font.postscript_name();

    let font_file_id = if font.is_cff() {
        doc.add_object(Stream::new(
            lopdf::dictionary! { "Subtype" => "OpenType" },
            font.data().to_vec(),
        ))
    } else {
        doc.add_object(Stream::new(
            lopdf::dictionary! { "Length1" => font.data().len() as i64 },
            font.data().to_vec(),
        ))
    };

    let bbox = face.global_bounding_box();
    let ascent = pdf_units(f64::from(face.ascender()), upem);
    let descent = pdf_units(f64::from(face.descender()), upem);
    let cap_height = face
        .capital_height()
        .map(|h| pdf_units(f64::from(h), upem))
        .unwrap_or(ascent);

    let mut descriptor = lopdf::dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(name.as_bytes().to_vec()),
        "Flags" => 32,
        "FontBBox" => Object::Array(vec![
            Object::Integer(pdf_units(f64::from(bbox.x_min), upem)),
            Object::Integer(pdf_units(f64::from(bbox.y_min), upem)),
            Object::Integer(pdf_units(f64::from(bbox.x_max), upem)),
            Object::Integer(pdf_units(f64::from(bbox.y_max), upem)),
        ]),
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => cap_height,
        "StemV" => 80,
    };
    let file_key = if font.is_cff() { "FontFile3" } else { "FontFile2" };
    descriptor.set(file_key, Object::Reference(font_file_id));
    let descriptor_id = doc.add_object(descriptor);

    let mut widths = Vec::with_capacity(glyphs.used.len() * 2);
    for (code, (_, advance)) in &glyphs.used {
        widths.push(Object::Integer(i64::from(*code)));
        widths.push(Object::Array(vec![Object::Integer(pdf_units(
            f64::from(*advance),
            upem,
        ))]));
    }

    let mut cid_font = lopdf::dictionary! {
        "Type" => "Font",
        "Subtype" => if font.is_cff() { "CIDFontType0" } else { "CIDFontType2" },
        "BaseFont" => Object::Name(name.as_bytes().to_vec()),
        "CIDSystemInfo" => lopdf::dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => Object::Reference(descriptor_id),
        "DW" => 1000,
        "W" => widths,
    };
    if !font.is_cff() {
        cid_font.set("CIDToGIDMap", "Identity");
    }
    let cid_font_id = doc.add_object(cid_font);

    let cmap = to_unicode_cmap(&glyphs.used);
    let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

    Ok(doc.add_object(lopdf::dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(name.as_bytes().to_vec()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => Object::Reference(to_unicode_id),
    }))
}

fn to_unicode_cmap(used: &BTreeMap<u16, (String, u16)>) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<_> = used.iter().collect();
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (code, (text, _)) in chunk {
            let utf16: String = text
                .encode_utf16()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            out.push_str(&format!("<{code:04X}> <{utf16}>\n"));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out
}

// -- Page plumbing --------------------------------------------------------------

fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> &'a Object {
    for _ in 0..MAX_DEPTH {
        match object {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => object = next,
                Err(_) => break,
            },
            _ => break,
        }
    }
    object
}

/// The page's resource dictionary, following references and inheritance.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_DEPTH {
        let Some(dict) = current else {
            break;
        };
        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok(resources) = resolve(doc, resources).as_dict() {
                return resources.clone();
            }
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }
    Dictionary::new()
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

fn unused_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

/// Give the page its own inline resource dictionary holding the overlay font
/// and graphics state. Returns the names they were registered under.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> Result<(String, String)> {
    let mut resources = effective_resources(doc, page_id);
    let mut fonts = sub_dictionary(doc, &resources, b"Font");
    let mut gstates = sub_dictionary(doc, &resources, b"ExtGState");

    let font_name = unused_name(&fonts, FONT_RESOURCE);
    let gs_name = unused_name(&gstates, GSTATE_RESOURCE);
    fonts.set(font_name.as_bytes().to_vec(), Object::Reference(font_id));
    gstates.set(gs_name.as_bytes().to_vec(), Object::Reference(gstate_id));
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| OcrLayerError::Composition(format!("page object unavailable: {err}")))?;
    page.set("Resources", Object::Dictionary(resources));

    Ok((font_name, gs_name))
}

fn append_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    font_name: &str,
    gs_name: &str,
    runs: Vec<Operation>,
) -> Result<()> {
    let mut operations = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name.as_bytes().to_vec())]),
        Operation::new("g", vec![Object::Integer(0)]),
    ];
    for mut op in runs {
        if op.operator == "Tf" {
            if let Some(first) = op.operands.first_mut() {
                *first = Object::Name(font_name.as_bytes().to_vec());
            }
        }
        operations.push(op);
    }
    operations.push(Operation::new("Q", vec![]));

    let encoded = Content { operations }
        .encode()
        .map_err(|err| OcrLayerError::Composition(format!("failed to encode overlay: {err}")))?;

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let existing = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
        .cloned();
    let mut contents = vec![Object::Reference(open_id)];
    match existing {
        Some(Object::Array(items)) => contents.extend(items),
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
            _ => contents.push(Object::Reference(id)),
        },
        Some(other) => {
            // An inline stream is not valid here, but keep whatever was present.
            let id = doc.add_object(other);
            contents.push(Object::Reference(id));
        }
        None => {}
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| OcrLayerError::Composition(format!("page object unavailable: {err}")))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
