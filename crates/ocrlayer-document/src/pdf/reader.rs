// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: page count, page geometry and rasterization of scanned pages
// using the `lopdf` crate.
//
// Scanned documents carry each page as one large image XObject. Rasterizing
// such a page means decoding that image and resampling it to the page size at
// the requested DPI. Pages drawn with vector content are not rendered here;
// the `pdfium` feature provides a full renderer for those.
//
// All geometry is in the page's unrotated user space, the space that both
// the page image and the text layer are drawn in. `/Rotate` only affects how
// viewers display the page.

use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use ocrlayer_core::PageGeometry;
use ocrlayer_core::error::{OcrLayerError, Result};
use tracing::{debug, instrument};

/// Depth limit when walking the page tree or following references.
const MAX_DEPTH: usize = 16;

/// Largest accepted width or height of a page image, in samples.
const MAX_IMAGE_DIMENSION: u32 = 1 << 16;

/// Reads page structure and embedded page images from an existing PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| OcrLayerError::load(format!("failed to load PDF from memory: {err}")))?;

        let pages = document.get_pages().len();
        if pages == 0 {
            return Err(OcrLayerError::load("document has no pages"));
        }
        debug!(pages, "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&page_number)
            .copied()
            .ok_or(OcrLayerError::PageOutOfRange {
                page: page_number,
                page_count: self.page_count(),
            })
    }

    /// Size of a page (1-indexed) in points, in unrotated user space.
    ///
    /// Uses the MediaBox, inherited through the page tree when the page has
    /// none, defaulting to US Letter.
    pub fn page_geometry(&self, page_number: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page_number)?;

        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|object| self.rect(object));
        let geometry = match media_box {
            Some([x1, y1, x2, y2]) if (x2 - x1).abs() > 0.0 && (y2 - y1).abs() > 0.0 => {
                PageGeometry::new((x2 - x1).abs(), (y2 - y1).abs())
            }
            _ => PageGeometry::LETTER,
        };
        debug!(page_number, ?geometry, "Page geometry");
        Ok(geometry)
    }

    /// Clockwise display rotation of a page in degrees: 0, 90, 180 or 270.
    pub fn page_rotation(&self, page_number: u32) -> Result<u32> {
        let page_id = self.page_id(page_number)?;
        let degrees = self
            .inherited(page_id, b"Rotate")
            .and_then(number)
            .filter(|degrees| degrees.is_finite())
            .map(|degrees| ((degrees / 90.0).round() as i64 * 90).rem_euclid(360))
            .unwrap_or(0);
        Ok(degrees as u32)
    }

    // -- Rasterization --------------------------------------------------------

    /// Render a scanned page at `dpi` by decoding its largest embedded image.
    ///
    /// Fails with a `Load` error naming the page when the page has no
    /// decodable image.
    #[instrument(skip(self))]
    pub fn rasterize_page(&self, page_number: u32, dpi: u32) -> Result<DynamicImage> {
        let geometry = self.page_geometry(page_number)?;
        let page_id = self.page_id(page_number)?;

        let stream = self
            .largest_image(page_id)
            .ok_or_else(|| OcrLayerError::load_page(page_number, "page contains no image to OCR"))?;

        let decoded = decode_image_stream(&self.document, stream)
            .map_err(|message| OcrLayerError::load_page(page_number, message))?;

        let (width, height) = geometry.pixel_size(dpi);
        debug!(
            page_number,
            source_width = decoded.width(),
            source_height = decoded.height(),
            width,
            height,
            "Resampling page image"
        );

        if decoded.width() == width && decoded.height() == height {
            return Ok(decoded);
        }
        Ok(decoded.resize_exact(width, height, FilterType::Triangle))
    }

    // -- Helpers --------------------------------------------------------------

    fn resolve<'a>(&'a self, mut object: &'a Object) -> &'a Object {
        for _ in 0..MAX_DEPTH {
            match object {
                Object::Reference(id) => match self.document.get_object(*id) {
                    Ok(next) => object = next,
                    Err(_) => break,
                },
                _ => break,
            }
        }
        object
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(object).as_dict().ok()
    }

    /// A page attribute, walking up `/Parent` for inheritable keys.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.document.get_dictionary(page_id).ok();
        for _ in 0..MAX_DEPTH {
            let dict = current?;
            if let Ok(value) = dict.get(key) {
                return Some(self.resolve(value));
            }
            current = dict
                .get(b"Parent")
                .ok()
                .and_then(|parent| parent.as_reference().ok())
                .and_then(|id| self.document.get_dictionary(id).ok());
        }
        None
    }

    fn rect(&self, object: &Object) -> Option<[f64; 4]> {
        let array = self.resolve(object).as_array().ok()?;
        if array.len() != 4 {
            return None;
        }
        let mut out = [0.0; 4];
        for (slot, value) in out.iter_mut().zip(array) {
            *slot = number(self.resolve(value))?;
        }
        Some(out)
    }

    /// The image XObject with the most pixels on this page, including images
    /// nested one level inside form XObjects.
    fn largest_image(&self, page_id: ObjectId) -> Option<&Stream> {
        let resources = self
            .inherited(page_id, b"Resources")
            .and_then(|object| self.resolve_dict(object))?;

        let mut candidates = Vec::new();
        for stream in self.xobject_streams(resources) {
            if has_subtype(stream, b"Image") {
                candidates.push(stream);
            } else if has_subtype(stream, b"Form") {
                if let Some(inner) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|object| self.resolve_dict(object))
                {
                    candidates.extend(
                        self.xobject_streams(inner)
                            .into_iter()
                            .filter(|nested| has_subtype(nested, b"Image")),
                    );
                }
            }
        }

        candidates.into_iter().max_by_key(|stream| image_pixels(stream))
    }

    fn xobject_streams<'a>(&'a self, resources: &'a Dictionary) -> Vec<&'a Stream> {
        resources
            .get(b"XObject")
            .ok()
            .and_then(|object| self.resolve_dict(object))
            .map(|xobjects| {
                xobjects
                    .iter()
                    .filter_map(|(_, value)| self.resolve(value).as_stream().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn has_subtype(stream: &Stream, expected: &[u8]) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|object| object.as_name().ok())
        .is_some_and(|name| name == expected)
}

fn image_pixels(stream: &Stream) -> u64 {
    let dim = |key: &[u8]| {
        stream
            .dict
            .get(key)
            .ok()
            .and_then(number)
            .map(|value| value.max(0.0) as u64)
            .unwrap_or(0)
    };
    dim(b"Width").saturating_mul(dim(b"Height"))
}

/// Filter names of a stream; `/Filter` may be a name or an array.
fn filters(doc: &Document, stream: &Stream) -> Vec<Vec<u8>> {
    let Ok(filter) = stream.dict.get(b"Filter") else {
        return Vec::new();
    };
    let filter = match filter {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(filter),
        other => other,
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components from `/ColorSpace`.
fn components(doc: &Document, stream: &Stream) -> Option<u32> {
    let mut object = stream.dict.get(b"ColorSpace").ok()?;
    for _ in 0..MAX_DEPTH {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            _ => break,
        }
    }
    let name = match object {
        Object::Name(name) => name.as_slice(),
        // [/ICCBased stream] and friends: read /N from the profile.
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            if family == b"ICCBased" {
                let profile = match items.get(1)? {
                    Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok()?,
                    _ => return None,
                };
                return profile
                    .dict
                    .get(b"N")
                    .ok()
                    .and_then(number)
                    .map(|n| n as u32);
            }
            family
        }
        _ => return None,
    };
    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> std::result::Result<DynamicImage, String> {
    let filters = filters(doc, stream);

    if filters.iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .map_err(|err| format!("failed to decode JPEG page image: {err}"));
    }
    if let Some(other) = filters
        .iter()
        .find(|f| f.as_slice() != b"FlateDecode")
    {
        return Err(format!(
            "unsupported image filter /{}",
            String::from_utf8_lossy(other)
        ));
    }

    let width = image_dimension(stream, b"Width")?;
    let height = image_dimension(stream, b"Height")?;

    // Stencil masks are 1-bit with no colour space; 0 paints black.
    let image_mask = stream
        .dict
        .get(b"ImageMask")
        .ok()
        .and_then(|object| object.as_bool().ok())
        .unwrap_or(false);
    let bits = if image_mask {
        1
    } else {
        stream
            .dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(number)
            .unwrap_or(8.0) as u32
    };
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("unsupported image depth of {bits} bits per component"));
    }
    let channels = if image_mask {
        1
    } else {
        components(doc, stream).ok_or_else(|| "unsupported image colour space".to_string())?
    };

    let too_large = || "page image dimensions are too large".to_string();
    let row_samples = (width as usize)
        .checked_mul(channels as usize)
        .ok_or_else(too_large)?;
    let row_bytes = row_samples
        .checked_mul(bits as usize)
        .map(|row_bits| row_bits.div_ceil(8))
        .ok_or_else(too_large)?;
    let expected = row_bytes.checked_mul(height as usize).ok_or_else(too_large)?;

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|err| format!("failed to inflate page image: {err}"))?
    };
    if samples.len() < expected {
        return Err(format!(
            "page image is truncated ({} of {} bytes)",
            samples.len(),
            expected
        ));
    }
    let samples = unpack_samples(
        &samples[..expected],
        row_bytes,
        row_samples,
        bits,
        decode_inverted(stream),
    );

    let image = match channels {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|px| {
                    let k = 255 - u32::from(px[3]);
                    let channel = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
                    [channel(px[0]), channel(px[1]), channel(px[2])]
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        other => return Err(format!("unsupported image with {other} colour components")),
    };
    image.ok_or_else(|| "page image dimensions do not match its data".to_string())
}

/// Expand packed rows of `bits`-wide samples to one byte per sample. Rows are
/// padded to a byte boundary; 16-bit samples keep their high byte.
fn unpack_samples(data: &[u8], row_bytes: usize, row_samples: usize, bits: u32, invert: bool) -> Vec<u8> {
    if bits == 8 && !invert {
        return data.to_vec();
    }
    let max = (1u32 << bits.min(8)) - 1;
    let bits = bits as usize;
    let mut out = Vec::with_capacity(row_samples * (data.len() / row_bytes.max(1)));
    for row in data.chunks_exact(row_bytes) {
        for index in 0..row_samples {
            let value = match bits {
                8 => u32::from(row[index]),
                16 => u32::from(row[index * 2]),
                _ => {
                    let bit = index * bits;
                    let shift = 8 - bits - bit % 8;
                    (u32::from(row[bit / 8]) >> shift) & max
                }
            };
            let level = (value * 255 / max) as u8;
            out.push(if invert { 255 - level } else { level });
        }
    }
    out
}

/// A `/Decode` array starting `[1 0]` maps samples to the inverse range.
fn decode_inverted(stream: &Stream) -> bool {
    let Some(decode) = stream
        .dict
        .get(b"Decode")
        .ok()
        .and_then(|object| object.as_array().ok())
    else {
        return false;
    };
    matches!(
        (decode.first().and_then(number), decode.get(1).and_then(number)),
        (Some(low), Some(high)) if low > high
    )
}

fn image_dimension(stream: &Stream, key: &[u8]) -> std::result::Result<u32, String> {
    let value = stream
        .dict
        .get(key)
        .ok()
        .and_then(number)
        .filter(|value| *value >= 1.0)
        .ok_or_else(|| format!("page image has no valid /{}", String::from_utf8_lossy(key)))?;
    if value > f64::from(MAX_IMAGE_DIMENSION) {
        return Err("page image dimensions are too large".to_string());
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::image_to_pdf;
    use image::{ImageFormat, Rgb};
    use lopdf::dictionary;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn gray_image(width: u32, height: u32) -> Stream {
        let mut pixels = vec![255u8; (width * height) as usize];
        pixels[0] = 0;
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        )
    }

    /// One page with a raw 40x20 DeviceGray image.
    fn gray_page_pdf(media_box: Option<[i64; 4]>, rotate: Option<i64>) -> Vec<u8> {
        page_pdf(media_box, rotate, gray_image(40, 20))
    }

    /// One page drawing `image`, with the given inherited MediaBox and rotation.
    fn page_pdf(media_box: Option<[i64; 4]>, rotate: Option<i64>, image: Stream) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(image);
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"q 612 0 0 792 0 0 cm /Im0 Do Q".to_vec(),
        ));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
        };
        if let Some(rotate) = rotate {
            page.set("Rotate", rotate);
        }
        let page_id = doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        };
        if let Some(mb) = media_box {
            pages.set(
                "MediaBox",
                Object::Array(mb.iter().map(|v| Object::Integer(*v)).collect()),
            );
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn inherited_media_box() {
        let reader = PdfReader::from_bytes(&gray_page_pdf(Some([0, 0, 595, 842]), None)).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.page_geometry(1).unwrap(), PageGeometry::new(595.0, 842.0));
    }

    #[test]
    fn missing_media_box_defaults_to_letter() {
        let reader = PdfReader::from_bytes(&gray_page_pdf(None, None)).unwrap();
        assert_eq!(reader.page_geometry(1).unwrap(), PageGeometry::LETTER);
    }

    #[test]
    fn rotated_page_keeps_unrotated_frame() {
        // Portrait scan on a portrait MediaBox, displayed in landscape.
        let pdf = page_pdf(Some([0, 0, 612, 792]), Some(90), gray_image(51, 66));
        let reader = PdfReader::from_bytes(&pdf).unwrap();

        let geometry = reader.page_geometry(1).unwrap();
        assert_eq!(geometry, PageGeometry::new(612.0, 792.0));
        assert_eq!(reader.page_rotation(1).unwrap(), 90);

        let raster = reader.rasterize_page(1, 72).unwrap();
        assert_eq!((raster.width(), raster.height()), (612, 792));

        // A word at the right edge of the raster stays inside the MediaBox.
        let word = ocrlayer_core::BoundingBox::new(560.0, 100.0, 611.0, 120.0);
        let mapped = crate::geometry::map_box_to_pdf(
            &word,
            f64::from(raster.height()),
            geometry.height_pt,
            Some(f64::from(raster.width())),
            Some(geometry.width_pt),
        );
        assert!(mapped.x + mapped.width <= 612.0, "{mapped:?}");
    }

    #[test]
    fn rotation_is_normalized() {
        let reader = PdfReader::from_bytes(&gray_page_pdf(None, Some(-90))).unwrap();
        assert_eq!(reader.page_rotation(1).unwrap(), 270);
        let reader = PdfReader::from_bytes(&gray_page_pdf(None, None)).unwrap();
        assert_eq!(reader.page_rotation(1).unwrap(), 0);
    }

    #[test]
    fn page_out_of_range() {
        let reader = PdfReader::from_bytes(&gray_page_pdf(None, None)).unwrap();
        assert!(matches!(
            reader.page_geometry(2),
            Err(OcrLayerError::PageOutOfRange { page: 2, .. })
        ));
    }

    #[test]
    fn rasterizes_raw_gray_image_to_dpi() {
        let reader = PdfReader::from_bytes(&gray_page_pdf(Some([0, 0, 144, 72]), None)).unwrap();
        let image = reader.rasterize_page(1, 150).unwrap();
        assert_eq!((image.width(), image.height()), (300, 150));
    }

    #[test]
    fn rasterizes_image_from_image_to_pdf() {
        let mut source = RgbImage::from_pixel(120, 60, Rgb([255, 255, 255]));
        source.put_pixel(5, 5, Rgb([0, 0, 0]));
        let pdf = image_to_pdf(&png_bytes(&DynamicImage::ImageRgb8(source)), "image/png").unwrap();

        let reader = PdfReader::from_bytes(&pdf).unwrap();
        let geometry = reader.page_geometry(1).unwrap();
        assert!((geometry.width_pt - 120.0).abs() < 0.5, "{geometry:?}");
        assert!((geometry.height_pt - 60.0).abs() < 0.5, "{geometry:?}");

        let image = reader.rasterize_page(1, 144).unwrap();
        assert_eq!((image.width(), image.height()), (240, 120));
    }

    #[test]
    fn page_without_image_is_a_load_error_with_page() {
        let pdf = crate::pdf::compose::tests::sample_pdf(2);
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        let err = reader.rasterize_page(2, 72).unwrap_err();
        assert_eq!(err.page(), Some(2));
        assert_eq!(err.kind(), ocrlayer_core::ErrorKind::Load);
    }

    #[test]
    fn garbage_is_a_load_error() {
        assert!(matches!(
            PdfReader::from_bytes(b"%PDF-nonsense"),
            Err(OcrLayerError::Load { .. })
        ));
    }

    #[test]
    fn cmyk_samples_convert_to_rgb() {
        let mut doc = Document::with_version("1.5");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![0, 0, 0, 255],
        );
        let id = doc.add_object(stream);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let image = decode_image_stream(&doc, stream).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    }

    fn decode(dict: Dictionary, content: Vec<u8>) -> std::result::Result<DynamicImage, String> {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(dict, content));
        let stream = doc.get_object(id).unwrap().as_stream().unwrap().clone();
        decode_image_stream(&doc, &stream)
    }

    #[test]
    fn absurd_image_dimensions_are_a_load_error() {
        let mut image = gray_image(40, 20);
        image.dict.set("Width", Object::Integer(1 << 40));
        image.dict.set("Height", Object::Integer(1 << 40));
        assert_eq!(image_pixels(&image), u64::MAX);

        let reader = PdfReader::from_bytes(&page_pdf(None, None, image)).unwrap();
        let err = reader.rasterize_page(1, 72).unwrap_err();
        assert_eq!(err.kind(), ocrlayer_core::ErrorKind::Load);
        assert_eq!(err.page(), Some(1));
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn one_bit_gray_rows_are_byte_padded() {
        let image = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            vec![0b0111_1111, 0b1100_0000, 0xFF, 0xC0],
        )
        .unwrap()
        .to_luma8();

        assert_eq!((image.width(), image.height()), (10, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [255]);
        assert_eq!(image.get_pixel(9, 0).0, [255]);
        assert_eq!(image.get_pixel(0, 1).0, [255]);
    }

    #[test]
    fn inverted_stencil_mask_paints_set_bits_black() {
        let image = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 1,
                "ImageMask" => true,
                "Decode" => vec![Object::Integer(1), Object::Integer(0)],
            },
            vec![0b1000_0000],
        )
        .unwrap()
        .to_luma8();

        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [255]);
    }

    #[test]
    fn four_bit_samples_scale_to_full_range() {
        let image = decode(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 4,
            },
            vec![0xF0],
        )
        .unwrap()
        .to_luma8();

        assert_eq!(image.get_pixel(0, 0).0, [255]);
        assert_eq!(image.get_pixel(1, 0).0, [0]);
    }
}
