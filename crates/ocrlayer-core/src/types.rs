// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the OCR text-layer pipeline.
//
// Two coordinate spaces appear here. OCR output lives in rasterized pixel
// space (origin top-left, y grows downward); text-layer items live in PDF
// point space (72 pt per inch, origin bottom-left, y grows upward).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
}

impl DocumentType {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Parse a MIME type string (parameters such as `; charset=` are ignored).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether this is a raster image format.
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// Axis-aligned rectangle in pixel space, origin top-left.
///
/// Well-formed boxes satisfy `x1 < x2` and `y1 < y2`; degenerate boxes are
/// still representable and handled downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Axis-aligned bounds of an arbitrary (possibly rotated) polygon, as
    /// emitted by line-level detectors that report four corner points.
    ///
    /// Returns `None` for an empty point list.
    pub fn from_points(points: &[[f64; 2]]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first[0], first[1], first[0], first[1]);
        for [x, y] in points.iter().skip(1).copied() {
            bbox.x1 = bbox.x1.min(x);
            bbox.y1 = bbox.y1.min(y);
            bbox.x2 = bbox.x2.max(x);
            bbox.y2 = bbox.y2.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// A single recognised token with its pixel-space box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f64,
}

/// OCR output for one rasterized page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPageResult {
    /// 1-based page number.
    pub page_number: u32,
    /// Words in the order the engine emitted them.
    pub items: Vec<OcrWord>,
    /// Overall page confidence in `[0, 1]`.
    pub confidence: f64,
    /// Height of the rasterized image in pixels.
    pub image_height: u32,
    /// Width of the rasterized image in pixels.
    pub image_width: Option<u32>,
}

/// One invisible text run, positioned in PDF point space.
///
/// `x`/`y` are the draw origin for the text operator: the left edge and the
/// lower visual edge of the recognised box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayerItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    /// Logical font identity. The concrete font is chosen at composition time.
    pub font_name: String,
    pub confidence: f64,
}

/// All text-layer items for one page, in OCR emission order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLayer {
    /// 1-based page number.
    pub page_number: u32,
    pub items: Vec<TextLayerItem>,
}

/// Authoritative page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PageGeometry {
    /// US Letter, used when a page declares no MediaBox anywhere in its tree.
    pub const LETTER: Self = Self {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    /// Pixel dimensions of this page when rendered at `dpi`.
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let scale = f64::from(dpi) / 72.0;
        let w = (self.width_pt * scale).round().max(1.0) as u32;
        let h = (self.height_pt * scale).round().max(1.0) as u32;
        (w, h)
    }
}

/// Lifecycle states of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// No job running; ready for a new one.
    Idle,
    /// Loading the document and reading page geometry.
    Loading,
    /// Rendering pages of the current batch to pixels.
    Rasterizing,
    /// Running OCR on the current batch.
    Recognizing,
    /// Converting OCR output into text layers.
    Synthesizing,
    /// Writing the text layers into the output document.
    Composing,
    /// Finished with output.
    Done,
    /// Cancelled; no output was produced.
    Aborted,
    /// Stopped by an unrecovered error.
    Failed,
}

impl JobState {
    /// Whether a job in this state is still in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Loading
                | Self::Rasterizing
                | Self::Recognizing
                | Self::Synthesizing
                | Self::Composing
        )
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Failed)
    }
}

/// Metadata stamped on each job for logs and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    pub started_at: DateTime<Utc>,
    pub page_count: u32,
}

impl JobInfo {
    pub fn new(page_count: u32) -> Self {
        Self {
            id: JobId::new(),
            started_at: Utc::now(),
            page_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_from_extension_and_mime() {
        assert_eq!(DocumentType::from_extension("JPG"), Some(DocumentType::Jpeg));
        assert_eq!(DocumentType::from_extension("tif"), Some(DocumentType::Tiff));
        assert_eq!(DocumentType::from_extension("docx"), None);
        assert_eq!(
            DocumentType::from_mime("application/pdf; version=1.7"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(DocumentType::from_mime("image/gif"), None);
        assert!(DocumentType::Png.is_image());
        assert!(!DocumentType::Pdf.is_image());
    }

    #[test]
    fn bbox_from_rotated_quad() {
        let quad = [[10.0, 5.0], [50.0, 8.0], [48.0, 30.0], [8.0, 27.0]];
        let bbox = BoundingBox::from_points(&quad).unwrap();
        assert_eq!(bbox, BoundingBox::new(8.0, 5.0, 50.0, 30.0));
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn page_pixel_size_at_300_dpi() {
        assert_eq!(PageGeometry::LETTER.pixel_size(300), (2550, 3300));
        assert_eq!(PageGeometry::new(595.0, 842.0).pixel_size(72), (595, 842));
    }

    #[test]
    fn job_state_classification() {
        assert!(JobState::Recognizing.is_active());
        assert!(!JobState::Idle.is_active());
        assert!(JobState::Aborted.is_terminal());
        assert!(!JobState::Composing.is_terminal());
    }
}
