use serde::{Deserialize, Serialize};

/// Axis-aligned box in page pixel space, `y` growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[must_use]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }
}

fn default_page() -> u32 {
    1
}

/// A positioned piece of recognized text, as handed over by the OCR stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default = "default_page")]
    pub page: u32,
}

impl Fragment {
    #[must_use]
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence: None,
            page: 1,
        }
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Drops fragments whose OCR confidence is below `floor`. Fragments without a
/// confidence score are kept.
#[must_use]
pub fn retain_confident(fragments: Vec<Fragment>, floor: f32) -> Vec<Fragment> {
    fragments
        .into_iter()
        .filter(|fragment| fragment.confidence.is_none_or(|score| score >= floor))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl LineSegment {
    #[must_use]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn horizontal_position(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    #[must_use]
    pub fn vertical_position(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    #[must_use]
    pub fn bounds(&self) -> BBox {
        BBox::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    /// Clips the segment to `crop`, returning `None` if they do not overlap.
    #[must_use]
    pub fn clip_to(&self, crop: &BBox) -> Option<Self> {
        if !self.bounds().intersects(crop) {
            return None;
        }
        Some(Self {
            x0: self.x0.clamp(crop.x0, crop.x1),
            y0: self.y0.clamp(crop.y0, crop.y1),
            x1: self.x1.clamp(crop.x0, crop.x1),
            y1: self.y1.clamp(crop.y0, crop.y1),
        })
    }
}

/// Ruling lines detected on one page. Absence is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRuling {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub horizontal: Vec<LineSegment>,
    #[serde(default)]
    pub vertical: Vec<LineSegment>,
}

/// One numeric cell together with the header hierarchy qualifying it.
///
/// Header lists run from outermost to innermost. `value` keeps the source
/// decimal convention (e.g. `1589,10`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub value: String,
    pub page: u32,
    pub table_id: usize,
    pub row: usize,
    pub col: usize,
    pub bbox: BBox,
    pub row_headers: Vec<String>,
    pub column_headers: Vec<String>,
}
