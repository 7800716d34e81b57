use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::error::ReconstructError;
use crate::exceptions::HeaderException;
use crate::model::BBox;

pub const DEFAULT_ROW_TOLERANCE: f64 = 4.0;
pub const DEFAULT_COLUMN_TOLERANCE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    BestEffort,
    Strict,
    SkipAmbiguous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// Rectangle on one page holding a single table. Fragments are assigned to
/// the first region that contains their bbox center.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub page: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl TableRegion {
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    #[must_use]
    pub fn bounds(&self) -> BBox {
        BBox::new(self.x1, self.y1, self.x2, self.y2)
    }
}

impl FromStr for TableRegion {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (page_part, rect_part) = input
            .split_once(':')
            .ok_or_else(|| format!("invalid region format '{input}', expected page:x1,y1,x2,y2"))?;

        let page: u32 = page_part
            .trim()
            .parse()
            .map_err(|_| format!("invalid page number in region: '{page_part}'"))?;
        if page == 0 {
            return Err("region page number must be >= 1".to_string());
        }

        let coordinates = rect_part
            .split(',')
            .map(str::trim)
            .map(|part| {
                part.parse::<f64>()
                    .map_err(|_| format!("invalid region coordinate: '{part}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let &[x1, y1, x2, y2] = coordinates.as_slice() else {
            return Err(format!(
                "invalid region format '{input}', expected exactly 4 coordinates"
            ));
        };

        if x2 <= x1 || y2 <= y1 {
            return Err("region requires x2>x1 and y2>y1".to_string());
        }

        Ok(Self {
            page,
            x1,
            y1,
            x2,
            y2,
        })
    }
}

/// Known OCR miscues mapped to their canonical spelling, e.g. `Colt` → `Col1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    entries: BTreeMap<String, String>,
}

impl ReplacementTable {
    #[must_use]
    pub fn with_entry(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.insert(from.into(), to.into());
        self
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for ReplacementTable {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        for pair in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (from, to) = pair
                .split_once('=')
                .ok_or_else(|| format!("invalid replacement '{pair}', expected FROM=TO"))?;
            let from = from.trim();
            if from.is_empty() {
                return Err(format!("invalid replacement '{pair}': FROM is empty"));
            }
            entries.insert(from.to_string(), to.trim().to_string());
        }
        Ok(Self { entries })
    }
}

#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    pub row_tolerance: f64,
    pub column_tolerance: f64,
    pub pages: Option<PageSelection>,
    pub regions: Vec<TableRegion>,
    pub replacements: ReplacementTable,
    pub extra_noise_tokens: Vec<String>,
    pub exceptions: Vec<HeaderException>,
    pub quality_mode: QualityMode,
    pub parallel: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            column_tolerance: DEFAULT_COLUMN_TOLERANCE,
            pages: None,
            regions: Vec::new(),
            replacements: ReplacementTable::default(),
            extra_noise_tokens: Vec::new(),
            exceptions: Vec::new(),
            quality_mode: QualityMode::BestEffort,
            parallel: true,
        }
    }
}

impl ReconstructOptions {
    pub(crate) fn validate(&self) -> Result<(), ReconstructError> {
        for (name, value) in [
            ("row_tolerance", self.row_tolerance),
            ("column_tolerance", self.column_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReconstructError::InvalidOption(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
