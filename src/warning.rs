use std::fmt::{Display, Formatter};

/// Recoverable conditions collected while reconstructing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    /// A region produced fewer than two boundaries on one axis and was skipped.
    DegenerateAxis,
    /// A fragment center fell outside every band and was clamped to the nearest one.
    ClampedAssignment,
    /// A cell holds several numbers. Each numeric fragment is still its own
    /// record, but a fragment holding several numbers is not split.
    MultiNumberCell,
    /// A named header exception rewrote the headers of some values.
    ExceptionApplied,
    /// Some values came out with no header on one or both axes.
    UnresolvedHeader,
    LowConfidence,
    InferenceFallback,
    NoValuesDetected,
}

impl WarningCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DegenerateAxis => "degenerate_axis",
            Self::ClampedAssignment => "clamped_assignment",
            Self::MultiNumberCell => "multi_number_cell",
            Self::ExceptionApplied => "exception_applied",
            Self::UnresolvedHeader => "unresolved_header",
            Self::LowConfidence => "low_confidence",
            Self::InferenceFallback => "inference_fallback",
            Self::NoValuesDetected => "no_values_detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructWarning {
    pub code: WarningCode,
    pub message: String,
    pub page: Option<u32>,
    pub table_id: Option<usize>,
    pub cell: Option<(usize, usize)>,
    pub confidence: Option<f32>,
}

impl ReconstructWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            table_id: None,
            cell: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_table_id(mut self, table_id: usize) -> Self {
        self.table_id = Some(table_id);
        self
    }

    #[must_use]
    pub fn with_cell(mut self, row: usize, col: usize) -> Self {
        self.cell = Some((row, col));
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl Display for ReconstructWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(page) = self.page {
            write!(f, " page={page}")?;
        }
        if let Some(table_id) = self.table_id {
            write!(f, " table_id={table_id}")?;
        }
        if let Some((row, col)) = self.cell {
            write!(f, " cell=({row},{col})")?;
        }
        if let Some(confidence) = self.confidence {
            write!(f, " confidence={confidence:.2}")?;
        }
        write!(f, ": {}", self.message)
    }
}
