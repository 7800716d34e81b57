//! Named structural exceptions applied after general header resolution.
//!
//! Some tables carry anomalies the general walk gets wrong, such as a subtotal
//! row with no label of its own that would otherwise borrow the label above
//! it. Each exception is keyed on a structural predicate, never on one
//! document's literal cell text, and every hit is logged under its name.

use regex::Regex;
use tracing::debug;

use crate::grid::Grid;
use crate::model::BBox;
use crate::normalize::Normalizer;
use crate::resolve::HeaderPath;

/// The value cell an exception is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub grid: &'a Grid,
    pub normalizer: &'a Normalizer,
    pub row: usize,
    pub col: usize,
    pub value: &'a str,
    pub bbox: BBox,
}

impl CellContext<'_> {
    fn header_in_original(&self, row: usize, col: usize) -> bool {
        self.normalizer
            .qualifies_as_header(self.grid.text(row, col))
    }

    fn merged_header_reaches(&self, row: usize, col: usize) -> bool {
        self.grid.merged_cells().iter().any(|merged| {
            merged.covers(row, col) && self.header_in_original(merged.row, merged.col)
        })
    }
}

#[derive(Debug, Clone)]
pub enum CellPredicate {
    /// No header text left of the value in its own row of the original grid,
    /// and no merged header cell stretching over that part of the row.
    UnlabeledRow,
    /// Same as [`CellPredicate::UnlabeledRow`] for the part of the column above
    /// the value.
    UnlabeledColumn,
    /// The value sits in a horizontal strip of rows: its center `y` lies in
    /// `[min, max)`.
    RowBand { min: f64, max: f64 },
    /// The value sits in a vertical strip of columns: its center `x` lies in
    /// `[min, max)`.
    ColumnBand { min: f64, max: f64 },
    /// The canonical value matches the pattern.
    ValuePattern(Regex),
    AllOf(Vec<CellPredicate>),
}

impl CellPredicate {
    #[must_use]
    pub fn matches(&self, cell: &CellContext<'_>) -> bool {
        match self {
            Self::UnlabeledRow => (0..cell.col).all(|col| {
                !cell.header_in_original(cell.row, col)
                    && !cell.merged_header_reaches(cell.row, col)
            }),
            Self::UnlabeledColumn => (0..cell.row).all(|row| {
                !cell.header_in_original(row, cell.col)
                    && !cell.merged_header_reaches(row, cell.col)
            }),
            Self::RowBand { min, max } => {
                let (_, center_y) = cell.bbox.center();
                *min <= center_y && center_y < *max
            }
            Self::ColumnBand { min, max } => {
                let (center_x, _) = cell.bbox.center();
                *min <= center_x && center_x < *max
            }
            Self::ValuePattern(pattern) => pattern.is_match(cell.value),
            Self::AllOf(predicates) => predicates.iter().all(|predicate| predicate.matches(cell)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionAction {
    ClearRowHeaders,
    ClearColumnHeaders,
    ReplaceRowHeaders(Vec<String>),
    ReplaceColumnHeaders(Vec<String>),
}

impl ExceptionAction {
    fn apply(&self, headers: &mut HeaderPath) {
        match self {
            Self::ClearRowHeaders => headers.row_headers.clear(),
            Self::ClearColumnHeaders => headers.column_headers.clear(),
            Self::ReplaceRowHeaders(replacement) => headers.row_headers.clone_from(replacement),
            Self::ReplaceColumnHeaders(replacement) => {
                headers.column_headers.clone_from(replacement);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderException {
    pub name: String,
    pub when: CellPredicate,
    pub action: ExceptionAction,
}

impl HeaderException {
    #[must_use]
    pub fn new(name: impl Into<String>, when: CellPredicate, action: ExceptionAction) -> Self {
        Self {
            name: name.into(),
            when,
            action,
        }
    }

    /// Values on a row with no label of their own (subtotal lines and the like)
    /// get no row headers instead of the label propagated from above.
    #[must_use]
    pub fn unlabeled_rows() -> Self {
        Self::new(
            "unlabeled-row",
            CellPredicate::UnlabeledRow,
            ExceptionAction::ClearRowHeaders,
        )
    }
}

/// Applies every matching exception in table order. Returns the names of the
/// exceptions that fired.
pub fn apply_exceptions<'e>(
    exceptions: &'e [HeaderException],
    cell: &CellContext<'_>,
    headers: &mut HeaderPath,
) -> Vec<&'e str> {
    let mut fired = Vec::new();
    for exception in exceptions {
        if exception.when.matches(cell) {
            debug!(
                exception = %exception.name,
                row = cell.row,
                col = cell.col,
                value = %cell.value,
                "header exception applied"
            );
            exception.action.apply(headers);
            fired.push(exception.name.as_str());
        }
    }
    fired
}
