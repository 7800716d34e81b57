use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::exceptions::{CellContext, HeaderException, apply_exceptions};
use crate::grid::Grid;
use crate::model::{BBox, ValueRecord};
use crate::normalize::{Normalizer, is_numeric_content};
use crate::propagate::PropagatedGrid;
use crate::resolve::resolve_headers;
use crate::warning::{ReconstructWarning, WarningCode};

pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Records and diagnostics of one table region.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTable {
    pub page: u32,
    pub table_id: usize,
    pub records: Vec<ValueRecord>,
    pub confidence: f32,
    pub warnings: Vec<ReconstructWarning>,
}

impl AssembledTable {
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        !self.records.is_empty() && self.confidence < LOW_CONFIDENCE_THRESHOLD
    }
}

/// Share of values qualified by a column header, weighted 0.75, plus the share
/// qualified by a row header, weighted 0.25.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn region_confidence(records: &[ValueRecord]) -> f32 {
    if records.is_empty() {
        return 0.0;
    }

    let total = records.len() as f32;
    let with_column = records
        .iter()
        .filter(|record| !record.column_headers.is_empty())
        .count() as f32
        / total;
    let with_row = records
        .iter()
        .filter(|record| !record.row_headers.is_empty())
        .count() as f32
        / total;

    (with_column * 0.75 + with_row * 0.25).clamp(0.0, 1.0)
}

/// One value per numeric fragment of the cell, with that fragment's bbox. A
/// fragment holding several numbers stays a single value.
fn cell_values(grid: &Grid, row: usize, col: usize) -> Vec<(String, BBox)> {
    grid.cell(row, col)
        .map(|cell| {
            cell.pieces()
                .iter()
                .filter(|piece| piece.kind.is_value())
                .map(|piece| (piece.text.clone(), piece.bbox))
                .collect()
        })
        .unwrap_or_default()
}

/// Turns every numeric cell of `grid` into value records, row-major.
#[must_use]
pub fn assemble_table(
    grid: &Grid,
    normalizer: &Normalizer,
    exceptions: &[HeaderException],
    page: u32,
    table_id: usize,
) -> AssembledTable {
    let propagated = PropagatedGrid::from_grid(grid);
    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut exception_hits = BTreeMap::<&str, usize>::new();

    for (row, col, cell) in grid.iter_cells() {
        if !is_numeric_content(cell.text()) {
            continue;
        }

        let values = cell_values(grid, row, col);
        let numbers = cell.text().split_whitespace().count();
        if numbers > 1 {
            warn!(
                page,
                table_id,
                row,
                col,
                text = %cell.text(),
                "cell holds more than one number"
            );
            warnings.push(
                ReconstructWarning::new(
                    WarningCode::MultiNumberCell,
                    format!(
                        "cell '{}' holds {numbers} numbers in {} value(s)",
                        cell.text(),
                        values.len()
                    ),
                )
                .with_page(page)
                .with_table_id(table_id)
                .with_cell(row, col),
            );
        }

        let headers = resolve_headers(&propagated, normalizer, row, col, cell.text());
        for (value, bbox) in values {
            let mut headers = headers.clone();
            let context = CellContext {
                grid,
                normalizer,
                row,
                col,
                value: &value,
                bbox,
            };
            for name in apply_exceptions(exceptions, &context, &mut headers) {
                *exception_hits.entry(name).or_default() += 1;
            }

            records.push(ValueRecord {
                value,
                page,
                table_id,
                row,
                col,
                bbox,
                row_headers: headers.row_headers,
                column_headers: headers.column_headers,
            });
        }
    }

    for (name, hits) in exception_hits {
        warnings.push(
            ReconstructWarning::new(
                WarningCode::ExceptionApplied,
                format!("exception '{name}' applied to {hits} value(s)"),
            )
            .with_page(page)
            .with_table_id(table_id),
        );
    }

    let unresolved = records
        .iter()
        .filter(|record| record.row_headers.is_empty() || record.column_headers.is_empty())
        .count();
    if unresolved > 0 {
        debug!(page, table_id, unresolved, "values without a header on some axis");
        warnings.push(
            ReconstructWarning::new(
                WarningCode::UnresolvedHeader,
                format!(
                    "{unresolved} of {} values have no header on at least one axis",
                    records.len()
                ),
            )
            .with_page(page)
            .with_table_id(table_id),
        );
    }

    let confidence = region_confidence(&records);
    AssembledTable {
        page,
        table_id,
        records,
        confidence,
        warnings,
    }
}
