//! Assigns normalized fragments to a discrete row/column grid.

use std::collections::BTreeSet;

use tracing::debug;

use crate::axis::{Band, BandLookup, bands_from_boundaries, cluster_boundaries, locate_band};
use crate::model::{BBox, LineSegment, PageRuling};
use crate::normalize::{CellKind, NormalizedFragment};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTolerance {
    pub rows: f64,
    pub columns: f64,
}

/// Boundary counts of a region that could not form at least one band per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegenerateAxes {
    pub row_boundaries: usize,
    pub column_boundaries: usize,
}

impl DegenerateAxes {
    #[must_use]
    pub const fn both(&self) -> bool {
        self.row_boundaries < 2 && self.column_boundaries < 2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellPiece {
    pub text: String,
    pub kind: CellKind,
    pub bbox: BBox,
}

/// Content of one grid position: the fragments placed there, joined by a space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    text: String,
    pieces: Vec<CellPiece>,
}

impl Cell {
    fn from_pieces(mut pieces: Vec<CellPiece>) -> Self {
        pieces.sort_by(|left, right| {
            left.bbox
                .x0
                .total_cmp(&right.bbox.x0)
                .then(left.bbox.y0.total_cmp(&right.bbox.y0))
                .then_with(|| left.text.cmp(&right.text))
        });
        let text = pieces
            .iter()
            .map(|piece| piece.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, pieces }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn pieces(&self) -> &[CellPiece] {
        &self.pieces
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        self.pieces
            .iter()
            .map(|piece| piece.bbox)
            .reduce(|acc, bbox| acc.union(&bbox))
    }
}

/// A fragment that covers more than one band. It sits at `(row, col)` and the
/// propagator carries it over the rest of the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedCell {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl MergedCell {
    #[must_use]
    pub const fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row
            && row < self.row + self.row_span
            && col >= self.col
            && col < self.col + self.col_span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClampedPlacement {
    pub text: String,
    pub row: usize,
    pub col: usize,
}

/// Sparse table of cell contents built once per region.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: Vec<Band>,
    columns: Vec<Band>,
    cells: Vec<Vec<Cell>>,
    merged: Vec<MergedCell>,
    clamped: Vec<ClampedPlacement>,
}

impl Grid {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row bands that hold content, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[Band] {
        &self.rows
    }

    #[must_use]
    pub fn columns(&self) -> &[Band] {
        &self.columns
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|cells| cells.get(col))
    }

    /// Joined text at `(row, col)`, empty for blank or out-of-range cells.
    #[must_use]
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).map_or("", Cell::text)
    }

    #[must_use]
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.text.clone()).collect())
            .collect()
    }

    #[must_use]
    pub fn merged_cells(&self) -> &[MergedCell] {
        &self.merged
    }

    #[must_use]
    pub fn clamped(&self) -> &[ClampedPlacement] {
        &self.clamped
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, cell)| (row, col, cell))
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisSpan {
    anchor: usize,
    last: usize,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    rows: AxisSpan,
    columns: AxisSpan,
    clamped: bool,
}

/// Picks the band a fragment is stored in. A fragment overlapping two or more
/// occupied bands by more than `margin` is a merged cell anchored at its
/// leading band; anything else stays at the band holding its center.
fn anchor_span(
    bands: &[Band],
    occupied: &BTreeSet<usize>,
    low: f64,
    high: f64,
    center: usize,
    margin: f64,
) -> AxisSpan {
    let covered = occupied
        .iter()
        .copied()
        .filter(|&index| bands[index].overlap(low, high) > margin)
        .collect::<Vec<_>>();

    match covered.as_slice() {
        [first, .., last] => AxisSpan {
            anchor: *first,
            last: *last,
        },
        _ => AxisSpan {
            anchor: center,
            last: center,
        },
    }
}

/// Maps raw band indices to positions among the kept bands.
fn compact_index(kept: &[usize], raw: usize) -> usize {
    kept.binary_search(&raw).unwrap_or_else(|insert_at| insert_at)
}

fn kept_within(kept: &[usize], span: AxisSpan) -> usize {
    kept.iter()
        .filter(|&&index| index >= span.anchor && index <= span.last)
        .count()
}

/// Builds the grid for one table region.
///
/// Row boundaries come from fragment top/bottom edges plus horizontal ruling
/// lines, column boundaries from left/right edges plus vertical lines. Bands
/// that end up holding no fragment (gutters between fragment edges) are not
/// part of the result.
///
/// # Errors
///
/// Returns [`DegenerateAxes`] when either axis yields fewer than two
/// boundaries.
pub fn build_grid(
    fragments: &[NormalizedFragment],
    ruling: Option<&PageRuling>,
    tolerance: AxisTolerance,
) -> Result<Grid, DegenerateAxes> {
    let mut row_pool = Vec::with_capacity(fragments.len() * 2);
    let mut column_pool = Vec::with_capacity(fragments.len() * 2);
    for fragment in fragments {
        let bbox = fragment.source.bbox;
        row_pool.extend([bbox.y0, bbox.y1]);
        column_pool.extend([bbox.x0, bbox.x1]);
    }
    if let Some(ruling) = ruling {
        row_pool.extend(ruling.horizontal.iter().map(LineSegment::horizontal_position));
        column_pool.extend(ruling.vertical.iter().map(LineSegment::vertical_position));
    }

    let row_boundaries = cluster_boundaries(&row_pool, tolerance.rows);
    let column_boundaries = cluster_boundaries(&column_pool, tolerance.columns);
    if row_boundaries.len() < 2 || column_boundaries.len() < 2 {
        return Err(DegenerateAxes {
            row_boundaries: row_boundaries.len(),
            column_boundaries: column_boundaries.len(),
        });
    }

    let row_bands = bands_from_boundaries(&row_boundaries);
    let column_bands = bands_from_boundaries(&column_boundaries);

    let centers = fragments
        .iter()
        .map(|fragment| {
            let (center_x, center_y) = fragment.source.bbox.center();
            (
                locate_band(&row_bands, center_y),
                locate_band(&column_bands, center_x),
            )
        })
        .collect::<Vec<_>>();
    let occupied_rows = centers
        .iter()
        .map(|(row, _)| row.index())
        .collect::<BTreeSet<_>>();
    let occupied_columns = centers
        .iter()
        .map(|(_, col)| col.index())
        .collect::<BTreeSet<_>>();

    let placements = fragments
        .iter()
        .zip(&centers)
        .map(|(fragment, (row, col))| {
            let bbox = fragment.source.bbox;
            let rows = anchor_span(
                &row_bands,
                &occupied_rows,
                bbox.y0,
                bbox.y1,
                row.index(),
                tolerance.rows,
            );
            let columns = anchor_span(
                &column_bands,
                &occupied_columns,
                bbox.x0,
                bbox.x1,
                col.index(),
                tolerance.columns,
            );
            Placement {
                rows,
                columns,
                clamped: matches!(row, BandLookup::Clamped(_))
                    || matches!(col, BandLookup::Clamped(_)),
            }
        })
        .collect::<Vec<_>>();

    let kept_rows = placements
        .iter()
        .map(|placement| placement.rows.anchor)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let kept_columns = placements
        .iter()
        .map(|placement| placement.columns.anchor)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let mut slots = vec![vec![Vec::new(); kept_columns.len()]; kept_rows.len()];
    let mut merged = Vec::new();
    let mut clamped = Vec::new();
    for (fragment, placement) in fragments.iter().zip(&placements) {
        let row = compact_index(&kept_rows, placement.rows.anchor);
        let col = compact_index(&kept_columns, placement.columns.anchor);

        if placement.clamped {
            debug!(
                text = %fragment.text,
                row,
                col,
                "fragment center outside grid; clamped to nearest band"
            );
            clamped.push(ClampedPlacement {
                text: fragment.text.clone(),
                row,
                col,
            });
        }

        let row_span = kept_within(&kept_rows, placement.rows);
        let col_span = kept_within(&kept_columns, placement.columns);
        if row_span > 1 || col_span > 1 {
            debug!(
                text = %fragment.text,
                row,
                col,
                row_span,
                col_span,
                "merged cell anchored at leading band"
            );
            merged.push(MergedCell {
                row,
                col,
                row_span,
                col_span,
            });
        }

        slots[row][col].push(CellPiece {
            text: fragment.text.clone(),
            kind: fragment.kind,
            bbox: fragment.source.bbox,
        });
    }
    merged.sort_by_key(|cell| (cell.row, cell.col));
    merged.dedup();
    clamped.sort_by(|left, right| {
        (left.row, left.col, &left.text).cmp(&(right.row, right.col, &right.text))
    });

    let cells = slots
        .into_iter()
        .map(|row| row.into_iter().map(Cell::from_pieces).collect())
        .collect();

    Ok(Grid {
        rows: kept_rows.iter().map(|&index| row_bands[index]).collect(),
        columns: kept_columns
            .iter()
            .map(|&index| column_bands[index])
            .collect(),
        cells,
        merged,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{AxisTolerance, DegenerateAxes, MergedCell, build_grid};
    use crate::model::{BBox, Fragment, LineSegment, PageRuling};
    use crate::normalize::{NormalizedFragment, Normalizer};

    const TOLERANCE: AxisTolerance = AxisTolerance {
        rows: 4.0,
        columns: 6.0,
    };

    fn normalized(items: &[(&str, [f64; 4])]) -> Vec<NormalizedFragment> {
        let fragments = items
            .iter()
            .map(|(text, [x0, y0, x1, y1])| Fragment::new(*text, BBox::new(*x0, *y0, *x1, *y1)))
            .collect::<Vec<_>>();
        Normalizer::default().normalize_all(&fragments)
    }

    #[test]
    fn stacked_headers_over_one_value_form_a_single_column() {
        let fragments = normalized(&[
            ("21,00", [50.0, 40.0, 90.0, 55.0]),
            ("Revenue", [20.0, 10.0, 80.0, 25.0]),
            ("Q1", [20.0, 25.0, 80.0, 38.0]),
        ]);

        let grid = build_grid(&fragments, None, TOLERANCE).expect("grid should build");
        assert_eq!(
            grid.text_rows(),
            vec![vec!["Revenue"], vec!["Q1"], vec!["21,00"]]
        );
        assert!(grid.merged_cells().is_empty());
    }

    #[test]
    fn header_spanning_two_value_columns_anchors_left() {
        let fragments = normalized(&[
            ("Total", [100.0, 10.0, 300.0, 25.0]),
            ("35,00", [100.0, 40.0, 180.0, 55.0]),
            ("35,00", [220.0, 40.0, 300.0, 55.0]),
        ]);

        let grid = build_grid(&fragments, None, TOLERANCE).expect("grid should build");
        assert_eq!(
            grid.text_rows(),
            vec![vec!["Total", ""], vec!["35,00", "35,00"]]
        );
        assert_eq!(
            grid.merged_cells(),
            &[MergedCell {
                row: 0,
                col: 0,
                row_span: 1,
                col_span: 2,
            }]
        );
    }

    #[test]
    fn fragments_sharing_a_cell_join_left_to_right() {
        let fragments = normalized(&[
            ("(EUR)", [60.0, 10.0, 100.0, 22.0]),
            ("Total", [20.0, 10.0, 120.0, 22.0]),
            ("12,00", [60.0, 40.0, 100.0, 52.0]),
        ]);

        let grid = build_grid(&fragments, None, TOLERANCE).expect("grid should build");
        assert_eq!(grid.text_rows(), vec![vec!["Total (EUR)"], vec!["12,00"]]);
        assert_eq!(grid.cell(0, 0).map(|cell| cell.pieces().len()), Some(2));
    }

    #[test]
    fn ruling_lines_contribute_boundaries() {
        let fragments = normalized(&[
            ("Name", [12.0, 12.0, 40.0, 20.0]),
            ("Amount", [72.0, 12.0, 110.0, 20.0]),
            ("Rent", [12.0, 32.0, 36.0, 40.0]),
            ("900", [80.0, 32.0, 110.0, 40.0]),
        ]);
        let ruling = PageRuling {
            page: 1,
            horizontal: vec![
                LineSegment::new(10.0, 10.0, 120.0, 10.0),
                LineSegment::new(10.0, 30.0, 120.0, 30.0),
                LineSegment::new(10.0, 50.0, 120.0, 50.0),
            ],
            vertical: vec![
                LineSegment::new(10.0, 10.0, 10.0, 50.0),
                LineSegment::new(70.0, 10.0, 70.0, 50.0),
                LineSegment::new(120.0, 10.0, 120.0, 50.0),
            ],
        };

        let grid = build_grid(&fragments, Some(&ruling), TOLERANCE).expect("grid should build");
        assert_eq!(
            grid.text_rows(),
            vec![vec!["Name", "Amount"], vec!["Rent", "900"]]
        );
        assert!((grid.rows()[1].start - 30.0).abs() < f64::EPSILON);
        assert!((grid.columns()[0].start - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_axis_is_reported() {
        let fragments = normalized(&[("Lonely", [10.0, 10.0, 12.0, 12.0])]);
        let error = build_grid(&fragments, None, TOLERANCE).expect_err("grid should not build");
        assert_eq!(
            error,
            DegenerateAxes {
                row_boundaries: 1,
                column_boundaries: 1,
            }
        );
        assert!(error.both());
    }

    #[test]
    fn center_past_last_boundary_is_clamped() {
        let fragments = normalized(&[
            ("Item", [10.0, 10.0, 60.0, 20.0]),
            ("Qty", [70.0, 10.0, 100.0, 20.0]),
            ("7", [94.0, 30.0, 102.0, 40.0]),
        ]);

        let grid = build_grid(&fragments, None, TOLERANCE).expect("grid should build");
        assert_eq!(grid.text_rows(), vec![vec!["Item", "Qty"], vec!["", "7"]]);
        assert_eq!(grid.clamped().len(), 1);
        assert_eq!(grid.clamped()[0].text, "7");
    }

    #[test]
    fn input_order_does_not_change_the_grid() {
        let items = [
            ("Region", [10.0, 10.0, 60.0, 20.0]),
            ("Q1", [80.0, 10.0, 110.0, 20.0]),
            ("Q2", [130.0, 10.0, 160.0, 20.0]),
            ("North", [10.0, 30.0, 60.0, 40.0]),
            ("10,00", [80.0, 30.0, 110.0, 40.0]),
            ("11,50", [130.0, 30.0, 160.0, 40.0]),
        ];
        let mut reversed = items;
        reversed.reverse();

        let forward = build_grid(&normalized(&items), None, TOLERANCE).expect("grid builds");
        let backward = build_grid(&normalized(&reversed), None, TOLERANCE).expect("grid builds");
        assert_eq!(forward, backward);
    }
}
