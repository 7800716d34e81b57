use crate::grid::Grid;
use crate::normalize::is_numeric_content;

/// Header lookup grid: a copy of a [`Grid`] whose blank cells inherit the
/// nearest non-numeric content above them, then to their left.
///
/// The downward pass finishes before the rightward pass starts. Column-spanning
/// headers stacked above a blank therefore win over a row label to its left,
/// and row merges then borrow from the already-filled column headers. The two
/// passes repeat until nothing changes, so a propagated grid is a fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagatedGrid {
    cells: Vec<Vec<String>>,
}

fn is_donor(text: &str) -> bool {
    !text.is_empty() && !is_numeric_content(text)
}

fn fill_downward(cells: &mut [Vec<String>], width: usize) -> bool {
    let mut changed = false;
    for col in 0..width {
        for row in 1..cells.len() {
            if cells[row][col].is_empty() && is_donor(&cells[row - 1][col]) {
                cells[row][col] = cells[row - 1][col].clone();
                changed = true;
            }
        }
    }
    changed
}

fn fill_rightward(cells: &mut [Vec<String>], width: usize) -> bool {
    let mut changed = false;
    for row in cells.iter_mut() {
        for col in 1..width {
            if row[col].is_empty() && is_donor(&row[col - 1]) {
                row[col] = row[col - 1].clone();
                changed = true;
            }
        }
    }
    changed
}

impl PropagatedGrid {
    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        let propagated = Self::from_rows(grid.text_rows());
        debug_assert!(
            propagated.numeric_donors_absent(grid),
            "numeric text propagated into a blank cell"
        );
        propagated
    }

    /// Propagates an arbitrary text matrix; ragged rows are padded with blanks
    /// first.
    #[must_use]
    pub fn from_rows(mut cells: Vec<Vec<String>>) -> Self {
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize(width, String::new());
        }

        while fill_downward(&mut cells, width) | fill_rightward(&mut cells, width) {}

        Self { cells }
    }

    /// Propagates this grid's own content again.
    #[must_use]
    pub fn repropagate(&self) -> Self {
        Self::from_rows(self.cells.clone())
    }

    #[must_use]
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.cells
    }

    /// True when no cell that is blank in `original` was filled with numeric
    /// content.
    #[must_use]
    pub fn numeric_donors_absent(&self, original: &Grid) -> bool {
        original
            .iter_cells()
            .filter(|(_, _, cell)| cell.is_blank())
            .all(|(row, col, _)| !is_numeric_content(self.text(row, col)))
    }
}
