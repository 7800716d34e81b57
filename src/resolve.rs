use std::collections::HashSet;

use crate::normalize::Normalizer;
use crate::propagate::PropagatedGrid;

/// Row and column header hierarchies of one value, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPath {
    pub row_headers: Vec<String>,
    pub column_headers: Vec<String>,
}

fn dedup_preserving_order(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .filter(|header| seen.insert(header.clone()))
        .collect()
}

/// Walks `cells` nearest-first, keeping qualifying headers, and returns them
/// outermost-first.
fn collect_headers<'a>(
    cells: impl Iterator<Item = &'a str>,
    normalizer: &Normalizer,
    own_text: &str,
) -> Vec<String> {
    let mut nearest_first = cells
        .filter(|text| *text != own_text && normalizer.qualifies_as_header(text))
        .map(str::to_string)
        .collect::<Vec<_>>();
    nearest_first.reverse();
    dedup_preserving_order(nearest_first)
}

/// Resolves the header hierarchy of the value at `(row, col)`.
///
/// The row walk scans leftward from the value's column and the column walk
/// scans upward from its row; both are reversed so the outermost header reads
/// first.
#[must_use]
pub fn resolve_headers(
    propagated: &PropagatedGrid,
    normalizer: &Normalizer,
    row: usize,
    col: usize,
    own_text: &str,
) -> HeaderPath {
    let row_headers = collect_headers(
        (0..col).rev().map(|left| propagated.text(row, left)),
        normalizer,
        own_text,
    );
    let column_headers = collect_headers(
        (0..row).rev().map(|above| propagated.text(above, col)),
        normalizer,
        own_text,
    );

    HeaderPath {
        row_headers,
        column_headers,
    }
}
