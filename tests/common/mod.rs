#![allow(dead_code)]

use std::path::Path;

use ocr_table_grid::{BBox, Fragment, ValueRecord};

pub fn fragment(text: &str, [x0, y0, x1, y1]: [f64; 4]) -> Fragment {
    Fragment::new(text, BBox::new(x0, y0, x1, y1))
}

/// Two-level column headers over three value columns, two-level row headers.
///
/// ```text
///             | Col2            | Col3
///             | Col2A  | Col2B  |
/// M1   | AA   | 23,00  | 25,40  | 50,00
///      | BB   | 24,00  | 25,10  | 54,00
/// ```
pub fn nested_header_table() -> Vec<Fragment> {
    vec![
        fragment("Col2", [200.0, 10.0, 380.0, 25.0]),
        fragment("Col3", [400.0, 10.0, 480.0, 25.0]),
        fragment("Col2A", [200.0, 30.0, 280.0, 45.0]),
        fragment("Col2B", [300.0, 30.0, 380.0, 45.0]),
        fragment("M1", [10.0, 60.0, 60.0, 75.0]),
        fragment("AA", [100.0, 60.0, 150.0, 75.0]),
        fragment("23,00", [200.0, 60.0, 280.0, 75.0]),
        fragment("25,40", [300.0, 60.0, 380.0, 75.0]),
        fragment("50,00", [400.0, 60.0, 480.0, 75.0]),
        fragment("BB", [100.0, 85.0, 150.0, 100.0]),
        fragment("24,00", [200.0, 85.0, 280.0, 100.0]),
        fragment("25,10", [300.0, 85.0, 380.0, 100.0]),
        fragment("54,00", [400.0, 85.0, 480.0, 100.0]),
    ]
}

/// Item/Qty table shifted by `(dx, dy)` and placed on `page`.
pub fn inventory_table(page: u32, dx: f64, dy: f64) -> Vec<Fragment> {
    [
        ("Item", [10.0, 10.0, 60.0, 20.0]),
        ("Qty", [80.0, 10.0, 120.0, 20.0]),
        ("Bolts", [10.0, 30.0, 60.0, 40.0]),
        ("12", [80.0, 30.0, 120.0, 40.0]),
        ("Nuts", [10.0, 50.0, 60.0, 60.0]),
        ("7", [80.0, 50.0, 120.0, 60.0]),
    ]
    .into_iter()
    .map(|(text, [x0, y0, x1, y1])| {
        fragment(text, [x0 + dx, y0 + dy, x1 + dx, y1 + dy]).on_page(page)
    })
    .collect()
}

/// `(value, row_headers, column_headers)` of every record, in output order.
pub fn summarize(records: &[ValueRecord]) -> Vec<(String, Vec<String>, Vec<String>)> {
    records
        .iter()
        .map(|record| {
            (
                record.value.clone(),
                record.row_headers.clone(),
                record.column_headers.clone(),
            )
        })
        .collect()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

pub fn write_fragments(
    path: &Path,
    fragments: &[Fragment],
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, serde_json::to_string_pretty(fragments)?)?;
    Ok(())
}
