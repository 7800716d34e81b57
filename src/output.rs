use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ReconstructError;
use crate::model::ValueRecord;

pub const CSV_HEADERS: [&str; 11] = [
    "page",
    "table_id",
    "row",
    "col",
    "value",
    "row_headers",
    "column_headers",
    "x0",
    "y0",
    "x1",
    "y1",
];

const HEADER_SEPARATOR: &str = " > ";

fn csv_row(record: &ValueRecord) -> [String; 11] {
    [
        record.page.to_string(),
        record.table_id.to_string(),
        record.row.to_string(),
        record.col.to_string(),
        record.value.clone(),
        record.row_headers.join(HEADER_SEPARATOR),
        record.column_headers.join(HEADER_SEPARATOR),
        record.bbox.x0.to_string(),
        record.bbox.y0.to_string(),
        record.bbox.x1.to_string(),
        record.bbox.y1.to_string(),
    ]
}

fn write_records<W: Write>(
    writer: &mut csv::Writer<W>,
    records: &[ValueRecord],
) -> Result<(), ReconstructError> {
    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.write_record(csv_row(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one CSV row per value; header hierarchies are joined with ` > `.
///
/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn write_csv(
    path: &Path,
    records: &[ValueRecord],
    delimiter: u8,
) -> Result<(), ReconstructError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, records)
}

/// # Errors
///
/// Fails when the CSV writer cannot serialize a row.
pub fn write_csv_to_string(
    records: &[ValueRecord],
    delimiter: u8,
) -> Result<String, ReconstructError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, records)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ReconstructError::Io(error.into_error()))?;
    String::from_utf8(bytes).map_err(|error| {
        ReconstructError::InvalidOption(format!("invalid utf-8 csv output: {error}"))
    })
}

/// Writes the records as a pretty-printed JSON array.
///
/// # Errors
///
/// Fails when the file cannot be created or the records cannot be serialized.
pub fn write_json(path: &Path, records: &[ValueRecord]) -> Result<(), ReconstructError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
