mod assemble;
mod axis;
mod error;
mod exceptions;
mod grid;
mod inference;
mod model;
mod normalize;
mod options;
mod output;
mod propagate;
mod resolve;
mod warning;

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use assemble::{AssembledTable, LOW_CONFIDENCE_THRESHOLD, assemble_table, region_confidence};
pub use axis::{Band, BandLookup, bands_from_boundaries, cluster_boundaries, locate_band};
pub use error::ReconstructError;
pub use exceptions::{
    CellContext, CellPredicate, ExceptionAction, HeaderException, apply_exceptions,
};
pub use grid::{
    AxisTolerance, Cell, CellPiece, ClampedPlacement, DegenerateAxes, Grid, MergedCell, build_grid,
};
pub use inference::{BoxError, InferenceRequest, StructureInference};
pub use model::{BBox, Fragment, LineSegment, PageRuling, ValueRecord, retain_confident};
pub use normalize::{
    CellKind, DEFAULT_NOISE_TOKENS, NormalizedFragment, Normalizer, is_numeric_content,
    is_numeric_token,
};
pub use options::{
    DEFAULT_COLUMN_TOLERANCE, DEFAULT_ROW_TOLERANCE, PageSelection, QualityMode,
    ReconstructOptions, ReplacementTable, TableRegion,
};
pub use output::{CSV_HEADERS, write_csv, write_csv_to_string, write_json};
pub use propagate::PropagatedGrid;
pub use resolve::{HeaderPath, resolve_headers};
pub use warning::{ReconstructWarning, WarningCode};

use crate::inference::run_fallback;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionReport {
    pub value_count: usize,
    pub table_count: usize,
    pub warnings: Vec<ReconstructWarning>,
}

/// Fragments and ruling lines of one table region, numbered in document order.
#[derive(Debug)]
struct RegionInput<'a> {
    page: u32,
    table_id: usize,
    region: Option<&'a TableRegion>,
    fragments: Vec<Fragment>,
    ruling: Option<PageRuling>,
}

#[derive(Debug)]
enum RegionOutcome {
    Table(AssembledTable),
    Degenerate(DegenerateAxes),
    /// Nothing but noise was left after normalization.
    Blank,
}

fn ruling_for_page(rulings: &[PageRuling], page: u32) -> Option<PageRuling> {
    rulings
        .iter()
        .filter(|ruling| ruling.page == page)
        .fold(None, |merged: Option<PageRuling>, ruling| {
            let mut merged = merged.unwrap_or_else(|| PageRuling {
                page,
                ..PageRuling::default()
            });
            merged.horizontal.extend_from_slice(&ruling.horizontal);
            merged.vertical.extend_from_slice(&ruling.vertical);
            Some(merged)
        })
}

/// Ruling lines of `ruling` clipped to `region`; lines outside it are dropped.
fn ruling_within(ruling: &PageRuling, region: &TableRegion) -> PageRuling {
    let bounds = region.bounds();
    let inside = |segments: &[LineSegment]| {
        segments
            .iter()
            .filter_map(|segment| segment.clip_to(&bounds))
            .collect::<Vec<_>>()
    };
    PageRuling {
        page: ruling.page,
        horizontal: inside(&ruling.horizontal),
        vertical: inside(&ruling.vertical),
    }
}

/// Groups fragments by page and splits each page into its table regions.
fn split_regions<'a>(
    fragments: &[Fragment],
    rulings: &[PageRuling],
    options: &'a ReconstructOptions,
) -> Vec<RegionInput<'a>> {
    let mut pages: BTreeMap<u32, Vec<Fragment>> = BTreeMap::new();
    for fragment in fragments {
        if options
            .pages
            .as_ref()
            .is_some_and(|selection| !selection.contains(fragment.page))
        {
            continue;
        }
        pages.entry(fragment.page).or_default().push(fragment.clone());
    }

    let mut inputs = Vec::new();
    for (page, page_fragments) in pages {
        let ruling = ruling_for_page(rulings, page);
        let page_regions = options
            .regions
            .iter()
            .filter(|region| region.page == page)
            .collect::<Vec<_>>();

        if page_regions.is_empty() {
            inputs.push(RegionInput {
                page,
                table_id: inputs.len() + 1,
                region: None,
                fragments: page_fragments,
                ruling,
            });
            continue;
        }

        let mut buckets = vec![Vec::new(); page_regions.len()];
        for fragment in page_fragments {
            let (center_x, center_y) = fragment.bbox.center();
            match page_regions
                .iter()
                .position(|region| region.contains_point(center_x, center_y))
            {
                Some(index) => buckets[index].push(fragment),
                None => debug!(text = %fragment.text, page, "fragment outside every table region"),
            }
        }

        for (region, bucket) in page_regions.into_iter().zip(buckets) {
            inputs.push(RegionInput {
                page,
                table_id: inputs.len() + 1,
                region: Some(region),
                fragments: bucket,
                ruling: ruling.as_ref().map(|ruling| ruling_within(ruling, region)),
            });
        }
    }

    inputs
}

fn process_region(
    input: &RegionInput<'_>,
    normalizer: &Normalizer,
    options: &ReconstructOptions,
) -> RegionOutcome {
    let normalized = normalizer.normalize_all(&input.fragments);
    if normalized.is_empty() {
        return RegionOutcome::Blank;
    }

    let tolerance = AxisTolerance {
        rows: options.row_tolerance,
        columns: options.column_tolerance,
    };
    let grid = match build_grid(&normalized, input.ruling.as_ref(), tolerance) {
        Ok(grid) => grid,
        Err(degenerate) => return RegionOutcome::Degenerate(degenerate),
    };
    debug!(
        page = input.page,
        table_id = input.table_id,
        rows = grid.row_count(),
        columns = grid.column_count(),
        "grid built"
    );

    let mut warnings = grid
        .clamped()
        .iter()
        .map(|clamp| {
            ReconstructWarning::new(
                WarningCode::ClampedAssignment,
                format!("'{}' fell outside every band and was clamped", clamp.text),
            )
            .with_page(input.page)
            .with_table_id(input.table_id)
            .with_cell(clamp.row, clamp.col)
        })
        .collect::<Vec<_>>();

    let mut table = assemble_table(
        &grid,
        normalizer,
        &options.exceptions,
        input.page,
        input.table_id,
    );
    warnings.append(&mut table.warnings);
    table.warnings = warnings;
    RegionOutcome::Table(table)
}

/// Fails when every non-blank region of a page is degenerate on both axes.
fn check_pages(
    inputs: &[RegionInput<'_>],
    outcomes: &[RegionOutcome],
) -> Result<(), ReconstructError> {
    let mut pages: BTreeMap<u32, (bool, bool)> = BTreeMap::new();
    for (input, outcome) in inputs.iter().zip(outcomes) {
        let (any_degenerate, any_usable) = pages.entry(input.page).or_default();
        match outcome {
            RegionOutcome::Degenerate(degenerate) if degenerate.both() => *any_degenerate = true,
            RegionOutcome::Degenerate(_) | RegionOutcome::Table(_) => *any_usable = true,
            RegionOutcome::Blank => {}
        }
    }

    match pages
        .into_iter()
        .find(|(_, (any_degenerate, any_usable))| *any_degenerate && !*any_usable)
    {
        Some((page, _)) => Err(ReconstructError::NoTableStructure { page }),
        None => Ok(()),
    }
}

fn apply_quality_mode(
    table: AssembledTable,
    options: &ReconstructOptions,
    warnings: &mut Vec<ReconstructWarning>,
) -> Result<Option<AssembledTable>, ReconstructError> {
    match options.quality_mode {
        QualityMode::BestEffort => {
            warn!(
                page = table.page,
                table_id = table.table_id,
                confidence = table.confidence,
                "low-confidence table kept"
            );
            warnings.push(
                ReconstructWarning::new(
                    WarningCode::LowConfidence,
                    "table confidence is low; exported in best-effort mode",
                )
                .with_page(table.page)
                .with_table_id(table.table_id)
                .with_confidence(table.confidence),
            );
            Ok(Some(table))
        }
        QualityMode::Strict => Err(ReconstructError::AmbiguousTable {
            page: table.page,
            table_id: table.table_id,
            confidence: table.confidence,
        }),
        QualityMode::SkipAmbiguous => {
            warn!(
                page = table.page,
                table_id = table.table_id,
                confidence = table.confidence,
                "low-confidence table skipped"
            );
            warnings.push(
                ReconstructWarning::new(
                    WarningCode::LowConfidence,
                    "skipping low-confidence table",
                )
                .with_page(table.page)
                .with_table_id(table.table_id)
                .with_confidence(table.confidence),
            );
            Ok(None)
        }
    }
}

fn reconstruct_document(
    fragments: &[Fragment],
    rulings: &[PageRuling],
    options: &ReconstructOptions,
    inference: Option<&dyn StructureInference>,
) -> Result<(Vec<ValueRecord>, ReconstructionReport), ReconstructError> {
    options.validate()?;

    let normalizer = Normalizer::new(options.replacements.clone(), &options.extra_noise_tokens);
    let inputs = split_regions(fragments, rulings, options);
    let outcomes = if options.parallel {
        inputs
            .par_iter()
            .map(|input| process_region(input, &normalizer, options))
            .collect::<Vec<_>>()
    } else {
        inputs
            .iter()
            .map(|input| process_region(input, &normalizer, options))
            .collect::<Vec<_>>()
    };
    check_pages(&inputs, &outcomes)?;

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    let mut table_count = 0;
    for (input, outcome) in inputs.iter().zip(outcomes) {
        let mut table = match outcome {
            RegionOutcome::Table(table) => table,
            RegionOutcome::Degenerate(degenerate) => {
                warn!(
                    page = input.page,
                    table_id = input.table_id,
                    ?degenerate,
                    "no table structure in region"
                );
                warnings.push(
                    ReconstructWarning::new(
                        WarningCode::DegenerateAxis,
                        format!(
                            "region yields {} row and {} column boundaries; \
                             at least 2 each are needed",
                            degenerate.row_boundaries, degenerate.column_boundaries
                        ),
                    )
                    .with_page(input.page)
                    .with_table_id(input.table_id),
                );
                continue;
            }
            RegionOutcome::Blank => continue,
        };
        warnings.append(&mut table.warnings);

        if table.is_low_confidence() {
            let inferred = inference.and_then(|engine| {
                let request = InferenceRequest {
                    page: input.page,
                    table_id: input.table_id,
                    region: input.region,
                    fragments: &input.fragments,
                    deterministic: &table.records,
                    confidence: table.confidence,
                };
                run_fallback(engine, &request).map(|records| (engine.name().to_string(), records))
            });

            if let Some((engine, inferred)) = inferred {
                warnings.push(
                    ReconstructWarning::new(
                        WarningCode::InferenceFallback,
                        format!(
                            "replaced {} deterministic values with {} from '{engine}'",
                            table.records.len(),
                            inferred.len()
                        ),
                    )
                    .with_page(input.page)
                    .with_table_id(input.table_id)
                    .with_confidence(table.confidence),
                );
                table.records = inferred;
            } else {
                match apply_quality_mode(table, options, &mut warnings)? {
                    Some(kept) => table = kept,
                    None => continue,
                }
            }
        }

        if !table.records.is_empty() {
            table_count += 1;
            records.append(&mut table.records);
        }
    }

    records.sort_by(|left, right| {
        left.page
            .cmp(&right.page)
            .then(left.bbox.y0.total_cmp(&right.bbox.y0))
            .then(left.bbox.x0.total_cmp(&right.bbox.x0))
    });

    if records.is_empty() {
        warnings.push(ReconstructWarning::new(
            WarningCode::NoValuesDetected,
            "no numeric values were detected in the selected pages",
        ));
    }

    info!(
        values = records.len(),
        tables = table_count,
        warnings = warnings.len(),
        "reconstruction finished"
    );

    let report = ReconstructionReport {
        value_count: records.len(),
        table_count,
        warnings,
    };
    Ok((records, report))
}

/// Reconstructs every table in `fragments` into header-qualified values.
///
/// Fragments are grouped by page and by the configured table regions; each
/// region is processed independently and the records are returned sorted by
/// page, then top edge, then left edge.
///
/// # Errors
///
/// Returns [`ReconstructError::InvalidOption`] for rejected options,
/// [`ReconstructError::NoTableStructure`] when a page is degenerate on both
/// axes, and [`ReconstructError::AmbiguousTable`] for a low-confidence table
/// under [`QualityMode::Strict`].
pub fn reconstruct(
    fragments: &[Fragment],
    rulings: &[PageRuling],
    options: &ReconstructOptions,
) -> Result<(Vec<ValueRecord>, ReconstructionReport), ReconstructError> {
    reconstruct_document(fragments, rulings, options, None)
}

/// Like [`reconstruct`], but hands low-confidence tables to `inference`
/// first. Its records replace the deterministic ones when it returns any.
///
/// # Errors
///
/// Same as [`reconstruct`]; an inference failure is never an error.
pub fn reconstruct_with_inference(
    fragments: &[Fragment],
    rulings: &[PageRuling],
    options: &ReconstructOptions,
    inference: &dyn StructureInference,
) -> Result<(Vec<ValueRecord>, ReconstructionReport), ReconstructError> {
    reconstruct_document(fragments, rulings, options, Some(inference))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ruling_for_page, ruling_within, split_regions};
    use crate::model::{BBox, Fragment, LineSegment, PageRuling};
    use crate::options::{PageSelection, ReconstructOptions, TableRegion};

    fn fragment(text: &str, page: u32, x: f64, y: f64) -> Fragment {
        Fragment::new(text, BBox::new(x, y, x + 20.0, y + 10.0)).on_page(page)
    }

    #[test]
    fn regions_are_numbered_in_page_order() {
        let options = ReconstructOptions {
            regions: vec![
                "2:0,0,100,100".parse::<TableRegion>().expect("region parses"),
                "2:0,200,100,300".parse::<TableRegion>().expect("region parses"),
            ],
            ..ReconstructOptions::default()
        };
        let fragments = vec![
            fragment("late", 2, 10.0, 210.0),
            fragment("early", 1, 10.0, 10.0),
            fragment("top", 2, 10.0, 10.0),
            fragment("stray", 2, 10.0, 150.0),
        ];

        let inputs = split_regions(&fragments, &[], &options);
        let summary = inputs
            .iter()
            .map(|input| {
                (
                    input.page,
                    input.table_id,
                    input
                        .fragments
                        .iter()
                        .map(|fragment| fragment.text.as_str())
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (1, 1, vec!["early"]),
                (2, 2, vec!["top"]),
                (2, 3, vec!["late"]),
            ]
        );
    }

    #[test]
    fn page_selection_drops_other_pages() {
        let options = ReconstructOptions {
            pages: Some("2".parse::<PageSelection>().expect("selection parses")),
            ..ReconstructOptions::default()
        };
        let fragments = vec![fragment("a1", 1, 0.0, 0.0), fragment("b2", 2, 0.0, 0.0)];

        let inputs = split_regions(&fragments, &[], &options);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].page, 2);
        assert_eq!(inputs[0].table_id, 1);
    }

    #[test]
    fn rulings_merge_per_page_and_clip_to_regions() {
        let rulings = vec![
            PageRuling {
                page: 1,
                horizontal: vec![LineSegment::new(-50.0, 10.0, 300.0, 10.0)],
                vertical: Vec::new(),
            },
            PageRuling {
                page: 1,
                horizontal: vec![LineSegment::new(0.0, 400.0, 100.0, 400.0)],
                vertical: vec![LineSegment::new(50.0, 0.0, 50.0, 90.0)],
            },
        ];

        let merged = ruling_for_page(&rulings, 1).expect("page 1 has ruling lines");
        assert_eq!(merged.horizontal.len(), 2);
        assert!(ruling_for_page(&rulings, 2).is_none());

        let region = "1:0,0,100,100".parse::<TableRegion>().expect("region parses");
        let clipped = ruling_within(&merged, &region);
        assert_eq!(clipped.horizontal, vec![LineSegment::new(0.0, 10.0, 100.0, 10.0)]);
        assert_eq!(clipped.vertical, vec![LineSegment::new(50.0, 0.0, 50.0, 90.0)]);
    }
}
