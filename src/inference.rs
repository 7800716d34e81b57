//! Optional structure-inference collaborator consulted for low-confidence
//! regions.
//!
//! The deterministic pipeline never depends on it: an engine that fails or
//! returns nothing leaves the deterministic records in place.

use tracing::{info, warn};

use crate::model::{Fragment, ValueRecord};
use crate::options::TableRegion;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything an engine gets to see about one region.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    pub page: u32,
    pub table_id: usize,
    /// `None` when the region is the whole page.
    pub region: Option<&'a TableRegion>,
    pub fragments: &'a [Fragment],
    /// What the deterministic pipeline produced, as a hint.
    pub deterministic: &'a [ValueRecord],
    pub confidence: f32,
}

pub trait StructureInference: Send + Sync {
    /// Infers value records for the requested region.
    ///
    /// # Errors
    ///
    /// Any engine failure. The caller logs it and keeps the deterministic
    /// records.
    fn infer_structure(&self, request: &InferenceRequest<'_>) -> Result<Vec<ValueRecord>, BoxError>;

    /// Name used in logs and warnings.
    fn name(&self) -> &str;
}

/// Runs `engine` and returns its records stamped with the request's page and
/// table id, or `None` when it failed or produced nothing.
pub(crate) fn run_fallback(
    engine: &dyn StructureInference,
    request: &InferenceRequest<'_>,
) -> Option<Vec<ValueRecord>> {
    match engine.infer_structure(request) {
        Ok(records) if records.is_empty() => {
            info!(
                engine = engine.name(),
                page = request.page,
                table_id = request.table_id,
                "structure inference returned no records"
            );
            None
        }
        Ok(records) => Some(
            records
                .into_iter()
                .map(|record| ValueRecord {
                    page: request.page,
                    table_id: request.table_id,
                    ..record
                })
                .collect(),
        ),
        Err(error) => {
            warn!(
                engine = engine.name(),
                page = request.page,
                table_id = request.table_id,
                %error,
                "structure inference failed; keeping deterministic records"
            );
            None
        }
    }
}
