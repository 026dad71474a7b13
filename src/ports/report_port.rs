//! Report generation port trait.

use crate::domain::engine::SimulationResult;
use crate::domain::error::RotatorError;
use crate::domain::metrics::CurvePoint;
use std::path::Path;

/// Port for persisting the logs and derived series of a finished run.
pub trait ReportPort {
    fn write(
        &self,
        result: &SimulationResult,
        curves: &[CurvePoint],
        output_dir: &Path,
    ) -> Result<(), RotatorError>;
}
