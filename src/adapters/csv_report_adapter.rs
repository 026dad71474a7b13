//! CSV report writer: `trades.csv`, `valuations.csv` and `curves.csv`.

use crate::domain::engine::SimulationResult;
use crate::domain::error::RotatorError;
use crate::domain::metrics::CurvePoint;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const TRADES_FILE: &str = "trades.csv";
pub const VALUATIONS_FILE: &str = "valuations.csv";
pub const CURVES_FILE: &str = "curves.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn write_rows<'a, T: Serialize + 'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a T>,
) -> Result<(), RotatorError> {
    let to_io = |e: csv::Error| {
        RotatorError::Io(std::io::Error::other(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )))
    };
    let mut wtr = csv::Writer::from_path(path).map_err(to_io)?;
    for row in rows {
        wtr.serialize(row).map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &SimulationResult,
        curves: &[CurvePoint],
        output_dir: &Path,
    ) -> Result<(), RotatorError> {
        fs::create_dir_all(output_dir)?;
        write_rows(&output_dir.join(TRADES_FILE), result.trades.iter())?;
        write_rows(&output_dir.join(VALUATIONS_FILE), result.valuations.iter())?;
        write_rows(&output_dir.join(CURVES_FILE), curves.iter())?;
        Ok(())
    }
}
