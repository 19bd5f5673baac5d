//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::backtest::SymbolReport;
use crate::domain::error::SlopetraderError;

/// Port for writing one symbol's backtest report.
pub trait ReportPort {
    /// Write the report under `output_dir` and return the paths written.
    fn write(
        &self,
        report: &SymbolReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SlopetraderError>;
}
