//! CSV report adapter: daily equity history and the trade ledger.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::SymbolReport;
use crate::domain::error::SlopetraderError;
use crate::domain::indicator::{BiasLabel, MaLabel};
use crate::ports::report_port::ReportPort;

#[derive(Default)]
pub struct CsvReportAdapter;

fn report_err(e: csv::Error) -> SlopetraderError {
    SlopetraderError::Report {
        reason: e.to_string(),
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_equity(report: &SymbolReport, path: &Path) -> Result<(), SlopetraderError> {
        let windows: Vec<usize> = report
            .rows
            .first()
            .map(|r| r.ma.keys().copied().collect())
            .unwrap_or_default();

        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        let mut header: Vec<String> = ["date", "open", "high", "low", "close"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(windows.iter().map(|&w| MaLabel(w).to_string()));
        header.extend(windows.iter().map(|&w| BiasLabel(w).to_string()));
        header.extend(
            ["slope", "signal", "action", "shares", "cash", "total"]
                .iter()
                .map(|s| s.to_string()),
        );
        wtr.write_record(&header).map_err(report_err)?;

        for (row, snap) in report.rows.iter().zip(&report.result.history) {
            let bar = &row.bar;
            let mut record = vec![
                bar.date.to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
            ];
            record.extend(windows.iter().map(|&w| opt(row.ma(w))));
            record.extend(windows.iter().map(|&w| opt(row.bias(w))));
            record.push(opt(row.slope));
            record.push(snap.signal.to_string());
            record.push(snap.action.map(|a| a.to_string()).unwrap_or_default());
            record.push(snap.shares.to_string());
            record.push(format!("{:.2}", snap.cash));
            record.push(format!("{:.2}", snap.total));
            wtr.write_record(&record).map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(report: &SymbolReport, path: &Path) -> Result<(), SlopetraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record([
            "date",
            "side",
            "price",
            "shares",
            "commission",
            "balance",
            "holding_days",
            "reason",
        ])
        .map_err(report_err)?;
        for t in &report.result.trades {
            wtr.write_record([
                t.date.to_string(),
                t.side.to_string(),
                t.price.to_string(),
                t.shares.to_string(),
                format!("{:.2}", t.commission),
                format!("{:.2}", t.balance),
                t.holding_days.map(|d| d.to_string()).unwrap_or_default(),
                t.reason.clone(),
            ])
            .map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        report: &SymbolReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SlopetraderError> {
        fs::create_dir_all(output_dir)?;
        let stem = report.entry.file_stem();
        let equity = output_dir.join(format!("{stem}_equity.csv"));
        let trades = output_dir.join(format!("{stem}_trades.csv"));
        Self::write_equity(report, &equity)?;
        Self::write_trades(report, &trades)?;
        tracing::info!(equity = %equity.display(), trades = %trades.display(), "csv report written");
        Ok(vec![equity, trades])
    }
}
