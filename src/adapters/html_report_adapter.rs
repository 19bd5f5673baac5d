//! HTML report adapter implementing ReportPort.
//!
//! One self-contained page per symbol: price panel with moving averages and
//! trade markers, optional bias panel, equity panel when trading is enabled,
//! and the trade ledger.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::chart_svg::{escape_html, render_panel, Marker, Series};
use crate::domain::backtest::SymbolReport;
use crate::domain::error::SlopetraderError;
use crate::domain::indicator::{BiasLabel, MaLabel};
use crate::domain::position::TradeSide;
use crate::ports::report_port::ReportPort;

const COLORS: [&str; 5] = ["orange", "teal", "purple", "olive", "steelblue"];

const STYLE: &str = "body{font-family:sans-serif;margin:24px;color:#222}\
table{border-collapse:collapse;margin-top:12px}\
td,th{border:1px solid #ccc;padding:4px 8px;text-align:right}\
th{background:#f3f3f3}.chart{display:block;margin:12px 0}\
.title{font-weight:bold;font-size:14px}.legend{font-size:11px}";

pub struct HtmlReportAdapter {
    show_bias: bool,
    show_equity: bool,
}

impl HtmlReportAdapter {
    pub fn new(show_bias: bool, show_equity: bool) -> Self {
        Self {
            show_bias,
            show_equity,
        }
    }

    pub fn file_name(report: &SymbolReport) -> String {
        format!("{}_report.html", report.entry.file_stem())
    }

    fn price_panel(report: &SymbolReport) -> String {
        let rows = &report.rows;
        let mut series = vec![Series {
            label: "Close".to_string(),
            color: "black",
            values: rows.iter().map(|r| Some(r.close())).collect(),
        }];
        let windows = rows.first().map(|r| r.ma.keys().copied().collect::<Vec<_>>());
        for (i, w) in windows.unwrap_or_default().into_iter().enumerate() {
            series.push(Series {
                label: MaLabel(w).to_string(),
                color: COLORS[i % COLORS.len()],
                values: rows.iter().map(|r| r.ma(w)).collect(),
            });
        }

        let markers: Vec<Marker> = report
            .result
            .history
            .iter()
            .zip(rows)
            .enumerate()
            .filter_map(|(i, (snap, row))| {
                snap.action.map(|side| match side {
                    TradeSide::Buy => Marker {
                        index: i,
                        value: row.bar.low * 0.98,
                        up: true,
                    },
                    TradeSide::Sell => Marker {
                        index: i,
                        value: row.bar.high * 1.02,
                        up: false,
                    },
                })
            })
            .collect();

        render_panel(&report.entry.label(), &series, &markers, false, 420.0)
    }

    fn bias_panel(report: &SymbolReport) -> String {
        let rows = &report.rows;
        let windows = rows
            .first()
            .map(|r| r.bias.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        let series: Vec<Series> = windows
            .into_iter()
            .enumerate()
            .map(|(i, w)| Series {
                label: BiasLabel(w).to_string(),
                color: COLORS[i % COLORS.len()],
                values: rows.iter().map(|r| r.bias(w)).collect(),
            })
            .collect();
        render_panel("BIAS (%)", &series, &[], true, 200.0)
    }

    fn equity_panel(report: &SymbolReport) -> String {
        let series = [Series {
            label: "Total".to_string(),
            color: "teal",
            values: report.result.history.iter().map(|s| Some(s.total)).collect(),
        }];
        render_panel("Account value", &series, &[], false, 200.0)
    }

    fn summary(report: &SymbolReport) -> String {
        let r = &report.result;
        let mut out = String::from("<table><tr><th>Start</th><th>End</th><th>Initial</th><th>Final</th><th>Return</th><th>Trades</th><th>Commission</th></tr>");
        let first = r.history.first().map(|s| s.date.to_string()).unwrap_or_default();
        let last = r.history.last().map(|s| s.date.to_string()).unwrap_or_default();
        let _ = write!(
            out,
            "<tr><td>{first}</td><td>{last}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}%</td><td>{}</td><td>{:.2}</td></tr></table>",
            r.initial_capital,
            r.final_total(),
            r.total_return_pct(),
            r.trades.len(),
            r.total_commission()
        );
        out
    }

    fn trade_table(report: &SymbolReport) -> String {
        let trades = &report.result.trades;
        if trades.is_empty() {
            return "<p>No trades.</p>".to_string();
        }
        let mut out = String::from(
            "<table><tr><th>Date</th><th>Side</th><th>Price</th><th>Shares</th>\
             <th>Commission</th><th>Balance</th><th>Held</th><th>Reason</th></tr>",
        );
        for t in trades {
            let held = t.holding_days.map(|d| d.to_string()).unwrap_or_default();
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{held}</td><td>{}</td></tr>",
                t.date,
                t.side,
                t.price,
                t.shares,
                t.commission,
                t.balance,
                escape_html(&t.reason)
            );
        }
        out.push_str("</table>");
        out
    }

    pub fn render(&self, report: &SymbolReport) -> String {
        let kind = if self.show_equity {
            "backtest"
        } else {
            "trend analysis"
        };
        let title = escape_html(&format!("{} {kind} report", report.entry.label()));

        let mut body = String::new();
        let _ = write!(body, "<h1>{title}</h1>");
        if self.show_equity {
            body.push_str(&Self::summary(report));
        }
        body.push_str(&Self::price_panel(report));
        if self.show_bias {
            body.push_str(&Self::bias_panel(report));
        }
        if self.show_equity {
            body.push_str(&Self::equity_panel(report));
            body.push_str("<h2>Trades</h2>");
            body.push_str(&Self::trade_table(report));
        }

        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
             <style>{STYLE}</style></head><body>{body}</body></html>\n"
        )
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(
        &self,
        report: &SymbolReport,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SlopetraderError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(Self::file_name(report));
        fs::write(&path, self.render(report))?;
        tracing::info!(path = %path.display(), "report written");
        Ok(vec![path])
    }
}
