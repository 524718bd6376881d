//! CSV report adapter implementing ReportPort.
//!
//! Writes `equity_curve.csv` and `trades.csv` into the output directory,
//! creating it if needed.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FlowtraderError;
use crate::ports::report_port::ReportPort;

pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const TRADES_FILE: &str = "trades.csv";

pub struct CsvReportAdapter;

fn csv_error(e: csv::Error) -> FlowtraderError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => FlowtraderError::Io(io),
        other => FlowtraderError::DataSource {
            reason: format!("CSV write error: {:?}", other),
        },
    }
}

impl CsvReportAdapter {
    fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), FlowtraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
        wtr.write_record(["date", "equity"]).map_err(csv_error)?;
        for point in &result.equity_curve {
            wtr.write_record([point.date.to_string(), point.equity.round_dp(2).to_string()])
                .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), FlowtraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
        wtr.write_record([
            "entry_bar",
            "exit_bar",
            "entry_date",
            "exit_date",
            "entry_price",
            "exit_price",
            "size",
            "pnl",
        ])
        .map_err(csv_error)?;
        for trade in &result.trades {
            wtr.write_record([
                trade.entry_bar_index.to_string(),
                trade.exit_bar_index.to_string(),
                trade.entry_date.to_string(),
                trade.exit_date.to_string(),
                trade.entry_price.round_dp(4).to_string(),
                trade.exit_price.round_dp(4).to_string(),
                trade.size.round_dp(6).to_string(),
                trade.pnl.round_dp(2).to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), FlowtraderError> {
        let dir = Path::new(output_path);
        fs::create_dir_all(dir)?;
        Self::write_equity(result, &dir.join(EQUITY_FILE))?;
        Self::write_trades(result, &dir.join(TRADES_FILE))?;
        tracing::info!(path = %dir.display(), "report written");
        Ok(())
    }
}
