//! CSV file data adapter.
//!
//! Reads `<SYMBOL>_history.csv` files as written by the price download
//! script. Columns are located by header name, so both a plain
//! `date,open,high,low,close,volume` layout and the two-row header layout
//! (`Price,Close,High,Low,Open,Volume` followed by a `Ticker,...` row) load.
//! Rows whose date or numeric fields do not parse are skipped.

use crate::domain::error::FlowtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const FILE_SUFFIX: &str = "_history.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, FlowtraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .skip(1)
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .map(|i| i + 1)
                .ok_or_else(|| FlowtraderError::DataSource {
                    reason: format!("missing {} column", name),
                })
        };
        Ok(Columns {
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", symbol, FILE_SUFFIX))
    }

    fn parse_date(field: &str) -> Option<NaiveDate> {
        // timestamps such as "2024-01-15 00:00:00+08:00" carry the date first
        let date = field.trim().get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    fn parse_record(record: &csv::StringRecord, columns: &Columns) -> Option<OhlcvBar> {
        let date = Self::parse_date(record.get(0)?)?;
        let number = |i: usize| record.get(i)?.trim().parse::<f64>().ok();
        Some(OhlcvBar {
            date,
            open: number(columns.open)?,
            high: number(columns.high)?,
            low: number(columns.low)?,
            close: number(columns.close)?,
            volume: number(columns.volume)?,
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, FlowtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| FlowtraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| FlowtraderError::DataSource {
            reason: format!("CSV parse error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| FlowtraderError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let Some(bar) = Self::parse_record(&record, &columns) else {
                skipped += 1;
                continue;
            };
            if bar.date < start_date || bar.date > end_date {
                continue;
            }
            bars.push(bar);
        }

        if skipped > 0 {
            tracing::debug!(symbol, skipped, "skipped non-numeric rows");
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, FlowtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FlowtraderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| FlowtraderError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(FILE_SUFFIX) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
