//! CSV file price source.
//!
//! Columns are located by header name so snapshot exports with extra
//! columns load unchanged. Accepted headers: `date` or `openTime`,
//! `name` or `instrument_id`, and `price`.

use crate::domain::error::RotatorError;
use crate::domain::observation::PriceObservation;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_COLUMNS: &[&str] = &["date", "openTime"];
const INSTRUMENT_COLUMNS: &[&str] = &["name", "instrument_id"];
const PRICE_COLUMNS: &[&str] = &["price"];

/// Formats tried in order when no explicit format is configured.
const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

pub struct CsvAdapter {
    path: PathBuf,
    date_format: Option<String>,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            date_format: None,
        }
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        match &self.date_format {
            Some(fmt) => NaiveDate::parse_from_str(raw, fmt).ok(),
            None => DEFAULT_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok()),
        }
    }

    /// Parses CSV text. Split out from [`PriceSource::fetch_observations`]
    /// so in-memory content can be loaded the same way.
    pub fn parse(&self, content: &str) -> Result<Vec<PriceObservation>, RotatorError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| RotatorError::InputMalformed {
                line: 1,
                reason: format!("unreadable header: {}", e),
            })?
            .clone();
        let date_idx = find_column(&headers, DATE_COLUMNS)?;
        let name_idx = find_column(&headers, INSTRUMENT_COLUMNS)?;
        let price_idx = find_column(&headers, PRICE_COLUMNS)?;

        let mut observations = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RotatorError::InputMalformed {
                line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let field = |idx: usize, column: &str| {
                record
                    .get(idx)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| RotatorError::InputMalformed {
                        line,
                        reason: format!("empty {} field", column),
                    })
            };

            let date_str = field(date_idx, "date")?;
            let date = self
                .parse_date(date_str)
                .ok_or_else(|| RotatorError::InputMalformed {
                    line,
                    reason: format!("invalid date '{}'", date_str),
                })?;

            let instrument_id = field(name_idx, "instrument")?;

            let price_str = field(price_idx, "price")?;
            let price: f64 = price_str
                .replace(['$', ','], "")
                .parse()
                .map_err(|e| RotatorError::InputMalformed {
                    line,
                    reason: format!("invalid price '{}': {}", price_str, e),
                })?;

            observations.push(PriceObservation::new(date, instrument_id, price));
        }

        Ok(observations)
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Result<usize, RotatorError> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        .ok_or_else(|| RotatorError::InputMissingColumn {
            column: names.join("|"),
        })
}

impl PriceSource for CsvAdapter {
    fn fetch_observations(&self) -> Result<Vec<PriceObservation>, RotatorError> {
        let content = fs::read_to_string(&self.path).map_err(|e| RotatorError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        self.parse(&content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn adapter() -> CsvAdapter {
        CsvAdapter::new(PathBuf::from("unused.csv"))
    }

    #[test]
    fn parses_snapshot_export() {
        let content = "date,name,price\n\
            20130602,BTC,122.5\n\
            20130602,LTC,3.05\n\
            20130609,BTC,100.1\n";
        let obs = adapter().parse(content).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0], PriceObservation::new(date(2013, 6, 2), "BTC", 122.5));
        assert_eq!(obs[2].date, date(2013, 6, 9));
    }

    #[test]
    fn accepts_open_time_header_and_extra_columns() {
        let content = "name,openTime,open,price\nETHUSDT,2021-01-05,1000,1100.5\n";
        let obs = adapter().parse(content).unwrap();
        assert_eq!(obs[0].instrument_id, "ETHUSDT");
        assert_eq!(obs[0].date, date(2021, 1, 5));
        assert_eq!(obs[0].price, 1100.5);
    }

    #[test]
    fn strips_currency_formatting() {
        let obs = adapter()
            .parse("date,name,price\n2021-01-05,BTC,\"$31,971.91\"\n")
            .unwrap();
        assert!((obs[0].price - 31_971.91).abs() < 1e-9);
    }

    #[test]
    fn missing_price_column() {
        let err = adapter().parse("date,name\n2021-01-05,BTC\n").unwrap_err();
        assert!(matches!(err, RotatorError::InputMissingColumn { column } if column == "price"));
    }

    #[test]
    fn bad_price_reports_line() {
        let err = adapter()
            .parse("date,name,price\n2021-01-05,BTC,1\n2021-01-06,BTC,abc\n")
            .unwrap_err();
        assert!(matches!(err, RotatorError::InputMalformed { line: 3, .. }));
    }

    #[test]
    fn bad_date_is_malformed() {
        let err = adapter()
            .parse("date,name,price\n05/01/2021,BTC,1\n")
            .unwrap_err();
        assert!(matches!(err, RotatorError::InputMalformed { line: 2, .. }));
    }

    #[test]
    fn explicit_date_format() {
        let obs = adapter()
            .with_date_format("%d.%m.%Y")
            .parse("date,name,price\n16.12.2020,BTC,1\n")
            .unwrap();
        assert_eq!(obs[0].date, date(2020, 12, 16));
    }

    #[test]
    fn header_only_is_no_data() {
        assert!(adapter().parse("date,name,price\n").unwrap().is_empty());
    }

    #[test]
    fn fetch_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "date,name,price\n2021-01-05,BTC,30000\n").unwrap();
        let obs = CsvAdapter::new(path).fetch_observations().unwrap();
        assert_eq!(obs.len(), 1);
    }

    #[test]
    fn fetch_missing_file_is_a_source_error() {
        let dir = TempDir::new().unwrap();
        let err = CsvAdapter::new(dir.path().join("nope.csv"))
            .fetch_observations()
            .unwrap_err();
        assert!(matches!(err, RotatorError::DataSource { .. }));
    }
}
