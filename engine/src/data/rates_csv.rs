use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::{anyhow, Result as AnyResult};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use shared::models::Sample;

use crate::config::SourceSettings;
use crate::error::{EngineError, Result};

// Field parsing for rate exports.
pub mod rate_format {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, NaiveDateTime, Utc};

    pub fn parse_decimal(s: &str) -> Result<f64> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))?;
        if !value.is_finite() {
            return Err(anyhow!("Decimal '{}' is not a finite number", s));
        }
        Ok(value)
    }

    /// RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC.
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|e| anyhow!("Failed to parse timestamp '{}': {}", s, e))
    }

}

/// Which rows of a rate export belong to the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateFilter {
    pub exchange: Option<String>,
    pub pair: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
}

impl RateFilter {
    pub fn from_source(source: &SourceSettings, not_before: Option<DateTime<Utc>>) -> Self {
        RateFilter {
            exchange: source.exchange.clone(),
            pair: source.pair.clone(),
            not_before,
        }
    }
}

pub struct RatesCsvLoader;

impl RatesCsvLoader {
    // CSV Header: time,rate,amount[,exchange,pair]
    // Example Row: 2024-05-01 13:45:10,58231.4,0.25,btc-e,btc_usd
    pub fn load_samples_from_csv(file_path: &str, filter: &RateFilter) -> Result<Vec<Sample>> {
        let file = File::open(file_path)?;
        let samples = Self::load_samples(BufReader::new(file), filter)?;
        tracing::info!(path = %file_path, count = samples.len(), "Loaded rate samples");
        Ok(samples)
    }

    /// Rows come back in file order; ordering is checked downstream.
    pub fn load_samples<R: Read>(reader: R, filter: &RateFilter) -> Result<Vec<Sample>> {
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;

            if !Self::matches_instrument(&record, &headers, filter) {
                skipped += 1;
                continue;
            }

            let sample = Self::parse_record(&record, &headers, line)
                .map_err(|e| EngineError::CsvDataFormatError(e.to_string()))?;

            if filter.not_before.is_some_and(|start| sample.timestamp < start) {
                skipped += 1;
                continue;
            }
            samples.push(sample);
        }

        if skipped > 0 {
            tracing::debug!(skipped, kept = samples.len(), "Filtered rate rows");
        }
        Ok(samples)
    }

    fn parse_record(record: &StringRecord, headers: &StringRecord, line: usize) -> AnyResult<Sample> {
        let time_str = Self::get_field(record, headers, "time")
            .ok_or_else(|| anyhow!("Missing 'time' field in CSV record at line {}", line))?;
        let rate_str = Self::get_field(record, headers, "rate")
            .ok_or_else(|| anyhow!("Missing 'rate' field in CSV record at line {}", line))?;
        let amount_str = Self::get_field(record, headers, "amount")
            .ok_or_else(|| anyhow!("Missing 'amount' field in CSV record at line {}", line))?;

        let timestamp = rate_format::parse_timestamp(time_str)
            .map_err(|e| anyhow!("Error parsing 'time' at line {}: {}", line, e))?;
        let price = rate_format::parse_decimal(rate_str)
            .map_err(|e| anyhow!("Error parsing 'rate' at line {}: {}", line, e))?;
        let volume = rate_format::parse_decimal(amount_str)
            .map_err(|e| anyhow!("Error parsing 'amount' at line {}: {}", line, e))?;

        Ok(Sample::new(timestamp, price, volume))
    }

    // Instrument columns are optional; a filter only applies when its column exists.
    fn matches_instrument(record: &StringRecord, headers: &StringRecord, filter: &RateFilter) -> bool {
        let column_matches = |name: &str, wanted: &Option<String>| match (wanted, Self::get_field(record, headers, name)) {
            (Some(wanted), Some(actual)) => actual == wanted.as_str(),
            _ => true,
        };
        column_matches("exchange", &filter.exchange) && column_matches("pair", &filter.pair)
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    fn btc_filter() -> RateFilter {
        RateFilter {
            exchange: Some("btc-e".to_string()),
            pair: Some("btc_usd".to_string()),
            not_before: None,
        }
    }

    #[test]
    fn test_load_samples_valid_data() {
        let csv_content = "\
time,rate,amount
2024-05-01 00:00:00,100.5,1.25
2024-05-01T00:10:00Z,105,2";
        let tmp_file = create_test_csv(csv_content);
        let samples = RatesCsvLoader::load_samples_from_csv(tmp_file.path().to_str().unwrap(), &btc_filter()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(samples[0].price, 100.5);
        assert_eq!(samples[0].volume_field, 1.25);
        assert_eq!(samples[1].timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 0, 10, 0).unwrap());
        assert_eq!(samples[1].price, 105.0);
    }

    #[test]
    fn test_load_samples_filters_instrument() {
        let csv_content = "\
time,rate,amount,exchange,pair
2024-05-01 00:00:00,100,1,btc-e,btc_usd
2024-05-01 00:01:00,3000,1,btc-e,eth_usd
2024-05-01 00:02:00,101,1,kraken,btc_usd
2024-05-01 00:03:00,102,1,btc-e,btc_usd";
        let samples = RatesCsvLoader::load_samples(csv_content.as_bytes(), &btc_filter()).unwrap();
        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![100.0, 102.0]);
    }

    #[test]
    fn test_load_samples_without_filter_keeps_all_rows() {
        let csv_content = "\
time,rate,amount,exchange,pair
2024-05-01 00:00:00,100,1,btc-e,btc_usd
2024-05-01 00:01:00,3000,1,kraken,eth_usd";
        let samples = RatesCsvLoader::load_samples(csv_content.as_bytes(), &RateFilter::default()).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_load_samples_drops_rows_before_window() {
        let csv_content = "\
time,rate,amount
2024-05-01 00:00:00,100,1
2024-05-01 00:15:00,101,1
2024-05-01 00:30:00,102,1";
        let filter = RateFilter {
            not_before: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 15, 0).unwrap()),
            ..RateFilter::default()
        };
        let samples = RatesCsvLoader::load_samples(csv_content.as_bytes(), &filter).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].price, 101.0);
    }

    #[test]
    fn test_load_samples_header_only() {
        let tmp_file = create_test_csv("time,rate,amount");
        let samples = RatesCsvLoader::load_samples_from_csv(tmp_file.path().to_str().unwrap(), &btc_filter()).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_load_samples_missing_column() {
        let csv_content = "\
time,rate
2024-05-01 00:00:00,100";
        let result = RatesCsvLoader::load_samples(csv_content.as_bytes(), &btc_filter());
        match result {
            Err(EngineError::CsvDataFormatError(msg)) => assert!(msg.contains("Missing 'amount' field")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_samples_invalid_rate() {
        let csv_content = "\
time,rate,amount
2024-05-01 00:00:00,abc,1";
        let err = RatesCsvLoader::load_samples(csv_content.as_bytes(), &btc_filter()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CSV data format error"));
        assert!(msg.contains("Error parsing 'rate' at line 2"));
        assert!(msg.contains("Failed to parse decimal 'abc'"));
    }

    #[test]
    fn test_load_samples_ragged_row_is_csv_error() {
        let csv_content = "\
time,rate,amount
2024-05-01 00:00:00,100";
        let err = RatesCsvLoader::load_samples(csv_content.as_bytes(), &btc_filter()).unwrap_err();
        assert!(matches!(err, EngineError::CsvSystemError { .. }));
    }

    #[test]
    fn test_load_samples_file_not_found() {
        let err = RatesCsvLoader::load_samples_from_csv("non_existent_file.csv", &btc_filter()).unwrap_err();
        assert!(matches!(err, EngineError::IoError { .. }));
    }
}
