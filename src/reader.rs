//! Logger CSV reading and timestamp parsing.
//!
//! Reads HOBOware CSV exports with polars, every column as text, and
//! converts the index, timestamp and temperature columns into typed
//! readings. Header lookup falls back to prefixes because the timestamp
//! column carries the logger's UTC offset in its name.

use crate::config::{ColumnConfig, ReaderConfig};
use crate::constants::{
    EXPORT_TIMESTAMP_FORMAT, READING_TIMESTAMP_FORMATS, TEMPERATURE_COLUMN_PREFIX,
    TIMESTAMP_COLUMN_PREFIX,
};
use crate::error::{QaqcError, Result};
use crate::models::Reading;
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Read a CSV file with every column typed as text
pub fn read_text_frame(path: &Path, skip_rows: usize) -> Result<DataFrame> {
    if !path.exists() {
        return Err(QaqcError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    Ok(df)
}

/// Resolve a column by exact name, then by header prefix
pub fn resolve_column(df: &DataFrame, name: &str, fallback_prefix: Option<&str>) -> Option<String> {
    let names: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .collect();

    if let Some(exact) = names.iter().find(|n| n.trim() == name) {
        return Some(exact.to_string());
    }

    let prefix = fallback_prefix?;
    names
        .iter()
        .find(|n| n.trim_start().starts_with(prefix))
        .map(|n| n.to_string())
}

/// Borrow a text column, reporting it as missing if absent
pub fn text_column<'a>(df: &'a DataFrame, name: &str, path: &Path) -> Result<&'a StringChunked> {
    let column = df.column(name).map_err(|_| QaqcError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    Ok(column.str()?)
}

/// Read a logger export into an ordered reading series
pub fn read_readings(
    path: &Path,
    columns: &ColumnConfig,
    reader: &ReaderConfig,
) -> Result<Vec<Reading>> {
    let df = read_text_frame(path, reader.skip_rows)?;

    let missing = |column: &str| QaqcError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let timestamp_name = resolve_column(&df, &columns.timestamp, Some(TIMESTAMP_COLUMN_PREFIX))
        .ok_or_else(|| missing(&columns.timestamp))?;
    let temperature_name =
        resolve_column(&df, &columns.temperature, Some(TEMPERATURE_COLUMN_PREFIX))
            .ok_or_else(|| missing(&columns.temperature))?;
    let index_name = resolve_column(&df, &columns.index, None);

    let timestamps = text_column(&df, &timestamp_name, path)?;
    let temperatures = text_column(&df, &temperature_name, path)?;
    let indices = match &index_name {
        Some(name) => Some(text_column(&df, name, path)?),
        None => None,
    };

    let mut readings = Vec::with_capacity(df.height());
    let mut unparsed_values = 0usize;

    for row in 0..df.height() {
        let Some(raw_timestamp) = timestamps.get(row).map(str::trim).filter(|s| !s.is_empty())
        else {
            continue;
        };

        let timestamp =
            parse_timestamp(raw_timestamp).ok_or_else(|| QaqcError::InvalidTimestamp {
                path: path.to_path_buf(),
                row: row + 1,
                value: raw_timestamp.to_string(),
            })?;

        let value = match temperatures.get(row).map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let parsed = raw.parse::<f64>().ok();
                if parsed.is_none() {
                    unparsed_values += 1;
                }
                parsed
            }
            None => None,
        };

        let index = indices
            .and_then(|ca| ca.get(row))
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(row as i64 + 1);

        readings.push(Reading::new(index, timestamp, value));
    }

    if unparsed_values > 0 {
        debug!(
            "{}: {} temperature value(s) could not be parsed and were left missing",
            path.display(),
            unparsed_values
        );
    }

    debug!("Read {} readings from {}", readings.len(), path.display());
    Ok(readings)
}

/// Parse a logger timestamp in any of the accepted formats
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    READING_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Format a timestamp the way exported files carry it
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string()
}

/// Write a frame to CSV with a header row
pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("01/02/24 13:30:00"),
            Some(ts(2024, 1, 2, 13, 30, 0))
        );
        assert_eq!(
            parse_timestamp("01/02/24 01:30:00 PM"),
            Some(ts(2024, 1, 2, 13, 30, 0))
        );
        assert_eq!(
            parse_timestamp("1/2/2024 13:30:00"),
            Some(ts(2024, 1, 2, 13, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-01-02 13:30:00"),
            Some(ts(2024, 1, 2, 13, 30, 0))
        );
        assert_eq!(parse_timestamp("1/2/24 13:30"), Some(ts(2024, 1, 2, 13, 30, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let original = ts(2023, 11, 5, 7, 0, 0);
        let formatted = format_timestamp(&original);
        assert_eq!(formatted, "2023-11-05 07:00:00");
        assert_eq!(parse_timestamp(&formatted), Some(original));
    }

    #[test]
    fn test_read_readings_hobo_export() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("BT_TCSR41_2210.csv");
        fs::write(
            &path,
            "#,\"Date Time, GMT-04:00\",\"Temp, °C\",Coupler Attached\n\
             1,10/01/22 00:00:00,28.5,\n\
             2,10/01/22 01:00:00,,Logged\n\
             3,10/01/22 02:00:00,28.75,\n",
        )
        .unwrap();

        let readings =
            read_readings(&path, &ColumnConfig::default(), &ReaderConfig::default()).unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].index, 1);
        assert_eq!(readings[0].timestamp, ts(2022, 10, 1, 0, 0, 0));
        assert_eq!(readings[0].value, Some(28.5));
        assert_eq!(readings[1].value, None);
        assert_eq!(readings[2].value, Some(28.75));
    }

    #[test]
    fn test_read_readings_with_other_offset_and_title_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("BT_TCSR41_2210.csv");
        fs::write(
            &path,
            "\"Plot Title: 20511234 \"\n\
             #,\"Date Time, GMT-05:00\",\"Temp, °F\"\n\
             7,10/01/22 00:00:00,80.1\n",
        )
        .unwrap();

        let reader = ReaderConfig { skip_rows: 1 };
        let readings = read_readings(&path, &ColumnConfig::default(), &reader).unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].index, 7);
        assert_eq!(readings[0].value, Some(80.1));
    }

    #[test]
    fn test_read_readings_missing_temperature_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("BT_TCSR41_2210.csv");
        fs::write(&path, "#,\"Date Time, GMT-04:00\"\n1,10/01/22 00:00:00\n").unwrap();

        let result = read_readings(&path, &ColumnConfig::default(), &ReaderConfig::default());
        match result {
            Err(QaqcError::MissingColumn { column, .. }) => assert_eq!(column, "Temp, °C"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_read_readings_invalid_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("BT_TCSR41_2210.csv");
        fs::write(
            &path,
            "#,\"Date Time, GMT-04:00\",\"Temp, °C\"\n1,not a time,28.5\n",
        )
        .unwrap();

        let result = read_readings(&path, &ColumnConfig::default(), &ReaderConfig::default());
        assert!(matches!(
            result,
            Err(QaqcError::InvalidTimestamp { row: 1, .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_text_frame(Path::new("/nonexistent/file.csv"), 0);
        assert!(matches!(result, Err(QaqcError::InputNotFound { .. })));
    }
}
