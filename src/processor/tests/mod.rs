//! Integration tests for the processor module
//!
//! Tests the complete processing pipeline using generated HOBO exports and
//! deployment logs in temporary directories.

pub mod basic_processing;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

/// Jan 2 2024, midnight
pub fn fixture_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Write an hourly HOBO export with one temperature per row
pub fn write_reading_file(dir: &Path, name: &str, start: NaiveDateTime, values: &[f64]) -> PathBuf {
    let mut contents = String::from("#,\"Date Time, GMT-04:00\",\"Temp, °C\"\n");
    for (i, value) in values.iter().enumerate() {
        let timestamp = start + Duration::hours(i as i64);
        contents.push_str(&format!(
            "{},{},{}\n",
            i + 1,
            timestamp.format("%m/%d/%y %H:%M:%S"),
            value
        ));
    }
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Write a deployment log; each row is (file name, time in)
pub fn write_deployment_log(path: &Path, rows: &[(&str, &str)]) {
    let mut contents =
        String::from("Offloaded Filename,Date In,Time In,Date Full,Date Out,Time Out\n");
    for (name, time_in) in rows {
        contents.push_str(&format!(
            "{},1/2/2024,{},Jan 2024,1/31/2024,00:00:00\n",
            name, time_in
        ));
    }
    fs::write(path, contents).unwrap();
}
