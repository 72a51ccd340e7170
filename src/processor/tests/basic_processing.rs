//! Basic processing integration tests

use super::{fixture_start, write_deployment_log, write_reading_file};
use crate::config::{ColumnConfig, QaqcConfig, ReaderConfig};
use crate::processor::QaqcProcessor;
use crate::reader::read_readings;
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_basic_processing_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    let output = temp_dir.path().join("output");
    let log = temp_dir.path().join("deployment_log.csv");

    write_reading_file(&input, "BT_TCSR41_2401.csv", fixture_start(), &[28.25; 20]);
    write_deployment_log(&log, &[("BT_TCSR41_2401", "00:00:00")]);

    let processor = QaqcProcessor::new(input, log, Some(output.clone())).unwrap();
    let report = processor.process().await.unwrap();

    assert_eq!(report.files_discovered, 1);
    assert_eq!(report.files_ingested, 1);
    assert_eq!(report.series_trimmed, 1);
    assert!(!report.has_issues());

    let cleaned = output.join("BT_TCSR41_2401_2401.csv");
    assert_eq!(report.written, vec![cleaned.clone()]);

    // The cleaned export reads back as the trimmed series
    let readings = read_readings(&cleaned, &ColumnConfig::default(), &ReaderConfig::default()).unwrap();
    assert_eq!(readings.len(), 11);
    assert_eq!(readings[0].index, 5);
    assert_eq!(readings[0].timestamp, fixture_start() + chrono::Duration::hours(4));
    assert!(readings.iter().all(|r| r.value == Some(28.25)));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    let output = temp_dir.path().join("output");
    let log = temp_dir.path().join("deployment_log.csv");

    write_reading_file(&input, "BT_TCSR41_2401.csv", fixture_start(), &[28.0; 20]);
    write_deployment_log(&log, &[("BT_TCSR41_2401", "00:00:00")]);

    let processor = QaqcProcessor::new(input, log, Some(output.clone()))
        .unwrap()
        .with_config(QaqcConfig::default().with_dry_run());
    let report = processor.process().await.unwrap();

    assert_eq!(report.written, vec![output.join("BT_TCSR41_2401_2401.csv")]);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_default_output_path_and_log_in_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().to_path_buf();
    let log = input.join("deployment_log.csv");

    write_reading_file(&input, "BT_TCSR41_2401.csv", fixture_start(), &[28.0; 20]);
    write_deployment_log(&log, &[("BT_TCSR41_2401", "00:00:00")]);

    let processor = QaqcProcessor::new(input.clone(), log, None).unwrap();
    assert_eq!(processor.output_path(), &input.join("processed"));

    let report = processor.process().await.unwrap();

    // The log is not mistaken for a reading file
    assert_eq!(report.files_discovered, 1);
    assert!(!report.has_issues());
    assert!(input.join("processed").join("BT_TCSR41_2401_2401.csv").exists());
}

#[tokio::test]
async fn test_empty_input_directory() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    let log = temp_dir.path().join("deployment_log.csv");
    write_deployment_log(&log, &[]);

    let processor = QaqcProcessor::new(input, log, None).unwrap();
    let report = processor.process().await.unwrap();

    assert_eq!(report.files_discovered, 0);
    assert!(report.written.is_empty());
}
