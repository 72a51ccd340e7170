//! Duplicate logger reconciliation.
//!
//! Two loggers deployed side by side ("a" and "b") are compared position
//! by position. Readings that agree within the tolerance are averaged;
//! readings that disagree are left missing and flagged so the group can
//! be reviewed by hand. Every position keeps an audit row.

use crate::config::{LengthPolicy, ReconcilePolicy};
use crate::constants::DIFFERENCE_ROUNDING;
use crate::error::{QaqcError, Result};
use crate::models::{GroupKey, Reading, ReconciledRow, Reconciliation};
use tracing::debug;

/// Reconcile an a/b pair under the configured policy.
///
/// On a length mismatch the `Skip` policy returns `LengthMismatch`; the
/// `Truncate` policy reconciles the common prefix and records the
/// original lengths in `truncated_from`.
pub fn reconcile_pair(
    key: &GroupKey,
    a: &[Reading],
    b: &[Reading],
    policy: &ReconcilePolicy,
) -> Result<Reconciliation> {
    let truncated_from = if a.len() != b.len() {
        match policy.length_policy {
            LengthPolicy::Skip => {
                return Err(QaqcError::LengthMismatch {
                    site_code: key.site_code.clone(),
                    file_number: key.file_number.clone(),
                    len_a: a.len(),
                    len_b: b.len(),
                });
            }
            LengthPolicy::Truncate => Some((a.len(), b.len())),
        }
    } else {
        None
    };

    let mut misaligned = 0usize;
    let rows: Vec<ReconciledRow> = a
        .iter()
        .zip(b.iter())
        .map(|(ra, rb)| {
            if ra.timestamp != rb.timestamp {
                misaligned += 1;
            }
            reconcile_readings(ra, rb, policy.tolerance)
        })
        .collect();

    debug!(
        "Reconciled {}: {} rows, {} flagged, {} misaligned",
        key,
        rows.len(),
        rows.iter().filter(|r| r.flag).count(),
        misaligned
    );

    Ok(Reconciliation {
        rows,
        truncated_from,
        misaligned,
    })
}

/// Audit row for one aligned position
pub fn reconcile_readings(a: &Reading, b: &Reading, tolerance: f64) -> ReconciledRow {
    let (difference, mean, value, flag) = match (a.value, b.value) {
        (Some(va), Some(vb)) => {
            let difference = round_difference((va - vb).abs());
            let mean = (va + vb) / 2.0;
            if difference <= tolerance {
                (Some(difference), Some(mean), Some(mean), false)
            } else {
                (Some(difference), Some(mean), None, true)
            }
        }
        _ => (None, None, None, false),
    };

    ReconciledRow {
        index: a.index,
        timestamp: a.timestamp,
        temp_a: a.value,
        temp_b: b.value,
        difference,
        mean,
        value,
        flag,
    }
}

// Subtraction of decimal readings leaves binary noise (10.2 - 10.0 > 0.2)
fn round_difference(difference: f64) -> f64 {
    (difference * DIFFERENCE_ROUNDING).round() / DIFFERENCE_ROUNDING
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    const EPS: f64 = 1e-12;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn key() -> GroupKey {
        GroupKey::new("TCSR41", "2210")
    }

    fn series(values: &[f64]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Reading::new(i as i64 + 1, ts(0, i as u32), Some(*v)))
            .collect()
    }

    #[test]
    fn test_scenario_one_agreeing_one_disagreeing() {
        let a = vec![
            Reading::new(1, ts(0, 0), Some(10.0)),
            Reading::new(2, ts(0, 1), Some(10.1)),
        ];
        let b = vec![
            Reading::new(1, ts(0, 0), Some(10.25)),
            Reading::new(2, ts(0, 1), Some(12.0)),
        ];

        // 0.25 exceeds the default tolerance, so widen it for the first pair
        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();
        assert!(result.rows[0].flag);

        let policy = ReconcilePolicy {
            tolerance: 0.25,
            ..ReconcilePolicy::default()
        };
        let result = reconcile_pair(&key(), &a, &b, &policy).unwrap();

        assert!((result.rows[0].value.unwrap() - 10.125).abs() < EPS);
        assert!(!result.rows[0].flag);
        assert_eq!(result.rows[1].value, None);
        assert!(result.rows[1].flag);
        assert!(result.is_flagged());
        assert_eq!(result.flagged_count(), 1);
    }

    #[test]
    fn test_within_tolerance_is_averaged() {
        let a = series(&[28.0, 28.1, 28.0]);
        let b = series(&[28.1, 28.3, 27.9]);

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        assert!(!result.is_flagged());
        assert!((result.rows[0].value.unwrap() - 28.05).abs() < EPS);
        assert!((result.rows[1].value.unwrap() - 28.2).abs() < EPS);
        assert!((result.rows[2].value.unwrap() - 27.95).abs() < EPS);
        assert!(result.truncated_from.is_none());
        assert_eq!(result.misaligned, 0);
    }

    #[test]
    fn test_exact_tolerance_boundary_passes() {
        let a = series(&[10.0, 10.1]);
        let b = series(&[10.2, 10.3]);

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        assert!(result.rows.iter().all(|row| !row.flag));
        assert!((result.rows[0].difference.unwrap() - 0.2).abs() < EPS);
        assert!((result.rows[1].value.unwrap() - 10.2).abs() < EPS);
    }

    #[test]
    fn test_just_over_tolerance_is_flagged() {
        let a = series(&[10.0]);
        let b = series(&[10.201]);

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        assert!(result.rows[0].flag);
        assert_eq!(result.rows[0].value, None);
        assert!((result.rows[0].mean.unwrap() - 10.1005).abs() < EPS);
    }

    #[test]
    fn test_missing_value_is_left_missing_without_flag() {
        let a = vec![Reading::new(1, ts(0, 0), None)];
        let b = series(&[10.0]);

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        let row = &result.rows[0];
        assert_eq!(row.difference, None);
        assert_eq!(row.value, None);
        assert!(!row.flag);
        assert_eq!(row.temp_b, Some(10.0));
    }

    #[test]
    fn test_length_mismatch_truncates() {
        let a = series(&[10.0, 10.0, 10.0]);
        let b = series(&[10.1, 10.1]);

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.truncated_from, Some((3, 2)));
    }

    #[test]
    fn test_length_mismatch_skip_policy() {
        let a = series(&[10.0, 10.0, 10.0]);
        let b = series(&[10.1, 10.1]);
        let policy = ReconcilePolicy {
            length_policy: LengthPolicy::Skip,
            ..ReconcilePolicy::default()
        };

        match reconcile_pair(&key(), &a, &b, &policy) {
            Err(QaqcError::LengthMismatch { len_a, len_b, .. }) => {
                assert_eq!((len_a, len_b), (3, 2));
            }
            other => panic!("Expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_misaligned_timestamps_are_counted() {
        let a = series(&[10.0, 10.0]);
        let b = vec![
            Reading::new(1, ts(0, 0), Some(10.0)),
            Reading::new(2, ts(5, 0), Some(10.0)),
        ];

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();

        assert_eq!(result.misaligned, 1);
        assert_eq!(result.rows[1].timestamp, ts(0, 1));
    }

    #[test]
    fn test_reconciled_readings_keep_a_index() {
        let a = vec![Reading::new(41, ts(1, 0), Some(10.0))];
        let b = vec![Reading::new(7, ts(1, 0), Some(10.1))];

        let result = reconcile_pair(&key(), &a, &b, &ReconcilePolicy::default()).unwrap();
        let readings = result.reconciled_readings();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].index, 41);
        assert_eq!(readings[0].timestamp, ts(1, 0));
        assert!((readings[0].value.unwrap() - 10.05).abs() < EPS);
    }
}
