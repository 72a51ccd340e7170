//! Offset logger merging.
//!
//! Loggers "c" and "d" cover the same site with shifted start times. They
//! are combined with a full outer join on timestamp so the overlap can be
//! inspected side by side.

use crate::models::{OffsetMerge, OffsetRow, Reading};
use chrono::NaiveDateTime;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Full outer join of two series on timestamp.
///
/// Output rows are sorted by timestamp and each timestamp appears once.
/// If one input repeats a timestamp, its first reading is kept.
pub fn merge_offset(c: &[Reading], d: &[Reading]) -> OffsetMerge {
    let mut joined: BTreeMap<NaiveDateTime, OffsetRow> = BTreeMap::new();
    let mut duplicate_timestamps = 0usize;

    for reading in c {
        match joined.entry(reading.timestamp) {
            Entry::Vacant(slot) => {
                slot.insert(OffsetRow {
                    timestamp: reading.timestamp,
                    index_c: Some(reading.index),
                    temp_c: reading.value,
                    index_d: None,
                    temp_d: None,
                });
            }
            Entry::Occupied(_) => duplicate_timestamps += 1,
        }
    }

    let mut seen_d = BTreeSet::new();
    for reading in d {
        if !seen_d.insert(reading.timestamp) {
            duplicate_timestamps += 1;
            continue;
        }
        let row = joined.entry(reading.timestamp).or_insert_with(|| OffsetRow {
            timestamp: reading.timestamp,
            index_c: None,
            temp_c: None,
            index_d: None,
            temp_d: None,
        });
        row.index_d = Some(reading.index);
        row.temp_d = reading.value;
    }

    OffsetMerge {
        rows: joined.into_values().collect(),
        duplicate_timestamps,
    }
}
