//! Grouping store for deployment episodes.
//!
//! Every ingested series lives under its (site code, file number) group
//! and variant tag. The store is the single owner of reading series;
//! later stages swap series in through the methods here.

use crate::error::{QaqcError, Result};
use crate::models::{GroupKey, OffsetMerge, ParsedName, Reconciliation, SourceSeries, Variant};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// All recorded variants of one deployment episode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    variants: BTreeMap<Variant, SourceSeries>,
    reconciliation: Option<Reconciliation>,
    offset_merge: Option<OffsetMerge>,
}

impl Group {
    pub fn get(&self, variant: Variant) -> Option<&SourceSeries> {
        self.variants.get(&variant)
    }

    pub fn get_mut(&mut self, variant: Variant) -> Option<&mut SourceSeries> {
        self.variants.get_mut(&variant)
    }

    pub fn has(&self, variant: Variant) -> bool {
        self.variants.contains_key(&variant)
    }

    pub fn variants(&self) -> impl Iterator<Item = (Variant, &SourceSeries)> {
        self.variants.iter().map(|(variant, series)| (*variant, series))
    }

    pub fn variant_tags(&self) -> Vec<Variant> {
        self.variants.keys().copied().collect()
    }

    /// Source series of the primary logger
    pub fn primary(&self) -> Option<&SourceSeries> {
        self.get(Variant::A)
    }

    pub fn insert(&mut self, variant: Variant, series: SourceSeries) -> Option<SourceSeries> {
        self.variants.insert(variant, series)
    }

    pub fn remove(&mut self, variant: Variant) -> Option<SourceSeries> {
        self.variants.remove(&variant)
    }

    pub fn reconciliation(&self) -> Option<&Reconciliation> {
        self.reconciliation.as_ref()
    }

    pub fn set_reconciliation(&mut self, reconciliation: Reconciliation) {
        self.reconciliation = Some(reconciliation);
    }

    pub fn offset_merge(&self) -> Option<&OffsetMerge> {
        self.offset_merge.as_ref()
    }

    pub fn set_offset_merge(&mut self, merge: OffsetMerge) {
        self.offset_merge = Some(merge);
    }
}

/// Site/file-number grouped reading series
#[derive(Debug, Clone, Default)]
pub struct GroupingStore {
    groups: BTreeMap<GroupKey, Group>,
}

impl GroupingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed file's readings.
    ///
    /// A variant that is already present is left untouched and the
    /// later file is rejected with `DuplicateVariant`.
    pub fn insert(&mut self, parsed: ParsedName, series: SourceSeries) -> Result<()> {
        let group = self.groups.entry(parsed.key.clone()).or_default();

        if group.has(parsed.variant) {
            return Err(QaqcError::DuplicateVariant {
                site_code: parsed.key.site_code,
                file_number: parsed.key.file_number,
                variant: parsed.variant.to_string(),
                file_name: series.source_name,
            });
        }

        group.insert(parsed.variant, series);
        Ok(())
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn get_mut(&mut self, key: &GroupKey) -> Option<&mut Group> {
        self.groups.get_mut(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, GroupKey, Group> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of stored series across all groups
    pub fn series_count(&self) -> usize {
        self.groups.values().map(|g| g.variants.len()).sum()
    }

    /// Groups that have no primary "a" series
    pub fn missing_primary(&self) -> Vec<GroupKey> {
        self.groups
            .iter()
            .filter(|(_, group)| !group.has(Variant::A))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Source names of every stored series
    pub fn source_names(&self) -> Vec<String> {
        self.groups
            .values()
            .flat_map(|group| group.variants.values().map(|s| s.source_name.clone()))
            .collect()
    }
}

/// Groups whose duplicate readings disagree beyond tolerance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationFlags {
    flags: BTreeMap<GroupKey, String>,
}

impl CalculationFlags {
    /// Record a group; the first recorded source name is kept
    pub fn record(&mut self, key: GroupKey, source_name: impl Into<String>) {
        self.flags.entry(key).or_insert_with(|| source_name.into());
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.flags.contains_key(key)
    }

    pub fn source_name(&self, key: &GroupKey) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &str)> {
        self.flags.iter().map(|(key, name)| (key, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
