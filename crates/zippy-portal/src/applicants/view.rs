use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::domain::{ApplicantRecord, Dataset};
use super::filter::{apply, FilterCriteria};
use super::summary::{metrics, summarize, ApplicantMetrics, GroupKey, GroupedSummary};

/// Choices offered by the multi-select controls, taken from the unfiltered data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub states: Vec<String>,
    pub naics_codes: Vec<String>,
}

impl FilterOptions {
    /// Distinct values in order of first appearance.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            states: distinct(dataset.records().iter().map(|r| r.state.as_str())),
            naics_codes: distinct(dataset.records().iter().map(|r| r.naics_code.as_str())),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

/// Everything the dashboard shows for one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct PortalView {
    pub criteria: FilterCriteria,
    pub group_by: GroupKey,
    pub options: FilterOptions,
    pub metrics: ApplicantMetrics,
    pub summary: GroupedSummary,
    pub columns: Vec<String>,
    pub records: Vec<ApplicantRecord>,
    pub total_records: usize,
    pub loaded_at: DateTime<Utc>,
}

impl PortalView {
    pub fn build(dataset: &Dataset, criteria: FilterCriteria, group_by: GroupKey) -> Self {
        let filtered = apply(dataset.records(), &criteria);
        let metrics = metrics(&filtered);
        let summary = summarize(&filtered, group_by);
        let records = filtered.iter().cloned().collect();

        Self {
            options: FilterOptions::from_dataset(dataset),
            metrics,
            summary,
            columns: dataset.columns().to_vec(),
            records,
            total_records: dataset.len(),
            loaded_at: dataset.loaded_at(),
            criteria,
            group_by,
        }
    }
}
