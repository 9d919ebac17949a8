use super::filter::FilteredApplicants;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Dimension the grouped summary is broken down by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    #[default]
    State,
    NaicsCode,
    Both,
}

impl GroupKey {
    pub const fn ordered() -> [Self; 3] {
        [Self::State, Self::NaicsCode, Self::Both]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::State => "State",
            Self::NaicsCode => "NAICS Code",
            Self::Both => "Both",
        }
    }

    pub const fn as_param(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::NaicsCode => "naics_code",
            Self::Both => "both",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping '{0}', expected state, naics_code or both")]
pub struct UnknownGroupKey(pub String);

impl FromStr for GroupKey {
    type Err = UnknownGroupKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "naics" | "naics_code" | "naics code" => Ok(Self::NaicsCode),
            "both" | "state_naics" => Ok(Self::Both),
            _ => Err(UnknownGroupKey(value.to_string())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Value of the grouping key for one group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Single(String),
    Pair { state: String, naics_code: String },
}

impl GroupValue {
    pub fn label(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Pair { state, naics_code } => format!("{state} / {naics_code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: GroupValue,
    pub label: String,
    pub count: usize,
}

/// Per-group record counts, ordered by group value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedSummary {
    pub key: GroupKey,
    pub key_label: &'static str,
    pub groups: Vec<GroupCount>,
}

impl GroupedSummary {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|group| group.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.groups.iter().map(|group| group.count).max().unwrap_or(0)
    }
}

/// Counts filtered records per distinct value of `key`.
pub fn summarize(filtered: &FilteredApplicants<'_>, key: GroupKey) -> GroupedSummary {
    let mut counts: BTreeMap<GroupValue, usize> = BTreeMap::new();
    for record in filtered.iter() {
        let group = match key {
            GroupKey::State => GroupValue::Single(record.state.clone()),
            GroupKey::NaicsCode => GroupValue::Single(record.naics_code.clone()),
            GroupKey::Both => GroupValue::Pair {
                state: record.state.clone(),
                naics_code: record.naics_code.clone(),
            },
        };
        *counts.entry(group).or_default() += 1;
    }

    GroupedSummary {
        key,
        key_label: key.label(),
        groups: counts
            .into_iter()
            .map(|(group, count)| GroupCount {
                label: group.label(),
                group,
                count,
            })
            .collect(),
    }
}

/// Headline numbers shown above the chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplicantMetrics {
    pub count: usize,
    pub eligible_count: usize,
    pub distinct_naics_count: usize,
}

pub fn metrics(filtered: &FilteredApplicants<'_>) -> ApplicantMetrics {
    let eligible_count = filtered.iter().filter(|record| record.is_zone_hit()).count();
    let distinct_naics_count = filtered
        .iter()
        .map(|record| record.naics_code.as_str())
        .collect::<HashSet<_>>()
        .len();

    ApplicantMetrics {
        count: filtered.len(),
        eligible_count,
        distinct_naics_count,
    }
}
