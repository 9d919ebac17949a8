use super::domain::ApplicantRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-selected constraints. Every field left at its default is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub states: BTreeSet<String>,
    pub naics_codes: BTreeSet<String>,
    pub city: String,
    pub zipcode: String,
    pub ez_only: bool,
}

impl FilterCriteria {
    pub fn is_unrestricted(&self) -> bool {
        self.states.is_empty()
            && self.naics_codes.is_empty()
            && needle(&self.city).is_none()
            && needle(&self.zipcode).is_none()
            && !self.ez_only
    }

    /// Compiles the criteria once so text needles are not re-lowercased per row.
    pub fn matcher(&self) -> ApplicantFilter<'_> {
        ApplicantFilter {
            states: &self.states,
            naics_codes: &self.naics_codes,
            city: needle(&self.city),
            zipcode: needle(&self.zipcode),
            ez_only: self.ez_only,
        }
    }
}

fn needle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Predicate form of [`FilterCriteria`].
#[derive(Debug)]
pub struct ApplicantFilter<'c> {
    states: &'c BTreeSet<String>,
    naics_codes: &'c BTreeSet<String>,
    city: Option<String>,
    zipcode: Option<String>,
    ez_only: bool,
}

impl ApplicantFilter<'_> {
    pub fn matches(&self, record: &ApplicantRecord) -> bool {
        (self.states.is_empty() || self.states.contains(&record.state))
            && (self.naics_codes.is_empty() || self.naics_codes.contains(&record.naics_code))
            && contains_text(record.city.as_deref(), self.city.as_deref())
            && contains_text(record.zipcode.as_deref(), self.zipcode.as_deref())
            && (!self.ez_only || record.is_zone_hit())
    }
}

/// Null values never match an active text filter.
fn contains_text(value: Option<&str>, needle: Option<&str>) -> bool {
    match (needle, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(needle), Some(value)) => value.to_lowercase().contains(needle),
    }
}

/// Records that survived a filter pass, in dataset order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredApplicants<'a> {
    records: Vec<&'a ApplicantRecord>,
}

impl<'a> FilteredApplicants<'a> {
    pub fn records(&self) -> &[&'a ApplicantRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ApplicantRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Keeps the records matching every active criterion.
pub fn apply<'a, I>(records: I, criteria: &FilterCriteria) -> FilteredApplicants<'a>
where
    I: IntoIterator<Item = &'a ApplicantRecord>,
{
    let filter = criteria.matcher();
    FilteredApplicants {
        records: records
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect(),
    }
}
