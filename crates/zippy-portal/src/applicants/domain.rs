use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `zone_result` value meaning the applicant is not in an Empowerment Zone.
pub const NOT_IN_ZONE: &str = "N/A";

/// Columns every applicant table must expose.
pub const REQUIRED_COLUMNS: [&str; 5] = ["state", "city", "zipcode", "naics_code", "zone_result"];

/// One candidate row from the applicant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub state: String,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub naics_code: String,
    pub zone_result: String,
    /// Remaining columns, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<String>>,
}

impl ApplicantRecord {
    pub fn is_zone_hit(&self) -> bool {
        self.zone_result != NOT_IN_ZONE
    }

    /// Text of a column by name, `None` for nulls and unknown columns.
    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            "state" => Some(self.state.as_str()),
            "city" => self.city.as_deref(),
            "zipcode" => self.zipcode.as_deref(),
            "naics_code" => Some(self.naics_code.as_str()),
            "zone_result" => Some(self.zone_result.as_str()),
            other => self.extra.get(other).and_then(|value| value.as_deref()),
        }
    }
}

/// Snapshot of the full applicant table.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<ApplicantRecord>,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<ApplicantRecord>) -> Self {
        Self {
            columns,
            records,
            loaded_at: Utc::now(),
        }
    }

    /// Builds a dataset whose column list is just the required columns.
    pub fn from_records(records: Vec<ApplicantRecord>) -> Self {
        let columns = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        Self::new(columns, records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ApplicantRecord] {
        &self.records
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Returns the required columns absent from `columns`, in canonical order.
pub fn missing_columns<'a, I>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = columns.into_iter().collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.contains(required))
        .map(|required| required.to_string())
        .collect()
}
