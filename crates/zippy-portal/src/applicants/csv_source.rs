use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::domain::{missing_columns, ApplicantRecord, Dataset};
use super::store::{ApplicantSource, LoadError};

/// Applicant table exported to CSV, with the same column contract as the database.
#[derive(Debug, Clone)]
pub struct CsvApplicantSource {
    path: PathBuf,
}

impl CsvApplicantSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ApplicantSource for CsvApplicantSource {
    fn describe(&self) -> String {
        format!("csv {}", self.path.display())
    }

    async fn load(&self) -> Result<Dataset, LoadError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(path)?;
            parse_dataset(file)
        })
        .await
        .map_err(|err| LoadError::Io(std::io::Error::other(err)))?
    }
}

/// Parses a CSV export; blank cells are treated as nulls.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect();
    let missing = missing_columns(columns.iter().map(String::as_str));
    if !missing.is_empty() {
        return Err(LoadError::SchemaMismatch { missing });
    }

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let mut values: BTreeMap<String, Option<String>> = columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| {
                let value = (!value.is_empty()).then(|| value.to_string());
                (column.clone(), value)
            })
            .collect();

        let row_number = index + 1;
        let mut required = |column: &'static str| {
            values
                .remove(column)
                .flatten()
                .ok_or(LoadError::NullValue { column, row: row_number })
        };
        let state = required("state")?;
        let naics_code = required("naics_code")?;
        let zone_result = required("zone_result")?;

        records.push(ApplicantRecord {
            state,
            city: values.remove("city").flatten(),
            zipcode: values.remove("zipcode").flatten(),
            naics_code,
            zone_result,
            extra: values,
        });
    }

    Ok(Dataset::new(columns, records))
}
