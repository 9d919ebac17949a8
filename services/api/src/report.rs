use clap::Args;
use std::path::PathBuf;
use zippy_portal::applicants::{
    ApplicantSource, CsvApplicantSource, DataStore, FilterCriteria, GroupKey, PortalView,
    SqlApplicantSource,
};
use zippy_portal::config::AppConfig;
use zippy_portal::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Read applicants from a CSV export instead of the configured database
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Keep only these states (repeatable)
    #[arg(long)]
    pub(crate) state: Vec<String>,
    /// Keep only these NAICS codes (repeatable)
    #[arg(long = "naics")]
    pub(crate) naics: Vec<String>,
    /// Case-insensitive city search
    #[arg(long, default_value = "")]
    pub(crate) city: String,
    /// Zip code search
    #[arg(long, default_value = "")]
    pub(crate) zipcode: String,
    /// Show only Empowerment Zone hits
    #[arg(long)]
    pub(crate) ez_only: bool,
    /// Summary grouping: state, naics or both
    #[arg(long, default_value = "state")]
    pub(crate) group_by: GroupKey,
    /// Maximum number of applicant rows to print
    #[arg(long, default_value_t = 25)]
    pub(crate) limit: usize,
}

impl ReportArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            states: self.state.iter().cloned().collect(),
            naics_codes: self.naics.iter().cloned().collect(),
            city: self.city.clone(),
            zipcode: self.zipcode.clone(),
            ez_only: self.ez_only,
        }
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    match &args.csv {
        Some(path) => {
            let store = DataStore::new(CsvApplicantSource::new(path), config.cache);
            print_report(&store, &args).await
        }
        None => {
            let store = DataStore::new(SqlApplicantSource::new(config.database), config.cache);
            print_report(&store, &args).await
        }
    }
}

async fn print_report<S: ApplicantSource>(
    store: &DataStore<S>,
    args: &ReportArgs,
) -> Result<(), AppError> {
    let view = store.view(args.criteria(), args.group_by).await?;
    print!("{}", render_report(&view, args.limit));
    Ok(())
}

fn render_report(view: &PortalView, limit: usize) -> String {
    let mut out = String::new();
    out.push_str("Tax Credit Eligibility Finder\n");
    out.push_str(&format!(
        "Loaded {} applicants at {}\n",
        view.total_records,
        view.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let metrics = &view.metrics;
    out.push_str(&format!("\nCandidates Found: {}\n", metrics.count));
    out.push_str(&format!("EZ Eligible: {}\n", metrics.eligible_count));
    out.push_str(&format!(
        "Unique NAICS Sectors: {}\n",
        metrics.distinct_naics_count
    ));

    out.push_str(&format!("\nGrouped by {}\n", view.summary.key_label));
    if view.summary.groups.is_empty() {
        out.push_str("- no matching candidates\n");
    }
    for group in &view.summary.groups {
        out.push_str(&format!("- {}: {}\n", group.label, group.count));
    }

    if !view.records.is_empty() {
        out.push_str("\nCandidate details\n");
        out.push_str(&view.columns.join(" | "));
        out.push('\n');
        for record in view.records.iter().take(limit) {
            let cells: Vec<&str> = view
                .columns
                .iter()
                .map(|column| record.field(column).unwrap_or(""))
                .collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        if view.records.len() > limit {
            out.push_str(&format!("... {} more\n", view.records.len() - limit));
        }
    }

    out
}
