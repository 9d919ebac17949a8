//! Applicant dataset: loading, caching, filtering, summaries and the dashboard.

mod csv_source;
pub mod domain;
pub mod filter;
pub mod page;
mod router;
mod sql;
pub mod store;
pub mod summary;
pub mod view;

pub use csv_source::{parse_dataset, CsvApplicantSource};
pub use domain::{ApplicantRecord, Dataset, NOT_IN_ZONE};
pub use filter::{apply, FilterCriteria, FilteredApplicants};
pub use router::{dashboard_query, parse_dashboard_query, portal_router, ViewRequest};
pub use sql::{connection_url, SqlApplicantSource};
pub use store::{ApplicantSource, DataStore, LoadError, MemoryApplicantSource};
pub use summary::{metrics, summarize, ApplicantMetrics, GroupKey, GroupedSummary};
pub use view::{FilterOptions, PortalView};
