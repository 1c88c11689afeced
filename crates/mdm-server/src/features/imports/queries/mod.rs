//! Import queries

pub mod get_job;
pub mod get_result;
pub mod list_jobs;
pub mod list_records;
pub mod list_tables;

pub use get_job::{GetJobError, GetJobQuery};
pub use get_result::{GetImportResultError, GetImportResultQuery};
pub use list_jobs::{ListJobsError, ListJobsQuery};
pub use list_records::{ListRecordsError, ListRecordsQuery, RecordListResponse};
pub use list_tables::ListTablesQuery;
