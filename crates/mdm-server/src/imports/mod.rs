//! Bulk import engine
//!
//! An upload becomes an import job in the [`JobRegistry`], runs to a terminal
//! state on an [`ImportExecutor`] task, and is observed through the
//! [`ProgressReporter`]. Rows that fail are kept on the job with their original
//! position so callers can fix them and push them one at a time through the
//! [`RetryCoordinator`].

pub mod error;
pub mod executor;
pub mod job;
pub mod parser;
pub mod registry;
pub mod reporter;
pub mod retry;
pub mod store;
pub mod validator;

pub use error::{ImportError, ParseError, RowError, StoreError};
pub use executor::{EmptyFilePolicy, ImportExecutor, ImportSettings};
pub use job::ImportJob;
pub use parser::{FileFormat, Upload};
pub use registry::{JobFilter, JobRegistry};
pub use reporter::ProgressReporter;
pub use retry::{RetryCoordinator, RetryError};
pub use store::{InMemoryRecordStore, PgRecordStore, RecordStore, StoredRecord};
pub use validator::{RowValidator, SchemaValidator, ValidatedRecord};

use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Everything the import routes need, wired to one registry and one store
#[derive(Clone)]
pub struct ImportService {
    registry: JobRegistry,
    executor: ImportExecutor,
    reporter: ProgressReporter,
    retry: RetryCoordinator,
    validator: Arc<dyn RowValidator>,
    store: Arc<dyn RecordStore>,
}

impl ImportService {
    pub fn new(
        validator: Arc<dyn RowValidator>,
        store: Arc<dyn RecordStore>,
        settings: ImportSettings,
    ) -> Self {
        let registry = JobRegistry::new();
        let executor =
            ImportExecutor::new(registry.clone(), validator.clone(), store.clone(), settings);
        Self {
            reporter: ProgressReporter::new(registry.clone()),
            retry: RetryCoordinator::new(validator.clone(), store.clone()),
            registry,
            executor,
            validator,
            store,
        }
    }

    /// Default catalog over a process-local store
    pub fn in_memory(settings: ImportSettings) -> Self {
        Self::new(
            Arc::new(SchemaValidator::default_catalog()),
            Arc::new(InMemoryRecordStore::new()),
            settings,
        )
    }

    /// Register a job for an upload that is about to arrive
    pub async fn begin_upload(&self, table: &str) -> Uuid {
        self.registry.create(table).await
    }

    pub async fn set_file_name(&self, job_id: Uuid, file_name: &str) -> Result<(), ImportError> {
        self.registry
            .mutate(job_id, |job| job.set_file_name(file_name))
            .await
    }

    /// The upload never arrived intact
    pub async fn abort_upload(&self, job_id: Uuid, reason: &str) -> Result<(), ImportError> {
        let message = format!("Upload could not be received: {}", reason);
        self.registry.mutate(job_id, |job| job.fail_upload(message)).await
    }

    /// Hand a received upload to the executor. Returns immediately.
    pub fn submit(&self, job_id: Uuid, upload: Upload) -> JoinHandle<()> {
        self.executor.spawn(job_id, upload)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    pub fn retry(&self) -> &RetryCoordinator {
        &self.retry
    }

    pub fn validator(&self) -> &dyn RowValidator {
        self.validator.as_ref()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}
