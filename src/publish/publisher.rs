//! Staged publishing
//!
//! A publish clears this run's rows from the dataset's staging table, loads
//! the newly encoded rows in bounded batches, then invokes the dataset's move
//! operation. All three steps run in one transaction that commits only after
//! the move succeeds, so a failure at any step leaves both staging and the
//! production target as they were.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::locks::{self, DatasetLocks};
use super::report::{PublishError, PublishFailure, PublishReport};
use super::state::{PublishState, StateTracker};
use crate::database::config::PublishSettings;
use crate::database::{
    DatabaseBackend, DatabaseResult, PublishConfig, QueryResult, Transaction, TransactionError,
    TransactionalExecutor, open_backend,
};
use crate::datasets::{DatasetDescriptor, RowDecoder, RowEncoder};
use crate::models::{Cell, Row};
use crate::sql::literal::serialize_cell;
use crate::sql::{Batch, Dialect, EscapeStyle, LoadMode, SerializationError, Statement};

/// Every statement one publish will run, built before touching the store
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPlan {
    pub dataset: String,
    pub staging_table: String,
    /// Scope value as its SQL literal
    pub scope: Option<String>,
    pub clear: Statement,
    pub load: Batch,
    pub moves: Vec<Statement>,
    pub rows: usize,
    pub load_mode: LoadMode,
    pub content_hash: String,
}

impl PublishPlan {
    /// Encode records and build the plan
    ///
    /// # Errors
    ///
    /// Any record that cannot be encoded, a missing or mistyped scope value,
    /// or a row whose scope column disagrees with the scope.
    pub fn encode<R: Serialize>(
        descriptor: &DatasetDescriptor,
        records: &[R],
        scope: Option<&Cell>,
        settings: &PublishSettings,
        mode: LoadMode,
        dialect: Dialect,
    ) -> Result<Self, PublishError> {
        let rows = RowEncoder::new(descriptor).encode_all(records)?;
        Self::from_rows(descriptor, rows, scope, settings, mode, dialect)
    }

    /// Build the plan for already encoded rows
    pub fn from_rows(
        descriptor: &DatasetDescriptor,
        rows: Vec<Row>,
        scope: Option<&Cell>,
        settings: &PublishSettings,
        mode: LoadMode,
        dialect: Dialect,
    ) -> Result<Self, PublishError> {
        let style = settings.escape_style;
        descriptor.check_scope_value(scope)?;
        if let Some(scope) = scope {
            RowEncoder::new(descriptor).check_scope(&rows, scope)?;
        }

        let load = descriptor
            .statement_builder()
            .with_limits(settings.batch_limits())
            .with_escape_style(style)
            .build(&rows, mode, dialect)?;

        let scope_literal = match (descriptor.scope_column(), scope) {
            (Some((_, column)), Some(value)) => Some(serialize_cell(
                value,
                column.zero_sentinel.as_deref(),
                style,
            )?),
            _ => None,
        };

        Ok(Self {
            dataset: descriptor.name().to_string(),
            staging_table: descriptor.staging_table().to_string(),
            clear: descriptor.clear_statement(scope, mode, dialect, style)?,
            moves: descriptor.move_statements(scope, mode, dialect, style)?,
            content_hash: content_hash(descriptor.name(), scope_literal.as_deref(), &rows),
            scope: scope_literal,
            rows: rows.len(),
            load_mode: mode,
            load,
        })
    }

    /// Plan in literal mode with a given escape style, for display
    pub fn literal<R: Serialize>(
        descriptor: &DatasetDescriptor,
        records: &[R],
        scope: Option<&Cell>,
        settings: &PublishSettings,
        style: EscapeStyle,
    ) -> Result<Self, PublishError> {
        let settings = PublishSettings {
            escape_style: style,
            ..settings.clone()
        };
        Self::encode(
            descriptor,
            records,
            scope,
            &settings,
            LoadMode::Literal,
            Dialect::Postgres,
        )
    }

    /// The plan as one SQL script, statements separated by `;`
    ///
    /// Only literal plans are self-contained; parameterized ones keep their
    /// placeholders.
    pub fn to_sql(&self) -> String {
        std::iter::once(&self.clear)
            .chain(&self.load.statements)
            .chain(&self.moves)
            .map(|s| {
                let sql = s.sql();
                if sql.ends_with(';') {
                    format!("{}\n", sql)
                } else {
                    format!("{};\n", sql)
                }
            })
            .collect()
    }
}

/// SHA-256 over dataset, scope and every cell
fn content_hash(dataset: &str, scope: Option<&str>, rows: &[Row]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dataset.as_bytes());
    hasher.update([0x1e]);
    hasher.update(scope.unwrap_or("").as_bytes());
    for row in rows {
        hasher.update([0x1e]);
        for cell in row {
            hasher.update(cell.to_json().to_string().as_bytes());
            hasher.update([0x1f]);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Publishes datasets through one backend
pub struct StagingPublisher {
    executor: TransactionalExecutor,
    settings: PublishSettings,
    locks: Option<Arc<DatasetLocks>>,
}

impl StagingPublisher {
    /// Create a publisher
    ///
    /// When `settings.lock_datasets` is set, publishes to the same staging
    /// table through this publisher run one at a time.
    pub fn new(backend: Arc<dyn DatabaseBackend>, settings: PublishSettings) -> Self {
        let locks = settings
            .lock_datasets
            .then(|| Arc::new(DatasetLocks::new()));
        Self {
            executor: TransactionalExecutor::new(backend),
            settings,
            locks,
        }
    }

    /// Open the configured backend and create a publisher for it
    pub fn from_config(config: &PublishConfig) -> DatabaseResult<Self> {
        Ok(Self::new(open_backend(config)?, config.publish.clone()))
    }

    /// Share a lock registry with other publishers in the process
    pub fn with_locks(mut self, locks: Arc<DatasetLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn DatabaseBackend> {
        self.executor.backend()
    }

    /// Build the plan a publish would run, without running it
    ///
    /// # Errors
    ///
    /// Besides encoding errors, an escape style the backend would misread.
    pub fn plan<R: Serialize>(
        &self,
        descriptor: &DatasetDescriptor,
        records: &[R],
        scope: Option<&Cell>,
    ) -> Result<PublishPlan, PublishError> {
        self.check_escape_style()?;
        PublishPlan::encode(
            descriptor,
            records,
            scope,
            &self.settings,
            self.settings.load_mode,
            self.backend().dialect(),
        )
    }

    /// Publish records to a dataset
    ///
    /// # Arguments
    ///
    /// * `descriptor` - Dataset to publish
    /// * `records` - Complete snapshot for the scope (an empty slice clears it)
    /// * `scope` - Scope value; required for scoped datasets, `None` otherwise
    ///
    /// # Returns
    ///
    /// The report of the committed publish, or the failure. On failure nothing
    /// the publish did is visible in the store.
    pub fn publish<R: Serialize>(
        &self,
        descriptor: &DatasetDescriptor,
        records: &[R],
        scope: Option<&Cell>,
    ) -> Result<PublishReport, PublishFailure> {
        let job_id = Uuid::new_v4();
        let start = Instant::now();

        let plan = self
            .plan(descriptor, records, scope)
            .map_err(|error| failed(job_id, descriptor, PublishState::Idle, error))?;
        self.execute(job_id, start, plan)
    }

    /// Publish already encoded rows
    pub fn publish_rows(
        &self,
        descriptor: &DatasetDescriptor,
        rows: Vec<Row>,
        scope: Option<&Cell>,
    ) -> Result<PublishReport, PublishFailure> {
        let job_id = Uuid::new_v4();
        let start = Instant::now();

        let plan = self
            .check_escape_style()
            .and_then(|()| {
                PublishPlan::from_rows(
                    descriptor,
                    rows,
                    scope,
                    &self.settings,
                    self.settings.load_mode,
                    self.backend().dialect(),
                )
            })
            .map_err(|error| failed(job_id, descriptor, PublishState::Idle, error))?;
        self.execute(job_id, start, plan)
    }

    /// Publish, logging instead of returning a failure
    ///
    /// For callers that treat publishing as best effort. A `None` means the
    /// target still holds its previous data.
    pub fn publish_or_log<R: Serialize>(
        &self,
        descriptor: &DatasetDescriptor,
        records: &[R],
        scope: Option<&Cell>,
    ) -> Option<PublishReport> {
        match self.publish(descriptor, records, scope) {
            Ok(report) => Some(report),
            Err(failure) => {
                tracing::error!(
                    job_id = %failure.job_id,
                    dataset = %failure.dataset,
                    reached = %failure.reached,
                    error = %failure.error,
                    "Publish failed, previous data left in place"
                );
                None
            }
        }
    }

    /// Read the staged rows of a dataset, optionally for one scope
    pub fn read_staged(
        &self,
        descriptor: &DatasetDescriptor,
        scope: Option<&Cell>,
    ) -> Result<QueryResult, PublishError> {
        let select = descriptor.select_statement(scope, self.backend().dialect())?;
        self.executor
            .run(|tx| tx.query(select.sql(), select.params()))
            .map_err(|e| match e {
                TransactionError::Begin(e) | TransactionError::Commit(e) => {
                    PublishError::Connection(e)
                }
                TransactionError::Work(e) => PublishError::Execution(e),
            })
    }

    /// Read staged rows back as records
    pub fn read_staged_records<R: DeserializeOwned>(
        &self,
        descriptor: &DatasetDescriptor,
        scope: Option<&Cell>,
    ) -> Result<Vec<R>, PublishError> {
        let result = self.read_staged(descriptor, scope)?;
        Ok(RowDecoder::new(descriptor).decode_all(&result.rows)?)
    }

    fn check_escape_style(&self) -> Result<(), PublishError> {
        let dialect = self.backend().dialect();
        let style = self.settings.escape_style;
        if style != dialect.escape_style() {
            return Err(SerializationError::EscapeStyleMismatch { style, dialect }.into());
        }
        Ok(())
    }

    fn execute(
        &self,
        job_id: Uuid,
        start: Instant,
        plan: PublishPlan,
    ) -> Result<PublishReport, PublishFailure> {
        tracing::info!(
            job_id = %job_id,
            dataset = %plan.dataset,
            rows = plan.rows,
            statements = plan.load.len(),
            "Publishing dataset"
        );

        let handle = self
            .locks
            .as_ref()
            .map(|locks| locks.handle(&plan.staging_table));
        let _guard = handle.as_deref().map(locks::acquire);

        let mut tracker = StateTracker::new();
        let outcome = self.executor.run(|tx| run_stages(tx, &plan, &mut tracker));

        let error = match outcome {
            Ok(()) => {
                tracker.advance(PublishState::Published);
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    job_id = %job_id,
                    dataset = %plan.dataset,
                    rows = plan.rows,
                    duration_ms,
                    "Published dataset"
                );
                return Ok(PublishReport {
                    job_id,
                    statements: plan.load.len(),
                    rows_per_statement: plan.load.row_counts(),
                    dataset: plan.dataset,
                    staging_table: plan.staging_table,
                    scope: plan.scope,
                    rows: plan.rows,
                    load_mode: plan.load_mode,
                    content_hash: plan.content_hash,
                    duration_ms,
                    state: tracker.current(),
                });
            }
            Err(TransactionError::Begin(e)) | Err(TransactionError::Commit(e)) => {
                PublishError::Connection(e)
            }
            Err(TransactionError::Work(e)) => e,
        };

        let reached = tracker.current();
        tracing::warn!(
            job_id = %job_id,
            dataset = %plan.dataset,
            reached = %reached,
            error = %error,
            "Publish rolled back"
        );
        Err(PublishFailure {
            job_id,
            dataset: plan.dataset,
            reached,
            error,
        })
    }
}

fn run_stages(
    tx: &mut Transaction,
    plan: &PublishPlan,
    tracker: &mut StateTracker,
) -> Result<(), PublishError> {
    tx.execute(&plan.clear).map_err(PublishError::Execution)?;
    tracker.advance(PublishState::Cleared);

    for (i, statement) in plan.load.statements.iter().enumerate() {
        tx.execute(statement).map_err(PublishError::Execution)?;
        tracing::debug!(
            statement = i + 1,
            of = plan.load.len(),
            rows = statement.row_count(),
            "Loaded batch"
        );
    }
    tracker.advance(PublishState::Loaded);

    tracker.advance(PublishState::MoveRequested);
    for statement in &plan.moves {
        tx.execute(statement).map_err(PublishError::Procedure)?;
    }
    Ok(())
}

fn failed(
    job_id: Uuid,
    descriptor: &DatasetDescriptor,
    reached: PublishState,
    error: PublishError,
) -> PublishFailure {
    tracing::warn!(
        job_id = %job_id,
        dataset = descriptor.name(),
        error = %error,
        "Publish rejected before reaching the store"
    );
    PublishFailure {
        job_id,
        dataset: descriptor.name().to_string(),
        reached,
        error,
    }
}
