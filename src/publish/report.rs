//! Publish outcomes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::PublishState;
use crate::database::DatabaseError;
use crate::sql::{LoadMode, SerializationError};

/// Why a publish failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishError {
    /// A connection or transaction could not be acquired or committed
    #[error("Connection error: {0}")]
    Connection(DatabaseError),

    /// A record could not be encoded or rendered
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The store rejected a clear or load statement
    #[error("Execution error: {0}")]
    Execution(DatabaseError),

    /// The move operation failed
    #[error("Procedure error: {0}")]
    Procedure(DatabaseError),
}

impl PublishError {
    /// Short name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Connection(_) => "connection",
            PublishError::Serialization(_) => "serialization",
            PublishError::Execution(_) => "execution",
            PublishError::Procedure(_) => "procedure",
        }
    }
}

/// A publish that did not reach `Published`
///
/// Production data is unchanged: everything the publish sent was rolled back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Publish {job_id} of '{dataset}' failed after reaching '{reached}': {error}")]
pub struct PublishFailure {
    pub job_id: Uuid,
    pub dataset: String,
    /// Last state reached before the failure
    pub reached: PublishState,
    #[source]
    pub error: PublishError,
}

/// Summary of a committed publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReport {
    pub job_id: Uuid,
    pub dataset: String,
    pub staging_table: String,
    /// Scope value as its SQL literal, for scoped datasets
    pub scope: Option<String>,
    pub rows: usize,
    /// Load statements executed
    pub statements: usize,
    /// Rows in each load statement, in execution order
    pub rows_per_statement: Vec<usize>,
    pub load_mode: LoadMode,
    /// SHA-256 of the encoded rows and scope
    pub content_hash: String,
    pub duration_ms: u64,
    pub state: PublishState,
}

/// JSON shape of a failure, for the command line
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary<'a> {
    pub job_id: Uuid,
    pub dataset: &'a str,
    pub reached: PublishState,
    pub state: PublishState,
    pub kind: &'static str,
    pub message: String,
}

impl PublishFailure {
    pub fn summary(&self) -> FailureSummary<'_> {
        FailureSummary {
            job_id: self.job_id,
            dataset: &self.dataset,
            reached: self.reached,
            state: PublishState::Failed,
            kind: self.error.kind(),
            message: self.error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = PublishFailure {
            job_id: Uuid::nil(),
            dataset: "pd_stats".to_string(),
            reached: PublishState::Loaded,
            error: PublishError::Procedure(DatabaseError::QueryFailed(
                "procedure usp_move_pd_stats does not exist".to_string(),
            )),
        };

        let message = failure.to_string();
        assert!(message.contains("'pd_stats'"));
        assert!(message.contains("'loaded'"));
        assert!(message.contains("usp_move_pd_stats"));
        assert_eq!(failure.summary().kind, "procedure");
    }

    #[test]
    fn test_serialization_error_converts() {
        let error: PublishError = SerializationError::MissingRequired {
            column: "ticker".to_string(),
        }
        .into();
        assert_eq!(error.kind(), "serialization");
    }
}
