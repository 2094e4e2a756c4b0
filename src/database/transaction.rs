//! Scoped transactions
//!
//! [`TransactionalExecutor::run`] acquires one connection, opens one
//! transaction, hands it to the caller's closure and then either commits
//! (closure succeeded) or rolls back (closure failed or panicked). Exactly one
//! of the two is issued on every path, and the connection is released when
//! the transaction is dropped.

use std::sync::Arc;

use super::{Connection, DatabaseBackend, DatabaseError, DatabaseResult, QueryResult};
use crate::sql::{Param, Statement};

/// Where a transactional unit of work failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransactionError<E> {
    /// No connection, or the transaction could not be opened
    #[error("Could not start transaction: {0}")]
    Begin(DatabaseError),

    /// The unit of work failed and was rolled back
    #[error("{0}")]
    Work(E),

    /// The unit of work succeeded but the commit failed
    #[error("Commit failed: {0}")]
    Commit(DatabaseError),
}

/// Runs units of work inside a single transaction each
#[derive(Clone)]
pub struct TransactionalExecutor {
    backend: Arc<dyn DatabaseBackend>,
}

impl TransactionalExecutor {
    pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn DatabaseBackend> {
        &self.backend
    }

    /// Run `work` in a fresh transaction
    ///
    /// # Returns
    /// The closure's value once committed, or where the attempt failed
    pub fn run<T, E>(
        &self,
        work: impl FnOnce(&mut Transaction) -> Result<T, E>,
    ) -> Result<T, TransactionError<E>> {
        let mut conn = self.backend.acquire().map_err(TransactionError::Begin)?;
        conn.begin().map_err(TransactionError::Begin)?;

        let mut tx = Transaction {
            conn,
            finished: false,
            statements: 0,
        };

        match work(&mut tx) {
            Ok(value) => {
                tx.commit().map_err(TransactionError::Commit)?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(TransactionError::Work(e))
            }
        }
    }
}

/// An open transaction on an exclusively held connection
pub struct Transaction {
    conn: Box<dyn Connection>,
    finished: bool,
    statements: usize,
}

impl Transaction {
    /// Execute a generated statement
    ///
    /// # Returns
    /// Number of rows affected
    pub fn execute(&mut self, statement: &Statement) -> DatabaseResult<u64> {
        self.statements += 1;
        self.conn.execute_statement(statement)
    }

    /// Execute raw SQL without parameters
    pub fn execute_batch(&mut self, sql: &str) -> DatabaseResult<()> {
        self.statements += 1;
        self.conn.execute_batch(sql)
    }

    /// Run a query inside the transaction
    pub fn query(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<QueryResult> {
        self.conn.query(sql, params)
    }

    /// Statements executed so far
    pub fn statement_count(&self) -> usize {
        self.statements
    }

    fn commit(&mut self) -> DatabaseResult<()> {
        self.finished = true;
        self.conn.commit()
    }

    fn rollback(&mut self) {
        self.finished = true;
        if let Err(e) = self.conn.rollback() {
            tracing::warn!(error = %e, "Rollback failed");
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Transaction abandoned without commit, rolling back");
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::ScriptedBackend;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn test_commit_on_success() {
        let backend = Arc::new(ScriptedBackend::new());
        let executor = TransactionalExecutor::new(backend.clone());

        let value = executor
            .run(|tx| {
                tx.execute_batch("DELETE FROM stg")?;
                Ok::<_, DatabaseError>(tx.statement_count())
            })
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(backend.calls(), vec!["BEGIN", "DELETE FROM stg", "COMMIT"]);
        assert_eq!(backend.open_connections(), 0);
    }

    #[test]
    fn test_rollback_on_failure() {
        let backend = Arc::new(ScriptedBackend::new().fail_on("INSERT"));
        let executor = TransactionalExecutor::new(backend.clone());

        let result = executor.run(|tx| {
            tx.execute_batch("DELETE FROM stg")?;
            tx.execute_batch("INSERT INTO stg VALUES (1)")?;
            Ok::<_, DatabaseError>(())
        });

        assert!(matches!(result, Err(TransactionError::Work(_))));
        assert_eq!(
            backend.calls(),
            vec!["BEGIN", "DELETE FROM stg", "INSERT INTO stg VALUES (1)", "ROLLBACK"]
        );
        assert_eq!(backend.open_connections(), 0);
    }

    #[test]
    fn test_begin_failure_skips_work() {
        let backend = Arc::new(ScriptedBackend::new().fail_on("BEGIN"));
        let executor = TransactionalExecutor::new(backend.clone());

        let mut ran = false;
        let result = executor.run(|_| {
            ran = true;
            Ok::<_, DatabaseError>(())
        });

        assert!(matches!(result, Err(TransactionError::Begin(_))));
        assert!(!ran);
        assert_eq!(backend.calls(), vec!["BEGIN"]);
    }

    #[test]
    fn test_commit_failure_is_not_rolled_back() {
        let backend = Arc::new(ScriptedBackend::new().fail_on("COMMIT"));
        let executor = TransactionalExecutor::new(backend.clone());

        let result = executor.run(|_| Ok::<_, DatabaseError>(()));

        assert!(matches!(result, Err(TransactionError::Commit(_))));
        assert_eq!(backend.calls(), vec!["BEGIN", "COMMIT"]);
    }

    #[test]
    fn test_rollback_on_panic() {
        let backend = Arc::new(ScriptedBackend::new());
        let executor = TransactionalExecutor::new(backend.clone());

        let result = catch_unwind(AssertUnwindSafe(|| {
            executor.run(|tx| -> Result<(), DatabaseError> {
                tx.execute_batch("DELETE FROM stg")?;
                panic!("analytics layer bug");
            })
        }));

        assert!(result.is_err());
        assert_eq!(backend.calls(), vec!["BEGIN", "DELETE FROM stg", "ROLLBACK"]);
        assert_eq!(backend.open_connections(), 0);
    }
}
