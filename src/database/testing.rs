//! Scripted backend for unit tests
//!
//! Records every call it receives and fails any call whose SQL contains one
//! of the configured patterns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Connection, DatabaseBackend, DatabaseError, DatabaseResult, QueryResult};
use crate::sql::{Dialect, Param};

#[derive(Default)]
struct Script {
    calls: Mutex<Vec<String>>,
    failures: Vec<String>,
    fail_acquire: bool,
    open: AtomicUsize,
}

impl Script {
    fn record(&self, sql: &str) -> DatabaseResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(sql.to_string());
        }
        match self.failures.iter().find(|p| sql.contains(p.as_str())) {
            Some(pattern) => Err(DatabaseError::QueryFailed(format!(
                "scripted failure on '{}'",
                pattern
            ))),
            None => Ok(()),
        }
    }
}

pub struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script::default()),
        }
    }

    /// Fail every call whose SQL contains `pattern`
    pub fn fail_on(self, pattern: &str) -> Self {
        let mut script = Arc::try_unwrap(self.script).unwrap_or_default();
        script.failures.push(pattern.to_string());
        Self {
            script: Arc::new(script),
        }
    }

    /// Refuse to hand out connections
    pub fn unreachable(self) -> Self {
        let mut script = Arc::try_unwrap(self.script).unwrap_or_default();
        script.fail_acquire = true;
        Self {
            script: Arc::new(script),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.calls.lock().unwrap().clone()
    }

    pub fn open_connections(&self) -> usize {
        self.script.open.load(Ordering::SeqCst)
    }
}

impl DatabaseBackend for ScriptedBackend {
    fn acquire(&self) -> DatabaseResult<Box<dyn Connection>> {
        if self.script.fail_acquire {
            return Err(DatabaseError::ConnectionFailed("scripted outage".to_string()));
        }
        self.script.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            script: Arc::clone(&self.script),
        }))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn backend_type(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedConnection {
    script: Arc<Script>,
}

impl Connection for ScriptedConnection {
    fn execute_batch(&mut self, sql: &str) -> DatabaseResult<()> {
        self.script.record(sql)
    }

    fn execute_params(&mut self, sql: &str, _params: &[Param]) -> DatabaseResult<u64> {
        self.script.record(sql).map(|_| 0)
    }

    fn query(&mut self, sql: &str, _params: &[Param]) -> DatabaseResult<QueryResult> {
        self.script.record(sql).map(|_| QueryResult::empty())
    }

    fn begin(&mut self) -> DatabaseResult<()> {
        self.script
            .record("BEGIN")
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    fn commit(&mut self) -> DatabaseResult<()> {
        self.script
            .record("COMMIT")
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    fn rollback(&mut self) -> DatabaseResult<()> {
        self.script
            .record("ROLLBACK")
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.script.open.fetch_sub(1, Ordering::SeqCst);
    }
}
