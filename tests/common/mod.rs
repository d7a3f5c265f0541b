#![allow(dead_code)]

use log::LevelFilter;
use sqlx_rw_proxy::{
    BackendConnection, BackendStatement, Binding, Error, Result, ResultSetConcurrency,
    ResultSetHoldability, ResultSetType, Router,
};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Calls seen by the fake backend, shared by router, connection and statements.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// In-memory router that always resolves to the same fake connection.
#[derive(Debug, Default)]
pub struct FakeRouter {
    pub journal: Journal,
    pub connection: FakeConnection,
    /// Number of upcoming `resolve` calls that fail.
    pub routing_failures: AtomicUsize,
}

impl FakeRouter {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            connection: FakeConnection {
                journal: journal.clone(),
                ..Default::default()
            },
            journal,
            routing_failures: AtomicUsize::new(0),
        }
    }

    /// Connections resolved by this router yield no statement.
    pub fn yielding_nothing(mut self) -> Self {
        self.connection.yield_none = true;
        self
    }

    /// Statements created by this router reject binding `index`.
    pub fn rejecting(self, index: u32) -> Self {
        self.rejecting_times(index, usize::MAX)
    }

    /// Only the first `times` attempts to bind `index` fail.
    pub fn rejecting_times(mut self, index: u32, times: usize) -> Self {
        self.connection.reject = Some(index);
        self.connection.rejections = Arc::new(AtomicUsize::new(times));
        self
    }

    pub fn fail_next_routes(&self, count: usize) {
        self.routing_failures.store(count, Ordering::SeqCst);
    }
}

impl Router for FakeRouter {
    type Connection = FakeConnection;

    async fn resolve(&self, probe_sql: &str) -> Result<FakeConnection> {
        self.journal.push(format!("resolve({probe_sql})"));
        let failing = self
            .routing_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::routing("no backend available"));
        }
        Ok(self.connection.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeConnection {
    pub journal: Journal,
    pub yield_none: bool,
    pub reject: Option<u32>,
    pub rejections: Arc<AtomicUsize>,
}

impl FakeConnection {
    fn create(&self, call: String, sql: &str) -> Result<Option<FakeStatement>> {
        self.journal.push(call);
        if self.yield_none {
            return Ok(None);
        }
        Ok(Some(FakeStatement {
            journal: self.journal.clone(),
            sql: sql.to_string(),
            reject: self.reject,
            rejections: self.rejections.clone(),
            bindings: Vec::new(),
        }))
    }
}

impl BackendConnection for FakeConnection {
    type Statement = FakeStatement;

    async fn prepare(&mut self, sql: &str) -> Result<Option<FakeStatement>> {
        self.create(format!("prepare({sql})"), sql)
    }

    async fn prepare_with_generated_keys(
        &mut self,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<Option<FakeStatement>> {
        self.create(
            format!("prepare_with_generated_keys({sql}, {return_generated_keys})"),
            sql,
        )
    }

    async fn prepare_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[u32],
    ) -> Result<Option<FakeStatement>> {
        self.create(
            format!("prepare_with_column_indexes({sql}, {column_indexes:?})"),
            sql,
        )
    }

    async fn prepare_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[String],
    ) -> Result<Option<FakeStatement>> {
        self.create(
            format!("prepare_with_column_names({sql}, {column_names:?})"),
            sql,
        )
    }

    async fn prepare_with_result_set(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    ) -> Result<Option<FakeStatement>> {
        self.create(
            format!("prepare_with_result_set({sql}, {kind:?}, {concurrency:?})"),
            sql,
        )
    }

    async fn prepare_with_holdability(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    ) -> Result<Option<FakeStatement>> {
        self.create(
            format!("prepare_with_holdability({sql}, {kind:?}, {concurrency:?}, {holdability:?})"),
            sql,
        )
    }
}

/// Fake real statement, keeping the bindings it received.
#[derive(Debug)]
pub struct FakeStatement {
    pub journal: Journal,
    pub sql: String,
    pub reject: Option<u32>,
    pub rejections: Arc<AtomicUsize>,
    pub bindings: Vec<(u32, Binding)>,
}

impl BackendStatement for FakeStatement {
    type ResultSet = Vec<(u32, Binding)>;
    type ParameterMetadata = usize;
    type Metadata = String;

    fn bind(&mut self, index: u32, binding: &Binding) -> Result<()> {
        self.journal
            .push(format!("{}({index})", binding.operation()));
        // Drivers consume stream payloads when they are bound.
        match binding {
            Binding::AsciiStream { stream, .. }
            | Binding::BinaryStream { stream, .. }
            | Binding::UnicodeStream { stream, .. }
            | Binding::CharacterStream { stream, .. }
            | Binding::NCharacterStream { stream, .. }
            | Binding::BlobStream { stream, .. }
            | Binding::ClobStream { stream, .. }
            | Binding::NClobStream { stream, .. } => {
                let payload = stream.read_to_end()?;
                self.journal.push(format!("payload({index}, {payload:?})"));
            }
            _ => {}
        }
        let rejected = self.reject == Some(index)
            && self
                .rejections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if rejected {
            return Err(Error::backend(format!("cannot bind parameter {index}")));
        }
        self.bindings.push((index, binding.clone()));
        Ok(())
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.journal.push("clear_parameters".to_string());
        self.bindings.clear();
        Ok(())
    }

    async fn execute_query(&mut self) -> Result<Vec<(u32, Binding)>> {
        self.journal.push("execute_query".to_string());
        Ok(self.bindings.clone())
    }

    async fn execute_update(&mut self) -> Result<u64> {
        self.journal.push("execute_update".to_string());
        Ok(self.bindings.len() as u64)
    }

    async fn execute(&mut self) -> Result<bool> {
        self.journal.push("execute".to_string());
        Ok(self.sql.trim_start().to_uppercase().starts_with("SELECT"))
    }

    fn parameter_metadata(&self) -> Result<usize> {
        Ok(self.sql.matches('?').count())
    }

    fn metadata(&self) -> Result<String> {
        Ok(self.sql.clone())
    }
}
