use crate::binding::Binding;
use crate::variant::{ResultSetConcurrency, ResultSetHoldability, ResultSetType};
use crate::Result;
use std::future::Future;
use std::sync::Arc;

/// Connection-resolution capability.
///
/// Given the probe SQL of a statement, returns the backend connection that
/// should execute it (a read replica or the write primary).
pub trait Router: Send + Sync {
    type Connection: BackendConnection;

    fn resolve(&self, probe_sql: &str) -> impl Future<Output = Result<Self::Connection>> + Send;
}

impl<R: Router> Router for &R {
    type Connection = R::Connection;

    fn resolve(&self, probe_sql: &str) -> impl Future<Output = Result<Self::Connection>> + Send {
        (**self).resolve(probe_sql)
    }
}

impl<R: Router> Router for Arc<R> {
    type Connection = R::Connection;

    fn resolve(&self, probe_sql: &str) -> impl Future<Output = Result<Self::Connection>> + Send {
        (**self).resolve(probe_sql)
    }
}

/// Backend statement creation, one method per creation shape.
///
/// Every method receives the original SQL text, with its placeholders intact.
/// `Ok(None)` means the backend accepted the call but produced no statement.
pub trait BackendConnection: Send {
    type Statement: BackendStatement;

    fn prepare(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;

    fn prepare_with_generated_keys(
        &mut self,
        sql: &str,
        return_generated_keys: bool,
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;

    fn prepare_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[u32],
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;

    fn prepare_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[String],
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;

    fn prepare_with_result_set(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;

    fn prepare_with_holdability(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    ) -> impl Future<Output = Result<Option<Self::Statement>>> + Send;
}

/// A real, backend-prepared statement.
///
/// `bind` sets the parameter at `index` (from 1); backends pattern match on
/// the [`Binding`] variant to pick the native binding call.
pub trait BackendStatement: Send {
    type ResultSet;
    type ParameterMetadata;
    type Metadata;

    fn bind(&mut self, index: u32, binding: &Binding) -> Result<()>;

    fn clear_parameters(&mut self) -> Result<()>;

    /// Executes a query and returns its rows.
    fn execute_query(&mut self) -> impl Future<Output = Result<Self::ResultSet>> + Send;

    /// Executes a statement and returns the number of affected rows.
    fn execute_update(&mut self) -> impl Future<Output = Result<u64>> + Send;

    /// Executes any statement, `true` when the first result is a result set.
    fn execute(&mut self) -> impl Future<Output = Result<bool>> + Send;

    fn parameter_metadata(&self) -> Result<Self::ParameterMetadata>;

    fn metadata(&self) -> Result<Self::Metadata>;
}
