//! MySQL backend on top of SQLx.
//!
//! [`MySqlBackend`] wraps a `MySqlPool` and implements [`BackendConnection`];
//! the statements it creates are prepared on the server right away, which
//! gives access to parameter and column metadata, and are executed through
//! the pool with the bound parameters.

use crate::backend::{BackendConnection, BackendStatement};
use crate::binding::Binding;
use crate::config::ProxyConfig;
use crate::router::ReadWriteRouter;
use crate::variant::{
    CreationVariant, ResultSetConcurrency, ResultSetHoldability, ResultSetType,
};
use crate::{Error, Result};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow, MySqlStatement};
use sqlx::{Arguments, Column, Either, Encode, Executor, MySql, Statement, Type, TypeInfo};
use std::collections::BTreeMap;
use time::{Date, Duration, Time, UtcOffset};

/// Read/write router over two MySQL pools.
pub type MySqlRouter = ReadWriteRouter<MySqlBackend>;

impl ReadWriteRouter<MySqlBackend> {
    /// Connects the primary and replica pools described by `config`.
    ///
    /// Without a replica URL both routes share the primary pool.
    pub async fn connect(config: &ProxyConfig) -> Result<Self> {
        let rules = config.routing_rules()?;
        let primary = MySqlBackend::connect(&config.primary_url).await?;
        let replica = match &config.replica_url {
            Some(url) => MySqlBackend::connect(url).await?,
            None => primary.clone(),
        };
        Ok(Self::with_rules(primary, replica, rules))
    }
}

/// A MySQL connection pool usable as a backend connection.
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(MySqlPool::connect(url).await?))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn create(
        &self,
        sql: &str,
        variant: CreationVariant,
    ) -> Result<Option<MySqlBackendStatement>> {
        let prepared = self.pool.prepare(sql).await?;
        Ok(Some(MySqlBackendStatement {
            pool: self.pool.clone(),
            statement: Statement::to_owned(&prepared),
            variant,
            parameters: MySqlParameters::default(),
            rows: Vec::new(),
            update_count: None,
            generated_key: None,
        }))
    }
}

fn warn_cursor_options(kind: ResultSetType, concurrency: ResultSetConcurrency) {
    if kind != ResultSetType::ForwardOnly || concurrency != ResultSetConcurrency::ReadOnly {
        log::warn!(
            "MySQL result sets are forward only and read only, ignoring {kind:?} / {concurrency:?}"
        );
    }
}

impl BackendConnection for MySqlBackend {
    type Statement = MySqlBackendStatement;

    async fn prepare(&mut self, sql: &str) -> Result<Option<MySqlBackendStatement>> {
        self.create(sql, CreationVariant::Plain).await
    }

    async fn prepare_with_generated_keys(
        &mut self,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<Option<MySqlBackendStatement>> {
        self.create(sql, CreationVariant::GeneratedKeys(return_generated_keys))
            .await
    }

    async fn prepare_with_column_indexes(
        &mut self,
        sql: &str,
        column_indexes: &[u32],
    ) -> Result<Option<MySqlBackendStatement>> {
        self.create(sql, CreationVariant::ColumnIndexes(column_indexes.to_vec()))
            .await
    }

    async fn prepare_with_column_names(
        &mut self,
        sql: &str,
        column_names: &[String],
    ) -> Result<Option<MySqlBackendStatement>> {
        self.create(sql, CreationVariant::ColumnNames(column_names.to_vec()))
            .await
    }

    async fn prepare_with_result_set(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    ) -> Result<Option<MySqlBackendStatement>> {
        warn_cursor_options(kind, concurrency);
        self.create(sql, CreationVariant::ResultSet { kind, concurrency })
            .await
    }

    async fn prepare_with_holdability(
        &mut self,
        sql: &str,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    ) -> Result<Option<MySqlBackendStatement>> {
        warn_cursor_options(kind, concurrency);
        self.create(
            sql,
            CreationVariant::Holdable {
                kind,
                concurrency,
                holdability,
            },
        )
        .await
    }
}

/// Parameter values of a MySQL statement, by index.
///
/// Streams are drained when they are bound, so the values can be encoded
/// again on every execution.
#[derive(Debug, Clone, Default)]
pub struct MySqlParameters {
    values: BTreeMap<u32, Binding>,
}

impl MySqlParameters {
    pub fn set(&mut self, index: u32, binding: &Binding) -> Result<()> {
        let value = drain_streams(binding)?;
        log::trace!("MySQL parameter {index} <- {}", binding.operation());
        self.values.insert(index, value);
        Ok(())
    }

    pub fn get(&self, index: u32) -> Option<&Binding> {
        self.values.get(&index)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Highest bound index.
    pub fn last_index(&self) -> u32 {
        self.values.keys().next_back().copied().unwrap_or(0)
    }

    /// Encodes the parameters `1..=count`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundParameter`] for the first index without a value.
    pub fn to_arguments(&self, count: u32) -> Result<MySqlArguments> {
        let mut arguments = MySqlArguments::default();
        for index in 1..=count {
            let value = self.get(index).ok_or(Error::UnboundParameter(index))?;
            add_value(&mut arguments, value)?;
        }
        Ok(arguments)
    }
}

/// Replaces stream payloads, also inside arrays and objects, by their bytes or text.
fn drain_streams(binding: &Binding) -> Result<Binding> {
    Ok(match binding {
        Binding::AsciiStream { stream, .. }
        | Binding::UnicodeStream { stream, .. }
        | Binding::CharacterStream { stream, .. }
        | Binding::NCharacterStream { stream, .. }
        | Binding::ClobStream { stream, .. }
        | Binding::NClobStream { stream, .. } => Binding::String(stream.read_to_string()?),
        Binding::BinaryStream { stream, .. } | Binding::BlobStream { stream, .. } => {
            Binding::Bytes(stream.read_to_end()?)
        }
        Binding::Array(values) => Binding::Array(
            values
                .iter()
                .map(drain_streams)
                .collect::<Result<Vec<_>>>()?,
        ),
        Binding::Object {
            value,
            target_sql_type,
            scale_or_length,
        } => Binding::Object {
            value: Box::new(drain_streams(value)?),
            target_sql_type: *target_sql_type,
            scale_or_length: *scale_or_length,
        },
        other => other.clone(),
    })
}

/// Offset of a calendar argument as a duration to subtract to reach UTC.
fn offset_duration(offset: UtcOffset) -> Duration {
    Duration::seconds(offset.whole_seconds().into())
}

/// The UTC date of midnight of `date` at `offset`.
fn utc_date(date: Date, offset: UtcOffset) -> Date {
    date.midnight()
        .checked_sub(offset_duration(offset))
        .map_or(date, |v| v.date())
}

/// The UTC time of day of `time` at `offset`, wrapping around midnight.
fn utc_time(time: Time, offset: UtcOffset) -> Time {
    time - offset_duration(offset)
}

fn add<'q, T>(arguments: &mut MySqlArguments, value: T) -> Result<()>
where
    T: Encode<'q, MySql> + Type<MySql> + Send + 'q,
{
    Arguments::add(arguments, value).map_err(Error::Backend)
}

fn add_value(arguments: &mut MySqlArguments, value: &Binding) -> Result<()> {
    match value {
        Binding::Null { .. } => add(arguments, None::<String>),
        Binding::Boolean(v) => add(arguments, *v),
        Binding::Byte(v) => add(arguments, *v),
        Binding::Short(v) => add(arguments, *v),
        Binding::Int(v) => add(arguments, *v),
        Binding::Long(v) => add(arguments, *v),
        Binding::Float(v) => add(arguments, *v),
        Binding::Double(v) => add(arguments, *v),
        Binding::Decimal(v) => add(arguments, *v),
        Binding::String(v)
        | Binding::NString(v)
        | Binding::Clob(v)
        | Binding::NClob(v)
        | Binding::SqlXml(v) => add(arguments, v.clone()),
        Binding::Bytes(v) | Binding::Blob(v) | Binding::RowId(v) => add(arguments, v.clone()),
        Binding::Date(v, None) => add(arguments, *v),
        Binding::Date(v, Some(offset)) => add(arguments, utc_date(*v, *offset)),
        Binding::Time(v, None) => add(arguments, *v),
        Binding::Time(v, Some(offset)) => add(arguments, utc_time(*v, *offset)),
        Binding::Timestamp(v, None) => add(arguments, *v),
        Binding::Timestamp(v, Some(offset)) => add(arguments, v.assume_offset(*offset)),
        Binding::Url(v) => add(arguments, v.to_string()),
        Binding::Object { value, .. } => add_value(arguments, value),
        Binding::Array(..) => Err(Error::NotImplemented("MySQL array parameters")),
        stream => Err(Error::NotImplemented(stream.operation())),
    }
}

/// Parameter metadata of a MySQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlParameterMetadata {
    pub count: usize,
}

/// Name and server type of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlColumnMetadata {
    pub name: String,
    pub type_name: String,
}

/// A statement prepared on a MySQL server.
pub struct MySqlBackendStatement {
    pool: MySqlPool,
    statement: MySqlStatement<'static>,
    variant: CreationVariant,
    parameters: MySqlParameters,
    rows: Vec<MySqlRow>,
    update_count: Option<u64>,
    generated_key: Option<u64>,
}

impl MySqlBackendStatement {
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn variant(&self) -> &CreationVariant {
        &self.variant
    }

    /// Rows produced by the last [`execute`](BackendStatement::execute) call.
    pub fn rows(&self) -> &[MySqlRow] {
        &self.rows
    }

    pub fn take_rows(&mut self) -> Vec<MySqlRow> {
        std::mem::take(&mut self.rows)
    }

    /// Affected rows of the last update, `None` if it produced a result set.
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    /// The `AUTO_INCREMENT` value generated by the last update, when the
    /// statement was created with a generated keys variant.
    pub fn generated_key(&self) -> Option<u64> {
        self.generated_key
    }

    fn parameter_count(&self) -> u32 {
        match self.statement.parameters() {
            Some(Either::Left(types)) => types.len() as u32,
            Some(Either::Right(count)) => count as u32,
            None => self.parameters.last_index(),
        }
    }
}

impl BackendStatement for MySqlBackendStatement {
    type ResultSet = Vec<MySqlRow>;
    type ParameterMetadata = MySqlParameterMetadata;
    type Metadata = Vec<MySqlColumnMetadata>;

    fn bind(&mut self, index: u32, binding: &Binding) -> Result<()> {
        self.parameters.set(index, binding)
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.parameters.clear();
        Ok(())
    }

    async fn execute_query(&mut self) -> Result<Vec<MySqlRow>> {
        let arguments = self.parameters.to_arguments(self.parameter_count())?;
        let rows = sqlx::query_with(self.statement.sql(), arguments)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn execute_update(&mut self) -> Result<u64> {
        let arguments = self.parameters.to_arguments(self.parameter_count())?;
        let result = sqlx::query_with(self.statement.sql(), arguments)
            .execute(&self.pool)
            .await?;
        if self.variant.wants_generated_keys() {
            self.generated_key = Some(result.last_insert_id());
        }
        Ok(result.rows_affected())
    }

    async fn execute(&mut self) -> Result<bool> {
        if self.statement.columns().is_empty() {
            let affected = self.execute_update().await?;
            self.rows.clear();
            self.update_count = Some(affected);
            Ok(false)
        } else {
            self.rows = self.execute_query().await?;
            self.update_count = None;
            Ok(true)
        }
    }

    fn parameter_metadata(&self) -> Result<MySqlParameterMetadata> {
        Ok(MySqlParameterMetadata {
            count: self.parameter_count() as usize,
        })
    }

    fn metadata(&self) -> Result<Vec<MySqlColumnMetadata>> {
        Ok(self
            .statement
            .columns()
            .iter()
            .map(|column| MySqlColumnMetadata {
                name: column.name().to_owned(),
                type_name: column.type_info().name().to_owned(),
            })
            .collect())
    }
}
