use crate::backend::{BackendConnection, BackendStatement, Router};
use crate::binding::{BindStream, Binding, SqlType};
use crate::parameters::ParameterLog;
use crate::placeholder::PlaceholderBuffer;
use crate::variant::{
    CreationVariant, ResultSetConcurrency, ResultSetHoldability, ResultSetType,
};
use crate::{Error, Result};
use rust_decimal::Decimal;
use std::io::Read;
use time::{Date, PrimitiveDateTime, Time, UtcOffset};
use url::Url;

/// Real statement type produced for a router `R`.
pub type StatementOf<R> = <<R as Router>::Connection as BackendConnection>::Statement;

/// A prepared statement proxy that routes on the fully bound SQL.
///
/// `StatementProxy` records every binding call while the backend that will
/// execute the statement is still unknown. On the first execution it renders
/// the probe SQL (the original text with the bound literals substituted), asks
/// the router for a connection, creates the real statement from the *original*
/// SQL and replays the recorded bindings onto it. Later executions reuse the
/// same real statement until [`reset`](Self::reset).
///
/// # Type Parameters
///
/// * `R` - The router resolving probe SQL to a backend connection.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx_rw_proxy::mysql::MySqlBackend;
/// use sqlx_rw_proxy::{ReadWriteRouter, StatementProxy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let primary = MySqlBackend::connect("mysql://localhost/primary").await?;
/// let replica = MySqlBackend::connect("mysql://localhost/replica").await?;
/// let router = ReadWriteRouter::new(primary, replica)?;
///
/// let mut statement = StatementProxy::new(&router, "INSERT INTO users (id, name) VALUES (?, ?)");
/// statement.set_int(1, 42)?.set_string(2, "John Doe")?;
/// assert_eq!(
///     statement.probe_sql().as_deref(),
///     Some("INSERT INTO users (id, name) VALUES (42, 'John Doe')")
/// );
///
/// let affected = statement.execute_update().await?;
/// println!("Inserted {affected} rows");
/// # Ok(())
/// # }
/// ```
pub struct StatementProxy<R: Router> {
    router: Option<R>,
    buffer: Option<PlaceholderBuffer>,
    variant: CreationVariant,
    parameters: ParameterLog,
    statement: Option<StatementOf<R>>,
}

impl<R: Router> std::fmt::Debug for StatementProxy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementProxy")
            .field("buffer", &self.buffer)
            .field("variant", &self.variant)
            .field("parameters", &self.parameters)
            .field("has_statement", &self.statement.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: Router> StatementProxy<R> {
    /// Creates a proxy whose real statement is created from the SQL only.
    pub fn new<T>(router: R, sql: T) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(router, sql, CreationVariant::Plain)
    }

    /// Creates a proxy that asks the backend for auto-generated keys.
    pub fn with_generated_keys<T>(router: R, sql: T, return_generated_keys: bool) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(
            router,
            sql,
            CreationVariant::GeneratedKeys(return_generated_keys),
        )
    }

    /// Creates a proxy returning the generated keys of the given columns.
    pub fn with_column_indexes<T>(router: R, sql: T, column_indexes: Vec<u32>) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(router, sql, CreationVariant::ColumnIndexes(column_indexes))
    }

    /// Creates a proxy returning the generated keys of the named columns.
    pub fn with_column_names<T>(router: R, sql: T, column_names: Vec<String>) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(router, sql, CreationVariant::ColumnNames(column_names))
    }

    pub fn with_result_set<T>(
        router: R,
        sql: T,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    ) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(router, sql, CreationVariant::ResultSet { kind, concurrency })
    }

    pub fn with_holdability<T>(
        router: R,
        sql: T,
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    ) -> Self
    where
        T: Into<String>,
    {
        Self::with_variant(
            router,
            sql,
            CreationVariant::Holdable {
                kind,
                concurrency,
                holdability,
            },
        )
    }

    pub fn with_variant<T>(router: R, sql: T, variant: CreationVariant) -> Self
    where
        T: Into<String>,
    {
        Self {
            router: Some(router),
            buffer: Some(PlaceholderBuffer::new(sql)),
            variant,
            parameters: ParameterLog::new(),
            statement: None,
        }
    }

    /// The SQL text as given by the caller, `None` after a reset.
    pub fn sql(&self) -> Option<&str> {
        self.buffer.as_ref().map(PlaceholderBuffer::sql)
    }

    /// The SQL text with every literal binding substituted, as seen by the router.
    pub fn probe_sql(&self) -> Option<String> {
        self.buffer.as_ref().map(PlaceholderBuffer::render)
    }

    pub fn variant(&self) -> &CreationVariant {
        &self.variant
    }

    pub fn parameters(&self) -> &ParameterLog {
        &self.parameters
    }

    /// Whether the real statement has been created.
    pub fn is_prepared(&self) -> bool {
        self.statement.is_some()
    }

    pub fn statement(&self) -> Option<&StatementOf<R>> {
        self.statement.as_ref()
    }

    pub fn statement_mut(&mut self) -> Option<&mut StatementOf<R>> {
        self.statement.as_mut()
    }

    /// Binds `binding` to the placeholder at `index` (from 1).
    ///
    /// The binding is recorded for replay and, unless it is a stream, its
    /// literal replaces the placeholder in the probe SQL. Once the real
    /// statement exists the binding is also applied to it right away.
    ///
    /// # Errors
    ///
    /// * [`Error::Closed`] if the proxy has been reset.
    /// * [`Error::ParameterIndex`] if `index` does not target a placeholder.
    /// * Any error of the real statement's binding call.
    pub fn bind(&mut self, index: u32, binding: Binding) -> Result<&mut Self> {
        let buffer = self.buffer.as_mut().ok_or(Error::Closed)?;
        buffer.check_index(index)?;
        if let Some(statement) = self.statement.as_mut() {
            statement.bind(index, &binding)?;
        }
        let literal = if binding.is_stream() {
            None
        } else {
            binding.literal()
        };
        buffer.bind(index, literal)?;
        self.parameters.record(index, binding);
        Ok(self)
    }

    pub fn set_null(&mut self, index: u32, sql_type: SqlType) -> Result<&mut Self> {
        self.bind(
            index,
            Binding::Null {
                sql_type,
                type_name: None,
            },
        )
    }

    /// Binds a null of a user-defined or reference type.
    pub fn set_null_with_type_name<T>(
        &mut self,
        index: u32,
        sql_type: SqlType,
        type_name: T,
    ) -> Result<&mut Self>
    where
        T: Into<String>,
    {
        self.bind(
            index,
            Binding::Null {
                sql_type,
                type_name: Some(type_name.into()),
            },
        )
    }

    pub fn set_boolean(&mut self, index: u32, value: bool) -> Result<&mut Self> {
        self.bind(index, Binding::Boolean(value))
    }

    pub fn set_byte(&mut self, index: u32, value: i8) -> Result<&mut Self> {
        self.bind(index, Binding::Byte(value))
    }

    pub fn set_short(&mut self, index: u32, value: i16) -> Result<&mut Self> {
        self.bind(index, Binding::Short(value))
    }

    pub fn set_int(&mut self, index: u32, value: i32) -> Result<&mut Self> {
        self.bind(index, Binding::Int(value))
    }

    pub fn set_long(&mut self, index: u32, value: i64) -> Result<&mut Self> {
        self.bind(index, Binding::Long(value))
    }

    pub fn set_float(&mut self, index: u32, value: f32) -> Result<&mut Self> {
        self.bind(index, Binding::Float(value))
    }

    pub fn set_double(&mut self, index: u32, value: f64) -> Result<&mut Self> {
        self.bind(index, Binding::Double(value))
    }

    pub fn set_decimal(&mut self, index: u32, value: Decimal) -> Result<&mut Self> {
        self.bind(index, Binding::Decimal(value))
    }

    pub fn set_string<T: Into<String>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::String(value.into()))
    }

    /// Binds national character text.
    pub fn set_nstring<T: Into<String>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::NString(value.into()))
    }

    pub fn set_bytes<T: Into<Vec<u8>>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::Bytes(value.into()))
    }

    pub fn set_date(&mut self, index: u32, value: Date) -> Result<&mut Self> {
        self.bind(index, Binding::Date(value, None))
    }

    /// Binds a date interpreted at the given UTC offset.
    ///
    /// The MySQL backend sends the value converted to UTC.
    pub fn set_date_in(&mut self, index: u32, value: Date, offset: UtcOffset) -> Result<&mut Self> {
        self.bind(index, Binding::Date(value, Some(offset)))
    }

    pub fn set_time(&mut self, index: u32, value: Time) -> Result<&mut Self> {
        self.bind(index, Binding::Time(value, None))
    }

    /// Binds a time of day interpreted at the given UTC offset.
    ///
    /// The MySQL backend sends the value converted to UTC.
    pub fn set_time_in(&mut self, index: u32, value: Time, offset: UtcOffset) -> Result<&mut Self> {
        self.bind(index, Binding::Time(value, Some(offset)))
    }

    pub fn set_timestamp(&mut self, index: u32, value: PrimitiveDateTime) -> Result<&mut Self> {
        self.bind(index, Binding::Timestamp(value, None))
    }

    /// Binds a timestamp interpreted at the given UTC offset.
    pub fn set_timestamp_in(
        &mut self,
        index: u32,
        value: PrimitiveDateTime,
        offset: UtcOffset,
    ) -> Result<&mut Self> {
        self.bind(index, Binding::Timestamp(value, Some(offset)))
    }

    pub fn set_url(&mut self, index: u32, value: Url) -> Result<&mut Self> {
        self.bind(index, Binding::Url(value))
    }

    pub fn set_blob<T: Into<Vec<u8>>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::Blob(value.into()))
    }

    pub fn set_clob<T: Into<String>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::Clob(value.into()))
    }

    pub fn set_nclob<T: Into<String>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::NClob(value.into()))
    }

    pub fn set_sqlxml<T: Into<String>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::SqlXml(value.into()))
    }

    pub fn set_row_id<T: Into<Vec<u8>>>(&mut self, index: u32, value: T) -> Result<&mut Self> {
        self.bind(index, Binding::RowId(value.into()))
    }

    pub fn set_array(&mut self, index: u32, values: Vec<Binding>) -> Result<&mut Self> {
        self.bind(index, Binding::Array(values))
    }

    /// Binds any value convertible into a [`Binding`], leaving its SQL type to the backend.
    pub fn set_object<V: Into<Binding>>(&mut self, index: u32, value: V) -> Result<&mut Self> {
        self.bind(
            index,
            Binding::Object {
                value: Box::new(value.into()),
                target_sql_type: None,
                scale_or_length: None,
            },
        )
    }

    pub fn set_object_with_type<V: Into<Binding>>(
        &mut self,
        index: u32,
        value: V,
        target_sql_type: SqlType,
    ) -> Result<&mut Self> {
        self.bind(
            index,
            Binding::Object {
                value: Box::new(value.into()),
                target_sql_type: Some(target_sql_type),
                scale_or_length: None,
            },
        )
    }

    pub fn set_object_with_scale<V: Into<Binding>>(
        &mut self,
        index: u32,
        value: V,
        target_sql_type: SqlType,
        scale_or_length: i32,
    ) -> Result<&mut Self> {
        self.bind(
            index,
            Binding::Object {
                value: Box::new(value.into()),
                target_sql_type: Some(target_sql_type),
                scale_or_length: Some(scale_or_length),
            },
        )
    }

    pub fn set_ascii_stream<S>(&mut self, index: u32, stream: S, length: Option<u64>) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::AsciiStream { stream, length })
    }

    pub fn set_binary_stream<S>(&mut self, index: u32, stream: S, length: Option<u64>) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::BinaryStream { stream, length })
    }

    pub fn set_unicode_stream<S>(&mut self, index: u32, stream: S, length: u32) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::UnicodeStream { stream, length })
    }

    pub fn set_character_stream<S>(
        &mut self,
        index: u32,
        stream: S,
        length: Option<u64>,
    ) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::CharacterStream { stream, length })
    }

    pub fn set_ncharacter_stream<S>(
        &mut self,
        index: u32,
        stream: S,
        length: Option<u64>,
    ) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::NCharacterStream { stream, length })
    }

    pub fn set_blob_stream<S>(&mut self, index: u32, stream: S, length: Option<u64>) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::BlobStream { stream, length })
    }

    pub fn set_clob_stream<S>(&mut self, index: u32, stream: S, length: Option<u64>) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::ClobStream { stream, length })
    }

    pub fn set_nclob_stream<S>(&mut self, index: u32, stream: S, length: Option<u64>) -> Result<&mut Self>
    where
        S: Read + Send + 'static,
    {
        let stream = BindStream::new(stream);
        self.bind(index, Binding::NClobStream { stream, length })
    }

    /// Creates the real statement if it does not exist yet and returns it.
    ///
    /// Renders the probe SQL, resolves a connection through the router,
    /// creates the statement from the original SQL with the creation variant
    /// chosen at construction and replays the recorded bindings on it.
    ///
    /// # Errors
    ///
    /// Router, creation and binding errors are returned unchanged, and
    /// [`Error::NoRealStatement`] when the connection yields no statement. On
    /// any error the proxy stays unprepared, so the next call starts over.
    pub async fn prepare(&mut self) -> Result<&mut StatementOf<R>> {
        let &mut StatementProxy {
            ref router,
            ref buffer,
            ref variant,
            ref parameters,
            ref mut statement,
        } = self;

        if statement.is_none() {
            let (Some(router), Some(buffer)) = (router, buffer) else {
                return Err(Error::Closed);
            };
            let probe = buffer.render();
            log::debug!("Routing statement: {}", buffer.sql());
            log::trace!("Routing probe: {probe}");
            let mut connection = router.resolve(&probe).await?;
            let mut created = variant.create(&mut connection, buffer.sql()).await?;
            parameters.replay(&mut created)?;
            *statement = Some(created);
        }
        statement.as_mut().ok_or(Error::NotPrepared)
    }

    /// Executes the statement as a query.
    pub async fn execute_query(
        &mut self,
    ) -> Result<<StatementOf<R> as BackendStatement>::ResultSet> {
        self.prepare().await?.execute_query().await
    }

    /// Executes the statement and returns the number of affected rows.
    pub async fn execute_update(&mut self) -> Result<u64> {
        self.prepare().await?.execute_update().await
    }

    /// Executes any kind of statement, `true` when it produced a result set.
    pub async fn execute(&mut self) -> Result<bool> {
        self.prepare().await?.execute().await
    }

    /// Drops every recorded binding, here and on the real statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPrepared`] if the real statement was not created.
    pub fn clear_parameters(&mut self) -> Result<()> {
        let statement = self.statement.as_mut().ok_or(Error::NotPrepared)?;
        self.parameters.clear();
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
        statement.clear_parameters()
    }

    /// Batching is not supported by the proxy.
    pub fn add_batch(&mut self) -> Result<()> {
        Err(Error::NotImplemented("add_batch"))
    }

    pub fn parameter_metadata(
        &self,
    ) -> Result<<StatementOf<R> as BackendStatement>::ParameterMetadata> {
        self.statement
            .as_ref()
            .ok_or(Error::NotPrepared)?
            .parameter_metadata()
    }

    pub fn metadata(&self) -> Result<<StatementOf<R> as BackendStatement>::Metadata> {
        self.statement.as_ref().ok_or(Error::NotPrepared)?.metadata()
    }

    /// Returns the proxy to a blank state so that it can be pooled.
    ///
    /// The real statement and the router are dropped, the SQL, creation
    /// variant and recorded bindings are forgotten.
    pub fn reset(&mut self) {
        self.statement = None;
        self.router = None;
        self.buffer = None;
        self.variant = CreationVariant::Plain;
        self.parameters.clear();
    }

    /// Reuses a pooled proxy for a new statement.
    pub fn reopen<T>(&mut self, router: R, sql: T, variant: CreationVariant)
    where
        T: Into<String>,
    {
        self.reset();
        self.router = Some(router);
        self.buffer = Some(PlaceholderBuffer::new(sql));
        self.variant = variant;
    }
}
