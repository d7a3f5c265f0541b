use crate::backend::BackendConnection;
use crate::{Error, Result};

/// Cursor movement of the result set produced by a statement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetHoldability {
    #[default]
    HoldCursorsOverCommit,
    CloseCursorsAtCommit,
}

/// How the real backend statement gets created.
///
/// Selected once when the proxy is constructed. Each variant carries exactly
/// the arguments of the matching [`BackendConnection`] creation method.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum CreationVariant {
    /// SQL only.
    #[default]
    Plain,
    /// SQL and the auto-generated-keys flag.
    GeneratedKeys(bool),
    /// SQL and the indexes of the generated key columns.
    ColumnIndexes(Vec<u32>),
    /// SQL and the names of the generated key columns.
    ColumnNames(Vec<String>),
    ResultSet {
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
    },
    Holdable {
        kind: ResultSetType,
        concurrency: ResultSetConcurrency,
        holdability: ResultSetHoldability,
    },
}

impl CreationVariant {
    /// Whether the statement asks the backend for generated keys.
    pub fn wants_generated_keys(&self) -> bool {
        match self {
            CreationVariant::GeneratedKeys(flag) => *flag,
            CreationVariant::ColumnIndexes(..) | CreationVariant::ColumnNames(..) => true,
            _ => false,
        }
    }

    /// Creates the real statement on `connection` from the original `sql`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRealStatement`] when the connection yields no
    /// statement, and propagates the connection's own errors unchanged.
    pub async fn create<C>(&self, connection: &mut C, sql: &str) -> Result<C::Statement>
    where
        C: BackendConnection,
    {
        log::debug!("Creating backend statement ({self:?}): {sql}");
        let statement = match self {
            CreationVariant::Plain => connection.prepare(sql).await?,
            CreationVariant::GeneratedKeys(flag) => {
                connection.prepare_with_generated_keys(sql, *flag).await?
            }
            CreationVariant::ColumnIndexes(indexes) => {
                connection.prepare_with_column_indexes(sql, indexes).await?
            }
            CreationVariant::ColumnNames(names) => {
                connection.prepare_with_column_names(sql, names).await?
            }
            CreationVariant::ResultSet { kind, concurrency } => {
                connection
                    .prepare_with_result_set(sql, *kind, *concurrency)
                    .await?
            }
            CreationVariant::Holdable {
                kind,
                concurrency,
                holdability,
            } => {
                connection
                    .prepare_with_holdability(sql, *kind, *concurrency, *holdability)
                    .await?
            }
        };
        statement.ok_or(Error::NoRealStatement)
    }
}
