/// Boxed error produced by routers and backend drivers.
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for sqlx-rw-proxy
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A routing pattern could not be compiled
    #[error("Failed to parse routing pattern: {0}")]
    Parse(#[from] regex::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error raised by a router while resolving a backend connection
    #[error("Routing error: {0}")]
    Routing(#[source] BoxDynError),

    /// Error raised by a backend driver that is not a SQLx error
    #[error("Backend error: {0}")]
    Backend(#[source] BoxDynError),

    /// The operation needs a real backend statement and none was created yet
    #[error("No real prepared statement exists")]
    NotPrepared,

    /// The backend connection did not yield a statement object
    #[error("No real prepared statement was returned by the backend connection")]
    NoRealStatement,

    /// The operation is not supported by the proxy
    #[error("Operation '{0}' is not implemented")]
    NotImplemented(&'static str),

    /// The parameter index does not point at a placeholder of the statement
    #[error("Parameter index {index} is out of range, the statement has {count} placeholder(s)")]
    ParameterIndex { index: u32, count: usize },

    /// Placeholder was left without a value at execution time
    #[error("Parameter {0} was not bound")]
    UnboundParameter(u32),

    /// The statement handle was reset and not reopened
    #[error("Statement handle has been reset")]
    Closed,

    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stream parameter could not be read
    #[error("Failed to read stream parameter: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an arbitrary router failure.
    pub fn routing<E>(error: E) -> Self
    where
        E: Into<BoxDynError>,
    {
        Error::Routing(error.into())
    }

    /// Wraps an arbitrary backend driver failure.
    pub fn backend<E>(error: E) -> Self
    where
        E: Into<BoxDynError>,
    {
        Error::Backend(error.into())
    }
}

/// Result type alias for sqlx-rw-proxy operations
pub type Result<T> = std::result::Result<T, Error>;
