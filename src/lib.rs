//! # sqlx-rw-proxy
//!
//! A prepared statement proxy for read/write splitting: parameterized SQL is bound through a
//! statement handle that only picks its backend (read replica or write primary) once the full,
//! parameter-substituted SQL is known.
//!
//! ## Features
//!
//! - **Deferred Routing**: The backend statement is created on first execution, after the router
//!   has seen the SQL with every literal parameter substituted
//! - **Faithful Replay**: Binding calls are recorded as typed [`Binding`] values and replayed in
//!   their original order onto the real statement
//! - **Six Creation Shapes**: Plain, generated keys, key column indexes or names, result set type
//!   and concurrency, with or without holdability
//! - **Pluggable Backends**: Routers and backends are traits, a SQLx MySQL backend and a
//!   regex-based read/write router are included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlx_rw_proxy::mysql::MySqlRouter;
//! use sqlx_rw_proxy::{ProxyConfig, StatementProxy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = MySqlRouter::connect(&ProxyConfig::from_env()?).await?;
//!
//! let mut statement = StatementProxy::new(&router, "SELECT id, name FROM users WHERE id = ?");
//! statement.set_int(1, 42)?;
//!
//! // Routed to the replica: "SELECT id, name FROM users WHERE id = 42" is a plain read
//! let rows = statement.execute_query().await?;
//! println!("Found {} rows", rows.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Record**: Each `set_*` call is validated against the placeholders of the SQL, stored in
//!    the [`ParameterLog`] and, unless it is a stream, rendered as a literal for the probe
//! 2. **Route**: On first execution the probe SQL is handed to the [`Router`], which returns the
//!    backend connection
//! 3. **Create**: The [`CreationVariant`] chosen at construction creates the real statement from
//!    the original SQL, placeholders untouched
//! 4. **Replay**: The recorded bindings are applied to the real statement, which then executes
//!
//! The probe is only ever read by the router. Text values are quoted without escaping and stream
//! parameters stay `?`, so it must never be executed.
//!
//! ## Limitations
//!
//! - Batching (`add_batch`) is not supported
//! - Placeholders are found by counting every `?` in the SQL text, including those inside
//!   quoted strings or comments
//! - The routing decision is fixed for the lifetime of the real statement, call
//!   [`StatementProxy::reset`] to route again
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod backend;
pub mod binding;
pub mod config;
pub mod error;
pub mod mysql;
pub mod parameters;
pub mod placeholder;
pub mod router;
pub mod statement;
pub mod variant;

pub use backend::{BackendConnection, BackendStatement, Router};
pub use binding::{BindStream, Binding, SqlType};
pub use config::ProxyConfig;
pub use error::{Error, Result};
pub use parameters::{ParameterEntry, ParameterLog};
pub use router::{ReadWriteRouter, Route, RoutingRules};
pub use statement::StatementProxy;
pub use variant::{CreationVariant, ResultSetConcurrency, ResultSetHoldability, ResultSetType};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{BackendConnection, BackendStatement, Router};
    pub use crate::{Binding, SqlType, StatementProxy};
}
