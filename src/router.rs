use crate::backend::{BackendConnection, Router};
use crate::Result;
use regex::Regex;
use std::future::{self, Future};
use std::sync::atomic::{AtomicBool, Ordering};

/// Statements that only read, possibly after leading comments.
pub const DEFAULT_READ_PATTERN: &str =
    r"(?is)^\s*(?:/\*.*?\*/\s*)*(?:SELECT|SHOW|DESCRIBE|DESC|EXPLAIN)\b";

/// Reads that must still see the primary: locking reads, file exports,
/// session-bound functions and explicit `/* primary */` hints.
pub const DEFAULT_PRIMARY_PATTERN: &str = r"(?is)\bFOR\s+UPDATE\b|\bFOR\s+SHARE\b|\bLOCK\s+IN\s+SHARE\s+MODE\b|\bINTO\s+(?:OUTFILE|DUMPFILE)\b|\b(?:LAST_INSERT_ID|GET_LOCK|RELEASE_LOCK|FOUND_ROWS)\s*\(|/\*\s*(?:master|primary)\s*\*/";

/// Target of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary,
    Replica,
}

/// Best-effort classification of probe SQL.
///
/// A statement goes to the replica when it matches the read pattern and does
/// not match the primary pattern; everything else goes to the primary.
#[derive(Debug, Clone)]
pub struct RoutingRules {
    read: Regex,
    primary: Regex,
}

impl RoutingRules {
    /// Rules built from [`DEFAULT_READ_PATTERN`] and [`DEFAULT_PRIMARY_PATTERN`].
    pub fn new() -> Result<Self> {
        Self::from_patterns(DEFAULT_READ_PATTERN, DEFAULT_PRIMARY_PATTERN)
    }

    /// # Errors
    ///
    /// Returns an error if either pattern is not a valid regular expression.
    pub fn from_patterns(read: &str, primary: &str) -> Result<Self> {
        Ok(Self {
            read: Regex::new(read)?,
            primary: Regex::new(primary)?,
        })
    }

    pub fn classify(&self, sql: &str) -> Route {
        if self.read.is_match(sql) && !self.primary.is_match(sql) {
            Route::Replica
        } else {
            Route::Primary
        }
    }
}

/// A [`Router`] splitting statements between a primary and a replica.
///
/// Connections are cloned out of the router, which suits pool handles such
/// as [`MySqlBackend`](crate::mysql::MySqlBackend).
#[derive(Debug)]
pub struct ReadWriteRouter<C> {
    primary: C,
    replica: C,
    rules: RoutingRules,
    pinned: AtomicBool,
}

impl<C> ReadWriteRouter<C> {
    pub fn new(primary: C, replica: C) -> Result<Self> {
        Ok(Self::with_rules(primary, replica, RoutingRules::new()?))
    }

    pub fn with_rules(primary: C, replica: C, rules: RoutingRules) -> Self {
        Self {
            primary,
            replica,
            rules,
            pinned: AtomicBool::new(false),
        }
    }

    pub fn primary(&self) -> &C {
        &self.primary
    }

    pub fn replica(&self) -> &C {
        &self.replica
    }

    /// Sends every statement to the primary while pinned, e.g. for the
    /// duration of a transaction.
    pub fn pin_primary(&self, pinned: bool) {
        self.pinned.store(pinned, Ordering::Release);
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.load(Ordering::Acquire)
    }

    pub fn route(&self, sql: &str) -> Route {
        if self.is_pinned() {
            Route::Primary
        } else {
            self.rules.classify(sql)
        }
    }
}

impl<C> Router for ReadWriteRouter<C>
where
    C: BackendConnection + Clone + Sync,
{
    type Connection = C;

    fn resolve(&self, probe_sql: &str) -> impl Future<Output = Result<C>> + Send {
        let route = self.route(probe_sql);
        log::debug!("Routing to {route:?}");
        log::trace!("{route:?} <- {probe_sql}");
        let connection = match route {
            Route::Primary => self.primary.clone(),
            Route::Replica => self.replica.clone(),
        };
        future::ready(Ok(connection))
    }
}
