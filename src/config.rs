use crate::router::{RoutingRules, DEFAULT_PRIMARY_PATTERN, DEFAULT_READ_PATTERN};
use crate::{Error, Result};
use std::env;

pub const PRIMARY_URL_VAR: &str = "PRIMARY_DATABASE_URL";
pub const FALLBACK_URL_VAR: &str = "DATABASE_URL";
pub const REPLICA_URL_VAR: &str = "REPLICA_DATABASE_URL";
pub const READ_PATTERN_VAR: &str = "READ_QUERY_PATTERN";
pub const PRIMARY_PATTERN_VAR: &str = "PRIMARY_QUERY_PATTERN";

/// Connection and routing settings of a read/write split deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub primary_url: String,
    /// Without a replica every statement runs on the primary.
    pub replica_url: Option<String>,
    pub read_pattern: Option<String>,
    pub primary_pattern: Option<String>,
}

impl ProxyConfig {
    pub fn new<T: Into<String>>(primary_url: T) -> Self {
        Self {
            primary_url: primary_url.into(),
            replica_url: None,
            read_pattern: None,
            primary_pattern: None,
        }
    }

    pub fn replica<T: Into<String>>(mut self, replica_url: T) -> Self {
        self.replica_url = Some(replica_url.into());
        self
    }

    pub fn read_pattern<T: Into<String>>(mut self, pattern: T) -> Self {
        self.read_pattern = Some(pattern.into());
        self
    }

    pub fn primary_pattern<T: Into<String>>(mut self, pattern: T) -> Self {
        self.primary_pattern = Some(pattern.into());
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// The primary URL is read from `PRIMARY_DATABASE_URL`, falling back to
    /// `DATABASE_URL`. `REPLICA_DATABASE_URL`, `READ_QUERY_PATTERN` and
    /// `PRIMARY_QUERY_PATTERN` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no primary URL is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary_url = lookup(PRIMARY_URL_VAR)
            .or_else(|| lookup(FALLBACK_URL_VAR))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("neither {PRIMARY_URL_VAR} nor {FALLBACK_URL_VAR} is set"))
            })?;
        let optional = |name: &str| lookup(name).filter(|value: &String| !value.is_empty());
        Ok(Self {
            primary_url,
            replica_url: optional(REPLICA_URL_VAR),
            read_pattern: optional(READ_PATTERN_VAR),
            primary_pattern: optional(PRIMARY_PATTERN_VAR),
        })
    }

    /// Compiles the routing rules, using the defaults for unset patterns.
    pub fn routing_rules(&self) -> Result<RoutingRules> {
        RoutingRules::from_patterns(
            self.read_pattern.as_deref().unwrap_or(DEFAULT_READ_PATTERN),
            self.primary_pattern
                .as_deref()
                .unwrap_or(DEFAULT_PRIMARY_PATTERN),
        )
    }
}
