use crate::{Error, Result};
use std::collections::BTreeMap;

/// Positional placeholder tracking for the routing probe.
///
/// The original SQL text is never modified. Each bound ordinal maps to the
/// literal that replaces the matching `?`, and the probe is rebuilt from the
/// original text every time it is rendered, so ordinals keep pointing at the
/// same placeholders no matter how often they are rebound or cleared.
///
/// # Examples
///
/// ```
/// use sqlx_rw_proxy::placeholder::PlaceholderBuffer;
///
/// let mut buffer = PlaceholderBuffer::new("SELECT * FROM users WHERE id = ? AND name = ?");
/// buffer.bind(2, Some("'Bob'".into()))?;
/// assert_eq!(buffer.render(), "SELECT * FROM users WHERE id = ? AND name = 'Bob'");
/// # Ok::<(), sqlx_rw_proxy::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderBuffer {
    sql: String,
    positions: Vec<usize>,
    literals: BTreeMap<u32, String>,
}

impl PlaceholderBuffer {
    pub fn new<T>(sql: T) -> Self
    where
        T: Into<String>,
    {
        let sql = sql.into();
        let positions = sql.match_indices('?').map(|(i, _)| i).collect();
        Self {
            sql,
            positions,
            literals: BTreeMap::new(),
        }
    }

    /// The original SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholder_count(&self) -> usize {
        self.positions.len()
    }

    /// Checks that `index` (1-based) targets an existing placeholder.
    pub fn check_index(&self, index: u32) -> Result<()> {
        if index == 0 || index as usize > self.positions.len() {
            return Err(Error::ParameterIndex {
                index,
                count: self.positions.len(),
            });
        }
        Ok(())
    }

    /// Sets the probe substitution of the `index`-th placeholder.
    ///
    /// `None` keeps the placeholder as `?` in the probe.
    pub fn bind(&mut self, index: u32, literal: Option<String>) -> Result<()> {
        self.check_index(index)?;
        match literal {
            Some(literal) => self.literals.insert(index, literal),
            None => self.literals.remove(&index),
        };
        Ok(())
    }

    /// Forgets every substitution.
    pub fn clear(&mut self) {
        self.literals.clear();
    }

    /// Renders the probe SQL.
    pub fn render(&self) -> String {
        let extra = self.literals.values().map(String::len).sum::<usize>();
        let mut out = String::with_capacity(self.sql.len() + extra);
        let mut pos = 0;
        for (index, literal) in &self.literals {
            let at = self.positions[*index as usize - 1];
            out.push_str(&self.sql[pos..at]);
            out.push_str(literal);
            pos = at + 1;
        }
        out.push_str(&self.sql[pos..]);
        out
    }
}
