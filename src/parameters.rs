use crate::backend::BackendStatement;
use crate::binding::Binding;
use crate::Result;

/// One recorded binding call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    /// Placeholder ordinal, from 1.
    pub index: u32,
    pub binding: Binding,
}

/// Ordered record of the binding calls made on a proxy statement.
///
/// Entries are kept in call order, including repeated bindings of the same
/// ordinal, so replaying them reproduces exactly the calls the client made.
#[derive(Debug, Clone, Default)]
pub struct ParameterLog {
    entries: Vec<ParameterEntry>,
}

impl ParameterLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, index: u32, binding: Binding) {
        log::trace!("Recording {}({index})", binding.operation());
        self.entries.push(ParameterEntry { index, binding });
    }

    /// Applies every recorded binding to `target`, in recording order.
    ///
    /// # Errors
    ///
    /// Stops at the first binding the target rejects and returns its error
    /// as is.
    pub fn replay<S>(&self, target: &mut S) -> Result<()>
    where
        S: BackendStatement,
    {
        log::trace!("Replaying {} binding(s)", self.entries.len());
        for ParameterEntry { index, binding } in &self.entries {
            target.bind(*index, binding)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ParameterLog {
    type Item = &'a ParameterEntry;
    type IntoIter = std::slice::Iter<'a, ParameterEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
