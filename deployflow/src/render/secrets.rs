//! Name-based credential lookup.

use std::collections::HashSet;

/// A store of named secrets. Only existence is checked; values never leave
/// the store.
#[cfg_attr(test, mockall::automock)]
pub trait SecretStore {
    /// Returns true if a secret with this name exists.
    ///
    /// # Errors
    ///
    /// Returns the reason if the store could not be queried.
    fn contains(&self, name: &str) -> Result<bool, String>;
}

/// A fixed set of secret names.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    names: HashSet<String>,
}

impl InMemorySecretStore {
    /// Creates a store knowing the given names.
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SecretStore for InMemorySecretStore {
    fn contains(&self, name: &str) -> Result<bool, String> {
        Ok(self.names.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemorySecretStore::new(["github-pipeline-pat"]);
        assert_eq!(store.contains("github-pipeline-pat"), Ok(true));
        assert_eq!(store.contains("other"), Ok(false));
    }
}
