//! # Registry Plumbing
//!
//! Name→entry bookkeeping shared by the client and server registries: unique
//! insertion, all-or-nothing bulk insertion and include/exclude filtering.
//! Every failed operation leaves the entry set exactly as it was.
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("the name '{0}' is already registered")]
    DuplicateName(String),
    #[error("unknown name '{0}'")]
    UnknownName(String),
}

/// Direction of a [`EntrySet::filter`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Keep only the named entries.
    Include,
    /// Remove the named entries.
    Exclude,
}

/// An ordered name→entry map with registry semantics.
#[derive(Debug, Default)]
pub(crate) struct EntrySet<T> {
    entries: BTreeMap<String, T>,
}

impl<T> EntrySet<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: String, entry: T, require_unique: bool) -> Result<(), RegistryError> {
        if require_unique && self.entries.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Inserts a batch, failing without any insertion if a name collides with
    /// an existing entry or repeats within the batch.
    pub fn insert_many(&mut self, batch: Vec<(String, T)>) -> Result<(), RegistryError> {
        let mut seen = std::collections::BTreeSet::new();
        for (name, _) in &batch {
            if self.entries.contains_key(name) || !seen.insert(name.clone()) {
                return Err(RegistryError::DuplicateName(name.clone()));
            }
        }
        self.entries.extend(batch);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Prunes the active set. Every listed name must exist; otherwise the call
    /// fails with `UnknownName` and nothing is removed.
    pub fn filter(&mut self, names: &[&str], mode: FilterMode) -> Result<(), RegistryError> {
        for name in names {
            if !self.entries.contains_key(*name) {
                return Err(RegistryError::UnknownName((*name).to_string()));
            }
        }
        match mode {
            FilterMode::Include => self.entries.retain(|name, _| names.contains(&name.as_str())),
            FilterMode::Exclude => self.entries.retain(|name, _| !names.contains(&name.as_str())),
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
