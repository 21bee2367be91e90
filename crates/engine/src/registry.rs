//! Named targets configured for one field, and selector resolution.

use std::sync::Arc;

use fanout_types::{Selector, Target};
use indexmap::IndexMap;

use crate::error::{RegistryError, UnknownTargetError};

/// Read-only set of targets for a field, in configuration order.
///
/// Clones share the same underlying map, so one registry can serve any
/// number of concurrent resolutions.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Arc<IndexMap<String, Target>>,
}

impl TargetRegistry {
    /// Build a registry; the first target becomes the default.
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Result<Self, RegistryError> {
        let mut map = IndexMap::new();
        for target in targets {
            if map.contains_key(&target.name) {
                return Err(RegistryError::DuplicateTarget { name: target.name });
            }
            map.insert(target.name.clone(), target);
        }
        if map.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { targets: Arc::new(map) })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Resolve a selector into the ordered list of targets to call.
    ///
    /// - absent: the first configured target
    /// - one name: exactly that target
    /// - many names: those targets in the given order, duplicates kept
    ///
    /// Any unknown name fails the whole resolution; no partial list is
    /// returned.
    pub fn resolve(&self, selector: &Selector) -> Result<Vec<Target>, UnknownTargetError> {
        match selector {
            Selector::Absent => Ok(self.targets.first().map(|(_, target)| target.clone()).into_iter().collect()),
            Selector::One(name) => self.lookup(name).map(|target| vec![target.clone()]),
            Selector::Many(names) => names.iter().map(|name| self.lookup(name).cloned()).collect(),
        }
    }

    fn lookup(&self, name: &str) -> Result<&Target, UnknownTargetError> {
        self.targets.get(name).ok_or_else(|| UnknownTargetError {
            name: name.to_string(),
            valid: self.names().map(str::to_string).collect(),
        })
    }
}
