//! Packages exposed in the REPL scope

use crate::error::{TrymodError, TrymodResult};
use crate::package::LoadedPackage;

/// Alias → package mapping injected into scope before the first submission
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    packages: Vec<LoadedPackage>,
}

impl BindingSet {
    /// Build a binding set, rejecting two packages under one alias
    pub fn from_packages(packages: Vec<LoadedPackage>) -> TrymodResult<Self> {
        let mut set = Self::default();
        for package in packages {
            set.insert(package)?;
        }
        Ok(set)
    }

    /// Add a package. The same package under the same alias is a no-op.
    pub fn insert(&mut self, package: LoadedPackage) -> TrymodResult<()> {
        if let Some(existing) = self.get(&package.alias) {
            if existing.name == package.name {
                return Ok(());
            }
            return Err(TrymodError::AliasConflict {
                alias: package.alias,
                first: existing.name.clone(),
                second: package.name,
            });
        }
        self.packages.push(package);
        Ok(())
    }

    /// Package bound to `alias`
    pub fn get(&self, alias: &str) -> Option<&LoadedPackage> {
        self.packages.iter().find(|p| p.alias == alias)
    }

    /// Bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &LoadedPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
