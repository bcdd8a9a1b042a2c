//! Package requests parsed from the command line

use crate::error::{TrymodError, TrymodResult};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A package to load and the scope name it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    name: String,
    alias: String,
}

impl PackageRequest {
    /// Request `name`, bound under an alias derived from the name itself
    pub fn new(name: impl Into<String>) -> TrymodResult<Self> {
        let name = name.into();
        let alias = binding_name(&name);
        Self::with_alias(name, alias)
    }

    /// Request `name`, bound under `alias` (rewritten by [`binding_name`])
    pub fn with_alias(name: impl Into<String>, alias: impl AsRef<str>) -> TrymodResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TrymodError::InvalidRequest {
                arg: name,
                reason: "package name is empty".to_string(),
            });
        }

        let alias = binding_name(alias.as_ref());
        if alias.is_empty() {
            return Err(TrymodError::InvalidRequest {
                arg: format!("{}=", name),
                reason: "alias is empty".to_string(),
            });
        }

        Ok(Self { name, alias })
    }

    /// Package identifier as passed to the installer
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the package is exposed under in the REPL scope
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl FromStr for PackageRequest {
    type Err = TrymodError;

    /// Parse `name` or `name=alias`
    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        match arg.split_once('=') {
            Some((name, alias)) => Self::with_alias(name, alias),
            None => Self::new(arg),
        }
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.alias)
    }
}

/// Make a package name usable as a variable: `-` and `.` become `_`
pub fn binding_name(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// Collapse repeated package names and reject alias collisions.
///
/// A name given twice keeps its first position and its last alias. Two
/// different packages resolving to the same alias are an error.
pub fn normalize(requests: Vec<PackageRequest>) -> TrymodResult<Vec<PackageRequest>> {
    let mut unique: Vec<PackageRequest> = Vec::with_capacity(requests.len());
    for request in requests {
        match unique.iter_mut().find(|r| r.name == request.name) {
            Some(existing) => existing.alias = request.alias,
            None => unique.push(request),
        }
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();
    for request in &unique {
        if let Some(first) = owners.insert(&request.alias, &request.name) {
            return Err(TrymodError::AliasConflict {
                alias: request.alias.clone(),
                first: first.to_string(),
                second: request.name.clone(),
            });
        }
    }

    Ok(unique)
}
