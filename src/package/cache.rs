//! On-disk package cache
//!
//! Layout under the cache root:
//!
//! | Path | Owner | Description |
//! |------|-------|-------------|
//! | `node_modules/` | installer | Installed packages, reused across runs |
//! | `package.json` | trymod | Placeholder manifest so installs land as dependencies |
//! | `repl_history` | REPL | Default history file (not touched by clear) |

use crate::error::{TrymodError, TrymodResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Directory holding installed packages
const MODULES_DIR: &str = "node_modules";

/// Manifest file name, both for the cache root and for each package
const MANIFEST_FILE: &str = "package.json";

/// File stem Node falls back to inside a package directory
const INDEX_STEM: &str = "index";

/// Extensions `require` tries on an extensionless path, in order
const EXTENSIONS: &[&str] = &["js", "json", "node"];

/// `exports` conditions honoured by `require`, most specific first
const REQUIRE_CONDITIONS: &[&str] = &["require", "node", "default"];

/// Name written into the placeholder manifest
const SANDBOX_NAME: &str = "trymod-sandbox";

/// Placeholder manifest written to the cache root
#[derive(Debug, Serialize)]
struct SandboxManifest {
    name: &'static str,
    private: bool,
}

/// Fields read from an installed package's manifest
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    version: Option<String>,
    main: Option<String>,
    exports: Option<serde_json::Value>,
}

/// A package found in the cache, ready to be bound into the REPL scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Package identifier
    pub name: String,
    /// Version from the package manifest, if it has one
    pub version: Option<String>,
    /// Package directory
    pub dir: PathBuf,
    /// File `require` loads for this package, passed to the evaluator
    pub entry: PathBuf,
}

/// Handle on a cache root directory
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    /// Wrap a cache root. Nothing is created until a package is installed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installer-managed package store
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    /// Placeholder manifest path
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Directory a package installs into
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.modules_dir().join(name)
    }

    /// Resolve a package from the store.
    ///
    /// A package only resolves when `require` could load it: its manifest
    /// parses and its entry point exists. Anything less is a cache miss, so
    /// a damaged install gets reinstalled.
    pub async fn resolve(&self, name: &str) -> TrymodResult<Option<ResolvedModule>> {
        let dir = self.package_dir(name);
        let manifest_path = dir.join(MANIFEST_FILE);

        let manifest = match fs::read_to_string(&manifest_path).await {
            Ok(content) => match serde_json::from_str::<PackageManifest>(&content) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Ignoring cached {}: unreadable {}: {}", name, manifest_path.display(), e);
                    return Ok(None);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PackageManifest::default(),
            Err(e) => {
                return Err(TrymodError::io(
                    format!("reading {}", manifest_path.display()),
                    e,
                ))
            }
        };

        let Some(entry) = entry_point(&dir, &manifest).await else {
            debug!("{} has no loadable entry point in {}", name, dir.display());
            return Ok(None);
        };
        debug!("Resolved {} to {}", name, entry.display());

        Ok(Some(ResolvedModule {
            name: name.to_string(),
            version: manifest.version,
            dir,
            entry,
        }))
    }

    /// Create the cache root and placeholder manifest if they are missing
    pub async fn prepare(&self) -> TrymodResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            TrymodError::io(format!("creating cache directory {}", self.root.display()), e)
        })?;

        let manifest = self.manifest_path();
        if fs::try_exists(&manifest).await.unwrap_or(false) {
            return Ok(());
        }

        let content = serde_json::to_string_pretty(&SandboxManifest {
            name: SANDBOX_NAME,
            private: true,
        })?;
        fs::write(&manifest, content)
            .await
            .map_err(|e| TrymodError::io(format!("writing {}", manifest.display()), e))?;

        debug!("Created {}", manifest.display());
        Ok(())
    }

    /// Remove every installed package. Missing store is not an error.
    pub async fn clear(&self) -> TrymodResult<()> {
        let modules = self.modules_dir();
        match fs::remove_dir_all(&modules).await {
            Ok(()) => {
                debug!("Removed {}", modules.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TrymodError::io(format!("removing {}", modules.display()), e)),
        }
    }
}

/// Locate the file `require` would load for the package in `dir`.
///
/// `exports` is exact and has no fallback. Otherwise `main` is tried as a
/// file (with extensions) and as a directory index, then the package's own
/// index.
async fn entry_point(dir: &Path, manifest: &PackageManifest) -> Option<PathBuf> {
    if let Some(ref exports) = manifest.exports {
        let target = dir.join(export_target(exports)?);
        return is_file(&target).await.then_some(target);
    }

    if let Some(main) = manifest.main.as_deref().filter(|m| !m.trim().is_empty()) {
        let target = dir.join(main);
        if let Some(found) = load_as_file(&target).await {
            return Some(found);
        }
        if let Some(found) = load_index(&target).await {
            return Some(found);
        }
    }

    load_index(dir).await
}

/// Target of the package root (`"."`) in an `exports` field
fn export_target(exports: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match exports {
        Value::String(target) => Some(target.clone()),
        Value::Array(targets) => targets.iter().find_map(export_target),
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            map.get(".").and_then(export_target)
        }
        Value::Object(map) => REQUIRE_CONDITIONS
            .iter()
            .find_map(|condition| map.get(*condition).and_then(export_target)),
        _ => None,
    }
}

async fn load_as_file(path: &Path) -> Option<PathBuf> {
    if is_file(path).await {
        return Some(path.to_path_buf());
    }
    for ext in EXTENSIONS {
        let mut candidate = path.as_os_str().to_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn load_index(dir: &Path) -> Option<PathBuf> {
    for ext in EXTENSIONS {
        let candidate = dir.join(format!("{}.{}", INDEX_STEM, ext));
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}
