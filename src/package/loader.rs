//! Package loading: reuse from cache, install on miss, resolve

use super::cache::{CacheDir, ResolvedModule};
use super::installer::PackageInstaller;
use super::request::PackageRequest;
use crate::error::{TrymodError, TrymodResult};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A package resolved from the cache and bound to its alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPackage {
    /// Package identifier
    pub name: String,
    /// Scope name the package is exposed under
    pub alias: String,
    /// Where the package lives in the cache
    pub value: ResolvedModule,
}

/// Progress notifications emitted while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// Package was already in the cache
    CacheHit { name: String },
    /// Package is missing and the installer is about to run
    Installing { name: String },
    /// Installer finished and the package resolved
    Installed { name: String },
    /// Loading this package failed
    Failed { name: String, reason: String },
}

/// Callback receiving [`LoadEvent`]s, possibly from several tasks at once
pub type LoadObserver = Arc<dyn Fn(LoadEvent) + Send + Sync>;

/// Loads requested packages from a cache directory, installing misses
pub struct PackageLoader {
    cache: CacheDir,
    installer: Arc<dyn PackageInstaller>,
    observer: LoadObserver,
    // Installs share one manifest, so only one installer runs at a time
    install_lock: Mutex<()>,
}

impl PackageLoader {
    /// Create a loader over `cache` using `installer` for misses
    pub fn new(cache: CacheDir, installer: Arc<dyn PackageInstaller>) -> Self {
        Self {
            cache,
            installer,
            observer: Arc::new(|_| {}),
            install_lock: Mutex::new(()),
        }
    }

    /// Report progress to `observer`
    pub fn with_observer(mut self, observer: LoadObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Cache this loader reads from
    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Load every request concurrently.
    ///
    /// Fails with the first error to arrive. Loads still in flight when that
    /// happens keep running in the background; only their results are
    /// dropped. Results are returned in request order.
    pub async fn load(
        self: &Arc<Self>,
        requests: &[PackageRequest],
    ) -> TrymodResult<Vec<LoadedPackage>> {
        let handles = requests.iter().cloned().map(|request| {
            let loader = Arc::clone(self);
            let handle = tokio::spawn(async move { loader.load_one(&request).await });
            async move {
                handle
                    .await
                    .map_err(|e| TrymodError::User(format!("Package load task failed: {}", e)))?
            }
        });

        try_join_all(handles).await
    }

    /// Load a single package
    pub async fn load_one(&self, request: &PackageRequest) -> TrymodResult<LoadedPackage> {
        debug!("Loading {}", request);
        match self.acquire(request.name()).await {
            Ok(value) => Ok(LoadedPackage {
                name: request.name().to_string(),
                alias: request.alias().to_string(),
                value,
            }),
            Err(e) => {
                warn!("Loading {} failed: {}", request.name(), e);
                self.emit(LoadEvent::Failed {
                    name: request.name().to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn acquire(&self, name: &str) -> TrymodResult<ResolvedModule> {
        if let Some(module) = self.cache.resolve(name).await? {
            info!("Cache hit for {}", name);
            self.emit(LoadEvent::CacheHit {
                name: name.to_string(),
            });
            return Ok(module);
        }

        let _guard = self.install_lock.lock().await;

        // Another request may have pulled this package in as a dependency
        // while we waited for the lock.
        if let Some(module) = self.cache.resolve(name).await? {
            info!("{} appeared in cache while waiting to install", name);
            self.emit(LoadEvent::CacheHit {
                name: name.to_string(),
            });
            return Ok(module);
        }

        info!("Cache miss for {}, installing", name);
        self.emit(LoadEvent::Installing {
            name: name.to_string(),
        });

        self.cache.prepare().await?;
        self.installer.install(name, self.cache.root()).await?;

        let module = self.cache.resolve(name).await?.ok_or_else(|| {
            TrymodError::load(
                name,
                format!(
                    "{} reported success but the package cannot be loaded from {}",
                    self.installer.installer_name(),
                    self.cache.package_dir(name).display()
                ),
            )
        })?;

        self.emit(LoadEvent::Installed {
            name: name.to_string(),
        });
        Ok(module)
    }

    fn emit(&self, event: LoadEvent) {
        (self.observer)(event);
    }
}
