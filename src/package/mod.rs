//! Package acquisition
//!
//! Turns package requests into packages resolvable from a shared cache:
//! reuse what is already installed, install what is missing, and resolve
//! the result so a half-finished install is reported instead of ignored.

pub mod cache;
pub mod installer;
pub mod loader;
pub mod request;

pub use cache::{CacheDir, ResolvedModule};
pub use installer::{classify_failure, FailureKind, NpmInstaller, PackageInstaller};
pub use loader::{LoadEvent, LoadObserver, LoadedPackage, PackageLoader};
pub use request::{binding_name, normalize, PackageRequest};
