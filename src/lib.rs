//! driverup — fetches, caches, and installs the chromedriver binary.
//!
//! The library resolves the latest published driver version, compares it
//! against the version stamped in the local cache directory, downloads and
//! unpacks a new release only when the two differ, and returns the path to a
//! ready-to-run executable. Freshness is judged by version-string equality
//! alone; there is no content-hash check.
//!
//! Known limitation: there is no cross-process coordination. Two installers
//! running concurrently against the same cache directory race (last writer
//! wins), which is acceptable for the intended use as a one-shot setup step
//! in a test harness.

pub mod archive;
pub mod config;
pub mod error;
pub mod installer;
pub mod platform;

pub use config::InstallerConfig;
pub use error::InstallError;
pub use installer::Installer;
pub use platform::Platform;
