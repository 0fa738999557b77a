//! Typed failure modes for the install flow.
//!
//! Nothing in this crate panics past `Installer::install`: step failures are
//! logged and folded into the fallback path where a previously installed
//! driver exists. Only the nothing-cached case reaches the caller, as
//! [`InstallError::NoFallback`] with the underlying cause attached.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// DNS, timeout, connection, or HTTP error-status failure.
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Filesystem failure, carrying the path that was being operated on.
    #[error("filesystem operation failed on {path}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The downloaded archive could not be read as a zip.
    #[error("driver archive is corrupt: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The zip was readable but did not have the expected internal layout.
    #[error("unexpected archive layout: {0}")]
    ArchiveLayout(String),

    /// Installation failed and no previously installed driver exists to
    /// fall back to.
    #[error("installation failed and no cached driver is available")]
    NoFallback(#[source] Box<InstallError>),
}

impl InstallError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            path: path.into(),
            source,
        }
    }
}
