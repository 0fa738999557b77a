//! Driver installer.
//!
//! Orchestrates the install flow: resolve the latest published version,
//! compare it against the locally stamped one, and only when they differ
//! download the archive, extract it, and restamp the cache.
//!
//! Flow on `install()`:
//! 1. GET the latest-version endpoint.
//! 2. Read `version.txt` from the cache directory.
//! 3. Equal and the binary exists: return the installed path, no download.
//! 4. Otherwise: streamed GET of the archive, extract + finalize, write
//!    `version.txt`, return the new path.
//!
//! Failures during 1 or 4 fall back to the previously installed driver when
//! one exists; with nothing cached the caller gets
//! [`InstallError::NoFallback`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::archive;
use crate::config::InstallerConfig;
use crate::error::InstallError;
use crate::platform::Platform;

/// Fixed name of the artifact directory, independent of the archive's
/// platform-specific internal naming.
const CANONICAL_DIR: &str = "chromedriver";

/// Version stamp file recording which driver version is installed. Its
/// content is the sole freshness check; there is no content-hash verification.
const VERSION_STAMP: &str = "version.txt";

/// Download progress callback: `(bytes_done, bytes_total)`.
///
/// `bytes_total` is 0 when the server did not declare a Content-Length;
/// renderers must guard that case before computing a ratio.
pub type ProgressFn = Box<dyn FnMut(u64, u64) + Send>;

/// Fetches, caches, and installs the driver binary.
pub struct Installer {
    config: InstallerConfig,
    platform: Platform,
    client: reqwest::Client,
    progress: Option<ProgressFn>,
}

impl Installer {
    pub fn new(config: InstallerConfig, platform: Platform) -> Result<Self, InstallError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            config,
            platform,
            client,
            progress: None,
        })
    }

    /// Attach a progress callback for archive downloads. The library itself
    /// never renders progress; the caller decides whether and how to.
    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        self.progress = Some(Box::new(on_progress));
        self
    }

    /// Latest published driver version, as an opaque string token.
    pub async fn latest_version(&self) -> Result<String, InstallError> {
        let text = self
            .client
            .get(&self.config.latest_version_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text.trim().to_string())
    }

    /// Version recorded by the last successful install, if any.
    ///
    /// Never errors: an absent or unreadable stamp reads as "nothing
    /// installed" (unreadable is logged).
    pub fn installed_version(&self) -> Option<String> {
        let path = self.config.cache_dir.join(VERSION_STAMP);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let version = raw.trim();
                if version.is_empty() {
                    None
                } else {
                    Some(version.to_string())
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not read version stamp");
                None
            }
        }
    }

    /// Path where the installed driver executable lives (whether or not it
    /// currently exists).
    pub fn installed_driver_path(&self) -> PathBuf {
        self.config
            .cache_dir
            .join(CANONICAL_DIR)
            .join(self.platform.driver_file())
    }

    /// Install or update the driver and return the path to its executable.
    ///
    /// When everything is current this performs a single version-check round
    /// trip and no downloads. When the flow fails but an earlier install
    /// exists, the previously installed executable is returned instead of an
    /// error.
    pub async fn install(&mut self) -> Result<PathBuf, InstallError> {
        match self.try_install().await {
            Ok(path) => Ok(path),
            Err(err) => {
                let fallback = self.installed_driver_path();
                if self.installed_version().is_some() && fallback.exists() {
                    warn!(
                        error = %err,
                        fallback = %fallback.display(),
                        "install failed; using previously installed driver"
                    );
                    Ok(fallback)
                } else {
                    Err(InstallError::NoFallback(Box::new(err)))
                }
            }
        }
    }

    async fn try_install(&mut self) -> Result<PathBuf, InstallError> {
        let latest = self.latest_version().await?;
        let driver_path = self.installed_driver_path();

        match self.installed_version() {
            Some(installed) if installed == latest && driver_path.exists() => {
                info!(version = %latest, "driver is already up to date");
                return Ok(driver_path);
            }
            Some(installed) if installed == latest => {
                warn!(
                    version = %latest,
                    "version stamp is current but the driver binary is missing; reinstalling"
                );
            }
            Some(installed) => {
                info!(installed = %installed, latest = %latest, "driver update available");
            }
            None => {
                info!(version = %latest, "no driver installed yet");
            }
        }

        let cache_dir = self.config.cache_dir.clone();
        fs::create_dir_all(&cache_dir).map_err(|e| InstallError::fs(&cache_dir, e))?;

        let zip_path = cache_dir.join(self.platform.archive_name());
        let url = self.config.archive_url(&latest, self.platform);
        debug!(url = %url, "downloading driver archive");
        self.download(&url, &zip_path).await?;

        let driver = archive::extract_and_finalize(
            &zip_path,
            &cache_dir,
            &self.platform.archive_dir(),
            CANONICAL_DIR,
            self.platform.driver_file(),
        )?;
        self.write_version_stamp(&latest)?;

        info!(version = %latest, path = %driver.display(), "driver installed");
        Ok(driver)
    }

    /// Stream the archive to `dest` chunk by chunk, reporting progress after
    /// each chunk. A failed download leaves a partial file behind; the next
    /// attempt restarts from scratch and overwrites it.
    async fn download(&mut self, url: &str, dest: &Path) -> Result<(), InstallError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length().unwrap_or(0);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InstallError::fs(dest, e))?;

        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| InstallError::fs(dest, e))?;
            received += chunk.len() as u64;
            if let Some(on_progress) = self.progress.as_mut() {
                on_progress(received, total);
            }
        }
        file.flush().await.map_err(|e| InstallError::fs(dest, e))?;

        debug!(bytes = received, "archive download complete");
        Ok(())
    }

    fn write_version_stamp(&self, version: &str) -> Result<(), InstallError> {
        let path = self.config.cache_dir.join(VERSION_STAMP);
        fs::write(&path, version).map_err(|e| InstallError::fs(&path, e))
    }
}
