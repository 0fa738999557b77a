//! Installer configuration.
//!
//! Priority: caller override (CLI flag / env var)  >  TOML  >  built-in default.
//! The optional TOML file lives at `{cache_dir}/config.toml`; a malformed file
//! logs a warning and is ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::platform::{default_cache_dir, Platform};

const DEFAULT_LATEST_VERSION_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_STABLE";
const DEFAULT_DOWNLOAD_URL_BASE: &str =
    "https://storage.googleapis.com/chrome-for-testing-public";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// `{cache_dir}/config.toml` — all fields are optional overrides.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Plain-text endpoint publishing the latest driver version.
    latest_version_url: Option<String>,
    /// Base URL of the archive host; the full archive URL is
    /// `{base}/{version}/{platform}/chromedriver-{platform}.zip`.
    download_url_base: Option<String>,
    /// HTTP timeout in seconds for the version check and download.
    http_timeout_secs: Option<u64>,
}

fn load_toml(cache_dir: &Path) -> Option<TomlConfig> {
    let path = cache_dir.join("config.toml");
    let raw = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config.toml");
            None
        }
    }
}

/// Resolved installer configuration.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Cache directory holding `version.txt` and the artifact directory.
    pub cache_dir: PathBuf,
    pub latest_version_url: String,
    pub download_url_base: String,
    pub http_timeout_secs: u64,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self::load(None, None, None)
    }
}

impl InstallerConfig {
    /// Build the configuration from optional caller overrides.
    ///
    /// The cache directory is resolved first (override or per-OS default)
    /// because the TOML override file lives inside it.
    pub fn load(
        cache_dir: Option<PathBuf>,
        latest_version_url: Option<String>,
        download_url_base: Option<String>,
    ) -> Self {
        let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
        let toml = load_toml(&cache_dir).unwrap_or_default();

        Self {
            latest_version_url: latest_version_url
                .or(toml.latest_version_url)
                .unwrap_or_else(|| DEFAULT_LATEST_VERSION_URL.to_string()),
            download_url_base: download_url_base
                .or(toml.download_url_base)
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_URL_BASE.to_string()),
            http_timeout_secs: toml.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            cache_dir,
        }
    }

    /// Full download URL for a given version and platform.
    pub fn archive_url(&self, version: &str, platform: Platform) -> String {
        format!(
            "{}/{}/{}/chromedriver-{}.zip",
            self.download_url_base,
            version,
            platform.download_slug(),
            platform.download_slug()
        )
    }
}
