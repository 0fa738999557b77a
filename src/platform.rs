//! Target platform abstraction and cache directory resolution.
//!
//! The platform is resolved once at startup from compile-time target cfg and
//! injected into the installer, so tests can exercise non-host branches by
//! constructing a `Platform` directly.

use std::path::PathBuf;

/// Supported driver targets. Each maps to a path segment of the download URL,
/// the archive's internal top-level directory name, and the executable file
/// name inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Win64,
    MacX64,
    MacArm64,
    Linux64,
}

impl Platform {
    /// Resolve the platform for the running host.
    pub fn detect() -> Self {
        #[cfg(all(target_arch = "aarch64", target_os = "macos"))]
        return Platform::MacArm64;

        #[cfg(all(target_arch = "x86_64", target_os = "macos"))]
        return Platform::MacX64;

        #[cfg(target_os = "windows")]
        return Platform::Win64;

        #[cfg(not(any(
            all(target_arch = "aarch64", target_os = "macos"),
            all(target_arch = "x86_64", target_os = "macos"),
            target_os = "windows",
        )))]
        return Platform::Linux64;
    }

    /// Path segment used in the archive download URL.
    pub fn download_slug(&self) -> &'static str {
        match self {
            Platform::Win64 => "win64",
            Platform::MacX64 => "mac-x64",
            Platform::MacArm64 => "mac-arm64",
            Platform::Linux64 => "linux64",
        }
    }

    /// Name of the top-level directory inside the downloaded archive.
    pub fn archive_dir(&self) -> String {
        format!("chromedriver-{}", self.download_slug())
    }

    /// File name of the downloaded archive in the cache directory.
    pub fn archive_name(&self) -> String {
        format!("chromedriver-{}.zip", self.download_slug())
    }

    /// File name of the driver executable inside the artifact directory.
    pub fn driver_file(&self) -> &'static str {
        match self {
            Platform::Win64 => "chromedriver.exe",
            _ => "chromedriver",
        }
    }
}

/// Per-user cache directory for downloaded drivers.
///
/// A pure function of OS identity and the user's environment:
/// - Windows: `%APPDATA%\driverup`
/// - macOS: `~/Library/Application Support/driverup`
/// - elsewhere: `$XDG_CONFIG_HOME/driverup` or `~/.config/driverup`
///
/// Falls back to a relative `.driverup` when the environment gives no home.
pub fn default_cache_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("driverup");
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("driverup");
        }
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("driverup");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join("driverup");
        }
    }
    // Fallback
    PathBuf::from(".driverup")
}
