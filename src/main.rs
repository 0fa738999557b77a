use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use driverup::{Installer, InstallerConfig, Platform};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "driverup",
    about = "Fetches, caches, and installs the chromedriver binary",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Cache directory for the driver and version stamp
    #[arg(long, env = "DRIVERUP_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Override the latest-version endpoint
    #[arg(long, env = "DRIVERUP_LATEST_VERSION_URL", global = true, hide = true)]
    latest_version_url: Option<String>,

    /// Override the archive download base URL
    #[arg(long, env = "DRIVERUP_DOWNLOAD_URL_BASE", global = true, hide = true)]
    download_url_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DRIVERUP_LOG", global = true)]
    log: Option<String>,

    /// Suppress progress and informational output.
    ///
    /// Errors are still printed to stderr; the installed path is still
    /// printed to stdout. Use this flag when piping output to other tools.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Install or update the driver (default when no subcommand given).
    ///
    /// Prints the path of the installed executable on stdout.
    Install,
    /// Show the installed and latest driver versions.
    Status {
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete the driver cache directory.
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.quiet { "warn" } else { "info" };
    init_logging(args.log.as_deref().unwrap_or(default_filter));

    let config = InstallerConfig::load(
        args.cache_dir.clone(),
        args.latest_version_url.clone(),
        args.download_url_base.clone(),
    );

    match args.command.unwrap_or(Command::Install) {
        Command::Install => cmd_install(config, args.quiet).await,
        Command::Status { json } => cmd_status(config, json).await,
        Command::Clean => cmd_clean(config),
    }
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn cmd_install(config: InstallerConfig, quiet: bool) -> Result<()> {
    let platform = Platform::detect();
    let mut installer = Installer::new(config, platform)?;

    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap(),
        );
        bar.set_message("Downloading driver");
        let handle = bar.clone();
        installer = installer.with_progress(move |done, total| {
            // total is 0 when the server declared no Content-Length; leave
            // the bar length unset rather than divide by zero.
            if total > 0 {
                handle.set_length(total);
            }
            handle.set_position(done);
        });
        Some(bar)
    };

    let result = installer.install().await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let path = result.context("driver installation failed")?;
    println!("{}", path.display());
    Ok(())
}

async fn cmd_status(config: InstallerConfig, json: bool) -> Result<()> {
    let cache_dir = config.cache_dir.clone();
    let installer = Installer::new(config, Platform::detect())?;

    let installed = installer.installed_version();
    let latest = match installer.latest_version().await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "could not reach the latest-version endpoint");
            None
        }
    };
    let driver_path = installer.installed_driver_path();
    let driver_present = driver_path.exists();
    let update_available = match (&installed, &latest) {
        (Some(i), Some(l)) => i != l,
        (None, Some(_)) => true,
        _ => false,
    };

    if json {
        let status = serde_json::json!({
            "cacheDir": cache_dir,
            "installed": installed,
            "latest": latest,
            "driverPath": if driver_present { Some(&driver_path) } else { None },
            "updateAvailable": update_available,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("cache dir: {}", cache_dir.display());
    println!(
        "installed: {}",
        installed.as_deref().unwrap_or("(none)")
    );
    println!(
        "latest:    {}",
        latest.as_deref().unwrap_or("(unavailable)")
    );
    if driver_present {
        println!("driver:    {}", driver_path.display());
    }
    if update_available {
        println!("an update is available; run `driverup install`");
    }
    Ok(())
}

/// Remove the installed driver, the version stamp, and any leftover archives.
/// `config.toml` (and the cache directory itself) are left in place.
fn cmd_clean(config: InstallerConfig) -> Result<()> {
    let cache_dir = &config.cache_dir;
    if !cache_dir.exists() {
        info!(path = %cache_dir.display(), "cache was already empty");
        return Ok(());
    }

    let stamp = cache_dir.join("version.txt");
    if stamp.exists() {
        std::fs::remove_file(&stamp)
            .with_context(|| format!("failed to remove {}", stamp.display()))?;
    }

    let artifact_dir = cache_dir.join("chromedriver");
    if artifact_dir.exists() {
        std::fs::remove_dir_all(&artifact_dir)
            .with_context(|| format!("failed to remove {}", artifact_dir.display()))?;
    }

    // Archives left behind by interrupted downloads.
    for entry in std::fs::read_dir(cache_dir)
        .with_context(|| format!("failed to read {}", cache_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "zip") {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }

    info!(path = %cache_dir.display(), "cache cleaned");
    Ok(())
}
