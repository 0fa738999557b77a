//! Zip extraction and artifact finalization.
//!
//! The downloaded archive carries a platform-named top-level directory
//! (e.g. `chromedriver-linux64/`). Finalization strips the files that are not
//! part of the runnable artifact, deletes the archive, and renames that
//! directory to the fixed canonical name so callers never see the platform
//! naming.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::InstallError;

/// Files shipped inside the archive that are not part of the runnable artifact.
const REMOVE_ON_EXTRACT: &[&str] = &["LICENSE.chromedriver", "THIRD_PARTY_NOTICES.chromedriver"];

/// Extract `zip_path` into `dest_dir`, then finalize: drop license/notice
/// files, delete the archive, rename `archive_dir` to `canonical_dir`, and
/// mark the driver executable on Unix.
///
/// Any previous `canonical_dir` is removed wholesale first, so no files from
/// an older release survive an update.
///
/// Returns the path of the driver executable inside the canonical directory.
pub fn extract_and_finalize(
    zip_path: &Path,
    dest_dir: &Path,
    archive_dir: &str,
    canonical_dir: &str,
    driver_file: &str,
) -> Result<PathBuf, InstallError> {
    extract(zip_path, dest_dir)?;

    let extracted = dest_dir.join(archive_dir);
    if !extracted.is_dir() {
        return Err(InstallError::ArchiveLayout(format!(
            "archive did not contain the expected '{archive_dir}' directory"
        )));
    }

    for name in REMOVE_ON_EXTRACT {
        let path = extracted.join(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| InstallError::fs(&path, e))?;
            debug!(file = *name, "removed non-artifact file");
        }
    }

    fs::remove_file(zip_path).map_err(|e| InstallError::fs(zip_path, e))?;

    let target = dest_dir.join(canonical_dir);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(|e| InstallError::fs(&target, e))?;
    }
    fs::rename(&extracted, &target).map_err(|e| InstallError::fs(&extracted, e))?;

    let driver = target.join(driver_file);
    #[cfg(unix)]
    if driver.exists() {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&driver)
            .map_err(|e| InstallError::fs(&driver, e))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&driver, perms).map_err(|e| InstallError::fs(&driver, e))?;
    }

    Ok(driver)
}

/// Unpack every entry of the zip into `dest_dir`.
///
/// Entries whose names escape the destination (absolute paths, `..`
/// components) are rejected rather than written.
fn extract(zip_path: &Path, dest_dir: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(zip_path).map_err(|e| InstallError::fs(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(InstallError::ArchiveLayout(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| InstallError::fs(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::fs(parent, e))?;
        }
        let mut out = fs::File::create(&out_path).map_err(|e| InstallError::fs(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| InstallError::fs(&out_path, e))?;
    }

    debug!(entries = archive.len(), dest = %dest_dir.display(), "archive extracted");
    Ok(())
}
