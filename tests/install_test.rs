//! install_test.rs — end-to-end install flow against a loopback HTTP server.
//!
//! The fixture server publishes a mutable "latest version" string and builds
//! driver zips on the fly, counting archive downloads so the tests can prove
//! the version-gated and idempotence properties.

use std::io::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path as UrlPath, State};
use axum::routing::get;
use axum::Router;
use driverup::{InstallError, Installer, InstallerConfig, Platform};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

#[derive(Clone)]
struct AppState {
    version: Arc<Mutex<String>>,
    archive_hits: Arc<AtomicUsize>,
}

struct Fixture {
    addr: SocketAddr,
    version: Arc<Mutex<String>>,
    archive_hits: Arc<AtomicUsize>,
}

impl Fixture {
    async fn start(initial_version: &str) -> Self {
        let state = AppState {
            version: Arc::new(Mutex::new(initial_version.to_string())),
            archive_hits: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/latest", get(latest_handler))
            .route("/dl/{version}/{platform}/{file}", get(download_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            version: state.version,
            archive_hits: state.archive_hits,
        }
    }

    fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }

    fn hits(&self) -> usize {
        self.archive_hits.load(Ordering::SeqCst)
    }

    fn config(&self, cache_dir: &Path) -> InstallerConfig {
        InstallerConfig::load(
            Some(cache_dir.to_path_buf()),
            Some(format!("http://{}/latest", self.addr)),
            Some(format!("http://{}/dl", self.addr)),
        )
    }

    fn installer(&self, cache_dir: &Path) -> Installer {
        Installer::new(self.config(cache_dir), Platform::Linux64).unwrap()
    }
}

async fn latest_handler(State(state): State<AppState>) -> String {
    state.version.lock().unwrap().clone()
}

async fn download_handler(
    State(state): State<AppState>,
    UrlPath((version, platform, _file)): UrlPath<(String, String, String)>,
) -> Vec<u8> {
    state.archive_hits.fetch_add(1, Ordering::SeqCst);
    let dir = format!("chromedriver-{platform}");
    let driver_name = if platform == "win64" {
        format!("{dir}/chromedriver.exe")
    } else {
        format!("{dir}/chromedriver")
    };
    make_zip_bytes(&[
        (&driver_name, format!("driver-{version}").as_bytes()),
        (&format!("{dir}/LICENSE.chromedriver"), b"license text"),
        (
            &format!("{dir}/THIRD_PARTY_NOTICES.chromedriver"),
            b"notices",
        ),
    ])
}

fn make_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

// ─── Install properties ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_install_downloads_and_stamps() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let path = fixture.installer(cache.path()).install().await.unwrap();

    assert_eq!(path, cache.path().join("chromedriver/chromedriver"));
    assert_eq!(std::fs::read(&path).unwrap(), b"driver-101.0.1");
    assert_eq!(
        std::fs::read_to_string(cache.path().join("version.txt")).unwrap(),
        "101.0.1"
    );
    assert_eq!(fixture.hits(), 1);
    // License, notices, and the archive itself are cleaned up.
    assert!(!cache.path().join("chromedriver/LICENSE.chromedriver").exists());
    assert!(!cache
        .path()
        .join("chromedriver/THIRD_PARTY_NOTICES.chromedriver")
        .exists());
    assert!(!cache.path().join("chromedriver-linux64.zip").exists());
    assert!(!cache.path().join("chromedriver-linux64").exists());
}

#[tokio::test]
async fn test_repeated_install_is_idempotent() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let first = fixture.installer(cache.path()).install().await.unwrap();
    let second = fixture.installer(cache.path()).install().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.hits(), 1, "second call must not download the archive");
}

#[tokio::test]
async fn test_update_replaces_previous_artifact() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    fixture.installer(cache.path()).install().await.unwrap();
    // A file only the old release had must not survive the update.
    std::fs::write(cache.path().join("chromedriver/leftover"), b"old").unwrap();

    fixture.set_version("102.0.0");
    let path = fixture.installer(cache.path()).install().await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"driver-102.0.0");
    assert_eq!(
        std::fs::read_to_string(cache.path().join("version.txt")).unwrap(),
        "102.0.0"
    );
    assert!(!cache.path().join("chromedriver/leftover").exists());
    assert_eq!(fixture.hits(), 2);
}

#[tokio::test]
async fn test_matching_stamp_and_binary_skip_the_download() {
    let fixture = Fixture::start("9.9.9").await;
    let cache = TempDir::new().unwrap();

    // Simulate a previous install by hand.
    std::fs::write(cache.path().join("version.txt"), "9.9.9").unwrap();
    std::fs::create_dir_all(cache.path().join("chromedriver")).unwrap();
    std::fs::write(cache.path().join("chromedriver/chromedriver"), b"cached").unwrap();

    let path = fixture.installer(cache.path()).install().await.unwrap();

    assert_eq!(path, cache.path().join("chromedriver/chromedriver"));
    assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    assert_eq!(fixture.hits(), 0);
}

#[tokio::test]
async fn test_matching_stamp_without_binary_reinstalls() {
    let fixture = Fixture::start("9.9.9").await;
    let cache = TempDir::new().unwrap();

    // Stamp says current, but the executable is gone.
    std::fs::write(cache.path().join("version.txt"), "9.9.9").unwrap();

    let path = fixture.installer(cache.path()).install().await.unwrap();

    assert!(path.exists());
    assert_eq!(std::fs::read(&path).unwrap(), b"driver-9.9.9");
    assert_eq!(fixture.hits(), 1);
}

// ─── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_version_check_failure_falls_back_to_cached_driver() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let installed = fixture.installer(cache.path()).install().await.unwrap();

    // Same cache, unreachable version endpoint.
    let config = InstallerConfig::load(
        Some(cache.path().to_path_buf()),
        Some("http://127.0.0.1:1/latest".to_string()),
        None,
    );
    let mut broken = Installer::new(config, Platform::Linux64).unwrap();

    let path = broken.install().await.unwrap();
    assert_eq!(path, installed);
    assert_eq!(fixture.hits(), 1);
}

#[tokio::test]
async fn test_download_failure_falls_back_to_cached_driver() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let installed = fixture.installer(cache.path()).install().await.unwrap();

    // New release published, but the archive host 404s for it.
    fixture.set_version("102.0.0");
    let config = InstallerConfig::load(
        Some(cache.path().to_path_buf()),
        Some(format!("http://{}/latest", fixture.addr)),
        Some(format!("http://{}/missing", fixture.addr)),
    );
    let mut broken = Installer::new(config, Platform::Linux64).unwrap();

    let path = broken.install().await.unwrap();
    assert_eq!(path, installed);
    // The stale stamp is untouched so the next healthy run retries the update.
    assert_eq!(
        std::fs::read_to_string(cache.path().join("version.txt")).unwrap(),
        "101.0.1"
    );
}

#[tokio::test]
async fn test_failure_with_empty_cache_is_a_hard_failure() {
    let cache = TempDir::new().unwrap();
    let config = InstallerConfig::load(
        Some(cache.path().to_path_buf()),
        Some("http://127.0.0.1:1/latest".to_string()),
        None,
    );
    let mut installer = Installer::new(config, Platform::Linux64).unwrap();

    let err = installer.install().await.unwrap_err();
    assert!(matches!(err, InstallError::NoFallback(_)));
}

// ─── Progress and platform injection ─────────────────────────────────────────

#[tokio::test]
async fn test_progress_callback_sees_full_download() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let samples: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&samples);
    let mut installer = fixture
        .installer(cache.path())
        .with_progress(move |done, total| sink.lock().unwrap().push((done, total)));

    installer.install().await.unwrap();

    let samples = samples.lock().unwrap();
    let (last_done, last_total) = *samples.last().expect("at least one progress report");
    assert!(last_total > 0, "fixture responses declare a Content-Length");
    assert_eq!(last_done, last_total);
    // Byte counts only ever grow.
    assert!(samples.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[tokio::test]
async fn test_injected_windows_platform_installs_exe() {
    let fixture = Fixture::start("101.0.1").await;
    let cache = TempDir::new().unwrap();

    let mut installer =
        Installer::new(fixture.config(cache.path()), Platform::Win64).unwrap();
    let path = installer.install().await.unwrap();

    assert_eq!(path, cache.path().join("chromedriver/chromedriver.exe"));
    assert!(path.exists());
}
