//! Flat-file store of module releases.
//!
//! Every release lives in one txtar file directly under the store root. The
//! file name is derived from the escaped module path with `/` replaced by
//! `_`, followed by `_`, the canonical version and `.txt`:
//!
//! ```text
//! github.com/BurntSushi/toml v1.2.0  ->  github.com_!burnt!sushi_toml_v1.2.0.txt
//! ```
//!
//! Nothing is cached. Each call reads the filesystem again, so files added
//! or replaced while the server runs are picked up by the next request.

mod txtar;

pub use txtar::{Archive, ArchiveFile};

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::path;
use crate::semver;

const FILE_SUFFIX: &str = ".txt";
const SEPARATOR: &str = "_";
const MOD_FILE: &str = "go.mod";

/// Response body of the `.info` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    pub time: String,
}

impl VersionInfo {
    pub fn new(version: &str, modified: DateTime<Utc>) -> Self {
        Self {
            version: version.to_string(),
            time: modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// One release read from the store.
#[derive(Debug, Clone)]
pub struct ModuleRelease {
    pub module: String,
    pub version: String,
    pub modified: DateTime<Utc>,
    pub archive: Archive,
}

/// Something that can answer proxy queries for modules.
///
/// Callers only pass canonical module paths and canonical versions.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// List the canonical versions available for `module`, in no particular order.
    async fn list(&self, module: &str) -> Result<Vec<String>>;

    /// Describe a single version without reading its contents.
    async fn info(&self, module: &str, version: &str) -> Result<VersionInfo>;

    /// Read and parse a release.
    async fn load(&self, module: &str, version: &str) -> Result<ModuleRelease>;
}

/// The filesystem-backed [`ModuleSource`].
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the archive holding `module` at `version`.
    pub fn file_name(&self, module: &str, version: &str) -> PathBuf {
        let mut name = file_prefix(module);
        name.push_str(version);
        name.push_str(FILE_SUFFIX);
        self.root.join(name)
    }
}

/// The part of a store file name shared by every version of `module`.
fn file_prefix(module: &str) -> String {
    let mut prefix = path::escape(module).replace('/', SEPARATOR);
    prefix.push_str(SEPARATOR);
    prefix
}

fn not_found(path: &Path) -> impl FnOnce(io::Error) -> ProxyError + '_ {
    move |source| ProxyError::NotFound {
        path: path.to_path_buf(),
        source,
    }
}

fn modified_time(meta: &std::fs::Metadata, path: &Path) -> Result<DateTime<Utc>> {
    let modified = meta.modified().map_err(not_found(path))?;
    Ok(modified.into())
}

#[async_trait]
impl ModuleSource for ArchiveStore {
    async fn list(&self, module: &str) -> Result<Vec<String>> {
        let prefix = file_prefix(module);
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(not_found(&self.root))?;

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(not_found(&self.root))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(version) = name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            // Another module's files can share the prefix, e.g. `a/b` and
            // `a/b/c` both start with `a_b_`; their middle is never canonical.
            if semver::is_canonical(version) {
                versions.push(version.to_string());
            }
        }

        debug!(module, count = versions.len(), "listed versions");
        Ok(versions)
    }

    async fn info(&self, module: &str, version: &str) -> Result<VersionInfo> {
        let path = self.file_name(module, version);
        let meta = fs::metadata(&path).await.map_err(not_found(&path))?;
        Ok(VersionInfo::new(version, modified_time(&meta, &path)?))
    }

    async fn load(&self, module: &str, version: &str) -> Result<ModuleRelease> {
        let path = self.file_name(module, version);
        let mut file = fs::File::open(&path).await.map_err(not_found(&path))?;
        let meta = file.metadata().await.map_err(not_found(&path))?;
        let mut data = Vec::with_capacity(meta.len() as usize);
        file.read_to_end(&mut data)
            .await
            .map_err(not_found(&path))?;

        let archive = Archive::parse(&data).map_err(|reason| ProxyError::CorruptArchive {
            path: path.clone(),
            reason,
        })?;
        debug!(path = %path.display(), files = archive.files.len(), "loaded archive");

        Ok(ModuleRelease {
            module: module.to_string(),
            version: version.to_string(),
            modified: modified_time(&meta, &path)?,
            archive,
        })
    }
}

/// The `go.mod` served for a release.
///
/// Releases without a `go.mod` file get a one-line manifest that only
/// declares the module path.
pub fn module_file(archive: &Archive, module: &str) -> Vec<u8> {
    match archive.file(MOD_FILE) {
        Some(f) => f.data.clone(),
        None => format!("module {module}\n").into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn store_with(files: &[(&str, &str)]) -> (TempDir, ArchiveStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let store = ArchiveStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn file_name_escapes_module_path() {
        let store = ArchiveStore::new("/srv/mods");
        assert_eq!(
            store.file_name("github.com/BurntSushi/toml", "v1.2.0"),
            PathBuf::from("/srv/mods/github.com_!burnt!sushi_toml_v1.2.0.txt")
        );
    }

    #[tokio::test]
    async fn list_returns_only_matching_canonical_versions() {
        let (_dir, store) = store_with(&[
            ("example.com_m_v1.0.0.txt", ""),
            ("example.com_m_v1.1.0.txt", ""),
            ("example.com_mx_v1.0.0.txt", ""),
            ("example.com_m_sub_v1.0.0.txt", ""),
            ("example.com_m_v1.2.txt", ""),
            ("example.com_m_v1.3.0+meta.txt", ""),
            ("example.com_m_v1.4.0.zip", ""),
            ("example.com_m_.txt", ""),
        ]);

        let versions: HashSet<_> = store.list("example.com/m").await.unwrap().into_iter().collect();
        let expected: HashSet<_> = ["v1.0.0", "v1.1.0"].map(String::from).into_iter().collect();
        assert_eq!(versions, expected);
    }

    #[tokio::test]
    async fn list_of_unknown_module_is_empty() {
        let (_dir, store) = store_with(&[("example.com_m_v1.0.0.txt", "")]);
        assert!(store.list("example.com/other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_fails_when_root_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("missing"));
        let err = store.list("example.com/m").await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn info_reports_version_and_utc_time() {
        let (_dir, store) = store_with(&[("example.com_m_v1.0.0.txt", "not parsed -- at all")]);
        let info = store.info("example.com/m", "v1.0.0").await.unwrap();
        assert_eq!(info.version, "v1.0.0");
        assert!(DateTime::parse_from_rfc3339(&info.time).is_ok(), "{}", info.time);
        assert!(info.time.ends_with('Z'), "{}", info.time);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["Version"], "v1.0.0");
        assert_eq!(json["Time"], info.time.as_str());
    }

    #[tokio::test]
    async fn info_and_load_report_the_file_mtime() {
        let (dir, store) = store_with(&[("example.com_m_v1.0.0.txt", "-- a --\na\n")]);
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        std::fs::File::options()
            .write(true)
            .open(dir.path().join("example.com_m_v1.0.0.txt"))
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let info = store.info("example.com/m", "v1.0.0").await.unwrap();
        assert_eq!(info.time, "2023-11-14T22:13:20Z");
        let release = store.load("example.com/m", "v1.0.0").await.unwrap();
        assert_eq!(release.modified, DateTime::<Utc>::from(mtime));
    }

    #[tokio::test]
    async fn info_of_missing_version_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let err = store.info("example.com/m", "v1.0.0").await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_parses_archive() {
        let (_dir, store) = store_with(&[(
            "example.com_!foo_v0.1.0.txt",
            "-- go.mod --\nmodule example.com/Foo\n-- foo.go --\npackage foo\n",
        )]);
        let release = store.load("example.com/Foo", "v0.1.0").await.unwrap();
        assert_eq!(release.module, "example.com/Foo");
        assert_eq!(release.version, "v0.1.0");
        assert_eq!(release.archive.files.len(), 2);
        assert_eq!(module_file(&release.archive, &release.module), b"module example.com/Foo\n");
    }

    #[tokio::test]
    async fn load_reports_corrupt_archive() {
        let (_dir, store) = store_with(&[("example.com_m_v1.0.0.txt", "-- a --\n-- a --\n")]);
        let err = store.load("example.com/m", "v1.0.0").await.unwrap_err();
        assert!(matches!(err, ProxyError::CorruptArchive { .. }), "{err}");
        assert!(err.to_string().contains("duplicate file name"));
    }

    #[tokio::test]
    async fn load_of_missing_version_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let err = store.load("example.com/m", "v9.9.9").await.unwrap_err();
        assert!(matches!(err, ProxyError::NotFound { .. }));
        assert!(err.to_string().contains("example.com_m_v9.9.9.txt"));
    }

    #[test]
    fn module_file_falls_back_to_declaration() {
        let archive = Archive::parse(b"-- LICENSE --\nMIT\n").unwrap();
        assert_eq!(module_file(&archive, "example.com/m"), b"module example.com/m\n");
    }

    #[test]
    fn module_file_prefers_archive_entry() {
        let archive = Archive::parse(b"-- sub/go.mod --\nmodule x\n-- go.mod --\nmodule example.com/m\n\ngo 1.21\n").unwrap();
        assert_eq!(module_file(&archive, "example.com/m"), b"module example.com/m\n\ngo 1.21\n");
    }
}
