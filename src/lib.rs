//! # modserve
//!
//! A module proxy server backed by a directory of txtar archives.
//!
//! Each release of a module is a single txtar file in the store directory.
//! The server answers the read side of the module proxy protocol from those
//! files, repackaging archives into zips on the fly.
//!
//! ## Endpoints
//!
//! | Path | Response |
//! |------|----------|
//! | `/<module>/@v/list` | known versions, one per line |
//! | `/<module>/@v/<version>.info` | `{"Version": ..., "Time": ...}` |
//! | `/<module>/@v/<version>.mod` | the release's `go.mod` |
//! | `/<module>/@v/<version>.zip` | the release as a module zip |
//! | `/<module>/@latest` | always `404` |
//!
//! Module paths and versions use the `!`-escaped form for uppercase letters.
//!
//! ## Example
//!
//! ```no_run
//! use modserve::{ArchiveStore, ProxyServer, ZipPackager};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = ProxyServer::new(ArchiveStore::new("testdata"), ZipPackager::default());
//!     let listener = TcpListener::bind("localhost:6939").await?;
//!     server.serve(listener, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod path;
pub mod semver;
pub mod server;
pub mod store;
pub mod zip;

pub use cli::Cli;
pub use error::{ProxyError, Result};
pub use path::{ModuleQuery, Operation, parse_request};
pub use server::{ProxyServer, Router};
pub use store::{Archive, ArchiveFile, ArchiveStore, ModuleRelease, ModuleSource, VersionInfo};
pub use zip::{CompressionMethod, ZipPackager, ZipWriter};
