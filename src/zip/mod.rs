//! ZIP archive writing.
//!
//! Module zips are built in memory for each `.zip` request and thrown away
//! once the response is sent.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP format records (local header, central directory
//!   header, EOCD) and their binary encoding
//! - [`packager`]: a streaming [`ZipWriter`] and the [`ZipPackager`] that
//!   lays a release out under `<module>@<version>/`
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - STORED (no compression) and DEFLATE methods
//! - UTF-8 file names
//!
//! ## Limitations
//!
//! - No ZIP64: archives over 4 GiB or with more than 65535 entries fail
//! - No encryption, no comments, no extra fields

mod packager;
mod structures;

pub use packager::{ZipPackager, ZipWriter};
pub use structures::*;
