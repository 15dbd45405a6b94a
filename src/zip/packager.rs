use std::io::{self, Write};

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use tracing::debug;

use crate::error::Result;
use crate::store::Archive;

use super::structures::*;

/// Streaming ZIP writer.
///
/// Entries are written one after another as they are added; the central
/// directory is appended by [`finish`](ZipWriter::finish).
pub struct ZipWriter<W: Write> {
    inner: W,
    method: CompressionMethod,
    offset: u64,
    entries: Vec<ZipFileEntry>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(inner: W, method: CompressionMethod) -> Self {
        Self {
            inner,
            method,
            offset: 0,
            entries: Vec::new(),
        }
    }

    /// Append a file entry.
    pub fn add(&mut self, name: String, data: &[u8]) -> io::Result<()> {
        if self.entries.len() >= usize::from(u16::MAX) {
            return Err(too_large("too many entries"));
        }

        let mut crc = Crc::new();
        crc.update(data);

        let deflated;
        let payload = match self.method {
            CompressionMethod::Stored => data,
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                deflated = encoder.finish()?;
                &deflated[..]
            }
        };

        let entry = ZipFileEntry {
            compression_method: self.method,
            compressed_size: fit_u32(payload.len() as u64, &name)?,
            uncompressed_size: fit_u32(data.len() as u64, &name)?,
            crc32: crc.sum(),
            lfh_offset: fit_u32(self.offset, &name)?,
            modified: DosDateTime::EPOCH,
            file_name: name,
        };

        entry.write_local_header(&mut self.inner)?;
        self.inner.write_all(payload)?;
        self.offset += (entry.local_header_len() + payload.len()) as u64;
        self.entries.push(entry);
        Ok(())
    }

    /// Write the central directory and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        let cd_offset = fit_u32(self.offset, "central directory")?;
        let mut cd_size = 0u64;
        for entry in &self.entries {
            entry.write_central_header(&mut self.inner)?;
            cd_size += entry.central_header_len() as u64;
        }

        EndOfCentralDirectory {
            total_entries: self.entries.len() as u16,
            cd_size: fit_u32(cd_size, "central directory")?,
            cd_offset,
        }
        .write_to(&mut self.inner)?;

        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn fit_u32(value: u64, what: &str) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| too_large(format!("{what} exceeds 4 GiB")))
}

/// Turns a release archive into the zip served for `<version>.zip`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager {
    method: CompressionMethod,
}

impl ZipPackager {
    pub fn new(method: CompressionMethod) -> Self {
        Self { method }
    }

    /// Package every file of `archive` under `<module>@<version>/`.
    ///
    /// Entries keep the archive's order. An archive without files yields an
    /// empty but valid zip.
    pub fn pack(&self, module: &str, version: &str, archive: &Archive) -> Result<Vec<u8>> {
        let prefix = format!("{module}@{version}/");
        let mut writer = ZipWriter::new(Vec::new(), self.method);
        for file in &archive.files {
            writer.add(format!("{prefix}{}", file.name), &file.data)?;
        }
        let buf = writer.finish()?;

        debug!(
            module,
            version,
            entries = archive.files.len(),
            bytes = buf.len(),
            "packaged zip"
        );
        Ok(buf)
    }
}
