use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CompressionMethod {
    #[default]
    Stored,
    Deflate,
}

impl CompressionMethod {
    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
        }
    }
}

/// Version 2.0: the minimum that understands DEFLATE and directories.
pub const VERSION_NEEDED: u16 = 20;
/// Version 2.0, created on Unix (so external attributes carry a mode).
pub const VERSION_MADE_BY: u16 = (3 << 8) | VERSION_NEEDED;
/// General purpose flag bit 11: names are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;
/// Regular file, rw-r--r--.
pub const EXTERNAL_ATTRS: u32 = 0o100644 << 16;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// MS-DOS timestamp as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const EPOCH: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };
}

/// Everything the central directory needs to know about an entry that has
/// already been written.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub lfh_offset: u32,
    pub modified: DosDateTime,
}

impl ZipFileEntry {
    /// Write the Local File Header that precedes the entry's data.
    pub fn write_local_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        w.write_u16::<LittleEndian>(FLAG_UTF8)?;
        w.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name_len()?)?;
        w.write_u16::<LittleEndian>(0)?; // extra field length
        w.write_all(self.file_name.as_bytes())
    }

    /// Write this entry's Central Directory File Header.
    pub fn write_central_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(CDFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        w.write_u16::<LittleEndian>(FLAG_UTF8)?;
        w.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name_len()?)?;
        w.write_u16::<LittleEndian>(0)?; // extra field length
        w.write_u16::<LittleEndian>(0)?; // file comment length
        w.write_u16::<LittleEndian>(0)?; // disk number start
        w.write_u16::<LittleEndian>(0)?; // internal attributes
        w.write_u32::<LittleEndian>(EXTERNAL_ATTRS)?;
        w.write_u32::<LittleEndian>(self.lfh_offset)?;
        w.write_all(self.file_name.as_bytes())
    }

    pub fn local_header_len(&self) -> usize {
        LFH_SIZE + self.file_name.len()
    }

    pub fn central_header_len(&self) -> usize {
        CDFH_MIN_SIZE + self.file_name.len()
    }

    fn name_len(&self) -> io::Result<u16> {
        u16::try_from(self.file_name.len())
            .map_err(|_| too_large(format!("file name too long: {}", self.file_name)))
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Write a single-disk EOCD record with no archive comment.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(0)?; // number of this disk
        w.write_u16::<LittleEndian>(0)?; // disk where central directory starts
        w.write_u16::<LittleEndian>(self.total_entries)?; // entries on this disk
        w.write_u16::<LittleEndian>(self.total_entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(0) // comment length
    }
}

/// Error for values that only fit with ZIP64 extensions, which are not written.
pub fn too_large(what: impl Into<String>) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} (ZIP64 is not supported)", what.into()),
    )
}
