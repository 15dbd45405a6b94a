//! Reader for the txtar packed text archive format.
//!
//! ```text
//! optional comment
//! -- go.mod --
//! module example.com/m
//! -- LICENSE --
//! ...
//! ```
//!
//! An archive is a free-form comment followed by a sequence of files. Each
//! file begins with a header line `-- NAME --` and its data runs up to the
//! next header line or the end of input. Writing archives is left to the
//! external `txtar` tool; this module only reads them.

use std::collections::HashSet;

const MARKER_START: &[u8] = b"-- ";
const MARKER_END: &[u8] = b" --";

/// A single named file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A parsed txtar archive. Files keep the order they appear in on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub comment: Vec<u8>,
    pub files: Vec<ArchiveFile>,
}

impl Archive {
    /// Parse a txtar archive.
    ///
    /// Returns a description of the first problem found when a file name is
    /// not valid UTF-8, is not a clean relative slash path, or is used twice.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let (comment, mut name, mut rest) = find_file_marker(data);
        let mut archive = Archive {
            comment: fix_newline(comment),
            files: Vec::new(),
        };
        let mut seen = HashSet::new();

        while let Some(raw_name) = name {
            let file_name = std::str::from_utf8(raw_name)
                .map_err(|_| {
                    let lossy = String::from_utf8_lossy(raw_name);
                    format!("file name {lossy:?} is not valid UTF-8")
                })?
                .to_string();
            check_file_name(&file_name)?;
            if !seen.insert(file_name.clone()) {
                return Err(format!("duplicate file name {file_name:?}"));
            }

            let (data, next_name, next_rest) = find_file_marker(rest);
            archive.files.push(ArchiveFile {
                name: file_name,
                data: fix_newline(data),
            });
            name = next_name;
            rest = next_rest;
        }

        Ok(archive)
    }

    /// Look up a file by exact name.
    pub fn file(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Find the next file marker in `data`.
///
/// Returns the bytes before the marker, the marker's name (if one was found)
/// and the bytes after the marker line.
fn find_file_marker(data: &[u8]) -> (&[u8], Option<&[u8]>, &[u8]) {
    let mut i = 0;
    loop {
        if let Some((name, after)) = is_marker(&data[i..]) {
            return (&data[..i], Some(name), after);
        }
        match data[i..].iter().position(|&b| b == b'\n') {
            Some(nl) => i += nl + 1,
            None => return (data, None, &[]),
        }
    }
}

/// Check whether `data` begins with a marker line `-- NAME --`.
fn is_marker(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if !data.starts_with(MARKER_START) {
        return None;
    }
    let (line, after) = match data.iter().position(|&b| b == b'\n') {
        Some(nl) => (&data[..nl], &data[nl + 1..]),
        None => (data, &data[data.len()..]),
    };
    if !line.ends_with(MARKER_END) || line.len() < MARKER_START.len() + MARKER_END.len() {
        return None;
    }
    let name = line[MARKER_START.len()..line.len() - MARKER_END.len()].trim_ascii();
    if name.is_empty() {
        return None;
    }
    Some((name, after))
}

/// Non-empty data always ends in a newline.
fn fix_newline(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    if !out.is_empty() && !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    out
}

fn check_file_name(name: &str) -> Result<(), String> {
    if name.starts_with('/') {
        return Err(format!("file name {name:?} is absolute"));
    }
    if name.contains('\\') {
        return Err(format!("file name {name:?} contains a backslash"));
    }
    if name
        .split('/')
        .any(|elem| elem.is_empty() || elem == "." || elem == "..")
    {
        return Err(format!("file name {name:?} is not a clean relative path"));
    }
    Ok(())
}
