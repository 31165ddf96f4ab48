//! Gzip framing for tile and marker artifacts.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{IoContext, MapError, Result};

pub fn encode(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::with_capacity(payload.len() / 2 + 32), Compression::default());
    enc.write_all(payload)?;
    enc.finish()
}

/// Decompresses the whole stream into memory before returning anything.
/// A truncated or corrupt stream is an error, never a short payload.
pub fn decode(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut dec = GzDecoder::new(compressed);
    let mut out = Vec::new();
    dec.read_to_end(&mut out)?;
    Ok(out)
}

pub fn encode_str(payload: &str) -> io::Result<Vec<u8>> {
    encode(payload.as_bytes())
}

pub fn decode_str(compressed: &[u8]) -> io::Result<String> {
    let bytes = decode(compressed)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Creates parent directories and an empty file at `path` if it does not
/// exist yet, so concurrent readers find a file rather than "not found".
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        // Another writer got there first.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(MapError::io(path, e)),
    }
}

/// Compresses `bytes` into `path` and returns once the data is on stable storage.
pub fn write_gzip(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let file = OpenOptions::new().write(true).truncate(true).open(path).at(path)?;
    let mut enc = GzEncoder::new(io::BufWriter::new(file), Compression::default());
    enc.write_all(bytes).at(path)?;
    let writer = enc.finish().at(path)?;
    let file = writer.into_inner().map_err(|e| MapError::io(path, e.into_error()))?;
    file.sync_all().at(path)?;
    Ok(())
}

pub fn write_gzip_str(path: &Path, text: &str) -> Result<()> {
    write_gzip(path, text.as_bytes())
}

pub fn read_gzip(path: &Path) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    File::open(path).and_then(|mut f| f.read_to_end(&mut raw)).at(path)?;
    decode(&raw).at(path)
}

pub fn read_gzip_str(path: &Path) -> Result<String> {
    let bytes = read_gzip(path)?;
    String::from_utf8(bytes).map_err(|e| MapError::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))
}
