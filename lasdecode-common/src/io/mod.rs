//! Byte-addressable random access to the raw bytes of a LAS file.
//!
//! Every decoding step reads "exactly N bytes at offset K". A short read is
//! always an error, it never yields a truncated buffer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Wrapper around std::io::Error,
/// that allows it to be "cloned" by putting it inside of an Arc.
#[derive(Debug, Clone)]
pub struct IoError(pub Arc<std::io::Error>);

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<std::io::Error> for IoError {
    fn from(value: std::io::Error) -> Self {
        Self(Arc::new(value))
    }
}

impl IoError {
    pub fn kind(&self) -> std::io::ErrorKind {
        self.0.kind()
    }
}

/// A failed or short read.
#[derive(Debug, Error, Clone)]
#[error("Failed to read {length} bytes at offset {offset}: {source}")]
pub struct ReadError {
    pub offset: u64,
    pub length: usize,
    #[source]
    pub source: IoError,
}

impl ReadError {
    pub fn new(offset: u64, length: usize, source: impl Into<IoError>) -> Self {
        ReadError {
            offset,
            length,
            source: source.into(),
        }
    }

    fn unexpected_eof(offset: u64, length: usize, size: u64) -> Self {
        Self::new(
            offset,
            length,
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("source is only {size} bytes long"),
            ),
        )
    }
}

/// Random access to a sequence of bytes.
pub trait RandomAccessSource {
    /// Reads exactly `length` bytes, starting at `offset`.
    fn read_exact_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, ReadError>;

    /// Total number of bytes in the source.
    fn size(&self) -> u64;
}

/// Reads from a local file.
///
/// The file handle is owned by the source and closed when it is dropped.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileSource { file, size })
    }
}

impl RandomAccessSource for FileSource {
    fn read_exact_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        if offset.saturating_add(length as u64) > self.size {
            return Err(ReadError::unexpected_eof(offset, length, self.size));
        }
        // `Read` and `Seek` are implemented for `&File`
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| ReadError::new(offset, length, e))?;
        let mut buffer = vec![0; length];
        file.read_exact(&mut buffer)
            .map_err(|e| ReadError::new(offset, length, e))?;
        Ok(buffer)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl RandomAccessSource for [u8] {
    fn read_exact_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        let size = self.len() as u64;
        let end = offset.saturating_add(length as u64);
        if end > size {
            return Err(ReadError::unexpected_eof(offset, length, size));
        }
        Ok(self[offset as usize..end as usize].to_vec())
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl RandomAccessSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, ReadError> {
        self.as_slice().read_exact_at(offset, length)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}
