//! Random-access readers backing archive-resident entries.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;

/// Random-access source of an opened container's bytes.
///
/// One reader is shared by every archive-resident entry of a container.
pub trait BackingReader: Send + Sync + fmt::Debug {
    /// Reads exactly `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Total size of the underlying data, when known.
    fn size(&self) -> Option<u64> {
        None
    }
}

/// A [`BackingReader`] over any seekable stream.
///
/// The stream has a single cursor, so reads are serialized with a mutex.
pub struct SharedReader<R> {
    inner: Mutex<R>,
    size: Option<u64>,
}

impl<R> fmt::Debug for SharedReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReader")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek + Send> SharedReader<R> {
    /// Wraps a stream, measuring its length.
    pub fn new(mut inner: R) -> Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Mutex::new(inner),
            size: Some(size),
        })
    }

    /// Unwraps the stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl SharedReader<BufReader<File>> {
    /// Opens a container file for shared reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek + Send> BackingReader for SharedReader<R> {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// A [`BackingReader`] over bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl MemoryReader {
    /// Wraps a buffer.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

impl BackingReader for MemoryReader {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(self.data[start..end].to_vec()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {:#x} past end of data", len, offset),
            )
            .into()),
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}
