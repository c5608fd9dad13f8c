//! File backing
//!
//! Disk store behind a buffered writer. The tracked cursor position lets
//! sequential appends skip the seek entirely.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::CommitDurability;
use crate::error::Result;

use super::StoreBacking;

/// Cursor position is unknown after a failed I/O call; forces the next seek
const POSITION_UNKNOWN: u64 = u64::MAX;

/// How an existing store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only; every mutation fails with `ReadOnly`
    ReadOnly,

    /// Reads, appends and in-place updates
    ReadWrite,
}

/// Disk-resident store file
#[derive(Debug)]
pub struct FileBacking {
    /// Buffered writer; reads go through `get_mut()` after a flush
    file: BufWriter<File>,
    /// Current file cursor as seen by the caller
    position: u64,
    /// Number of write_at calls
    writes: u64,
}

impl FileBacking {
    /// Create (or truncate) a store file for read/write
    pub fn create(path: &Path, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self::wrap(file, buffer_size))
    }

    /// Open an existing store file
    pub fn open(path: &Path, mode: OpenMode, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(path)?;

        Ok(Self::wrap(file, buffer_size))
    }

    fn wrap(file: File, buffer_size: usize) -> Self {
        Self {
            file: BufWriter::with_capacity(buffer_size, file),
            position: 0,
            writes: 0,
        }
    }

    /// On-disk length of the file, including unflushed writes
    pub fn file_len(&mut self) -> Result<u64> {
        self.file.flush()?;
        Ok(self.file.get_ref().metadata()?.len())
    }

    /// Seek only if the cursor is not already at `offset`
    fn seek_to(&mut self, offset: u64) -> Result<()> {
        if self.position != offset {
            if let Err(e) = self.file.seek(SeekFrom::Start(offset)) {
                self.position = POSITION_UNKNOWN;
                return Err(e.into());
            }
            self.position = offset;
        }
        Ok(())
    }
}

impl StoreBacking for FileBacking {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        // Pending writes must reach the file before the raw handle is read.
        self.file.flush()?;
        self.seek_to(offset)?;

        if let Err(e) = self.file.get_mut().read_exact(buf) {
            self.position = POSITION_UNKNOWN;
            return Err(e.into());
        }
        self.position += buf.len() as u64;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.seek_to(offset)?;

        if let Err(e) = self.file.write_all(data) {
            self.position = POSITION_UNKNOWN;
            return Err(e.into());
        }
        self.position += data.len() as u64;
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self, durability: CommitDurability) -> Result<()> {
        self.file.flush()?;
        if durability == CommitDurability::Sync {
            self.file.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn write_count(&self) -> u64 {
        self.writes
    }
}
