//! Byte source and sink collaborators: the sender's random-access reader
//! over the transfer and the receiver's random-access writer into it.
//! Absolute seeks replace the original's relative `fseek(SEEK_CUR, ...)`
//! save/restore dance — `std::io::Seek` makes that bookkeeping redundant.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// A seekable, boundedly-readable source of the bytes being transferred.
pub trait ByteSource {
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;
    fn read_chunk(&mut self, max_len: usize) -> io::Result<Vec<u8>>;
}

/// A seekable sink the receiver writes arriving chunks into, addressed
/// by absolute byte offset so out-of-order arrivals never disturb the
/// in-order write cursor.
pub trait ByteSink {
    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()>;
}

pub struct FileSource {
    file: File,
}

impl FileSource {
    pub fn open(path: &str) -> io::Result<Self> {
        Ok(FileSource {
            file: File::open(path)?,
        })
    }
}

impl ByteSource for FileSource {
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_chunk(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let mut total = 0;
        loop {
            let n = self.file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == max_len {
                break;
            }
        }
        buf.truncate(total);
        Ok(buf)
    }
}

pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn create(path: &str) -> io::Result<Self> {
        Ok(FileSink {
            file: File::create(path)?,
        })
    }
}

impl ByteSink for FileSink {
    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(data)
    }
}

/// In-memory source over a fixed byte buffer, for tests.
pub struct MemSource {
    cursor: Cursor<Vec<u8>>,
}

impl MemSource {
    pub fn new(data: Vec<u8>) -> Self {
        MemSource {
            cursor: Cursor::new(data),
        }
    }
}

impl ByteSource for MemSource {
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.cursor.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_chunk(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len];
        let mut total = 0;
        loop {
            let n = self.cursor.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == max_len {
                break;
            }
        }
        buf.truncate(total);
        Ok(buf)
    }
}

/// In-memory sink growing to fit whatever offsets are written, for tests.
pub struct MemSink {
    pub data: Vec<u8>,
}

impl MemSink {
    pub fn new() -> Self {
        MemSink { data: Vec::new() }
    }
}

impl Default for MemSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSink for MemSink {
    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()> {
        let pos = pos as usize;
        if self.data.len() < pos + data.len() {
            self.data.resize(pos + data.len(), 0);
        }
        self.data[pos..pos + data.len()].copy_from_slice(data);
        Ok(())
    }
}
