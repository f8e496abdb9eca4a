//! Archive reader: header parsing and the group/data primitives.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::RwLock;

use super::format::*;
use crate::core::Layout;
use crate::util::{Error, Result};

/// Input streams over an archive file.
/// Supports both memory-mapped and buffered I/O modes.
pub struct IStreams {
    inner: StreamsInner,
    sealed: bool,
    layout: Layout,
    size: u64,
}

enum StreamsInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(Arc<RwLock<File>>),
}

impl IStreams {
    /// Open with optional memory mapping. `writable` requests write access
    /// to the file, so a read-write open fails early on permissions.
    pub fn open(path: impl AsRef<Path>, use_mmap: bool, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|e| Error::from_open(e, path))?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::corrupt(format!(
                "file is {} bytes, shorter than the {}-byte header",
                size, HEADER_SIZE
            )));
        }

        let inner = if use_mmap {
            // Safety: the archive is sealed (write-once); nothing in this
            // crate writes to a file after sealing it.
            let mmap = unsafe { Mmap::map(&file) }?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(Arc::new(RwLock::new(file)))
        };

        let (sealed, layout) = match &inner {
            StreamsInner::Mmap(mmap) => Self::parse_header(mmap)?,
            StreamsInner::File(file) => {
                let mut f = file.write();
                let mut header = [0u8; HEADER_SIZE];
                f.seek(SeekFrom::Start(0))?;
                f.read_exact(&mut header)?;
                Self::parse_header(&header)?
            }
        };

        Ok(Self {
            inner,
            sealed,
            layout,
            size,
        })
    }

    /// Parse and validate the archive header.
    fn parse_header(data: &[u8]) -> Result<(bool, Layout)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corrupt("truncated header"));
        }
        if &data[..ARCHIVE_MAGIC.len()] != ARCHIVE_MAGIC {
            return Err(Error::corrupt("bad magic bytes"));
        }

        let sealed = data[SEALED_OFFSET] == SEALED_FLAG;
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        if version != CURRENT_VERSION {
            return Err(Error::corrupt(format!("unsupported format version {}", version)));
        }
        let layout = Layout::from_tag(data[LAYOUT_OFFSET])
            .ok_or_else(|| Error::corrupt(format!("unknown layout tag {}", data[LAYOUT_OFFSET])))?;

        Ok((sealed, layout))
    }

    /// Check if the archive was sealed (completely written).
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Project layout recorded in the header.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Get the total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check if the file is memory-mapped.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.inner, StreamsInner::Mmap(_))
    }

    /// Get the root group position from the header.
    pub fn root_pos(&self) -> Result<u64> {
        self.read_u64(ROOT_POS_OFFSET as u64)
    }

    fn check_range(&self, pos: u64, len: usize) -> Result<()> {
        match pos.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::corrupt(format!(
                "read of {} bytes at {} past end of file ({})",
                len, pos, self.size
            ))),
        }
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(pos, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..(pos as usize + buf.len())]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Read a u64 value at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// A group in the archive hierarchy.
/// Groups contain children which can be either data or other groups.
#[derive(Clone)]
pub struct IGroup {
    streams: Arc<IStreams>,
    pos: u64,
    child_offsets: Vec<u64>,
}

impl IGroup {
    /// Read the group at the given position.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let num_children = if pos == 0 { 0 } else { streams.read_u64(pos)? };

        // Every offset is 8 bytes; reject counts the file cannot hold.
        let table = num_children
            .checked_mul(8)
            .filter(|bytes| pos.saturating_add(8).saturating_add(*bytes) <= streams.size())
            .ok_or_else(|| Error::corrupt(format!("group at {} claims {} children", pos, num_children)))?;

        let child_offsets = if num_children == 0 {
            Vec::new()
        } else {
            let raw = streams.read_bytes(pos + 8, table as usize)?;
            raw.chunks_exact(8)
                .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect()
        };

        Ok(Self {
            streams,
            pos,
            child_offsets,
        })
    }

    /// Get the position of this group in the file.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Get the number of children.
    #[inline]
    pub fn num_children(&self) -> usize {
        self.child_offsets.len()
    }

    fn child_offset(&self, index: usize) -> Result<u64> {
        self.child_offsets.get(index).copied().ok_or_else(|| {
            Error::corrupt(format!(
                "child {} of group at {} missing ({} children)",
                index,
                self.pos,
                self.child_offsets.len()
            ))
        })
    }

    /// Get a child group.
    pub fn group(&self, index: usize) -> Result<IGroup> {
        let offset = self.child_offset(index)?;
        if !is_group_offset(offset) {
            return Err(Error::corrupt(format!(
                "child {} of group at {} is data, expected group",
                index, self.pos
            )));
        }
        IGroup::new(self.streams.clone(), extract_offset(offset))
    }

    /// Get child data.
    pub fn data(&self, index: usize) -> Result<IData> {
        let offset = self.child_offset(index)?;
        if !is_data_offset(offset) {
            return Err(Error::corrupt(format!(
                "child {} of group at {} is a group, expected data",
                index, self.pos
            )));
        }
        IData::new(self.streams.clone(), extract_offset(offset))
    }
}

/// Data block in the archive hierarchy.
pub struct IData {
    streams: Arc<IStreams>,
    pos: u64,
    size: u64,
}

impl IData {
    /// Read the data block header at the given position.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let size = if pos == 0 { 0 } else { streams.read_u64(pos)? };
        if pos != 0 {
            streams.check_range(pos + 8, size as usize)?;
        }
        Ok(Self { streams, pos, size })
    }

    /// Get the size of the data in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check if this data is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the position of the actual data bytes (after size field).
    #[inline]
    pub fn data_pos(&self) -> u64 {
        if self.pos == 0 {
            0
        } else {
            self.pos + 8
        }
    }

    /// Read all data as bytes.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        if self.size == 0 {
            return Ok(Vec::new());
        }
        self.streams.read_bytes(self.data_pos(), self.size as usize)
    }
}
