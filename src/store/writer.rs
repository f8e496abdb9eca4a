//! Archive writer.
//!
//! The tree is written bottom-up: every node's children land in the file
//! before the node's own group, and the header's root position and sealed
//! flag are patched last.

use std::path::{Path, PathBuf};

use super::codec::{self, DatasetHeader};
use super::format::*;
use super::stream::OStream;
use crate::core::{ContainerTree, Layout, NodeBody, NodeRef, Payload};
use crate::util::{Error, Result};

/// Output archive bound to one file.
pub struct OArchive {
    path: PathBuf,
    stream: OStream,
    sealed: bool,
}

impl OArchive {
    /// Create the file and write an unsealed header.
    pub fn create(path: impl AsRef<Path>, layout: Layout, buffer: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut stream = OStream::create(&path, buffer)?;

        stream.write_bytes(ARCHIVE_MAGIC)?;
        stream.write_u8(NOT_SEALED_FLAG)?;
        stream.write_u16(CURRENT_VERSION)?;
        stream.write_u8(layout.tag())?;
        stream.write_bytes(&[0u8; ROOT_POS_OFFSET - LAYOUT_OFFSET - 1])?;
        stream.write_u64(0)?; // root position placeholder
        debug_assert_eq!(stream.pos(), HEADER_SIZE as u64);

        tracing::debug!(path = %path.display(), "archive created");
        Ok(Self {
            path,
            stream,
            sealed: false,
        })
    }

    /// File path of this archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if `seal` already ran.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Write a data block and return its position (0 for empty data).
    pub fn write_data(&mut self, data: &[u8]) -> Result<u64> {
        if self.sealed {
            return Err(Error::SealedContainer);
        }
        if data.is_empty() {
            return Ok(0);
        }
        let pos = self.stream.pos();
        self.stream.write_u64(data.len() as u64)?;
        self.stream.write_bytes(data)?;
        Ok(pos)
    }

    /// Write a group of child offsets and return its position.
    pub fn write_group(&mut self, children: &[u64]) -> Result<u64> {
        if self.sealed {
            return Err(Error::SealedContainer);
        }
        if children.is_empty() {
            return Ok(0);
        }
        let pos = self.stream.pos();
        self.stream.write_u64(children.len() as u64)?;
        for &child in children {
            self.stream.write_u64(child)?;
        }
        Ok(pos)
    }

    /// Write every node of `tree`, then seal with the root as entry point.
    pub fn write_tree(&mut self, tree: &ContainerTree) -> Result<()> {
        let root = self.write_node(tree, tree.root())?;
        tracing::debug!(nodes = tree.len(), root, "tree written");
        self.seal(root)
    }

    fn write_node(&mut self, tree: &ContainerTree, node: NodeRef) -> Result<u64> {
        let n = tree.node(node)?;
        let header = codec::encode_node_header(n.is_group(), n.name())?;
        let attributes = codec::encode_attributes(n.attributes())?;

        let mut children = vec![
            make_data_offset(self.write_data(&header)?),
            make_data_offset(self.write_data(&attributes)?),
        ];

        match &n.body {
            NodeBody::Group(_) => {
                let refs: Vec<NodeRef> = tree.children_of(node).map(|(_, r)| r).collect();
                for child in refs {
                    children.push(make_group_offset(self.write_node(tree, child)?));
                }
            }
            NodeBody::Dataset(slot) => {
                let element_type = slot.element_type();
                let (payload, axes) = match &slot.payload {
                    Payload::Pending => (Vec::new(), 0),
                    Payload::Memory(array) => (array.as_bytes().to_vec(), array.axes()),
                    Payload::Archived(_) => {
                        let array = tree.read_all(node)?;
                        let axes = array.axes();
                        (array.as_bytes().to_vec(), axes)
                    }
                };
                let rows = slot.len().unwrap_or(0);
                let header = DatasetHeader {
                    element_type,
                    finalized: slot.is_finalized(),
                    axes: axes as u64,
                    rows: rows as u64,
                    digest: codec::payload_digest(&payload),
                };
                let header = codec::encode_dataset_header(&header)?;
                children.push(make_data_offset(self.write_data(&header)?));
                children.push(make_data_offset(self.write_data(&payload)?));
            }
        }

        let pos = self.write_group(&children)?;
        if pos == 0 {
            // A node always has at least its header and attribute children.
            return Err(Error::corrupt(format!("empty group written for {}", n.path())));
        }
        Ok(pos)
    }

    /// Patch the root position and sealed flag into the header, then sync.
    pub fn seal(&mut self, root_pos: u64) -> Result<()> {
        if self.sealed {
            return Ok(());
        }
        self.stream.flush()?;
        let end = self.stream.pos();

        self.stream.seek(ROOT_POS_OFFSET as u64)?;
        self.stream.write_u64(root_pos)?;
        self.stream.seek(SEALED_OFFSET as u64)?;
        self.stream.write_u8(SEALED_FLAG)?;
        self.stream.seek(end)?;
        self.stream.sync()?;

        self.sealed = true;
        tracing::debug!(path = %self.path.display(), bytes = end, "archive sealed");
        Ok(())
    }
}
