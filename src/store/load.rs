//! Rebuilding a [`ContainerTree`] from a sealed archive.

use std::sync::Arc;

use super::codec::{self, DatasetHeader};
use super::reader::{IData, IGroup, IStreams};
use crate::core::{ArchivedPayload, ContainerTree, NodePath, NodeRef};
use crate::util::{Error, Result};

// Child slots of a node group.
const SLOT_HEADER: usize = 0;
const SLOT_ATTRIBUTES: usize = 1;
const SLOT_DATASET_HEADER: usize = 2;
const SLOT_PAYLOAD: usize = 3;

/// Read the whole hierarchy of a sealed archive.
///
/// Attributes and shapes are loaded eagerly; payload bytes stay in the
/// file and are read by slice. With `verify_digests`, every payload is
/// hashed once and compared against its stored digest.
pub fn read_tree(streams: Arc<IStreams>, verify_digests: bool) -> Result<ContainerTree> {
    if !streams.is_sealed() {
        return Err(Error::corrupt("archive was never sealed"));
    }
    let root_pos = streams.root_pos()?;
    if root_pos == 0 || root_pos >= streams.size() {
        return Err(Error::corrupt(format!("invalid root position {}", root_pos)));
    }

    let root_group = IGroup::new(streams.clone(), root_pos)?;
    let header = codec::decode_node_header(&root_group.data(SLOT_HEADER)?.read_all()?)?;
    if !header.is_group || !header.name.is_empty() {
        return Err(Error::corrupt("root node is not an unnamed group"));
    }

    let mut tree = ContainerTree::new();
    let mut loader = Loader {
        tree: &mut tree,
        verify_digests,
        datasets: 0,
    };
    let root = loader.tree.root();
    loader.load_attributes(&root_group, root)?;
    loader.load_children(root_group)?;
    let datasets = loader.datasets;

    tree.seal();
    tree.source = Some(streams);
    tracing::debug!(nodes = tree.len(), datasets, "archive tree loaded");
    Ok(tree)
}

struct Loader<'a> {
    tree: &'a mut ContainerTree,
    verify_digests: bool,
    datasets: usize,
}

impl Loader<'_> {
    fn load_attributes(&mut self, group: &IGroup, node: NodeRef) -> Result<()> {
        let block = group.data(SLOT_ATTRIBUTES)?.read_all()?;
        for (key, value) in codec::decode_attributes(&block)? {
            self.tree.set_attribute(node, &key, value).map_err(as_corrupt)?;
        }
        Ok(())
    }

    /// Rebuild every node below `root`. Groups are expanded from an
    /// explicit stack, so nesting depth is bounded by the file, not the
    /// call stack.
    fn load_children(&mut self, root: IGroup) -> Result<()> {
        let mut pending = vec![(root, NodePath::root())];
        while let Some((group, path)) = pending.pop() {
            for index in SLOT_ATTRIBUTES + 1..group.num_children() {
                let child = group.group(index)?;
                // Children are always written before their parent.
                if child.pos() >= group.pos() {
                    return Err(Error::corrupt(format!(
                        "child group at {} does not precede parent at {}",
                        child.pos(),
                        group.pos()
                    )));
                }

                let header = codec::decode_node_header(&child.data(SLOT_HEADER)?.read_all()?)?;
                let child_path = path.join(&header.name);
                if header.is_group {
                    let node = self.tree.add_group(&path, &header.name).map_err(as_corrupt)?;
                    self.load_attributes(&child, node)?;
                    pending.push((child, child_path));
                } else {
                    let (ds_header, payload) = dataset_parts(&child, &child_path)?;
                    let node = self
                        .tree
                        .add_dataset(&path, &header.name, ds_header.element_type)
                        .map_err(as_corrupt)?;
                    self.load_attributes(&child, node)?;
                    self.load_payload(node, &ds_header, &payload, &child_path)?;
                }
            }
        }
        Ok(())
    }

    fn load_payload(
        &mut self,
        node: NodeRef,
        header: &DatasetHeader,
        payload: &IData,
        path: &NodePath,
    ) -> Result<()> {
        if !header.finalized {
            if header.rows != 0 || !payload.is_empty() {
                return Err(Error::corrupt(format!("pending dataset {} carries data", path)));
            }
            return Ok(());
        }

        let expected = header.payload_len();
        if header.axes == 0 || header.row_bytes().is_none() || expected != Some(payload.size()) {
            return Err(Error::corrupt(format!(
                "dataset {} payload is {} bytes, shape {}x{} of {}",
                path,
                payload.size(),
                header.rows,
                header.axes,
                header.element_type
            )));
        }
        if self.verify_digests {
            verify_digest(header, payload, path)?;
        }

        let archived = ArchivedPayload {
            pos: payload.data_pos(),
            axes: to_usize(header.axes, path)?,
            rows: to_usize(header.rows, path)?,
        };
        self.tree.attach_archived(node, archived).map_err(as_corrupt)?;
        self.datasets += 1;
        Ok(())
    }
}

fn dataset_parts(group: &IGroup, path: &NodePath) -> Result<(DatasetHeader, IData)> {
    if group.num_children() != SLOT_PAYLOAD + 1 {
        return Err(Error::corrupt(format!(
            "dataset {} has {} slots",
            path,
            group.num_children()
        )));
    }
    let header = codec::decode_dataset_header(&group.data(SLOT_DATASET_HEADER)?.read_all()?)?;
    Ok((header, group.data(SLOT_PAYLOAD)?))
}

fn verify_digest(header: &DatasetHeader, payload: &IData, path: &NodePath) -> Result<()> {
    let digest = codec::payload_digest(&payload.read_all()?);
    if digest != header.digest {
        tracing::warn!(%path, "payload digest mismatch");
        return Err(Error::corrupt(format!("dataset {} failed its digest check", path)));
    }
    Ok(())
}

fn to_usize(value: u64, path: &NodePath) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::corrupt(format!("dataset {} shape {} exceeds address space", path, value)))
}

/// Structural errors while rebuilding mean the file itself is inconsistent.
fn as_corrupt(err: Error) -> Error {
    if err.is_structural() {
        Error::corrupt(err.to_string())
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeStore, Layout};
    use crate::store::format::{make_data_offset, make_group_offset};
    use crate::store::OArchive;

    const DEPTH: usize = 1000;

    /// Hand-assemble a chain of `DEPTH` nested groups under the root.
    fn write_chain(path: &std::path::Path) {
        let mut archive = OArchive::create(path, Layout::SingleProject, 4096).unwrap();
        let attributes = codec::encode_attributes(&AttributeStore::new()).unwrap();
        let mut below: Option<u64> = None;
        for level in (0..=DEPTH).rev() {
            let name = if level == 0 { String::new() } else { format!("g{}", level) };
            let header = codec::encode_node_header(true, &name).unwrap();
            let mut slots = vec![
                make_data_offset(archive.write_data(&header).unwrap()),
                make_data_offset(archive.write_data(&attributes).unwrap()),
            ];
            slots.extend(below.map(make_group_offset));
            below = Some(archive.write_group(&slots).unwrap());
        }
        archive.seal(below.unwrap()).unwrap();
    }

    #[test]
    fn test_deep_nesting_on_small_stack() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        write_chain(temp.path());
        let path = temp.path().to_path_buf();

        let depth = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                let streams = Arc::new(IStreams::open(&path, true, false).unwrap());
                let tree = read_tree(streams, true).unwrap();
                let (deepest, _) = tree.walk().last().unwrap();
                deepest.depth()
            })
            .unwrap()
            .join()
            .expect("loader thread overflowed its stack");
        assert_eq!(depth, DEPTH);
    }
}
