//! Dataset payload storage.
//!
//! A dataset's samples are written exactly once ([`ContainerTree::finalize`])
//! and read back in arbitrary row ranges ([`ContainerTree::get_slice`]).
//! Payloads of an opened archive stay on disk; a slice read touches only
//! the requested bytes.

use super::path::NodePath;
use super::tree::{ContainerTree, NodeBody, NodeRef};
use crate::util::{ElementType, Error, Result, SamplePod};

/// Contiguous numeric samples of one element type.
///
/// 1-D arrays have one axis; multi-axis sensors store `len() x axes()`
/// values in row-major order. Bytes are little-endian (host layout on the
/// little-endian targets this crate supports).
#[derive(Clone, Debug, PartialEq)]
pub struct SampleArray {
    element_type: ElementType,
    axes: usize,
    bytes: Vec<u8>,
}

impl SampleArray {
    /// Create a 1-D array from typed values.
    pub fn from_slice<T: SamplePod>(values: &[T]) -> Self {
        Self {
            element_type: T::ELEMENT_TYPE,
            axes: 1,
            bytes: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// Create a 2-D array from row-major values with `axes` columns.
    pub fn from_rows<T: SamplePod>(values: &[T], axes: usize) -> Result<Self> {
        if axes == 0 || values.len() % axes != 0 {
            return Err(Error::InvalidShape(format!(
                "{} values do not form rows of {} axes",
                values.len(),
                axes
            )));
        }
        Ok(Self {
            element_type: T::ELEMENT_TYPE,
            axes,
            bytes: bytemuck::cast_slice(values).to_vec(),
        })
    }

    /// Create from raw little-endian bytes.
    pub fn from_bytes(element_type: ElementType, axes: usize, bytes: Vec<u8>) -> Result<Self> {
        let row_bytes = axes.checked_mul(element_type.num_bytes()).unwrap_or(0);
        if row_bytes == 0 || bytes.len() % row_bytes != 0 {
            return Err(Error::InvalidShape(format!(
                "{} bytes do not form rows of {} x {}",
                bytes.len(),
                axes,
                element_type
            )));
        }
        Ok(Self {
            element_type,
            axes,
            bytes,
        })
    }

    /// Element type of the samples.
    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Number of values per row (1 for a plain time series).
    #[inline]
    pub fn axes(&self) -> usize {
        self.axes
    }

    /// Number of rows (samples).
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.row_bytes()
    }

    /// Check if there are no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size of one row in bytes.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.axes * self.element_type.num_bytes()
    }

    /// Raw little-endian bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy out as typed values; `None` if `T` is not the element type.
    pub fn to_vec<T: SamplePod>(&self) -> Option<Vec<T>> {
        if T::ELEMENT_TYPE != self.element_type {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(&self.bytes))
    }

    /// All values widened to `f64`, row-major.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let width = self.element_type.num_bytes();
        self.bytes
            .chunks_exact(width)
            .map(|chunk| self.element_type.decode_f64(chunk))
            .collect()
    }

    /// Single value widened to `f64`.
    pub fn get_f64(&self, row: usize, axis: usize) -> Option<f64> {
        if axis >= self.axes || row >= self.len() {
            return None;
        }
        let width = self.element_type.num_bytes();
        let offset = (row * self.axes + axis) * width;
        Some(self.element_type.decode_f64(&self.bytes[offset..offset + width]))
    }
}

/// Location of a payload that stays in the archive file.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArchivedPayload {
    /// File position of the first payload byte.
    pub pos: u64,
    pub axes: usize,
    pub rows: usize,
}

#[derive(Clone, Debug)]
pub(crate) enum Payload {
    Pending,
    Memory(SampleArray),
    Archived(ArchivedPayload),
}

/// Declared element type and payload state of a dataset node.
#[derive(Clone, Debug)]
pub struct DatasetSlot {
    element_type: ElementType,
    pub(crate) payload: Payload,
}

impl DatasetSlot {
    pub(crate) fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            payload: Payload::Pending,
        }
    }

    /// Element type fixed at creation.
    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Check if the payload was written.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        !matches!(self.payload, Payload::Pending)
    }

    /// Number of rows, `None` before finalization.
    pub fn len(&self) -> Option<usize> {
        match &self.payload {
            Payload::Pending => None,
            Payload::Memory(a) => Some(a.len()),
            Payload::Archived(a) => Some(a.rows),
        }
    }

    /// Values per row, `None` before finalization.
    pub fn axes(&self) -> Option<usize> {
        match &self.payload {
            Payload::Pending => None,
            Payload::Memory(a) => Some(a.axes()),
            Payload::Archived(a) => Some(a.axes),
        }
    }
}

impl ContainerTree {
    fn slot(&self, node: NodeRef) -> Result<(&NodePath, &DatasetSlot)> {
        let n = self.node(node)?;
        match &n.body {
            NodeBody::Dataset(slot) => Ok((&n.path, slot)),
            NodeBody::Group(_) => Err(Error::NotADataset(n.path.clone())),
        }
    }

    fn slot_mut(&mut self, node: NodeRef) -> Result<(&NodePath, &mut DatasetSlot)> {
        let n = self.node_mut(node)?;
        match &mut n.body {
            NodeBody::Dataset(slot) => Ok((&n.path, slot)),
            NodeBody::Group(_) => Err(Error::NotADataset(n.path.clone())),
        }
    }

    /// Dataset slot of a node.
    pub fn dataset(&self, node: NodeRef) -> Result<&DatasetSlot> {
        Ok(self.slot(node)?.1)
    }

    /// Write a dataset's samples. Allowed once per dataset.
    pub fn finalize(&mut self, node: NodeRef, values: SampleArray) -> Result<()> {
        self.ensure_mutable()?;
        let (path, slot) = self.slot_mut(node)?;
        if slot.is_finalized() {
            return Err(Error::AlreadyFinalized(path.clone()));
        }
        if values.element_type() != slot.element_type() {
            return Err(Error::ElementTypeMismatch {
                path: path.clone(),
                expected: slot.element_type(),
                actual: values.element_type(),
            });
        }
        tracing::trace!(%path, rows = values.len(), axes = values.axes(), "finalize dataset");
        slot.payload = Payload::Memory(values);
        Ok(())
    }

    /// Number of rows of a finalized dataset.
    pub fn length(&self, node: NodeRef) -> Result<usize> {
        let (path, slot) = self.slot(node)?;
        slot.len().ok_or_else(|| Error::NotFinalized(path.clone()))
    }

    /// Read rows `[start, start + length)`.
    pub fn get_slice(&self, node: NodeRef, start: usize, length: usize) -> Result<SampleArray> {
        let (path, slot) = self.slot(node)?;
        let len = slot.len().ok_or_else(|| Error::NotFinalized(path.clone()))?;
        match start.checked_add(length) {
            Some(end) if end <= len => {}
            _ => return Err(Error::OutOfBounds { start, length, len }),
        }

        match &slot.payload {
            Payload::Pending => Err(Error::NotFinalized(path.clone())),
            Payload::Memory(array) => {
                let rb = array.row_bytes();
                SampleArray::from_bytes(
                    array.element_type(),
                    array.axes(),
                    array.as_bytes()[start * rb..(start + length) * rb].to_vec(),
                )
            }
            Payload::Archived(archived) => {
                let source = self.source.as_ref().ok_or(Error::Closed)?;
                let range = archived
                    .axes
                    .checked_mul(slot.element_type().num_bytes())
                    .and_then(|rb| Some((start.checked_mul(rb)?, length.checked_mul(rb)?)))
                    .and_then(|(offset, len)| Some((archived.pos.checked_add(offset as u64)?, len)));
                let (pos, len) = range.ok_or_else(|| {
                    Error::corrupt(format!("dataset {} slice {}+{} overflows", path, start, length))
                })?;
                let bytes = source.read_bytes(pos, len)?;
                SampleArray::from_bytes(slot.element_type(), archived.axes, bytes)
            }
        }
    }

    /// Read a whole dataset.
    pub fn read_all(&self, node: NodeRef) -> Result<SampleArray> {
        let len = self.length(node)?;
        self.get_slice(node, 0, len)
    }

    /// Bind a dataset to a payload already stored in the archive file.
    pub(crate) fn attach_archived(&mut self, node: NodeRef, archived: ArchivedPayload) -> Result<()> {
        let (path, slot) = self.slot_mut(node)?;
        if slot.is_finalized() {
            return Err(Error::AlreadyFinalized(path.clone()));
        }
        slot.payload = Payload::Archived(archived);
        Ok(())
    }
}
