//! The container handle: one measurement archive, in memory or on disk.
//!
//! A [`Container`] owns a [`ContainerTree`] plus the resource backing it.
//! Created containers are authored in memory and written to their file in
//! one pass by [`Container::seal`]; opened containers are always sealed and
//! read their payloads lazily from the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{
    AttributeValue, Children, ContainerTree, CoordinateFrame, DatasetSlot, Layout, NodeKind,
    NodePath, NodeRef, SampleArray, SchemaValidator, TimeBaseResolver, TimeBasis, Timestamps,
    ValidationError, ValidationReport,
};
use crate::store::{read_tree, IStreams, OArchive, DEFAULT_WRITE_BUFFER};
use crate::util::{ElementType, Error, Result};

/// Access mode for [`Container::open`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    ReadOnly,
    /// Requires write permission on the file. A sealed archive still
    /// rejects every mutation.
    ReadWrite,
}

/// Container configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerOptions {
    /// Memory-map archives on open instead of reading through a file handle.
    pub use_mmap: bool,
    /// Hash every payload on open and fail with `Corrupt` on mismatch.
    pub verify_digests: bool,
    /// Where projects sit in the hierarchy. Ignored by `open`, which uses
    /// the layout recorded in the file.
    pub layout: Layout,
    /// Write buffer capacity used when sealing to a file.
    pub write_buffer: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            use_mmap: true,
            verify_digests: true,
            layout: Layout::default(),
            write_buffer: DEFAULT_WRITE_BUFFER,
        }
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    pub fn with_digest_verification(mut self, enabled: bool) -> Self {
        self.verify_digests = enabled;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer = bytes;
        self
    }
}

enum Backing {
    /// No file; everything lives in the tree.
    Memory,
    /// Authoring a new file, written on seal.
    Writer(OArchive),
    /// A file this handle wrote and sealed.
    Written(PathBuf),
    /// An opened archive.
    Archive(Arc<IStreams>),
}

/// Handle to one measurement container.
///
/// Resources are released by [`close`](Self::close) or on drop, whichever
/// comes first. Closing an unsealed file-backed container seals it.
pub struct Container {
    tree: ContainerTree,
    mode: OpenMode,
    options: ContainerOptions,
    backing: Backing,
    closed: bool,
}

impl Container {
    /// Start authoring a new archive at `path`, truncating any existing file.
    pub fn create(path: impl AsRef<Path>, options: ContainerOptions) -> Result<Self> {
        let archive = OArchive::create(path, options.layout, options.write_buffer)?;
        Ok(Self {
            tree: ContainerTree::new(),
            mode: OpenMode::ReadWrite,
            options,
            backing: Backing::Writer(archive),
            closed: false,
        })
    }

    /// A container with no backing file.
    pub fn in_memory() -> Self {
        Self::in_memory_with(ContainerOptions::default())
    }

    /// In-memory container with explicit options (only `layout` applies).
    pub fn in_memory_with(options: ContainerOptions) -> Self {
        Self {
            tree: ContainerTree::new(),
            mode: OpenMode::ReadWrite,
            options,
            backing: Backing::Memory,
            closed: false,
        }
    }

    /// Open a sealed archive.
    ///
    /// # Errors
    /// `NotFound` and `PermissionDenied` from the file system, `Corrupt`
    /// for anything that is not a complete, sealed archive.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, options: ContainerOptions) -> Result<Self> {
        let path = path.as_ref();
        let streams = Arc::new(IStreams::open(
            path,
            options.use_mmap,
            mode == OpenMode::ReadWrite,
        )?);
        let layout = streams.layout();
        let tree = read_tree(streams.clone(), options.verify_digests)?;

        tracing::debug!(
            path = %path.display(),
            ?mode,
            mapped = streams.is_mapped(),
            nodes = tree.len(),
            "container opened"
        );
        Ok(Self {
            tree,
            mode,
            options: ContainerOptions { layout, ..options },
            backing: Backing::Archive(streams),
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.options.layout
    }

    #[inline]
    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.tree.is_sealed()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory | Backing::Archive(_) => None,
            Backing::Writer(archive) => Some(archive.path()),
            Backing::Written(path) => Some(path),
        }
    }

    /// The underlying tree.
    pub fn tree(&self) -> Result<&ContainerTree> {
        self.ensure_open()?;
        Ok(&self.tree)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn root(&self) -> NodeRef {
        self.tree.root()
    }

    pub fn add_group(&mut self, parent: impl Into<NodePath>, name: &str) -> Result<NodeRef> {
        self.ensure_open()?;
        self.tree.add_group(parent, name)
    }

    pub fn add_dataset(
        &mut self,
        parent: impl Into<NodePath>,
        name: &str,
        element_type: ElementType,
    ) -> Result<NodeRef> {
        self.ensure_open()?;
        self.tree.add_dataset(parent, name, element_type)
    }

    pub fn resolve(&self, path: impl Into<NodePath>) -> Result<NodeRef> {
        self.ensure_open()?;
        self.tree.resolve(path)
    }

    pub fn children(&self, path: impl Into<NodePath>) -> Result<Children<'_>> {
        self.ensure_open()?;
        self.tree.children(path)
    }

    /// Path of a node handle.
    pub fn path_of(&self, node: NodeRef) -> Result<&NodePath> {
        self.ensure_open()?;
        Ok(self.tree.node(node)?.path())
    }

    /// Kind of a node under this container's layout.
    pub fn kind_of(&self, node: NodeRef) -> Result<NodeKind> {
        self.ensure_open()?;
        self.tree.kind_of(node, self.layout())
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn set_attribute(
        &mut self,
        node: NodeRef,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.tree.set_attribute(node, key, value)
    }

    pub fn get_attribute(&self, node: NodeRef, key: &str) -> Result<&AttributeValue> {
        self.ensure_open()?;
        self.tree.get_attribute(node, key)
    }

    pub fn get_str(&self, node: NodeRef, key: &str) -> Result<&str> {
        self.ensure_open()?;
        self.tree.get_str(node, key)
    }

    pub fn get_real(&self, node: NodeRef, key: &str) -> Result<f64> {
        self.ensure_open()?;
        self.tree.get_real(node, key)
    }

    pub fn get_vector3(&self, node: NodeRef, key: &str) -> Result<[f64; 3]> {
        self.ensure_open()?;
        self.tree.get_vector3(node, key)
    }

    /// Attributes in lexicographic key order.
    pub fn attributes(
        &self,
        node: NodeRef,
    ) -> Result<impl Iterator<Item = (&str, &AttributeValue)> + Clone + '_> {
        self.ensure_open()?;
        self.tree.attributes(node)
    }

    // ------------------------------------------------------------------
    // Datasets
    // ------------------------------------------------------------------

    pub fn dataset(&self, node: NodeRef) -> Result<&DatasetSlot> {
        self.ensure_open()?;
        self.tree.dataset(node)
    }

    pub fn finalize(&mut self, node: NodeRef, values: SampleArray) -> Result<()> {
        self.ensure_open()?;
        self.tree.finalize(node, values)
    }

    pub fn length(&self, node: NodeRef) -> Result<usize> {
        self.ensure_open()?;
        self.tree.length(node)
    }

    /// Read rows `[start, start + length)`. Archived payloads read only
    /// the requested bytes.
    pub fn get_slice(&self, node: NodeRef, start: usize, length: usize) -> Result<SampleArray> {
        self.ensure_open()?;
        self.tree.get_slice(node, start, length)
    }

    pub fn read_all(&self, node: NodeRef) -> Result<SampleArray> {
        self.ensure_open()?;
        self.tree.read_all(node)
    }

    // ------------------------------------------------------------------
    // Schema, frames and time
    // ------------------------------------------------------------------

    /// Validate the whole tree with the default validator.
    pub fn validate(&self) -> Result<ValidationReport> {
        self.validate_with(&SchemaValidator::new())
    }

    pub fn validate_with(&self, validator: &SchemaValidator) -> Result<ValidationReport> {
        self.ensure_open()?;
        validator.validate_tree(&self.tree, self.layout())
    }

    pub fn validate_node(&self, node: NodeRef) -> Result<Vec<ValidationError>> {
        self.ensure_open()?;
        SchemaValidator::new().validate_node(&self.tree, self.layout(), node)
    }

    pub fn time_base(&self) -> Result<TimeBaseResolver<'_>> {
        self.ensure_open()?;
        Ok(TimeBaseResolver::new(&self.tree, self.layout()))
    }

    pub fn resolve_time_basis(&self, trial: impl Into<NodePath>) -> Result<TimeBasis> {
        self.time_base()?.resolve_time_basis(trial)
    }

    pub fn timestamps(&self, sensor: impl Into<NodePath>) -> Result<Timestamps<'_>> {
        self.time_base()?.timestamps(sensor)
    }

    /// Coordinate frame of the project enclosing `node`.
    pub fn coordinate_frame(&self, node: NodeRef) -> Result<CoordinateFrame<'_>> {
        self.ensure_open()?;
        CoordinateFrame::for_node(&self.tree, node, self.layout())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Make the container immutable, writing it out if file-backed.
    ///
    /// Sealing a sealed container is a no-op. If writing fails the tree
    /// stays unsealed and the file is left without its sealed flag.
    pub fn seal(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.tree.is_sealed() {
            return Ok(());
        }

        if let Backing::Writer(archive) = &mut self.backing {
            archive.write_tree(&self.tree)?;
            let path = archive.path().to_path_buf();
            self.backing = Backing::Written(path);
        }
        self.tree.seal();
        tracing::debug!(nodes = self.tree.len(), "container sealed");
        Ok(())
    }

    /// Release the backing resource. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let sealed = if matches!(self.backing, Backing::Writer(_)) {
            self.seal()
        } else {
            Ok(())
        };

        self.closed = true;
        self.tree.source = None;
        self.backing = Backing::Memory;
        tracing::debug!("container closed");
        sealed
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close container");
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("mode", &self.mode)
            .field("layout", &self.options.layout)
            .field("nodes", &self.tree.len())
            .field("sealed", &self.tree.is_sealed())
            .field("closed", &self.closed)
            .finish()
    }
}
