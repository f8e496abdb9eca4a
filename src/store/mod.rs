//! Persistence backend - a write-once, append-only binary archive.
//!
//! The file is a tree of *groups* (lists of child offsets) and *data
//! blocks* (sized byte runs). Each container node becomes one group whose
//! children are its header, its attribute block and then either its child
//! nodes or, for a dataset, its shape header and raw payload.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic "SensArch" |  8 bytes
//! +------------------+
//! | Sealed flag      |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 LE)
//! +------------------+
//! | Layout tag       |  1 byte + 4 reserved
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! - [`OArchive`] writes a whole [`ContainerTree`](crate::core::ContainerTree) bottom-up and seals it
//! - [`IStreams`] reads the file through `mmap` or a locked file handle
//! - [`read_tree`] rebuilds the tree with payloads left on disk

pub mod codec;
pub mod format;
mod load;
mod reader;
mod stream;
mod writer;

pub use load::read_tree;
pub use reader::{IData, IGroup, IStreams};
pub use stream::{OStream, DEFAULT_WRITE_BUFFER};
pub use writer::OArchive;
