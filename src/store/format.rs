//! Archive format constants and offset helpers.

/// Magic bytes at the start of an archive file.
pub const ARCHIVE_MAGIC: &[u8; 8] = b"SensArch";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Offset of the sealed flag in the header.
pub const SEALED_OFFSET: usize = 8;

/// Offset of the version (u16 LE) in the header.
pub const VERSION_OFFSET: usize = 9;

/// Offset of the layout tag in the header.
pub const LAYOUT_OFFSET: usize = 11;

/// Offset of the root group position (u64 LE) in the header.
pub const ROOT_POS_OFFSET: usize = 16;

/// Current format version.
pub const CURRENT_VERSION: u16 = 1;

/// Sealed flag value once the archive is complete.
pub const SEALED_FLAG: u8 = 0xFF;

/// Sealed flag value while the archive is still being written.
pub const NOT_SEALED_FLAG: u8 = 0x00;

/// Bit marking a child offset as data (clear = group).
pub const TYPE_FLAG_MASK: u64 = 1 << 63;

/// Mask to extract the position from a child offset.
pub const OFFSET_MASK: u64 = !(1 << 63);

/// Node header tag of a group node.
pub const NODE_TAG_GROUP: u8 = 0x01;

/// Node header tag of a dataset node.
pub const NODE_TAG_DATASET: u8 = 0x02;

/// Length of the payload digest stored in a dataset header.
pub const DIGEST_SIZE: usize = 32;

/// Check if a child offset refers to a group.
#[inline]
pub const fn is_group_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) == 0
}

/// Check if a child offset refers to data.
#[inline]
pub const fn is_data_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) != 0
}

/// Extract the position from a child offset.
#[inline]
pub const fn extract_offset(offset: u64) -> u64 {
    offset & OFFSET_MASK
}

/// Child offset for a group at `pos`.
#[inline]
pub const fn make_group_offset(pos: u64) -> u64 {
    pos & OFFSET_MASK
}

/// Child offset for data at `pos`.
#[inline]
pub const fn make_data_offset(pos: u64) -> u64 {
    pos | TYPE_FLAG_MASK
}
