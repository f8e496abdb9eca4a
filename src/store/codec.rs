//! Binary encoding of node headers, attribute blocks and dataset headers.
//!
//! All integers and floats are little-endian. Strings are a `u32` byte
//! length followed by UTF-8 bytes.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha256};
use smallvec::SmallVec;

use super::format::{DIGEST_SIZE, NODE_TAG_DATASET, NODE_TAG_GROUP};
use crate::core::{AttributeStore, AttributeValue};
use crate::util::{ElementType, Error, Result};

const VALUE_TAG_TEXT: u8 = 1;
const VALUE_TAG_REAL: u8 = 2;
const VALUE_TAG_VECTOR: u8 = 3;
const VALUE_TAG_TIMESTAMP: u8 = 4;

/// Decoded node header: whether the node is a group, and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeader {
    pub is_group: bool,
    pub name: String,
}

/// Decoded dataset header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetHeader {
    pub element_type: ElementType,
    pub finalized: bool,
    pub axes: u64,
    pub rows: u64,
    pub digest: [u8; DIGEST_SIZE],
}

impl DatasetHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 1 + 1 + 8 + 8 + DIGEST_SIZE;

    /// Bytes per row, `None` when it does not fit the address space.
    pub fn row_bytes(&self) -> Option<usize> {
        let bytes = self
            .axes
            .checked_mul(self.element_type.num_bytes() as u64)?;
        usize::try_from(bytes).ok()
    }

    /// Payload byte count implied by the shape.
    pub fn payload_len(&self) -> Option<u64> {
        self.axes
            .checked_mul(self.rows)?
            .checked_mul(self.element_type.num_bytes() as u64)
    }
}

/// SHA-256 of a payload.
pub fn payload_digest(bytes: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut out = [0u8; DIGEST_SIZE];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

fn truncated(what: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |e| Error::corrupt(format!("{} truncated: {}", what, e))
}

fn write_str(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = u32::try_from(s.len())
        .map_err(|_| Error::InvalidShape(format!("string of {} bytes too long", s.len())))?;
    buf.write_u32::<LittleEndian>(len)?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn read_str(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<String> {
    let len = cursor.read_u32::<LittleEndian>().map_err(truncated(what))? as usize;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if len as u64 > remaining {
        return Err(Error::corrupt(format!(
            "{}: string of {} bytes with {} left",
            what, len, remaining
        )));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes).map_err(truncated(what))?;
    String::from_utf8(bytes).map_err(|e| Error::corrupt(format!("{}: {}", what, e)))
}

fn ensure_consumed(cursor: &Cursor<&[u8]>, what: &str) -> Result<()> {
    let extra = cursor.get_ref().len() as u64 - cursor.position();
    if extra != 0 {
        return Err(Error::corrupt(format!("{} has {} trailing bytes", what, extra)));
    }
    Ok(())
}

/// Encode a node header.
pub fn encode_node_header(is_group: bool, name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(5 + name.len());
    buf.push(if is_group { NODE_TAG_GROUP } else { NODE_TAG_DATASET });
    write_str(&mut buf, name)?;
    Ok(buf)
}

/// Decode a node header.
pub fn decode_node_header(data: &[u8]) -> Result<NodeHeader> {
    let mut cursor = Cursor::new(data);
    let is_group = match cursor.read_u8().map_err(truncated("node header"))? {
        NODE_TAG_GROUP => true,
        NODE_TAG_DATASET => false,
        other => return Err(Error::corrupt(format!("unknown node tag {}", other))),
    };
    let name = read_str(&mut cursor, "node name")?;
    ensure_consumed(&cursor, "node header")?;
    Ok(NodeHeader { is_group, name })
}

/// Encode an attribute block: `u32` count, then `key, tag, value` per entry.
pub fn encode_attributes(attributes: &AttributeStore) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(attributes.len() as u32)?;
    for (key, value) in attributes {
        write_str(&mut buf, key)?;
        match value {
            AttributeValue::Text(s) => {
                buf.push(VALUE_TAG_TEXT);
                write_str(&mut buf, s)?;
            }
            AttributeValue::Real(v) => {
                buf.push(VALUE_TAG_REAL);
                buf.write_f64::<LittleEndian>(*v)?;
            }
            AttributeValue::Vector(v) => {
                buf.push(VALUE_TAG_VECTOR);
                buf.write_u32::<LittleEndian>(v.len() as u32)?;
                for x in v {
                    buf.write_f64::<LittleEndian>(*x)?;
                }
            }
            AttributeValue::Timestamp(t) => {
                buf.push(VALUE_TAG_TIMESTAMP);
                buf.write_f64::<LittleEndian>(*t)?;
            }
        }
    }
    Ok(buf)
}

/// Decode an attribute block.
pub fn decode_attributes(data: &[u8]) -> Result<Vec<(String, AttributeValue)>> {
    let mut cursor = Cursor::new(data);
    let count = cursor.read_u32::<LittleEndian>().map_err(truncated("attribute block"))?;
    // Each entry takes at least a key length, a tag and a 4-byte value length.
    if count as usize > data.len() / 9 {
        return Err(Error::corrupt(format!(
            "attribute block claims {} entries in {} bytes",
            count,
            data.len()
        )));
    }

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = read_str(&mut cursor, "attribute key")?;
        let tag = cursor.read_u8().map_err(truncated("attribute value"))?;
        let value = match tag {
            VALUE_TAG_TEXT => AttributeValue::Text(read_str(&mut cursor, "attribute value")?),
            VALUE_TAG_REAL => AttributeValue::Real(
                cursor
                    .read_f64::<LittleEndian>()
                    .map_err(truncated("attribute value"))?,
            ),
            VALUE_TAG_VECTOR => {
                let n = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(truncated("attribute vector"))? as usize;
                let mut v = SmallVec::with_capacity(n.min(16));
                for _ in 0..n {
                    v.push(
                        cursor
                            .read_f64::<LittleEndian>()
                            .map_err(truncated("attribute vector"))?,
                    );
                }
                AttributeValue::Vector(v)
            }
            VALUE_TAG_TIMESTAMP => AttributeValue::Timestamp(
                cursor
                    .read_f64::<LittleEndian>()
                    .map_err(truncated("attribute value"))?,
            ),
            other => {
                return Err(Error::corrupt(format!(
                    "attribute '{}' has unknown value tag {}",
                    key, other
                )))
            }
        };
        if out.iter().any(|(k, _)| *k == key) {
            return Err(Error::corrupt(format!("attribute '{}' stored twice", key)));
        }
        out.push((key, value));
    }
    ensure_consumed(&cursor, "attribute block")?;
    Ok(out)
}

/// Encode a dataset header.
pub fn encode_dataset_header(header: &DatasetHeader) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(DatasetHeader::SIZE);
    buf.push(header.element_type as u8);
    buf.push(u8::from(header.finalized));
    buf.write_u64::<LittleEndian>(header.axes)?;
    buf.write_u64::<LittleEndian>(header.rows)?;
    buf.extend_from_slice(&header.digest);
    Ok(buf)
}

/// Decode a dataset header.
pub fn decode_dataset_header(data: &[u8]) -> Result<DatasetHeader> {
    if data.len() != DatasetHeader::SIZE {
        return Err(Error::corrupt(format!(
            "dataset header is {} bytes, expected {}",
            data.len(),
            DatasetHeader::SIZE
        )));
    }
    let mut cursor = Cursor::new(data);
    let tag = cursor.read_u8().map_err(truncated("dataset header"))?;
    let element_type = ElementType::from_u8(tag)
        .ok_or_else(|| Error::corrupt(format!("unknown element type tag {}", tag)))?;
    let finalized = cursor.read_u8().map_err(truncated("dataset header"))? != 0;
    let axes = cursor.read_u64::<LittleEndian>().map_err(truncated("dataset header"))?;
    let rows = cursor.read_u64::<LittleEndian>().map_err(truncated("dataset header"))?;
    let mut digest = [0u8; DIGEST_SIZE];
    cursor.read_exact(&mut digest).map_err(truncated("dataset header"))?;
    Ok(DatasetHeader {
        element_type,
        finalized,
        axes,
        rows,
        digest,
    })
}
