//! Opening missing, damaged and incomplete archives.

use sensor_archive::prelude::*;
use sensor_archive::store::codec::{encode_dataset_header, payload_digest, DatasetHeader};
use sensor_archive::store::OArchive;
use tempfile::NamedTempFile;

const MARKER: f64 = 1234.5678;

fn write_marked_archive(path: &std::path::Path) {
    let mut c = Container::create(path, ContainerOptions::default()).expect("Failed to create container");
    let node = c.add_dataset("/", "A1", ElementType::Float64).unwrap();
    c.finalize(node, SampleArray::from_slice(&[0.5, MARKER, 2.5])).unwrap();
    c.seal().expect("Failed to seal");
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("missing.sarc");
    let err = Container::open(&path, OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    match err {
        Error::NotFound(p) => assert_eq!(p, path),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_open_garbage_file() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    std::fs::write(temp.path(), b"this is not a sensor archive, only text").unwrap();
    let err = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);

    std::fs::write(temp.path(), b"SensArch").unwrap();
    let err = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);
}

#[test]
fn test_open_unsealed_file() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut archive = OArchive::create(temp.path(), Layout::SingleProject, 1024).unwrap();
        archive.write_data(b"orphaned block").unwrap();
        // dropped without sealing
    }
    let err = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);
}

#[test]
fn test_truncated_archive() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_marked_archive(temp.path());
    let bytes = std::fs::read(temp.path()).unwrap();
    std::fs::write(temp.path(), &bytes[..bytes.len() - 16]).unwrap();

    let err = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);
}

#[test]
fn test_digest_mismatch_is_corrupt() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_marked_archive(temp.path());

    let mut bytes = std::fs::read(temp.path()).unwrap();
    let marker = MARKER.to_le_bytes();
    let at = bytes
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("payload bytes present in file");
    bytes[at] ^= 0x01;
    std::fs::write(temp.path(), &bytes).unwrap();

    let err = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);

    // Without verification the damaged payload is served as stored.
    let options = ContainerOptions::new().with_digest_verification(false);
    let c = Container::open(temp.path(), OpenMode::ReadOnly, options).expect("opens unverified");
    let node = c.resolve("/A1").unwrap();
    let values = c.read_all(node).unwrap().to_vec::<f64>().unwrap();
    assert_eq!(values[0], 0.5);
    assert_ne!(values[1], MARKER);
}

fn empty_header(axes: u64) -> Vec<u8> {
    encode_dataset_header(&DatasetHeader {
        element_type: ElementType::Float64,
        finalized: true,
        axes,
        rows: 0,
        digest: payload_digest(&[]),
    })
    .unwrap()
}

#[test]
fn test_oversized_row_shape_is_corrupt() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut c = Container::create(temp.path(), ContainerOptions::default()).unwrap();
        let node = c.add_dataset("/", "empty", ElementType::Float64).unwrap();
        c.finalize(node, SampleArray::from_slice::<f64>(&[])).unwrap();
        c.seal().expect("Failed to seal");
    }

    // Empty payload keeps the digest valid while the row size overflows.
    let mut bytes = std::fs::read(temp.path()).unwrap();
    let stored = empty_header(1);
    let at = bytes
        .windows(stored.len())
        .position(|w| w == stored.as_slice())
        .expect("dataset header present in file");
    bytes[at..at + stored.len()].copy_from_slice(&empty_header(1 << 61));
    std::fs::write(temp.path(), &bytes).unwrap();

    for use_mmap in [true, false] {
        let options = ContainerOptions::new().with_mmap(use_mmap);
        let err = Container::open(temp.path(), OpenMode::ReadOnly, options).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)), "got {:?}", err);
    }
}

#[test]
fn test_error_classes() {
    let mut c = Container::in_memory();
    let err = c.add_group("/nowhere", "x").unwrap_err();
    assert!(err.is_structural());
    assert_eq!(err.to_string(), "Path not found: /nowhere");

    let node = c.add_dataset("/", "A1", ElementType::Float64).unwrap();
    let err = c.add_group("/A1", "x").unwrap_err();
    assert!(matches!(err, Error::InvalidParent(_)));
    assert!(c.get_attribute(node, "unit").unwrap_err().to_string().contains("unit"));
}
