//! Concurrent slice reads from one sealed container.

use rayon::prelude::*;
use sensor_archive::prelude::*;
use tempfile::NamedTempFile;

const ROWS: usize = 20_000;
const CHUNK: usize = 250;

fn write_archive(path: &std::path::Path) -> Vec<f64> {
    let values: Vec<f64> = (0..ROWS).map(|i| (i as f64).sqrt()).collect();
    let mut c = Container::create(path, ContainerOptions::default()).expect("Failed to create container");
    c.add_group("/", "trial 1").unwrap();
    let node = c.add_dataset("/trial 1", "A1", ElementType::Float64).unwrap();
    c.finalize(node, SampleArray::from_slice(&values)).unwrap();
    c.seal().expect("Failed to seal");
    values
}

fn read_in_parallel(options: ContainerOptions) {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let values = write_archive(temp.path());
    let c = Container::open(temp.path(), OpenMode::ReadOnly, options).expect("Failed to open");
    let node = c.resolve("/trial 1/A1").unwrap();

    // Overlapping windows, every chunk read several times.
    let starts: Vec<usize> = (0..ROWS - CHUNK).step_by(CHUNK / 2).collect();
    let mismatches: usize = starts
        .par_iter()
        .flat_map_iter(|&start| std::iter::repeat(start).take(3))
        .map(|start| {
            let slice = c.get_slice(node, start, CHUNK).unwrap().to_vec::<f64>().unwrap();
            usize::from(slice != values[start..start + CHUNK])
        })
        .sum();
    assert_eq!(mismatches, 0);
}

#[test]
fn test_parallel_reads_mmap() {
    read_in_parallel(ContainerOptions::default());
}

#[test]
fn test_parallel_reads_file_handle() {
    read_in_parallel(ContainerOptions::new().with_mmap(false));
}

#[test]
fn test_independent_handles() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let values = write_archive(temp.path());

    let total: f64 = (0..4)
        .into_par_iter()
        .map(|_| {
            let c = Container::open(temp.path(), OpenMode::ReadOnly, ContainerOptions::default())
                .expect("Failed to open");
            let node = c.resolve("/trial 1/A1").unwrap();
            c.read_all(node).unwrap().to_f64_vec().iter().sum::<f64>()
        })
        .sum();
    let expected: f64 = values.iter().sum();
    assert!((total - 4.0 * expected).abs() < 1e-6 * expected);
}
