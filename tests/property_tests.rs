//! Property-based tests for validation and timestamp arithmetic.

use proptest::prelude::*;
use sensor_archive::prelude::*;

#[derive(Clone, Debug)]
struct SensorCase {
    len: usize,
    coordinate: [f64; 3],
    text: String,
}

fn sensor_case() -> impl Strategy<Value = SensorCase> {
    (
        0usize..40,
        prop::array::uniform3(-1.0e3f64..1.0e3),
        "[A-Za-z][A-Za-z0-9 ]{0,11}",
    )
        .prop_map(|(len, coordinate, text)| SensorCase { len, coordinate, text })
}

fn trials() -> impl Strategy<Value = Vec<Vec<SensorCase>>> {
    prop::collection::vec(prop::collection::vec(sensor_case(), 0..4), 0..4)
}

/// Build a fully documented container; `omit(i)` drops the i-th required attribute written.
fn build(trials: &[Vec<SensorCase>], omit: impl Fn(usize) -> bool) -> Container {
    let mut c = Container::in_memory();
    let mut counter = 0usize;
    let mut set = |c: &mut Container, node: NodeRef, key: &str, value: AttributeValue| {
        if !omit(counter) {
            c.set_attribute(node, key, value).unwrap();
        }
        counter += 1;
    };

    let root = c.root();
    for key in ["name", "contact", "description", "location", "coordinate-system"] {
        set(&mut c, root, key, AttributeValue::from("Demo"));
    }
    for (t, sensors) in trials.iter().enumerate() {
        let trial_name = format!("trial {}", t + 1);
        let trial = c.add_group("/", &trial_name).unwrap();
        set(&mut c, trial, "name", AttributeValue::from(trial_name.as_str()));
        set(&mut c, trial, "description", AttributeValue::from("run"));

        let trial_path = format!("/{}", trial_name);
        for (s, case) in sensors.iter().enumerate() {
            let name = format!("A{}", s + 1);
            let node = c
                .add_dataset(trial_path.as_str(), &name, ElementType::Float64)
                .unwrap();
            set(&mut c, node, "name", AttributeValue::from(case.text.as_str()));
            set(&mut c, node, "coordinate", AttributeValue::from(case.coordinate));
            set(&mut c, node, "orientation", AttributeValue::from([0.0, 0.0, 1.0]));
            set(&mut c, node, "description", AttributeValue::from(case.text.as_str()));
            set(&mut c, node, "unit", AttributeValue::from("mm"));
            set(&mut c, node, "conversion", AttributeValue::Real(0.001));
            let values: Vec<f64> = (0..case.len).map(|i| i as f64).collect();
            c.finalize(node, SampleArray::from_slice(&values)).unwrap();
        }
    }
    c
}

proptest! {
    /// Fully documented trees validate clean.
    #[test]
    fn prop_complete_tree_is_valid(trials in trials()) {
        let c = build(&trials, |_| false);
        let report = c.validate().unwrap();
        prop_assert!(report.is_empty(), "unexpected violations: {}", report);
    }

    /// Every omitted attribute is reported exactly once.
    #[test]
    fn prop_omissions_are_counted(
        trials in trials(),
        mask in prop::collection::vec(any::<bool>(), 64),
    ) {
        let omit = |i: usize| mask.get(i).copied().unwrap_or(false);
        let c = build(&trials, omit);
        let report = c.validate().unwrap();

        let total = 5 + trials.iter().map(|s| 2 + 6 * s.len()).sum::<usize>();
        let omitted = (0..total).filter(|&i| omit(i)).count();
        prop_assert_eq!(report.error_count(), omitted);
    }

    /// Validation and sealing are idempotent.
    #[test]
    fn prop_validation_is_idempotent(
        trials in trials(),
        mask in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut c = build(&trials, |i| mask.get(i).copied().unwrap_or(false));
        let first = c.validate().unwrap();
        let second = c.validate().unwrap();
        prop_assert_eq!(&first, &second);

        c.seal().unwrap();
        c.seal().unwrap();
        prop_assert_eq!(&c.validate().unwrap(), &first);
    }

    /// `t(i) = start + i * interval` for every sample.
    #[test]
    fn prop_uniform_timestamps(
        start in -1.0e6f64..1.0e6,
        interval in 1.0e-4f64..10.0,
        len in 0usize..500,
    ) {
        let mut c = Container::in_memory();
        c.add_group("/", "trial 1").unwrap();
        let node = c.add_dataset("/trial 1", "A1", ElementType::Float64).unwrap();
        c.finalize(node, SampleArray::from_slice(&vec![0.0f64; len])).unwrap();
        c.set_attribute(node, "start-time", AttributeValue::timestamp(start)).unwrap();
        c.set_attribute(node, "sampling-interval", interval).unwrap();

        let ts = c.timestamps("/trial 1/A1").unwrap();
        prop_assert_eq!(ts.len(), len);
        let first: Vec<f64> = ts.iter().collect::<Result<_>>().unwrap();
        let again: Vec<f64> = ts.iter().collect::<Result<_>>().unwrap();
        prop_assert_eq!(&first, &again);
        for (i, t) in first.iter().enumerate() {
            prop_assert_eq!(*t, start + i as f64 * interval);
        }
    }
}

#[test]
fn test_hundred_samples_at_ten_milliseconds() {
    let mut c = Container::in_memory();
    c.add_group("/", "trial 1").unwrap();
    let node = c.add_dataset("/trial 1", "A1", ElementType::Float64).unwrap();
    c.finalize(node, SampleArray::from_slice(&[0.0f64; 100])).unwrap();
    c.set_attribute(node, "start-time", 0.0).unwrap();
    c.set_attribute(node, "sampling-interval", 0.01).unwrap();

    let ts = c.timestamps("/trial 1/A1").unwrap().to_vec().unwrap();
    assert_eq!(ts.len(), 100);
    assert_eq!(ts[0], 0.0);
    assert_eq!(ts[1], 0.01);
    assert_eq!(ts[2], 0.02);
    assert_eq!(ts[99], 99.0 * 0.01);
    assert!((ts[99] - 0.99).abs() < 1e-12);
}
