//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use sensor_archive::prelude::*;

pub const SAMPLE_RATE: f64 = 100.0;

/// Fill in every required project attribute.
pub fn describe_project(c: &mut Container, project: NodeRef, name: &str) {
    c.set_attribute(project, "name", name).expect("set name");
    c.set_attribute(project, "contact", "x").expect("set contact");
    c.set_attribute(project, "description", "y").expect("set description");
    c.set_attribute(project, "location", "z").expect("set location");
    c.set_attribute(project, "coordinate-system", "c").expect("set coordinate-system");
}

/// Add a trial group with its required attributes.
pub fn add_trial(c: &mut Container, parent: &str, name: &str) -> NodeRef {
    let trial = c.add_group(parent, name).expect("add trial");
    c.set_attribute(trial, "name", name).expect("set name");
    c.set_attribute(trial, "description", "static load test").expect("set description");
    trial
}

/// Add a sensor dataset with every required attribute and `values` as payload.
pub fn add_sensor(c: &mut Container, trial: &str, name: &str, values: &[f64]) -> NodeRef {
    let sensor = c
        .add_dataset(trial, name, ElementType::Float64)
        .expect("add sensor dataset");
    c.set_attribute(sensor, "name", name).expect("set name");
    c.set_attribute(sensor, "coordinate", [1.0, 2.0, 0.5]).expect("set coordinate");
    c.set_attribute(sensor, "orientation", [0.0, 0.0, 1.0]).expect("set orientation");
    c.set_attribute(sensor, "description", "accelerometer").expect("set description");
    c.set_attribute(sensor, "unit", "m/s^2").expect("set unit");
    c.set_attribute(sensor, "conversion", 9.81).expect("set conversion");
    c.finalize(sensor, SampleArray::from_slice(values)).expect("finalize sensor");
    sensor
}

/// `n` samples of a deterministic signal.
pub fn signal(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (i as f64 / SAMPLE_RATE + phase).sin() * 0.25)
        .collect()
}

/// Shared time vector sampled at [`SAMPLE_RATE`].
pub fn time_vector(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64 / SAMPLE_RATE).collect()
}

/// The demo project: one trial with a shared `time` vector and sensors A1, A2.
pub fn demo_container(c: &mut Container, a2_len: usize) {
    let root = c.root();
    describe_project(c, root, "Demo");
    add_trial(c, "/", "trial 1");
    let time = c
        .add_dataset("/trial 1", "time", ElementType::Float64)
        .expect("add time");
    c.finalize(time, SampleArray::from_slice(&time_vector(18000)))
        .expect("finalize time");
    add_sensor(c, "/trial 1", "A1", &signal(18000, 0.0));
    add_sensor(c, "/trial 1", "A2", &signal(a2_len, 1.0));
}
