//! Time bases of sensor datasets.
//!
//! A trial either holds a shared `time` dataset used by all its sensors, or
//! every sensor carries its own `start-time` and `sampling-interval`.
//! Mixing both for one sensor, or supplying neither, is an error.

use super::kind::{classify, Layout, NodeKind, SAMPLING_INTERVAL_KEY, START_TIME_KEY, TIME_DATASET};
use super::path::NodePath;
use super::tree::{ContainerTree, NodeRef};
use super::ValueType;
use crate::util::{Chrono, ElementType, Error, Result};

/// Rows fetched per read when streaming a shared time vector.
const CHUNK_ROWS: usize = 4096;

/// Uniform clock of one sensor: `t(i) = start + i * interval`.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorClock {
    pub path: NodePath,
    pub start: Chrono,
    pub interval: Chrono,
    pub length: usize,
    /// Float type the arithmetic is carried out in.
    pub precision: ElementType,
}

impl SensorClock {
    /// Timestamp of sample `index`.
    pub fn time_at(&self, index: usize) -> Chrono {
        uniform_time(self.start, self.interval, index, self.precision)
    }
}

fn uniform_time(start: Chrono, interval: Chrono, index: usize, precision: ElementType) -> Chrono {
    match precision {
        ElementType::Float32 => (start as f32 + index as f32 * interval as f32) as Chrono,
        _ => start + index as Chrono * interval,
    }
}

/// Time basis of a whole trial.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeBasis {
    /// One `time` vector shared by all sensors of the trial.
    SharedVector {
        time: NodePath,
        length: usize,
        sensors: Vec<NodePath>,
    },
    /// Every sensor has its own start time and sampling interval.
    PerSensor(Vec<SensorClock>),
}

impl TimeBasis {
    /// Check if this is the shared-vector case.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::SharedVector { .. })
    }

    /// Number of sensors covered.
    pub fn sensor_count(&self) -> usize {
        match self {
            Self::SharedVector { sensors, .. } => sensors.len(),
            Self::PerSensor(clocks) => clocks.len(),
        }
    }
}

/// Time basis of a single sensor.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorTimeBasis {
    /// Uses the trial's `time` dataset.
    Shared { time: NodeRef, length: usize },
    /// Uses its own start time and sampling interval.
    Clock(SensorClock),
}

/// Resolves time bases for trials and sensors of one tree.
pub struct TimeBaseResolver<'a> {
    tree: &'a ContainerTree,
    layout: Layout,
}

impl<'a> TimeBaseResolver<'a> {
    pub fn new(tree: &'a ContainerTree, layout: Layout) -> Self {
        Self { tree, layout }
    }

    /// Sensor datasets that are direct children of `trial`.
    pub fn sensors(&self, trial: NodeRef) -> impl Iterator<Item = NodeRef> + 'a {
        let tree = self.tree;
        let layout = self.layout;
        tree.children_of(trial).filter_map(move |(_, child)| {
            let node = tree.node(child).ok()?;
            (classify(node.path(), node.is_group(), layout) == NodeKind::SensorDataset)
                .then_some(child)
        })
    }

    /// The trial's usable `time` dataset and its length, if present.
    fn time_vector(&self, trial: NodeRef) -> Result<Option<(NodeRef, usize)>> {
        let Some(time) = self.tree.child(trial, TIME_DATASET) else {
            return Ok(None);
        };
        let node = self.tree.node(time)?;
        let Some(slot) = node.dataset() else {
            return Ok(None);
        };
        let length = slot
            .len()
            .ok_or_else(|| Error::NotFinalized(node.path().clone()))?;
        if !slot.element_type().is_real() || slot.axes() != Some(1) {
            return Err(Error::InvalidTimeVector(node.path().clone()));
        }
        Ok(Some((time, length)))
    }

    /// Resolve the time basis of every sensor in a trial.
    ///
    /// Fails on the first sensor that violates the rules.
    pub fn resolve_time_basis(&self, trial: impl Into<NodePath>) -> Result<TimeBasis> {
        let trial_path = trial.into();
        let trial = self.tree.resolve(&trial_path)?;
        if !self.tree.node(trial)?.is_group() {
            return Err(Error::InvalidParent(trial_path));
        }
        let time = self.time_vector(trial)?;

        let mut sensors = Vec::new();
        let mut clocks = Vec::new();
        for sensor in self.sensors(trial) {
            match self.sensor_basis(time, sensor)? {
                SensorTimeBasis::Shared { .. } => {
                    sensors.push(self.tree.node(sensor)?.path().clone());
                }
                SensorTimeBasis::Clock(clock) => clocks.push(clock),
            }
        }

        Ok(match time {
            Some((node, length)) => TimeBasis::SharedVector {
                time: self.tree.node(node)?.path().clone(),
                length,
                sensors,
            },
            None => TimeBasis::PerSensor(clocks),
        })
    }

    /// Resolve the time basis of one sensor dataset.
    pub fn sensor_time_basis(&self, sensor: impl Into<NodePath>) -> Result<SensorTimeBasis> {
        let sensor = self.tree.resolve(sensor)?;
        self.basis_of(sensor)
    }

    /// Resolve the time basis of a sensor node handle.
    pub fn basis_of(&self, sensor: NodeRef) -> Result<SensorTimeBasis> {
        let node = self.tree.node(sensor)?;
        if node.dataset().is_none() {
            return Err(Error::NotADataset(node.path().clone()));
        }
        let trial = node
            .parent()
            .ok_or_else(|| Error::NotADataset(node.path().clone()))?;
        let time = self.time_vector(trial)?;
        self.sensor_basis(time, sensor)
    }

    fn sensor_basis(&self, time: Option<(NodeRef, usize)>, sensor: NodeRef) -> Result<SensorTimeBasis> {
        let node = self.tree.node(sensor)?;
        let path = node.path();
        let attrs = node.attributes();
        let length = self.tree.length(sensor)?;
        let start = attrs.get(START_TIME_KEY);
        let interval = attrs.get(SAMPLING_INTERVAL_KEY);

        if let Some((time, expected)) = time {
            if start.is_some() || interval.is_some() {
                return Err(Error::AmbiguousTimeBasis(path.clone()));
            }
            if length != expected {
                return Err(Error::TimeLengthMismatch {
                    path: path.clone(),
                    expected,
                    actual: length,
                });
            }
            return Ok(SensorTimeBasis::Shared { time, length });
        }

        let (Some(start), Some(interval)) = (start, interval) else {
            return Err(Error::MissingTimeBasis(path.clone()));
        };
        let start = start.as_time().ok_or_else(|| Error::AttributeType {
            path: path.clone(),
            key: START_TIME_KEY.to_string(),
            expected: ValueType::Timestamp,
            actual: start.value_type(),
        })?;
        let interval = interval.as_real().ok_or_else(|| Error::AttributeType {
            path: path.clone(),
            key: SAMPLING_INTERVAL_KEY.to_string(),
            expected: ValueType::Real,
            actual: interval.value_type(),
        })?;
        let precision = match node.dataset().map(|d| d.element_type()) {
            Some(ElementType::Float32) => ElementType::Float32,
            _ => ElementType::Float64,
        };

        Ok(SensorTimeBasis::Clock(SensorClock {
            path: path.clone(),
            start,
            interval,
            length,
            precision,
        }))
    }

    /// Timestamp sequence of a sensor dataset.
    pub fn timestamps(&self, sensor: impl Into<NodePath>) -> Result<Timestamps<'a>> {
        let source = match self.sensor_time_basis(sensor)? {
            SensorTimeBasis::Shared { time, length } => Timestamps {
                source: TimeSource::Vector { tree: self.tree, node: time },
                len: length,
            },
            SensorTimeBasis::Clock(clock) => Timestamps {
                source: TimeSource::Uniform {
                    start: clock.start,
                    interval: clock.interval,
                    precision: clock.precision,
                },
                len: clock.length,
            },
        };
        Ok(source)
    }
}

#[derive(Clone)]
enum TimeSource<'a> {
    Vector { tree: &'a ContainerTree, node: NodeRef },
    Uniform { start: Chrono, interval: Chrono, precision: ElementType },
}

/// Finite, lazily evaluated timestamps of one sensor.
///
/// Each call to [`iter`](Self::iter) starts from the first sample. Shared
/// vectors are streamed from the dataset in chunks.
#[derive(Clone)]
pub struct Timestamps<'a> {
    source: TimeSource<'a>,
    len: usize,
}

impl<'a> Timestamps<'a> {
    /// Number of timestamps.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no timestamps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Timestamp of sample `index`.
    pub fn get(&self, index: usize) -> Result<Chrono> {
        if index >= self.len {
            return Err(Error::OutOfBounds {
                start: index,
                length: 1,
                len: self.len,
            });
        }
        match &self.source {
            TimeSource::Uniform { start, interval, precision } => {
                Ok(uniform_time(*start, *interval, index, *precision))
            }
            TimeSource::Vector { tree, node } => {
                let row = tree.get_slice(*node, index, 1)?;
                row.get_f64(0, 0)
                    .ok_or_else(|| Error::corrupt("empty time vector row"))
            }
        }
    }

    /// Iterate from the first timestamp.
    pub fn iter(&self) -> TimestampIter<'a> {
        TimestampIter {
            source: self.source.clone(),
            len: self.len,
            index: 0,
            buffer: Vec::new(),
            buffer_start: 0,
        }
    }

    /// Collect all timestamps.
    pub fn to_vec(&self) -> Result<Vec<Chrono>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &Timestamps<'a> {
    type Item = Result<Chrono>;
    type IntoIter = TimestampIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`Timestamps`].
pub struct TimestampIter<'a> {
    source: TimeSource<'a>,
    len: usize,
    index: usize,
    buffer: Vec<Chrono>,
    buffer_start: usize,
}

impl Iterator for TimestampIter<'_> {
    type Item = Result<Chrono>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let index = self.index;
        self.index += 1;

        match &self.source {
            TimeSource::Uniform { start, interval, precision } => {
                Some(Ok(uniform_time(*start, *interval, index, *precision)))
            }
            TimeSource::Vector { tree, node } => {
                let offset = index - self.buffer_start;
                if offset >= self.buffer.len() {
                    let rows = CHUNK_ROWS.min(self.len - index);
                    match tree.get_slice(*node, index, rows) {
                        Ok(chunk) => {
                            self.buffer = chunk.to_f64_vec();
                            self.buffer_start = index;
                        }
                        Err(e) => {
                            self.index = self.len;
                            return Some(Err(e));
                        }
                    }
                }
                Some(Ok(self.buffer[index - self.buffer_start]))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}
