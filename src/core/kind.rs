//! Node kinds and their required-attribute contracts.
//!
//! The contracts are fixed constants so they can be reviewed statically.

use std::fmt;

use super::attribute::{AttributeValue, ValueType};
use super::path::NodePath;
use super::tree::{ContainerTree, NodeRef};
use crate::util::Result;

/// Name of the shared time-vector dataset inside a trial.
pub const TIME_DATASET: &str = "time";

/// Project attribute holding the coordinate-system description.
pub const COORDINATE_SYSTEM_KEY: &str = "coordinate-system";
/// Sensor placement vector.
pub const COORDINATE_KEY: &str = "coordinate";
/// Sensor orientation vector.
pub const ORIENTATION_KEY: &str = "orientation";
/// Per-sensor start time.
pub const START_TIME_KEY: &str = "start-time";
/// Per-sensor sampling interval.
pub const SAMPLING_INTERVAL_KEY: &str = "sampling-interval";

/// How project nodes are placed in the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// The root is the project.
    #[default]
    SingleProject,
    /// The root is a plain collection; its child groups are projects.
    MultiProject,
}

impl Layout {
    /// Depth at which project groups sit.
    #[inline]
    pub const fn project_depth(self) -> usize {
        match self {
            Self::SingleProject => 0,
            Self::MultiProject => 1,
        }
    }

    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::SingleProject => 0,
            Self::MultiProject => 1,
        }
    }

    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SingleProject),
            1 => Some(Self::MultiProject),
            _ => None,
        }
    }
}

/// Expected value type of a required attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expect {
    /// Non-empty UTF-8 string
    Text,
    /// Scalar real number
    Real,
    /// Real vector of length 3
    Vector3,
}

impl Expect {
    /// The value type this expectation names.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Text => ValueType::Text,
            Self::Real => ValueType::Real,
            Self::Vector3 => ValueType::Vector(3),
        }
    }

    /// Check the value's type (not its content).
    pub fn accepts(self, value: &AttributeValue) -> bool {
        value.value_type() == self.value_type()
    }
}

/// One required key of a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requirement {
    pub key: &'static str,
    pub expect: Expect,
}

const fn req(key: &'static str, expect: Expect) -> Requirement {
    Requirement { key, expect }
}

/// Required attributes of a project (root) group.
pub const PROJECT_CONTRACT: &[Requirement] = &[
    req("name", Expect::Text),
    req("contact", Expect::Text),
    req("description", Expect::Text),
    req("location", Expect::Text),
    req(COORDINATE_SYSTEM_KEY, Expect::Text),
];

/// Required attributes of a trial group.
pub const TRIAL_CONTRACT: &[Requirement] = &[
    req("name", Expect::Text),
    req("description", Expect::Text),
];

/// Required attributes of a sensor dataset.
pub const SENSOR_CONTRACT: &[Requirement] = &[
    req("name", Expect::Text),
    req(COORDINATE_KEY, Expect::Vector3),
    req(ORIENTATION_KEY, Expect::Vector3),
    req("description", Expect::Text),
    req("unit", Expect::Text),
    req("conversion", Expect::Real),
];

/// Role of a node in the measurement hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Multi-project root holding project groups.
    Collection,
    /// A measurement project.
    Project,
    /// One measurement run within a project.
    Trial,
    /// One sensor's time series within a trial.
    SensorDataset,
    /// The shared `time` vector of a trial.
    TimeVector,
    /// Any other node; carries no contract.
    Auxiliary,
}

impl NodeKind {
    /// Required attributes for this kind.
    pub const fn contract(self) -> &'static [Requirement] {
        match self {
            Self::Project => PROJECT_CONTRACT,
            Self::Trial => TRIAL_CONTRACT,
            Self::SensorDataset => SENSOR_CONTRACT,
            Self::Collection | Self::TimeVector | Self::Auxiliary => &[],
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Project => "project",
            Self::Trial => "trial",
            Self::SensorDataset => "sensor dataset",
            Self::TimeVector => "time vector",
            Self::Auxiliary => "auxiliary",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a node at `path`, given whether it is a group.
pub fn classify(path: &NodePath, is_group: bool, layout: Layout) -> NodeKind {
    let base = layout.project_depth();
    let depth = path.depth();
    if depth < base {
        return NodeKind::Collection;
    }
    match (depth - base, is_group) {
        (0, true) => NodeKind::Project,
        (1, true) => NodeKind::Trial,
        (2, false) if path.name() == Some(TIME_DATASET) => NodeKind::TimeVector,
        (2, false) => NodeKind::SensorDataset,
        _ => NodeKind::Auxiliary,
    }
}

impl ContainerTree {
    /// Kind of a node under the given layout.
    pub fn kind_of(&self, node: NodeRef, layout: Layout) -> Result<NodeKind> {
        let n = self.node(node)?;
        Ok(classify(n.path(), n.is_group(), layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_keys() {
        let keys: Vec<&str> = PROJECT_CONTRACT.iter().map(|r| r.key).collect();
        assert_eq!(keys, ["name", "contact", "description", "location", "coordinate-system"]);
        let keys: Vec<&str> = TRIAL_CONTRACT.iter().map(|r| r.key).collect();
        assert_eq!(keys, ["name", "description"]);
        let keys: Vec<&str> = SENSOR_CONTRACT.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            ["name", "coordinate", "orientation", "description", "unit", "conversion"]
        );
    }

    #[test]
    fn test_classify_single_project() {
        let l = Layout::SingleProject;
        assert_eq!(classify(&NodePath::root(), true, l), NodeKind::Project);
        assert_eq!(classify(&"trial 1".into(), true, l), NodeKind::Trial);
        assert_eq!(classify(&"trial 1/A1".into(), false, l), NodeKind::SensorDataset);
        assert_eq!(classify(&"trial 1/time".into(), false, l), NodeKind::TimeVector);
        assert_eq!(classify(&"trial 1/extra".into(), true, l), NodeKind::Auxiliary);
        assert_eq!(classify(&"notes".into(), false, l), NodeKind::Auxiliary);
    }

    #[test]
    fn test_classify_multi_project() {
        let l = Layout::MultiProject;
        assert_eq!(classify(&NodePath::root(), true, l), NodeKind::Collection);
        assert_eq!(classify(&"bridge".into(), true, l), NodeKind::Project);
        assert_eq!(classify(&"bridge/trial 1".into(), true, l), NodeKind::Trial);
        assert_eq!(classify(&"bridge/trial 1/A1".into(), false, l), NodeKind::SensorDataset);
    }

    #[test]
    fn test_expect_accepts() {
        assert!(Expect::Text.accepts(&"x".into()));
        assert!(!Expect::Text.accepts(&1.0.into()));
        assert!(Expect::Vector3.accepts(&[0.0, 0.0, 1.0].into()));
        assert!(!Expect::Vector3.accepts(&vec![0.0, 1.0].into()));
        assert!(Expect::Real.accepts(&2.5.into()));
    }

    #[test]
    fn test_layout_tags() {
        for layout in [Layout::SingleProject, Layout::MultiProject] {
            assert_eq!(Layout::from_tag(layout.tag()), Some(layout));
        }
        assert_eq!(Layout::from_tag(7), None);
    }
}
