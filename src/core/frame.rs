//! Project coordinate frame and sensor placement vectors.
//!
//! A project's `coordinate-system` attribute is an opaque description.
//! Every sensor `coordinate` / `orientation` below that project is read in
//! the same frame; nothing here transforms between frames.

use glam::DVec3;

use super::attribute::AttributeValue;
use super::kind::{Expect, Layout, COORDINATE_KEY, COORDINATE_SYSTEM_KEY, ORIENTATION_KEY};
use super::path::NodePath;
use super::tree::{ContainerTree, NodeRef};
use super::validate::ValidationErrorKind;
use crate::util::{Error, Result};

/// The frame a node's vectors are expressed in.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateFrame<'a> {
    project: NodePath,
    system: &'a str,
}

impl<'a> CoordinateFrame<'a> {
    /// Resolve the frame declared by the project above `node`.
    ///
    /// Fails with `MissingAttribute` when the project has no
    /// `coordinate-system`, `AttributeType` when it is not a string, or
    /// `NoEnclosingProject` when `node` lies above the project level.
    pub fn for_node(tree: &'a ContainerTree, node: NodeRef, layout: Layout) -> Result<Self> {
        let path = tree.node(node)?.path();
        let depth = layout.project_depth();
        if path.depth() < depth {
            return Err(Error::NoEnclosingProject(path.clone()));
        }
        let mut project = NodePath::root();
        for part in path.components().take(depth) {
            project = project.join(part);
        }
        let project_node = tree.resolve(&project)?;
        let system = tree.get_str(project_node, COORDINATE_SYSTEM_KEY)?;
        Ok(Self { project, system })
    }

    /// Path of the declaring project.
    pub fn project(&self) -> &NodePath {
        &self.project
    }

    /// The coordinate-system description.
    pub fn system(&self) -> &'a str {
        self.system
    }

    /// Sensor position, as stored.
    pub fn coordinate(&self, tree: &ContainerTree, sensor: NodeRef) -> Result<DVec3> {
        read_vector3(tree, sensor, COORDINATE_KEY)
    }

    /// Sensor orientation, as stored (not normalized).
    pub fn orientation(&self, tree: &ContainerTree, sensor: NodeRef) -> Result<DVec3> {
        read_vector3(tree, sensor, ORIENTATION_KEY)
    }
}

fn read_vector3(tree: &ContainerTree, node: NodeRef, key: &str) -> Result<DVec3> {
    tree.get_vector3(node, key).map(DVec3::from_array)
}

/// Structural check of a placement vector: three real components.
pub fn check_placement(value: &AttributeValue) -> std::result::Result<(), ValidationErrorKind> {
    if Expect::Vector3.accepts(value) {
        Ok(())
    } else {
        Err(ValidationErrorKind::WrongType {
            expected: Expect::Vector3.value_type(),
            actual: value.value_type(),
        })
    }
}

/// Scale a vector to unit length.
///
/// Never applied implicitly; stored orientations are kept as written.
pub fn normalize(v: [f64; 3]) -> Result<[f64; 3]> {
    DVec3::from_array(v)
        .try_normalize()
        .map(|n| n.to_array())
        .ok_or(Error::ZeroVector)
}
