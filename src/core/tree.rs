//! The group/dataset hierarchy of a container.
//!
//! Nodes live in an arena owned by [`ContainerTree`]; a [`NodeRef`] is an
//! index into it. Every node except the root has exactly one parent group,
//! which owns it, so the graph is a tree by construction.

use std::collections::HashMap;
use std::sync::Arc;

use super::attribute::{AttributeStore, AttributeValue, ValueType};
use super::dataset::DatasetSlot;
use super::path::{is_valid_name, NodePath};
use crate::store::IStreams;
use crate::util::{ElementType, Error, Result};

/// Handle to a node of a [`ContainerTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    /// Arena index of this node.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Children of a group, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct GroupBody {
    pub(crate) children: Vec<NodeRef>,
    by_name: HashMap<String, NodeRef>,
}

pub(crate) enum NodeBody {
    Group(GroupBody),
    Dataset(DatasetSlot),
}

/// A group or dataset node.
pub struct Node {
    pub(crate) name: String,
    pub(crate) path: NodePath,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) attributes: AttributeStore,
    pub(crate) body: NodeBody,
}

impl Node {
    /// Node name (empty for the root).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path from the root.
    #[inline]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Parent group, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
    }

    /// Attributes attached to this node.
    #[inline]
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Check if this node is a group.
    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self.body, NodeBody::Group(_))
    }

    /// Check if this node is a dataset.
    #[inline]
    pub fn is_dataset(&self) -> bool {
        matches!(self.body, NodeBody::Dataset(_))
    }

    /// Dataset slot, if this node is a dataset.
    pub fn dataset(&self) -> Option<&DatasetSlot> {
        match &self.body {
            NodeBody::Dataset(d) => Some(d),
            NodeBody::Group(_) => None,
        }
    }

    /// Number of direct children (0 for datasets).
    pub fn num_children(&self) -> usize {
        match &self.body {
            NodeBody::Group(g) => g.children.len(),
            NodeBody::Dataset(_) => 0,
        }
    }
}

/// The node hierarchy of one container.
pub struct ContainerTree {
    nodes: Vec<Node>,
    sealed: bool,
    pub(crate) source: Option<Arc<IStreams>>,
}

impl Default for ContainerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerTree {
    /// Create a tree holding only the root group.
    pub fn new() -> Self {
        let root = Node {
            name: String::new(),
            path: NodePath::root(),
            parent: None,
            attributes: AttributeStore::new(),
            body: NodeBody::Group(GroupBody::default()),
        };
        Self {
            nodes: vec![root],
            sealed: false,
            source: None,
        }
    }

    /// The root node.
    #[inline]
    pub fn root(&self) -> NodeRef {
        NodeRef(0)
    }

    /// Total number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if the tree is sealed (immutable).
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Make the tree immutable. Sealing twice is a no-op.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Look up a node by handle.
    pub fn node(&self, node: NodeRef) -> Result<&Node> {
        self.nodes.get(node.0).ok_or(Error::UnknownNode(node.0))
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> Result<&mut Node> {
        self.nodes.get_mut(node.0).ok_or(Error::UnknownNode(node.0))
    }

    pub(crate) fn ensure_mutable(&self) -> Result<()> {
        if self.sealed {
            return Err(Error::SealedContainer);
        }
        Ok(())
    }

    /// Resolve a path to a node.
    pub fn resolve(&self, path: impl Into<NodePath>) -> Result<NodeRef> {
        let path = path.into();
        let mut current = self.root();
        for part in path.components() {
            current = match &self.nodes[current.0].body {
                NodeBody::Group(g) => match g.by_name.get(part) {
                    Some(child) => *child,
                    None => return Err(Error::PathNotFound(path.clone())),
                },
                NodeBody::Dataset(_) => return Err(Error::PathNotFound(path.clone())),
            };
        }
        Ok(current)
    }

    /// Find a direct child of `parent` by name.
    pub fn child(&self, parent: NodeRef, name: &str) -> Option<NodeRef> {
        match &self.nodes.get(parent.0)?.body {
            NodeBody::Group(g) => g.by_name.get(name).copied(),
            NodeBody::Dataset(_) => None,
        }
    }

    /// Add a group under `parent`.
    pub fn add_group(&mut self, parent: impl Into<NodePath>, name: &str) -> Result<NodeRef> {
        self.insert(parent.into(), name, NodeBody::Group(GroupBody::default()))
    }

    /// Add a dataset with the given element type under `parent`.
    pub fn add_dataset(
        &mut self,
        parent: impl Into<NodePath>,
        name: &str,
        element_type: ElementType,
    ) -> Result<NodeRef> {
        self.insert(parent.into(), name, NodeBody::Dataset(DatasetSlot::new(element_type)))
    }

    /// Every check runs before the arena is touched, so a failed call
    /// leaves the tree unchanged.
    fn insert(&mut self, parent_path: NodePath, name: &str, body: NodeBody) -> Result<NodeRef> {
        self.ensure_mutable()?;
        if !is_valid_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        let parent = self.resolve(&parent_path)?;
        match &self.nodes[parent.0].body {
            NodeBody::Dataset(_) => return Err(Error::InvalidParent(parent_path)),
            NodeBody::Group(g) => {
                if g.by_name.contains_key(name) {
                    return Err(Error::DuplicateName {
                        parent: parent_path,
                        name: name.to_string(),
                    });
                }
            }
        }

        let id = NodeRef(self.nodes.len());
        let path = parent_path.join(name);
        tracing::trace!(%path, dataset = matches!(body, NodeBody::Dataset(_)), "add node");
        self.nodes.push(Node {
            name: name.to_string(),
            path,
            parent: Some(parent),
            attributes: AttributeStore::new(),
            body,
        });
        if let NodeBody::Group(g) = &mut self.nodes[parent.0].body {
            g.children.push(id);
            g.by_name.insert(name.to_string(), id);
        }
        Ok(id)
    }

    /// Direct children of the group at `path`, in insertion order.
    ///
    /// The returned iterator is lazy; clone it to restart. A dataset
    /// yields an empty sequence.
    pub fn children(&self, path: impl Into<NodePath>) -> Result<Children<'_>> {
        let node = self.resolve(path)?;
        Ok(self.children_of(node))
    }

    /// Children of a node handle.
    pub fn children_of(&self, node: NodeRef) -> Children<'_> {
        let refs: &[NodeRef] = match self.nodes.get(node.0).map(|n| &n.body) {
            Some(NodeBody::Group(g)) => &g.children,
            _ => &[],
        };
        Children {
            tree: self,
            refs: refs.iter(),
        }
    }

    /// Depth-first, pre-order traversal of the whole tree.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![self.root()],
        }
    }

    /// Set an attribute, overwriting any previous value for `key`.
    pub fn set_attribute(
        &mut self,
        node: NodeRef,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        if key.is_empty() {
            return Err(Error::InvalidName(key.to_string()));
        }
        let node = self.node_mut(node)?;
        tracing::trace!(path = %node.path, key, "set attribute");
        node.attributes.set(key, value);
        Ok(())
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, node: NodeRef, key: &str) -> Result<&AttributeValue> {
        let node = self.node(node)?;
        node.attributes
            .get(key)
            .ok_or_else(|| Error::MissingAttribute {
                path: node.path.clone(),
                key: key.to_string(),
            })
    }

    /// Get a text attribute.
    pub fn get_str(&self, node: NodeRef, key: &str) -> Result<&str> {
        let value = self.get_attribute(node, key)?;
        value
            .as_str()
            .ok_or_else(|| self.type_error(node, key, ValueType::Text, value))
    }

    /// Get a real attribute.
    pub fn get_real(&self, node: NodeRef, key: &str) -> Result<f64> {
        let value = self.get_attribute(node, key)?;
        value
            .as_real()
            .ok_or_else(|| self.type_error(node, key, ValueType::Real, value))
    }

    /// Get a 3-element vector attribute.
    pub fn get_vector3(&self, node: NodeRef, key: &str) -> Result<[f64; 3]> {
        let value = self.get_attribute(node, key)?;
        value
            .as_vector3()
            .ok_or_else(|| self.type_error(node, key, ValueType::Vector(3), value))
    }

    fn type_error(&self, node: NodeRef, key: &str, expected: ValueType, value: &AttributeValue) -> Error {
        Error::AttributeType {
            path: self.nodes[node.0].path.clone(),
            key: key.to_string(),
            expected,
            actual: value.value_type(),
        }
    }

    /// All attributes of a node in lexicographic key order.
    pub fn attributes(
        &self,
        node: NodeRef,
    ) -> Result<impl Iterator<Item = (&str, &AttributeValue)> + Clone + '_> {
        Ok(self.node(node)?.attributes.iter())
    }
}

/// Lazy sequence of `(name, NodeRef)` children. Clone to restart.
#[derive(Clone)]
pub struct Children<'a> {
    tree: &'a ContainerTree,
    refs: std::slice::Iter<'a, NodeRef>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (&'a str, NodeRef);

    fn next(&mut self) -> Option<Self::Item> {
        let r = *self.refs.next()?;
        Some((self.tree.nodes[r.0].name.as_str(), r))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.refs.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Depth-first pre-order traversal. Siblings are visited in insertion order.
#[derive(Clone)]
pub struct Walk<'a> {
    tree: &'a ContainerTree,
    stack: Vec<NodeRef>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a NodePath, NodeRef);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let node = &self.tree.nodes[current.0];
        if let NodeBody::Group(g) = &node.body {
            self.stack.extend(g.children.iter().rev());
        }
        Some((&node.path, current))
    }
}
