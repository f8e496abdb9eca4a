//! Node paths - the sequence of names from the root to a node.

use std::fmt;

/// Path of a node inside a container.
///
/// Displayed as `/a/b`; the root is `/`. Parsing ignores empty components,
/// so `"a/b"`, `"/a/b"` and `"/a//b/"` name the same node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    parts: Vec<String>,
}

impl NodePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path.
    pub fn parse(s: &str) -> Self {
        Self {
            parts: s
                .split('/')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Check if this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of components (0 for the root).
    #[inline]
    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// Last component, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.parts.is_empty() {
            return None;
        }
        Some(Self {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    /// Path of a direct child.
    pub fn join(&self, name: &str) -> NodePath {
        let mut parts = self.parts.clone();
        parts.push(name.to_string());
        Self { parts }
    }

    /// Iterate over the components from the root down.
    pub fn components(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().map(String::as_str)
    }

    /// True if `self` is `other` or lies beneath it.
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.parts.starts_with(&other.parts)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return f.write_str("/");
        }
        for part in &self.parts {
            write!(f, "/{}", part)?;
        }
        Ok(())
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&String> for NodePath {
    fn from(s: &String) -> Self {
        Self::parse(s)
    }
}

impl From<&NodePath> for NodePath {
    fn from(p: &NodePath) -> Self {
        p.clone()
    }
}

/// Check that `name` can label a node.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/')
}
