//! Node storage for the package tree.
//!
//! All nodes live in an arena owned by [`Dsm`](crate::dsm::Dsm) and are
//! addressed by [`NodeId`] handles. Dependencies point back into the tree
//! with plain handles, so the tree remains the single owner of every node.

use std::path::PathBuf;

/// Handle to a node inside the [`Dsm`](crate::dsm::Dsm) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Module(ModuleData),
    Package(PackageData),
}

#[derive(Debug)]
pub(crate) struct ModuleData {
    pub(crate) path: PathBuf,
    pub(crate) dependencies: Vec<Dependency>,
}

#[derive(Debug)]
pub(crate) struct PackageData {
    pub(crate) path: PathBuf,
    /// Module children, in directory-listing order.
    pub(crate) modules: Vec<NodeId>,
    /// Package children, in directory-listing order.
    pub(crate) packages: Vec<NodeId>,
}

/// A single import edge from a module to some target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The importing module.
    pub source: NodeId,
    /// Line of the import statement in the source file.
    pub lineno: u32,
    /// What the import resolved to.
    pub target: DependencyTarget,
    /// The imported attribute name, when it differs from the resolved
    /// node's own name (the import names something *inside* the target).
    /// Display only, never used for resolution.
    pub what: Option<String>,
}

impl Dependency {
    /// Whether the target could not be resolved to an in-scope node.
    pub fn external(&self) -> bool {
        matches!(self.target, DependencyTarget::External(_))
    }
}

/// Resolution outcome for one import target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    /// The dotted name did not resolve inside the scanned package set.
    External(String),
    /// Resolved to a module of the tree.
    Module(NodeId),
    /// Resolved to a package of the tree (possibly coarsely, when the
    /// exact submodule could not be pinned down).
    Package(NodeId),
}

impl DependencyTarget {
    /// The resolved node, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            DependencyTarget::External(_) => None,
            DependencyTarget::Module(id) | DependencyTarget::Package(id) => Some(*id),
        }
    }
}
