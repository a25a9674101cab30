//! Index-addressed bounding volume hierarchy
//!
//! Nodes and leaf payloads live in two growable arrays and refer to each
//! other by index, never by address — internal reallocation can move
//! storage, so a pointer-based tree would dangle (the arena+index pattern).
//! The tree is built once through [`Bvh::add_root`] / [`Bvh::add_children`] /
//! [`Bvh::set_leaf`] and queried many times.

use crate::containers::Array;
use crate::geom::Aabb;

/// One node of the hierarchy
///
/// A node either has two children or carries a leaf payload index, never
/// both. A freshly added node has neither until the build step decides.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    /// Bounds of everything beneath this node
    pub aabb: Aabb,
    /// Parent node index; `None` for the root
    pub parent: Option<u32>,
    /// Left/right child node indices
    pub children: Option<(u32, u32)>,
    /// Index into the leaf payload array
    pub leaf: Option<u32>,
}

/// Binary AABB tree with per-leaf payloads
///
/// `L` is the leaf payload type — for collision meshes, a contiguous run of
/// triangles. The root is always node 0.
#[derive(Debug, Clone)]
pub struct Bvh<L> {
    nodes: Array<BvhNode>,
    leaves: Array<L>,
}

impl<L> Default for Bvh<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> Bvh<L> {
    /// Create an empty tree
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Array::new(),
            leaves: Array::new(),
        }
    }

    /// Add the root node covering `aabb`
    ///
    /// Must be the first operation on the tree. Returns the root index
    /// (always 0).
    ///
    /// # Panics
    /// Panics if the tree already has a root.
    pub fn add_root(&mut self, aabb: Aabb) -> u32 {
        assert!(self.nodes.is_empty(), "bvh already has a root");
        self.nodes.push(BvhNode {
            aabb,
            parent: None,
            children: None,
            leaf: None,
        });
        0
    }

    /// Split `parent` into two children covering `left_aabb` and `right_aabb`
    ///
    /// The parent's AABB is widened to the union of the two child boxes.
    /// Returns the (left, right) node indices.
    ///
    /// # Panics
    /// Panics if `parent` is out of range or already has children or a leaf.
    pub fn add_children(&mut self, parent: u32, left_aabb: Aabb, right_aabb: Aabb) -> (u32, u32) {
        let parent_idx = parent as usize;
        assert!(
            self.nodes[parent_idx].children.is_none(),
            "bvh node {parent} already has children"
        );
        assert!(
            self.nodes[parent_idx].leaf.is_none(),
            "bvh node {parent} already carries a leaf"
        );

        let left = self.nodes.len() as u32;
        let right = left + 1;
        self.nodes.push(BvhNode {
            aabb: left_aabb,
            parent: Some(parent),
            children: None,
            leaf: None,
        });
        self.nodes.push(BvhNode {
            aabb: right_aabb,
            parent: Some(parent),
            children: None,
            leaf: None,
        });

        let node = &mut self.nodes[parent_idx];
        node.children = Some((left, right));
        node.aabb = left_aabb.union(&right_aabb);
        (left, right)
    }

    /// Attach a leaf payload to `node`
    ///
    /// A node that is already a leaf has its payload overwritten in place.
    /// Returns the payload index.
    ///
    /// # Panics
    /// Panics if `node` is out of range or has children.
    pub fn set_leaf(&mut self, node: u32, payload: L) -> u32 {
        let node_idx = node as usize;
        assert!(
            self.nodes[node_idx].children.is_none(),
            "bvh node {node} has children and cannot become a leaf"
        );
        if let Some(existing) = self.nodes[node_idx].leaf {
            self.leaves[existing as usize] = payload;
            existing
        } else {
            let index = self.leaves.len() as u32;
            self.leaves.push(payload);
            self.nodes[node_idx].leaf = Some(index);
            index
        }
    }

    /// Node at `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn node(&self, index: u32) -> &BvhNode {
        &self.nodes[index as usize]
    }

    /// Leaf payload at `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn leaf(&self, index: u32) -> &L {
        &self.leaves[index as usize]
    }

    /// The root node, if the tree has one
    #[must_use]
    pub fn root(&self) -> Option<&BvhNode> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(&self.nodes[0])
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf payloads
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Iterate over the nodes in index order
    pub fn nodes(&self) -> impl Iterator<Item = &BvhNode> {
        self.nodes.iter()
    }

    /// Remove all nodes and leaves
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaves.clear();
    }
}
