//! Adaptive region quadtree over the play field.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`], so the
//! parent/child links form no ownership cycles: a child slot and a parent
//! link are both plain indices, and upward walks stay O(1) per step.
//! Subdivision allocates four child slots; a collapse returns them to the
//! free list.

use glam::Vec2;
use tracing::{debug, warn};

use super::bounds::BoundingBox;
use crate::error::QuadError;
use crate::point::{PointId, PointMap};

/// Stable node identifier into the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// One tree node: a leaf holding point ids, or an internal node holding
/// exactly four children in fixed NW, NE, SW, SE order. Never both.
#[derive(Debug)]
struct Node {
    bounds: BoundingBox,
    parent: Option<NodeId>,
    children: Option<[NodeId; 4]>,
    points: Vec<PointId>,
    /// Subdivision levels left before the minimum cell size is reached.
    depth: i32,
}

impl Node {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Region quadtree indexing points by position.
///
/// The tree stores point ids only; every operation that needs a position or
/// updates a point's leaf back-link takes the world's [`PointMap`].
pub struct QuadTree {
    nodes: Vec<Option<Node>>,
    free_list: Vec<usize>,
    root: NodeId,
    min_cell: f32,
}

impl QuadTree {
    /// Create a tree covering `bounds`, subdividing no finer than
    /// `min_cell`. Both are expected to be roughly power-of-two sized; the
    /// depth formula below is not well defined otherwise.
    pub fn new(bounds: BoundingBox, min_cell: f32) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NodeId(0),
            min_cell,
        };
        tree.root = tree.alloc(bounds, None);
        tree
    }

    /// Remaining subdivision levels for a node of the given half-extent.
    fn depth_for(half: Vec2, min_cell: f32) -> i32 {
        half.min_element().log2().floor() as i32 - min_cell.log2().floor() as i32
    }

    fn alloc(&mut self, bounds: BoundingBox, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            depth: Self::depth_for(bounds.half_extent(), self.min_cell),
            bounds,
            parent,
            children: None,
            points: Vec::new(),
        };
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            NodeId(idx as u32)
        } else {
            self.nodes.push(Some(node));
            NodeId((self.nodes.len() - 1) as u32)
        }
    }

    fn free(&mut self, id: NodeId) {
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    #[inline]
    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx()).and_then(|slot| slot.as_ref())
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.idx()).and_then(|slot| slot.as_mut())
    }

    /// Root node id. The root exists for the lifetime of the tree.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Bounds of a live node.
    #[inline]
    pub fn bounds(&self, id: NodeId) -> Option<BoundingBox> {
        self.get(id).map(|node| node.bounds)
    }

    /// Whether a live node is currently a leaf.
    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_leaf)
    }

    /// Child ids of an internal node, in NW, NE, SW, SE order.
    #[inline]
    pub fn children(&self, id: NodeId) -> Option<[NodeId; 4]> {
        self.get(id).and_then(|node| node.children)
    }

    /// Parent of a node (None for the root).
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Point ids held directly by a node. Empty for internal nodes.
    #[inline]
    pub fn leaf_points(&self, id: NodeId) -> &[PointId] {
        self.get(id).map(|node| node.points.as_slice()).unwrap_or(&[])
    }

    /// Number of live nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Iterate all live node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| NodeId(idx as u32)))
    }

    /// Iterate the bounds of every leaf cell, for structural display.
    pub fn leaf_bounds(&self) -> impl Iterator<Item = BoundingBox> + '_ {
        self.nodes
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|node| node.is_leaf())
            .map(|node| node.bounds)
    }

    /// Insert a live point, routing from the root.
    ///
    /// `Ok(false)` means the point's position lies outside the tree bounds.
    pub fn insert(&mut self, id: PointId, points: &mut PointMap) -> Result<bool, QuadError> {
        self.insert_at(self.root, id, points)
    }

    fn insert_at(
        &mut self,
        node_id: NodeId,
        id: PointId,
        points: &mut PointMap,
    ) -> Result<bool, QuadError> {
        let Some(position) = points.get(&id).map(|point| point.position) else {
            return Ok(false);
        };
        let (contains, is_leaf, occupancy, depth) = match self.get(node_id) {
            Some(node) => (
                node.bounds.contains(position),
                node.is_leaf(),
                node.points.len(),
                node.depth,
            ),
            None => return Ok(false),
        };
        if !contains {
            return Ok(false);
        }

        if is_leaf {
            // An empty leaf takes the point directly. A leaf at minimum
            // cell size takes it too: capacity is unbounded once no further
            // subdivision is allowed.
            if occupancy == 0 || depth - 1 <= 0 {
                if let Some(node) = self.get_mut(node_id) {
                    node.points.push(id);
                }
                if let Some(point) = points.get_mut(&id) {
                    point.node = Some(node_id);
                }
                return Ok(true);
            }
            self.subdivide(node_id, points)?;
        }

        let Some(children) = self.get(node_id).and_then(|node| node.children) else {
            return Ok(false);
        };
        for child in children {
            if self.insert_at(child, id, points)? {
                return Ok(true);
            }
        }
        // The node contains the position but no child took it: the child
        // bounds no longer tile this node.
        Err(QuadError::QuadrantsRejected {
            node: node_id,
            position,
        })
    }

    /// Split a single-point leaf into four quadrants and push its resident
    /// point down into whichever child contains it.
    fn subdivide(&mut self, node_id: NodeId, points: &mut PointMap) -> Result<(), QuadError> {
        let Some((center, half, resident)) = self.get(node_id).map(|node| {
            (
                node.bounds.center(),
                (node.bounds.half_extent() / 2.0).round(),
                node.points.first().copied(),
            )
        }) else {
            return Ok(());
        };

        let centers = [
            center - half,
            Vec2::new(center.x + half.x, center.y - half.y),
            Vec2::new(center.x - half.x, center.y + half.y),
            center + half,
        ];
        let children = centers.map(|c| self.alloc(BoundingBox::new(c, half), Some(node_id)));
        if let Some(node) = self.get_mut(node_id) {
            node.children = Some(children);
        }
        debug!("Subdivided node {:?}", node_id);

        if let Some(resident) = resident {
            for child in children {
                if self.insert_at(child, resident, points)? {
                    if let Some(node) = self.get_mut(node_id) {
                        node.points.clear();
                    }
                    return Ok(());
                }
            }
            let position = points
                .get(&resident)
                .map(|point| point.position)
                .unwrap_or(center);
            return Err(QuadError::QuadrantsRejected {
                node: node_id,
                position,
            });
        }
        Ok(())
    }

    /// Remove and destroy the point sitting exactly at `coord`.
    pub fn remove_at(&mut self, coord: Vec2, points: &mut PointMap) -> bool {
        self.remove_at_node(self.root, coord, points)
    }

    fn remove_at_node(&mut self, node_id: NodeId, coord: Vec2, points: &mut PointMap) -> bool {
        let Some(node) = self.get(node_id) else {
            return false;
        };
        if !node.bounds.contains(coord) {
            return false;
        }
        if let Some(children) = node.children {
            for child in children {
                if self.remove_at_node(child, coord, points) {
                    return true;
                }
            }
            return false;
        }

        let Some(idx) = node
            .points
            .iter()
            .position(|pid| points.get(pid).is_some_and(|point| point.position == coord))
        else {
            return false;
        };
        let parent = node.parent;
        if let Some(node) = self.get_mut(node_id) {
            let pid = node.points.remove(idx);
            points.remove(&pid);
        }
        self.merge_walk(parent, points);
        true
    }

    /// Detach a surviving point from the leaf currently holding it.
    ///
    /// The point stays alive in the map with its leaf back-link cleared;
    /// the caller is expected to reinsert it (see [`QuadTree::relocate`]).
    pub fn release(&mut self, node_id: NodeId, id: PointId, points: &mut PointMap) -> bool {
        let Some(node) = self.get(node_id) else {
            return false;
        };
        let Some(idx) = node.points.iter().position(|&pid| pid == id) else {
            return false;
        };
        let parent = node.parent;
        if let Some(node) = self.get_mut(node_id) {
            node.points.remove(idx);
        }
        if let Some(point) = points.get_mut(&id) {
            point.node = None;
        }
        self.merge_walk(parent, points);
        true
    }

    /// Re-home a point whose position may have left its current leaf.
    ///
    /// Returns `Ok(false)` if the current leaf still contains the position.
    /// Otherwise the point is released and reinserted from the root: every
    /// out-of-leaf move costs a full root-to-leaf descent, there is no
    /// path-local promotion.
    pub fn relocate(&mut self, id: PointId, points: &mut PointMap) -> Result<bool, QuadError> {
        let (position, node) = match points.get(&id) {
            Some(point) => (point.position, point.node),
            None => return Ok(false),
        };
        if let Some(node_id) = node {
            if self
                .get(node_id)
                .is_some_and(|node| node.bounds.contains(position))
            {
                return Ok(false);
            }
            self.release(node_id, id, points);
        }
        if !self.insert(id, points)? {
            warn!("Point {:?} at {} is outside the field and left the index", id, position);
        }
        Ok(true)
    }

    /// Walk ancestors from `start`, collapsing while each collapse succeeds.
    ///
    /// A failed collapse ends the walk: the node stays internal, so no
    /// ancestor above it can collapse either.
    fn merge_walk(&mut self, start: Option<NodeId>, points: &mut PointMap) {
        let mut current = start;
        while let Some(node_id) = current {
            if !self.try_collapse(node_id, points) {
                break;
            }
            current = self.get(node_id).and_then(|node| node.parent);
        }
    }

    /// Collapse an internal node back into a leaf if its children are all
    /// leaves jointly holding at most one point. The surviving point, if
    /// any, moves up with its back-link retargeted; the children are freed.
    fn try_collapse(&mut self, node_id: NodeId, points: &mut PointMap) -> bool {
        let Some(node) = self.get(node_id) else {
            return false;
        };
        let Some(children) = node.children else {
            return true;
        };

        let mut survivor = None;
        let mut count = 0;
        for child in children {
            let Some(child_node) = self.get(child) else {
                return false;
            };
            if !child_node.is_leaf() {
                return false;
            }
            count += child_node.points.len();
            if survivor.is_none() {
                survivor = child_node.points.first().copied();
            }
        }
        if count > 1 {
            return false;
        }

        for child in children {
            self.free(child);
        }
        if let Some(node) = self.get_mut(node_id) {
            node.children = None;
            if let Some(pid) = survivor {
                node.points.push(pid);
            }
        }
        if let Some(pid) = survivor {
            if let Some(point) = points.get_mut(&pid) {
                point.node = Some(node_id);
            }
        }
        debug!("Collapsed node {:?}", node_id);
        true
    }

    /// Collect every occupied leaf intersecting `area`.
    ///
    /// Leaf bounds may extend past `area`, so callers must still test each
    /// point's exact position before treating it as a match. Subtrees whose
    /// bounds miss `area` are pruned without descent.
    pub fn query(&self, area: &BoundingBox) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.query_node(self.root, area, &mut leaves);
        leaves
    }

    fn query_node(&self, node_id: NodeId, area: &BoundingBox, out: &mut Vec<NodeId>) {
        let Some(node) = self.get(node_id) else {
            return;
        };
        if !node.bounds.intersects(area) {
            return;
        }
        match node.children {
            Some(children) => {
                for child in children {
                    self.query_node(child, area, out);
                }
            }
            None => {
                if !node.points.is_empty() {
                    out.push(node_id);
                }
            }
        }
    }

    /// Drop all structure and reset to a single empty root.
    pub fn clear(&mut self) {
        if let Some(bounds) = self.bounds(self.root) {
            self.nodes.clear();
            self.free_list.clear();
            self.root = self.alloc(bounds, None);
        }
    }
}

impl std::fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("nodes", &self.node_count())
            .field("min_cell", &self.min_cell)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{Color, Point, PointMap};

    // 512x512 field, min cell 16: the root has a budget of 4 subdivisions.
    fn make_tree() -> QuadTree {
        QuadTree::new(
            BoundingBox::new(Vec2::splat(256.0), Vec2::splat(256.0)),
            16.0,
        )
    }

    fn make_point(points: &mut PointMap, id: u32, x: f32, y: f32) -> PointId {
        let pid = PointId(id);
        points.insert(
            pid,
            Point::new(Vec2::new(x, y), Vec2::ZERO, Color::default(), 2.0),
        );
        pid
    }

    /// Walk the whole tree checking the structural invariants: internal
    /// nodes have four children and no points, leaf points sit inside their
    /// leaf's bounds, and every back-link is mutual.
    fn check_invariants(tree: &QuadTree, points: &PointMap) {
        let mut listed = 0;
        for id in tree.node_ids() {
            match tree.children(id) {
                Some(children) => {
                    assert!(tree.leaf_points(id).is_empty());
                    for child in children {
                        assert_eq!(tree.parent(child), Some(id));
                    }
                }
                None => {
                    let bounds = tree.bounds(id).unwrap();
                    for pid in tree.leaf_points(id) {
                        let point = points.get(pid).unwrap();
                        assert!(bounds.contains(point.position));
                        assert_eq!(point.node, Some(id));
                        listed += 1;
                    }
                }
            }
        }
        assert_eq!(listed, points.len());
    }

    #[test]
    fn test_depth_formula() {
        assert_eq!(QuadTree::depth_for(Vec2::splat(256.0), 16.0), 4);
        assert_eq!(QuadTree::depth_for(Vec2::splat(400.0), 16.0), 4);
        assert_eq!(QuadTree::depth_for(Vec2::splat(16.0), 16.0), 0);
        // The smaller axis bounds the budget.
        assert_eq!(QuadTree::depth_for(Vec2::new(256.0, 32.0), 16.0), 1);
    }

    #[test]
    fn test_subdivision() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        let b = make_point(&mut points, 2, 500.0, 500.0);

        assert!(tree.insert(a, &mut points).unwrap());
        assert!(tree.is_leaf(tree.root()));
        assert_eq!(tree.leaf_points(tree.root()), &[a]);

        assert!(tree.insert(b, &mut points).unwrap());
        assert!(!tree.is_leaf(tree.root()));
        assert!(tree.leaf_points(tree.root()).is_empty());

        let [nw, _, _, se] = tree.children(tree.root()).unwrap();
        assert_eq!(tree.bounds(nw).unwrap().half_extent(), Vec2::splat(128.0));
        assert_eq!(tree.leaf_points(nw), &[a]);
        assert_eq!(tree.leaf_points(se), &[b]);
        assert_eq!(tree.leaf_bounds().count(), 4);
        check_invariants(&tree, &points);
    }

    #[test]
    fn test_collapse() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        let b = make_point(&mut points, 2, 500.0, 500.0);
        tree.insert(a, &mut points).unwrap();
        tree.insert(b, &mut points).unwrap();

        assert!(tree.remove_at(Vec2::new(500.0, 500.0), &mut points));
        assert!(points.get(&b).is_none());

        // All four children were leaves with one point left between them,
        // so the root collapsed back into a leaf holding it.
        assert!(tree.is_leaf(tree.root()));
        assert_eq!(tree.leaf_points(tree.root()), &[a]);
        assert_eq!(points.get(&a).unwrap().node, Some(tree.root()));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_idempotent() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        tree.insert(a, &mut points).unwrap();

        assert!(tree.remove_at(Vec2::new(10.0, 10.0), &mut points));
        assert!(!tree.remove_at(Vec2::new(10.0, 10.0), &mut points));
    }

    #[test]
    fn test_query_round_trip() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        let b = make_point(&mut points, 2, 500.0, 500.0);
        tree.insert(a, &mut points).unwrap();
        tree.insert(b, &mut points).unwrap();

        // A zero-size box at the point's own position finds its leaf.
        let probe = BoundingBox::anchored(Vec2::new(10.0, 10.0));
        let leaves = tree.query(&probe);
        assert!(leaves.iter().any(|&leaf| tree.leaf_points(leaf).contains(&a)));
    }

    #[test]
    fn test_query_empty_region() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        let b = make_point(&mut points, 2, 500.0, 500.0);
        tree.insert(a, &mut points).unwrap();
        tree.insert(b, &mut points).unwrap();

        // NE quadrant holds nothing.
        let probe = BoundingBox::new(Vec2::new(384.0, 128.0), Vec2::splat(100.0));
        assert!(tree.query(&probe).is_empty());
    }

    #[test]
    fn test_relocate() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 10.0, 10.0);
        let b = make_point(&mut points, 2, 500.0, 500.0);
        tree.insert(a, &mut points).unwrap();
        tree.insert(b, &mut points).unwrap();

        // Still inside its leaf: no-op.
        points.get_mut(&a).unwrap().position = Vec2::new(20.0, 20.0);
        assert!(!tree.relocate(a, &mut points).unwrap());

        // Out of the NW quadrant: released, reinserted from the root.
        points.get_mut(&a).unwrap().position = Vec2::new(300.0, 10.0);
        assert!(tree.relocate(a, &mut points).unwrap());
        let leaf = points.get(&a).unwrap().node.unwrap();
        assert!(tree.bounds(leaf).unwrap().contains(Vec2::new(300.0, 10.0)));
        assert!(tree.leaf_points(leaf).contains(&a));
        check_invariants(&tree, &points);
    }

    #[test]
    fn test_minimum_cell_accumulates() {
        // Half-extent equals the minimum cell size: depth 0, no splitting.
        let mut tree = QuadTree::new(
            BoundingBox::new(Vec2::splat(16.0), Vec2::splat(16.0)),
            16.0,
        );
        let mut points = PointMap::new();
        for i in 0..3 {
            let pid = make_point(&mut points, i + 1, 4.0 + i as f32, 4.0);
            assert!(tree.insert(pid, &mut points).unwrap());
        }
        assert!(tree.is_leaf(tree.root()));
        assert_eq!(tree.leaf_points(tree.root()).len(), 3);
    }

    #[test]
    fn test_insert_outside_bounds() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let a = make_point(&mut points, 1, 600.0, 600.0);
        assert!(!tree.insert(a, &mut points).unwrap());
        assert!(points.get(&a).unwrap().node.is_none());
    }

    #[test]
    fn test_churn_keeps_invariants() {
        let mut tree = make_tree();
        let mut points = PointMap::new();
        let coords: Vec<Vec2> = (0..64)
            .map(|i| Vec2::new((i * 37 % 512) as f32, (i * 73 % 512) as f32))
            .collect();
        for (i, &coord) in coords.iter().enumerate() {
            let pid = make_point(&mut points, i as u32 + 1, coord.x, coord.y);
            tree.insert(pid, &mut points).unwrap();
        }
        check_invariants(&tree, &points);

        for &coord in coords.iter().step_by(2) {
            assert!(tree.remove_at(coord, &mut points));
        }
        check_invariants(&tree, &points);
    }
}
