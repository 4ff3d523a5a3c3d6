//! Play-field state management.
//!
//! Owns every live point plus the quadtree indexing them. All enumeration
//! (all points, all tree cells) goes through this context object; nothing
//! here is a process-wide singleton.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use tracing::debug;

use crate::config::Config;
use crate::error::QuadError;
use crate::point::{Color, Point, PointId, PointMap};
use crate::spatial::{BoundingBox, NodeId, QuadTree};

/// Play-field border bounds, origin at the top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct FieldBorder {
    pub width: f32,
    pub height: f32,
    pub extent: Vec2,
}

impl FieldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            extent: Vec2::new(width, height),
        }
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position(&self) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(0.0..self.width),
            rng.random_range(0.0..self.height),
        )
    }

    /// Quadtree bounds covering the whole field.
    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.extent / 2.0, self.extent / 2.0)
    }

    /// Wrap a position back into the field. Edges are toroidal: a point
    /// leaving one side re-enters from the opposite one.
    #[inline]
    pub fn wrap(&self, position: Vec2) -> Vec2 {
        position.rem_euclid(self.extent)
    }
}

/// The play field: all live points plus the spatial index over them.
#[derive(Debug)]
pub struct World {
    /// Next point ID to assign.
    next_point_id: u32,

    /// All live points by ID.
    points: PointMap,

    /// Field border.
    pub border: FieldBorder,

    /// QuadTree for spatial queries.
    pub tree: QuadTree,

    point_speed: f32,
    point_radius: f32,
}

impl World {
    /// Create a new world from configuration.
    pub fn new(config: &Config) -> Self {
        let border = FieldBorder::new(config.field.width, config.field.height);
        Self {
            next_point_id: 1,
            points: PointMap::with_capacity(1024),
            tree: QuadTree::new(border.bounds(), config.grid.min_cell_size),
            border,
            point_speed: config.point.speed,
            point_radius: config.point.radius,
        }
    }

    /// Get the next point ID.
    fn next_id(&mut self) -> PointId {
        let id = self.next_point_id;
        self.next_point_id = self.next_point_id.wrapping_add(1);
        if self.next_point_id == 0 {
            self.next_point_id = 1; // Skip 0
        }
        PointId(id)
    }

    /// Generate a random color.
    #[inline]
    pub fn random_color() -> Color {
        let mut rng = rand::rng();
        Color::new(
            rng.random_range(50..=255),
            rng.random_range(50..=255),
            rng.random_range(50..=255),
        )
    }

    /// Spawn a point at `coord` with the configured speed in a uniformly
    /// random direction. Returns `Ok(None)` when `coord` falls outside the
    /// field.
    pub fn spawn_at(&mut self, coord: Vec2) -> Result<Option<PointId>, QuadError> {
        let mut rng = rand::rng();
        let angle = rng.random_range(0.0..TAU);
        let velocity = Vec2::from_angle(angle) * self.point_speed;

        let id = self.next_id();
        self.points.insert(
            id,
            Point::new(coord, velocity, Self::random_color(), self.point_radius),
        );
        if self.tree.insert(id, &mut self.points)? {
            Ok(Some(id))
        } else {
            debug!("Rejected spawn outside the field at {}", coord);
            self.points.remove(&id);
            Ok(None)
        }
    }

    /// Seed the field with `count` uniformly random points.
    pub fn spawn_random(&mut self, count: usize) -> Result<(), QuadError> {
        for _ in 0..count {
            let coord = self.border.random_position();
            self.spawn_at(coord)?;
        }
        Ok(())
    }

    /// Remove and destroy the point sitting exactly at `coord`.
    pub fn remove_at(&mut self, coord: Vec2) -> bool {
        self.tree.remove_at(coord, &mut self.points)
    }

    /// Remove every point whose position lies inside `area`.
    /// Returns how many were removed.
    pub fn remove_within(&mut self, area: &BoundingBox) -> usize {
        let mut doomed = Vec::new();
        for leaf in self.tree.query(area) {
            for pid in self.tree.leaf_points(leaf) {
                if let Some(point) = self.points.get(pid) {
                    if area.contains(point.position) {
                        doomed.push(point.position);
                    }
                }
            }
        }
        let mut removed = 0;
        for coord in doomed {
            if self.tree.remove_at(coord, &mut self.points) {
                removed += 1;
            }
        }
        removed
    }

    /// Advance every point by `dt` seconds, wrapping at the field edges,
    /// then re-home any point that left its leaf. Every out-of-leaf move
    /// costs a full root reinsertion.
    pub fn step(&mut self, dt: f32) -> Result<(), QuadError> {
        let ids: Vec<PointId> = self.points.keys().copied().collect();
        for id in ids {
            if let Some(point) = self.points.get_mut(&id) {
                point.position += point.velocity * dt;
                point.position = self.border.wrap(point.position);
            }
            self.tree.relocate(id, &mut self.points)?;
        }
        Ok(())
    }

    /// Occupied leaves intersecting `area`. Leaf bounds may extend past
    /// `area`; use [`World::points_within`] for exact matches.
    #[inline]
    pub fn query(&self, area: &BoundingBox) -> Vec<NodeId> {
        self.tree.query(area)
    }

    /// Ids of points whose exact position lies inside `area`.
    pub fn points_within(&self, area: &BoundingBox) -> Vec<PointId> {
        let mut out = Vec::new();
        for leaf in self.tree.query(area) {
            for pid in self.tree.leaf_points(leaf) {
                if self
                    .points
                    .get(pid)
                    .is_some_and(|point| area.contains(point.position))
                {
                    out.push(*pid);
                }
            }
        }
        out
    }

    /// Get a point by ID.
    #[inline]
    pub fn get_point(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    /// Get a mutable point by ID. Position changes must be followed by a
    /// relocate before the next query.
    #[inline]
    pub fn get_point_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.get_mut(&id)
    }

    /// Iterate over all live points.
    #[inline]
    pub fn iter_points(&self) -> impl Iterator<Item = (&PointId, &Point)> {
        self.points.iter()
    }

    /// Number of live points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the field is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop every point and reset the tree to a single empty root.
    pub fn clear(&mut self) {
        self.points.clear();
        self.tree.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> Config {
        let mut config = Config::default();
        config.field.width = 512.0;
        config.field.height = 512.0;
        config
    }

    #[test]
    fn test_wrap_is_toroidal() {
        let border = FieldBorder::new(512.0, 512.0);
        assert_eq!(border.wrap(Vec2::new(522.0, -10.0)), Vec2::new(10.0, 502.0));
        assert_eq!(border.wrap(Vec2::new(100.0, 200.0)), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_spawn_outside_field() {
        let mut world = World::new(&make_config());
        assert!(world.spawn_at(Vec2::new(-5.0, 5.0)).unwrap().is_none());
        assert!(world.is_empty());
    }

    #[test]
    fn test_step_relocates_across_edge() {
        let mut world = World::new(&make_config());
        let id = world.spawn_at(Vec2::new(500.0, 10.0)).unwrap().unwrap();
        world.spawn_at(Vec2::new(10.0, 500.0)).unwrap().unwrap();

        world.get_point_mut(id).unwrap().velocity = Vec2::new(100.0, 0.0);
        world.step(0.5).unwrap();

        // 500 + 50 wraps to 38; the point must have been re-homed.
        let point = world.get_point(id).unwrap();
        assert_eq!(point.position.x, 38.0);
        let leaf = point.node.unwrap();
        assert!(world
            .tree
            .bounds(leaf)
            .unwrap()
            .contains(world.get_point(id).unwrap().position));

        // Wrapping keeps every point inside the field.
        let bounds = world.border.bounds();
        assert!(world.iter_points().all(|(_, p)| bounds.contains(p.position)));
    }

    #[test]
    fn test_remove_within() {
        let mut world = World::new(&make_config());
        for coord in [
            Vec2::new(10.0, 10.0),
            Vec2::new(40.0, 40.0),
            Vec2::new(500.0, 500.0),
        ] {
            world.spawn_at(coord).unwrap().unwrap();
        }

        let area = BoundingBox::new(Vec2::splat(32.0), Vec2::splat(32.0));
        assert_eq!(world.remove_within(&area), 2);
        assert_eq!(world.len(), 1);
        assert_eq!(world.remove_within(&area), 0);

        world.clear();
        assert!(world.is_empty());
        assert_eq!(world.tree.node_count(), 1);
    }

    #[test]
    fn test_points_within_filters_exactly() {
        let mut world = World::new(&make_config());
        // Close enough to end up in the same minimal leaf.
        let inside = world.spawn_at(Vec2::new(20.0, 20.0)).unwrap().unwrap();
        let outside = world.spawn_at(Vec2::new(30.0, 30.0)).unwrap().unwrap();

        // The probe intersects the shared leaf but only contains `inside`,
        // so the exact position test must drop the other point.
        let area = BoundingBox::new(Vec2::splat(12.5), Vec2::splat(12.5));
        let hits = world.points_within(&area);
        assert!(hits.contains(&inside));
        assert!(!hits.contains(&outside));
    }
}
