//! Tracked points.

use std::collections::HashMap;

use glam::Vec2;

use crate::spatial::NodeId;

/// RGB color used for points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Stable point identifier, assigned by the world. Never 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

/// All live points, keyed by id. Owned by the world; the tree only stores
/// ids and reaches into this map to read positions and update back-links.
pub type PointMap = HashMap<PointId, Point>;

/// A tracked point in the play field.
#[derive(Debug, Clone)]
pub struct Point {
    /// Position in field coordinates.
    pub position: Vec2,
    /// Velocity in field units per second.
    pub velocity: Vec2,
    /// Point color.
    pub color: Color,
    /// Display radius. The index treats points as dimensionless.
    pub radius: f32,
    /// Leaf currently holding this point, if any. Updated on every insert,
    /// release, and collapse; never implies ownership.
    pub node: Option<NodeId>,
}

impl Point {
    /// Create a new, not yet indexed point.
    pub fn new(position: Vec2, velocity: Vec2, color: Color, radius: f32) -> Self {
        Self {
            position,
            velocity,
            color,
            radius,
            node: None,
        }
    }
}
