//! Spatial indexing.
//!
//! An adaptive region quadtree plus the bounding-box type it is built on.

mod bounds;
mod quadtree;

pub use bounds::BoundingBox;
pub use quadtree::{NodeId, QuadTree};
