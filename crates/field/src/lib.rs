//! Quadfield core library.
//!
//! A bounded 2D play field of moving points, indexed by an adaptive region
//! quadtree that subdivides on demand and collapses empty structure as
//! points leave. Presentation (windowing, rendering, input decoding) is the
//! caller's business: this crate only exposes the index, the point registry,
//! and a motion integrator.

pub mod config;
pub mod error;
pub mod point;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use error::QuadError;
pub use point::{Color, Point, PointId};
pub use spatial::{BoundingBox, NodeId, QuadTree};
pub use world::{FieldBorder, World};
