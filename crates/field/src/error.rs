//! Library error types.

use glam::Vec2;
use thiserror::Error;

use crate::spatial::NodeId;

/// Errors raised by the spatial index.
///
/// Ordinary failures (coordinate outside the field, point not found) are
/// reported through boolean results. An error here means a structural
/// invariant was broken and the tree can no longer be trusted.
#[derive(Debug, Clone, Copy, Error)]
pub enum QuadError {
    /// A position contained by a node was refused by all four of its child
    /// quadrants. The children no longer tile their parent's bounds.
    #[error("position {position} refused by all four quadrants of node {node:?}")]
    QuadrantsRejected { node: NodeId, position: Vec2 },
}
