//! Geometry primitives in real-world millimeters.
//!
//! - [`PointF`] / [`Point3F`] - 2D and 3D points
//! - [`Line`] - straight segment with closest-point and side queries
//! - [`BoundingBoxF`] - 2D axis-aligned box
//! - [`LineIndex`] - AABB tree over lines for nearest / signed distance queries
//! - [`ConvexPolygon`] - footprint hull, [`Polygon`] - island outline

pub mod aabb_tree;
mod bounding_box;
mod line;
mod point;
mod polygon;

pub use aabb_tree::{AsLine, LineIndex, SignedDistance};
pub use bounding_box::BoundingBoxF;
pub use line::Line;
pub use point::{PointF, Point3F};
pub use polygon::{ConvexPolygon, Polygon};
