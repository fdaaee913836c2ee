//! Shared geometric types

pub mod bounds;
pub mod polyline;
pub mod vector;

pub use bounds::BoundingBox2D;
pub use polyline::Polyline;
pub use vector::Vector2;
