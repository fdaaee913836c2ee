//! Axis-aligned bounding box

use super::Vector2;
use std::fmt;

/// 2D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox2D {
    /// Minimum point (lower-left corner)
    pub min: Vector2,
    /// Maximum point (upper-right corner)
    pub max: Vector2,
}

impl BoundingBox2D {
    /// Create a new bounding box from min and max points
    pub fn new(min: Vector2, max: Vector2) -> Self {
        BoundingBox2D { min, max }
    }

    /// Create a bounding box from a single point
    pub fn from_point(point: Vector2) -> Self {
        BoundingBox2D {
            min: point,
            max: point,
        }
    }

    /// Create a bounding box that contains all given points
    pub fn from_points(points: &[Vector2]) -> Option<Self> {
        let first = *points.first()?;
        let mut bbox = BoundingBox2D::from_point(first);
        for point in points.iter().skip(1) {
            bbox.expand_to_include(*point);
        }
        Some(bbox)
    }

    /// Get the width of the bounding box
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Get the height of the bounding box
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Get the center point of the bounding box
    pub fn center(&self) -> Vector2 {
        Vector2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Check if this bounding box contains a point
    pub fn contains(&self, point: Vector2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check if `other` lies strictly inside this box (no shared edges)
    pub fn strictly_contains(&self, other: &BoundingBox2D) -> bool {
        other.min.x > self.min.x
            && other.min.y > self.min.y
            && other.max.x < self.max.x
            && other.max.y < self.max.y
    }

    /// Expand the bounding box to include another point
    pub fn expand_to_include(&mut self, point: Vector2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Expand the bounding box to include another box
    pub fn union(&mut self, other: &BoundingBox2D) {
        self.expand_to_include(other.min);
        self.expand_to_include(other.max);
    }

    /// Grow the box by `margin` on every side
    pub fn grown(&self, margin: f64) -> BoundingBox2D {
        BoundingBox2D {
            min: Vector2::new(self.min.x - margin, self.min.y - margin),
            max: Vector2::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

impl fmt::Display for BoundingBox2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}
