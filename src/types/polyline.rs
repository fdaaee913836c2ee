//! Uniform polyline representation used by the post-processing stages

use super::{BoundingBox2D, Vector2};

/// A 2D polyline, open or closed.
///
/// For a closed polyline the final point either equals the first or is made
/// so by the stitching stage before any geometry that depends on it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Closed figures are cut as loops; open ones as strokes.
    pub closed: bool,
    /// Ordered vertex list.
    pub points: Vec<Vector2>,
}

impl Polyline {
    /// Create an open polyline from points
    pub fn open(points: Vec<Vector2>) -> Self {
        Polyline {
            closed: false,
            points,
        }
    }

    /// Create a closed polyline from points
    pub fn closed(points: Vec<Vector2>) -> Self {
        Polyline {
            closed: true,
            points,
        }
    }

    /// First vertex
    pub fn start(&self) -> Option<Vector2> {
        self.points.first().copied()
    }

    /// Last vertex
    pub fn end(&self) -> Option<Vector2> {
        self.points.last().copied()
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when there are no vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total path length along the segments
    pub fn path_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    /// Reverse the vertex order in place
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Translate every vertex by `delta`, then scale about the origin
    pub fn translate_scale(&mut self, delta: Vector2, scale: f64) {
        for p in &mut self.points {
            *p = (*p + delta) * scale;
        }
    }

    /// Axis-aligned bounding box, `None` for an empty polyline
    pub fn bounding_box(&self) -> Option<BoundingBox2D> {
        BoundingBox2D::from_points(&self.points)
    }

    /// Ensure a closed polyline carries its closing duplicate point.
    pub fn ensure_closing_point(&mut self) {
        if self.closed {
            if let (Some(first), Some(last)) = (self.start(), self.end()) {
                if first != last {
                    self.points.push(first);
                }
            }
        }
    }
}
