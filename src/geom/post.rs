//! Polyline post-processing: coarsening, overlap, bounding boxes, and the
//! partial sort that orders figures for cutting.

use crate::error::{CamError, Result};
use crate::types::{BoundingBox2D, Polyline, Vector2};
use std::cmp::Ordering;

/// Drop interior points closer than `threshold` to the previously
/// retained point.  Endpoints are always retained.
pub fn coarsen(polylines: &mut [Polyline], threshold: f64) {
    if threshold <= 0.0 {
        return;
    }
    let limit = threshold * threshold;
    for polyline in polylines {
        if polyline.len() < 3 {
            continue;
        }
        let last = polyline.points[polyline.len() - 1];
        let mut kept = vec![polyline.points[0]];
        for &point in &polyline.points[1..polyline.len() - 1] {
            let retained = kept.last().expect("kept starts non-empty");
            if retained.distance_squared(&point) >= limit {
                kept.push(point);
            }
        }
        kept.push(last);
        polyline.points = kept;
    }
}

/// Reopen each closed polyline and append a prefix of its own path so the
/// cut overlaps itself by at least `overlap`.  A vertex within 2×overlap
/// ends the tail; otherwise the final segment is cut parametrically at
/// exactly `overlap`.
pub fn add_overlap(polylines: &mut [Polyline], overlap: f64) {
    if overlap <= 0.0 {
        return;
    }
    for polyline in polylines {
        if !polyline.closed || polyline.len() < 3 {
            continue;
        }
        let original = polyline.points.clone();
        let mut tail: Vec<Vector2> = Vec::new();
        let mut travelled = 0.0;
        for pair in original.windows(2) {
            let length = pair[0].distance(&pair[1]);
            if travelled + length >= overlap {
                if travelled + length <= 2.0 * overlap {
                    tail.push(pair[1]);
                } else {
                    let t = (overlap - travelled) / length;
                    tail.push(pair[0] + (pair[1] - pair[0]) * t);
                }
                break;
            }
            travelled += length;
            tail.push(pair[1]);
        }
        polyline.points.extend(tail);
        polyline.closed = false;
    }
}

/// Bounding boxes for a polyline list; degenerate (empty) polylines must
/// have been excluded earlier.
pub fn bounding_boxes(polylines: &[Polyline]) -> Vec<BoundingBox2D> {
    polylines
        .iter()
        .map(|p| {
            p.bounding_box()
                .unwrap_or_else(|| BoundingBox2D::from_point(Vector2::ZERO))
        })
        .collect()
}

/// A closed rectangle around the union of `boxes`, grown by `margin`.
pub fn frame_polyline(boxes: &[BoundingBox2D], margin: f64) -> Option<Polyline> {
    let mut union = *boxes.first()?;
    for bbox in &boxes[1..] {
        union.union(bbox);
    }
    let frame = union.grown(margin);
    Some(Polyline::closed(vec![
        frame.min,
        Vector2::new(frame.max.x, frame.min.y),
        frame.max,
        Vector2::new(frame.min.x, frame.max.y),
        frame.min,
    ]))
}

/// One sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriterion {
    /// Sort by a bounding box edge, ascending or descending.
    Edge { edge: Edge, ascending: bool },
    /// The strict bbox-containment partial order: inner figures first.
    Containment,
}

/// A bounding box edge used as a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Bottom,
    Right,
    Top,
}

impl Edge {
    fn value(&self, bbox: &BoundingBox2D) -> f64 {
        match self {
            Edge::Left => bbox.min.x,
            Edge::Bottom => bbox.min.y,
            Edge::Right => bbox.max.x,
            Edge::Top => bbox.max.y,
        }
    }
}

/// Parse a comma-separated criteria list:
/// `{left,bottom,right,top}[-asc|-desc]` or `box`.
pub fn parse_sort_criteria(input: &str) -> Result<Vec<SortCriterion>> {
    let mut criteria = Vec::new();
    for raw in input.split(',') {
        let item = raw.trim();
        if item.is_empty() {
            continue;
        }
        if item == "box" {
            criteria.push(SortCriterion::Containment);
            continue;
        }
        let (name, ascending) = match item.strip_suffix("-desc") {
            Some(name) => (name, false),
            None => (item.strip_suffix("-asc").unwrap_or(item), true),
        };
        let edge = match name {
            "left" => Edge::Left,
            "bottom" => Edge::Bottom,
            "right" => Edge::Right,
            "top" => Edge::Top,
            _ => {
                return Err(CamError::InvalidArgument(format!(
                    "unknown sort criterion '{}'",
                    item
                )))
            }
        };
        criteria.push(SortCriterion::Edge { edge, ascending });
    }
    if criteria.is_empty() {
        return Err(CamError::InvalidArgument(format!(
            "empty sort criteria '{}'",
            input
        )));
    }
    Ok(criteria)
}

/// Sort configuration.
#[derive(Debug, Clone)]
pub struct SortConfig {
    pub criteria: Vec<SortCriterion>,
    /// Quantisation step for the edge criteria; near-equal coordinates tie
    /// so that criteria applied earlier keep their relative order.
    pub crudeness: f64,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            criteria: Vec::new(),
            crudeness: 1.0,
        }
    }
}

fn containment_cmp(a: &BoundingBox2D, b: &BoundingBox2D) -> Ordering {
    if b.strictly_contains(a) {
        Ordering::Less
    } else if a.strictly_contains(b) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Sort polylines by the configured criteria.  Criteria are applied
/// right to left with stable passes, so the leftmost dominates; the `box`
/// partial order uses a stable insertion sort.
pub fn sort_polylines(
    items: &mut Vec<(Polyline, BoundingBox2D)>,
    config: &SortConfig,
) {
    for criterion in config.criteria.iter().rev() {
        match criterion {
            SortCriterion::Edge { edge, ascending } => {
                let step = config.crudeness;
                items.sort_by(|a, b| {
                    let (va, vb) = (edge.value(&a.1), edge.value(&b.1));
                    let ordering = if step > 0.0 {
                        let (qa, qb) = ((va / step).round() as i64, (vb / step).round() as i64);
                        qa.cmp(&qb)
                    } else {
                        va.total_cmp(&vb)
                    };
                    if *ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                });
            }
            SortCriterion::Containment => {
                // Stable insertion against the partial order: each item
                // moves in front of the first element that contains it,
                // leaving incomparable pairs in their prior order.
                for i in 1..items.len() {
                    let insert_at = (0..i).find(|&j| {
                        containment_cmp(&items[i].1, &items[j].1) == Ordering::Less
                    });
                    if let Some(at) = insert_at {
                        let item = items.remove(i);
                        items.insert(at, item);
                    }
                }
            }
        }
    }
}
