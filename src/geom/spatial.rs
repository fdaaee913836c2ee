//! Epsilon-bucketed 2D spatial index over polyline endpoints
//!
//! Cell size equals the matching epsilon.  Every element is inserted under
//! all 2^2 neighbouring cell keys (the floor coordinate with `{0,1}` added
//! per dimension), so a query only ever inspects its own four buckets and
//! still sees every candidate within epsilon.

use crate::types::Vector2;
use std::collections::HashMap;

/// Which endpoint of an element a map tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

type CellKey = (i64, i64);

/// Spatial map from endpoints to element ids.
pub struct EndpointIndex {
    cell: f64,
    by_start: HashMap<CellKey, Vec<usize>>,
    by_end: HashMap<CellKey, Vec<usize>>,
    points: HashMap<usize, (Vector2, Vector2)>,
}

impl EndpointIndex {
    /// Create an index matching within `epsilon`.
    pub fn new(epsilon: f64) -> Self {
        EndpointIndex {
            cell: epsilon.max(1e-12),
            by_start: HashMap::new(),
            by_end: HashMap::new(),
            points: HashMap::new(),
        }
    }

    fn keys(&self, p: Vector2) -> [CellKey; 4] {
        let cx = (p.x / self.cell).floor() as i64;
        let cy = (p.y / self.cell).floor() as i64;
        [(cx, cy), (cx + 1, cy), (cx, cy + 1), (cx + 1, cy + 1)]
    }

    /// Insert an element under both of its endpoints.
    pub fn insert(&mut self, id: usize, start: Vector2, end: Vector2) {
        for key in self.keys(start) {
            self.by_start.entry(key).or_default().push(id);
        }
        for key in self.keys(end) {
            self.by_end.entry(key).or_default().push(id);
        }
        self.points.insert(id, (start, end));
    }

    /// Remove an element from all buckets of both maps.
    pub fn remove(&mut self, id: usize) {
        let Some((start, end)) = self.points.remove(&id) else {
            return;
        };
        for key in self.keys(start) {
            if let Some(bucket) = self.by_start.get_mut(&key) {
                bucket.retain(|&other| other != id);
            }
        }
        for key in self.keys(end) {
            if let Some(bucket) = self.by_end.get_mut(&key) {
                bucket.retain(|&other| other != id);
            }
        }
    }

    /// The closest element whose `domain` endpoint lies within `max_dist`
    /// of `at`, excluding `exclude`.  Ties break towards the lowest id, so
    /// results are deterministic given insertion order.
    pub fn query(
        &self,
        domain: Endpoint,
        at: Vector2,
        max_dist: f64,
        exclude: Option<usize>,
    ) -> Option<usize> {
        let map = match domain {
            Endpoint::Start => &self.by_start,
            Endpoint::End => &self.by_end,
        };

        let mut candidates: Vec<usize> = Vec::new();
        for key in self.keys(at) {
            if let Some(bucket) = map.get(&key) {
                candidates.extend(bucket.iter().copied());
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let limit = max_dist * max_dist;
        let mut best: Option<(usize, f64)> = None;
        for id in candidates {
            if exclude == Some(id) {
                continue;
            }
            let (start, end) = self.points[&id];
            let point = match domain {
                Endpoint::Start => start,
                Endpoint::End => end,
            };
            let dist = at.distance_squared(&point);
            if dist <= limit && best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Stored endpoints of an element.
    pub fn endpoints(&self, id: usize) -> Option<(Vector2, Vector2)> {
        self.points.get(&id).copied()
    }

    /// Number of indexed elements.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no elements are indexed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_query() {
        let mut index = EndpointIndex::new(0.01);
        index.insert(0, Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0));
        index.insert(1, Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0));

        let hit = index.query(Endpoint::Start, Vector2::new(1.0, 0.0), 0.0, Some(0));
        assert_eq!(hit, Some(1));
        // Exact query misses a nearby-but-unequal point.
        let miss = index.query(Endpoint::Start, Vector2::new(1.0001, 0.0), 0.0, None);
        assert_eq!(miss, None);
    }

    #[test]
    fn test_fuzzy_query_across_cell_boundary() {
        let eps = 0.5;
        let mut index = EndpointIndex::new(eps);
        // Just below a cell boundary; a query just above must still hit.
        index.insert(7, Vector2::new(0.999, 0.999), Vector2::new(5.0, 5.0));
        let hit = index.query(Endpoint::Start, Vector2::new(1.001, 1.001), eps, None);
        assert_eq!(hit, Some(7));
    }

    #[test]
    fn test_within_epsilon_always_found() {
        let eps = 0.25;
        let mut index = EndpointIndex::new(eps);
        let mut id = 0;
        for gx in -4..=4 {
            for gy in -4..=4 {
                let p = Vector2::new(gx as f64 * 0.2, gy as f64 * 0.2);
                index.insert(id, p, p);
                id += 1;
            }
        }
        // Probe points offset by just under epsilon from a stored point.
        for gx in -4..=4 {
            for gy in -4..=4 {
                let p = Vector2::new(gx as f64 * 0.2 + 0.24, gy as f64 * 0.2);
                assert!(
                    index.query(Endpoint::Start, p, eps, None).is_some(),
                    "no hit near {p}"
                );
            }
        }
    }

    #[test]
    fn test_closest_wins_and_ties_are_deterministic() {
        let mut index = EndpointIndex::new(1.0);
        index.insert(0, Vector2::new(0.3, 0.0), Vector2::ZERO);
        index.insert(1, Vector2::new(0.1, 0.0), Vector2::ZERO);
        index.insert(2, Vector2::new(-0.1, 0.0), Vector2::ZERO);
        // 1 and 2 are equally close; the lower id wins.
        assert_eq!(index.query(Endpoint::Start, Vector2::ZERO, 1.0, None), Some(1));
    }

    #[test]
    fn test_remove() {
        let mut index = EndpointIndex::new(0.1);
        index.insert(0, Vector2::ZERO, Vector2::new(1.0, 1.0));
        assert_eq!(index.len(), 1);
        index.remove(0);
        assert!(index.is_empty());
        assert_eq!(index.query(Endpoint::Start, Vector2::ZERO, 0.1, None), None);
        assert_eq!(index.query(Endpoint::End, Vector2::new(1.0, 1.0), 0.1, None), None);
    }
}
