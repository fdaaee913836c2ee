//! Fuzzy polyline stitching and cycle embedding
//!
//! Joins polylines whose endpoints coincide (exactly, then within
//! epsilon) into longer paths, migrates paths whose two ends meet into
//! the cycle list, and optionally embeds cycles that share a point into
//! their host path so the cutter never lifts between them.
//!
//! Joining assumes points are not referentially shared between input
//! polylines; every splice copies points.

use crate::geom::spatial::{Endpoint, EndpointIndex};
use crate::types::{Polyline, Vector2};

/// Stitching parameters.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Endpoint matching distance.
    pub epsilon: f64,
    /// Embed cycles sharing a point into their host path.
    pub join_cycles: bool,
    /// Allow reversing one element to join end-to-end or start-to-start.
    pub reverse_allowed: bool,
}

impl Default for StitchConfig {
    fn default() -> Self {
        StitchConfig {
            epsilon: 1e-3,
            join_cycles: false,
            reverse_allowed: false,
        }
    }
}

/// Stitch a polyline list.  Deterministic given the input order.
pub fn stitch(polylines: Vec<Polyline>, config: &StitchConfig) -> Vec<Polyline> {
    let eps = config.epsilon.max(0.0);

    // Partition into cycles and open paths.  The closed flag always forces
    // the closing duplicate point first.
    let mut cycles: Vec<Option<Polyline>> = Vec::new();
    let mut open: Vec<Option<Polyline>> = Vec::new();
    for mut polyline in polylines {
        polyline.ensure_closing_point();
        if is_cycle(&polyline, eps) {
            snap_closed(&mut polyline);
            cycles.push(Some(polyline));
        } else {
            polyline.closed = false;
            open.push(Some(polyline));
        }
    }

    // Pass A/B exact, pass C/D fuzzy; each runs to fixpoint before the
    // next starts.
    join_pass(&mut open, 0.0, false, eps);
    if config.reverse_allowed {
        join_pass(&mut open, 0.0, true, eps);
    }
    join_pass(&mut open, eps, false, eps);
    if config.reverse_allowed {
        join_pass(&mut open, eps, true, eps);
    }

    // Joined paths whose ends now meet become cycles.
    for slot in &mut open {
        let migrate = matches!(slot, Some(polyline) if is_cycle(polyline, eps));
        if migrate {
            let mut cycle = slot.take().expect("slot just matched");
            snap_closed(&mut cycle);
            cycles.push(Some(cycle));
        }
    }

    if config.join_cycles {
        embed_cycles(&mut cycles, eps);
        embed_cycles_into_open(&mut cycles, &mut open, eps);
    }

    let mut result: Vec<Polyline> = cycles.into_iter().flatten().collect();
    result.extend(open.into_iter().flatten());
    result
}

fn is_cycle(polyline: &Polyline, eps: f64) -> bool {
    match (polyline.start(), polyline.end()) {
        (Some(start), Some(end)) => {
            polyline.len() > 2 && start.distance_squared(&end) <= eps * eps
        }
        _ => false,
    }
}

fn snap_closed(polyline: &mut Polyline) {
    polyline.closed = true;
    if let Some(first) = polyline.start() {
        if let Some(last) = polyline.points.last_mut() {
            *last = first;
        }
    }
}

/// One joining pass at a fixed match distance, run to fixpoint.
fn join_pass(open: &mut Vec<Option<Polyline>>, max_dist: f64, reverse: bool, eps: f64) {
    let mut index = EndpointIndex::new(eps.max(max_dist));
    for (id, slot) in open.iter().enumerate() {
        if let Some(polyline) = slot {
            if let (Some(start), Some(end)) = (polyline.start(), polyline.end()) {
                index.insert(id, start, end);
            }
        }
    }

    loop {
        let mut joined_any = false;
        for id in 0..open.len() {
            while try_join(open, &mut index, id, max_dist, reverse) {
                joined_any = true;
            }
        }
        if !joined_any {
            break;
        }
    }
}

/// Attempt one join onto element `id`; returns whether a join happened.
fn try_join(
    open: &mut [Option<Polyline>],
    index: &mut EndpointIndex,
    id: usize,
    max_dist: f64,
    reverse: bool,
) -> bool {
    let Some((start, end)) = index.endpoints(id) else {
        return false;
    };

    // Forward: their start continues my end, or their end leads into my
    // start.
    if let Some(other) = index.query(Endpoint::Start, end, max_dist, Some(id)) {
        merge(open, index, id, other, false, false);
        return true;
    }
    if let Some(other) = index.query(Endpoint::End, start, max_dist, Some(id)) {
        merge(open, index, id, other, true, false);
        return true;
    }
    if reverse {
        if let Some(other) = index.query(Endpoint::End, end, max_dist, Some(id)) {
            merge(open, index, id, other, false, true);
            return true;
        }
        if let Some(other) = index.query(Endpoint::Start, start, max_dist, Some(id)) {
            merge(open, index, id, other, true, true);
            return true;
        }
    }
    false
}

/// Concatenate `other` onto `id` (prepending when `before`), reversing
/// `other` first when `reversed`.  The shared point is dropped only when
/// the touching endpoints are exactly equal.
fn merge(
    open: &mut [Option<Polyline>],
    index: &mut EndpointIndex,
    id: usize,
    other: usize,
    before: bool,
    reversed: bool,
) {
    let mut absorbed = open[other].take().expect("indexed element missing");
    index.remove(other);
    index.remove(id);

    if reversed {
        absorbed.reverse();
    }

    let host = open[id].as_mut().expect("indexed element missing");
    if before {
        let mut points = absorbed.points;
        if points.last() == host.points.first() {
            points.pop();
        }
        points.extend(host.points.drain(..));
        host.points = points;
    } else {
        let mut iter = absorbed.points.into_iter();
        if host.points.last() == iter.as_slice().first() {
            iter.next();
        }
        host.points.extend(iter);
    }

    if let (Some(start), Some(end)) = (host.start(), host.end()) {
        index.insert(id, start, end);
    }
}

/// Quantised point signature for cycle embedding.
fn signature(p: Vector2, quantum: f64) -> (i64, i64) {
    ((p.x / quantum).round() as i64, (p.y / quantum).round() as i64)
}

/// Internal points of a cycle (the closing duplicate excluded).
fn internal_points(polyline: &Polyline) -> &[Vector2] {
    let n = polyline.points.len();
    &polyline.points[..n.saturating_sub(1)]
}

/// Splice cycle `guest` into a point list at `at`, rotated so the shared
/// point leads.  The guest's closing walk returns to the shared point, so
/// the host continues where it left off.
fn splice_points(host: &mut Vec<Vector2>, at: usize, guest: &Polyline, guest_at: usize) {
    let inner = internal_points(guest);
    let mut detour: Vec<Vector2> = Vec::with_capacity(inner.len() + 1);
    detour.extend_from_slice(&inner[guest_at..]);
    detour.extend_from_slice(&inner[..guest_at]);
    detour.push(inner[guest_at]);
    if host[at] == detour[0] {
        detour.remove(0);
    }
    host.splice(at + 1..at + 1, detour);
}

/// Embed cycles sharing a point into one another.
fn embed_cycles(cycles: &mut [Option<Polyline>], eps: f64) {
    let quantum = eps.max(1e-9);
    loop {
        let mut sigs: std::collections::HashMap<(i64, i64), (usize, usize)> =
            std::collections::HashMap::new();
        for (ci, slot) in cycles.iter().enumerate() {
            if let Some(cycle) = slot {
                for (pi, point) in internal_points(cycle).iter().enumerate() {
                    sigs.entry(signature(*point, quantum)).or_insert((ci, pi));
                }
            }
        }

        let mut hit: Option<(usize, usize, usize, usize)> = None;
        'scan: for (cj, slot) in cycles.iter().enumerate() {
            if let Some(cycle) = slot {
                for (pj, point) in internal_points(cycle).iter().enumerate() {
                    if let Some(&(ci, pi)) = sigs.get(&signature(*point, quantum)) {
                        if ci != cj {
                            hit = Some((ci, pi, cj, pj));
                            break 'scan;
                        }
                    }
                }
            }
        }

        let Some((ci, pi, cj, pj)) = hit else { break };
        let guest = cycles[cj].take().expect("scan saw this cycle");
        let host = cycles[ci].as_mut().expect("signature points at live cycle");
        splice_points(&mut host.points, pi, &guest, pj);
    }
}

/// Embed surviving cycles into open paths sharing a point.
fn embed_cycles_into_open(
    cycles: &mut [Option<Polyline>],
    open: &mut [Option<Polyline>],
    eps: f64,
) {
    let quantum = eps.max(1e-9);
    for slot in open.iter_mut() {
        let Some(path) = slot else { continue };
        loop {
            let mut sigs: std::collections::HashMap<(i64, i64), (usize, usize)> =
                std::collections::HashMap::new();
            for (ci, cycle_slot) in cycles.iter().enumerate() {
                if let Some(cycle) = cycle_slot {
                    for (pi, point) in internal_points(cycle).iter().enumerate() {
                        sigs.entry(signature(*point, quantum)).or_insert((ci, pi));
                    }
                }
            }

            let hit = path.points.iter().enumerate().find_map(|(at, point)| {
                sigs.get(&signature(*point, quantum))
                    .map(|&(ci, pi)| (at, ci, pi))
            });
            let Some((at, ci, pi)) = hit else { break };
            let guest = cycles[ci].take().expect("signature points at live cycle");
            splice_points(&mut path.points, at, &guest, pi);
        }
    }
}
