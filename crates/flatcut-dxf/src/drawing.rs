//! Outline reconstruction from loose drawing entities.
//!
//! Entities are chained end to start into closed loops. A drawing that does
//! not form a valid [`Outline2D`] still yields its sample points so the
//! rotation can be computed on their convex hull.

use crate::entity::DecodedEntity;
use flatcut_math::{Point2, Tolerance};
use flatcut_outline::{Loop, Outline2D, Segment};
use std::collections::HashMap;
use tracing::debug;

/// What a drawing's entities add up to.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingOutline {
    /// The outline, when the entities form closed, properly nested loops.
    pub outline: Option<Outline2D>,
    /// World-space samples of every supported entity.
    pub points: Vec<Point2>,
    /// Why no outline could be built.
    pub fallback_reason: Option<String>,
}

/// Build an outline from decoded entities. `arc_samples` is the number of
/// points per full turn used for curve samples.
pub fn build_outline(entities: &[DecodedEntity], tol: f64, arc_samples: usize) -> DrawingOutline {
    let segments: Vec<Segment> = entities
        .iter()
        .flat_map(|e| e.segments(arc_samples))
        .collect();
    let points: Vec<Point2> = entities
        .iter()
        .flat_map(|e| e.sample_points(arc_samples))
        .collect();

    let (loops, open) = chain_loops(segments, tol);
    let result = if open > 0 {
        Err(format!("{open} open chain(s)"))
    } else {
        Outline2D::from_loops(loops, &Tolerance::linear(tol)).map_err(|e| e.to_string())
    };

    match result {
        Ok(outline) => {
            debug!(
                loops = outline.holes.len() + 1,
                segments = outline.segment_count(),
                "drawing outline"
            );
            DrawingOutline {
                outline: Some(outline),
                points,
                fallback_reason: None,
            }
        }
        Err(reason) => {
            debug!(%reason, points = points.len(), "no outline, using convex hull");
            DrawingOutline {
                outline: None,
                points,
                fallback_reason: Some(reason),
            }
        }
    }
}

type CellKey = (i64, i64);

fn cell(p: &Point2, tol: f64) -> CellKey {
    let scale = 1.0 / tol;
    ((p.x * scale).round() as i64, (p.y * scale).round() as i64)
}

/// Endpoint index over segments: cell → (segment, is_end).
struct EndpointIndex {
    cells: HashMap<CellKey, Vec<(usize, bool)>>,
    tol: f64,
}

impl EndpointIndex {
    fn new(segments: &[Segment], tol: f64) -> Self {
        let mut cells: HashMap<CellKey, Vec<(usize, bool)>> = HashMap::new();
        for (i, s) in segments.iter().enumerate() {
            cells.entry(cell(&s.start(), tol)).or_default().push((i, false));
            cells.entry(cell(&s.end(), tol)).or_default().push((i, true));
        }
        Self { cells, tol }
    }

    /// An unused segment with an endpoint within tolerance of `p`.
    fn find(&self, p: &Point2, segments: &[Segment], used: &[bool]) -> Option<(usize, bool)> {
        let (cx, cy) = cell(p, self.tol);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &(i, is_end) in candidates {
                    if used[i] {
                        continue;
                    }
                    let q = if is_end {
                        segments[i].end()
                    } else {
                        segments[i].start()
                    };
                    if (q - p).norm() <= self.tol {
                        return Some((i, is_end));
                    }
                }
            }
        }
        None
    }
}

/// Chain segments into closed loops, reversing segments as needed.
///
/// Returns the closed loops and the number of chains that could not be
/// closed.
pub fn chain_loops(segments: Vec<Segment>, tol: f64) -> (Vec<Loop>, usize) {
    let tol = tol.max(f64::EPSILON);
    let index = EndpointIndex::new(&segments, tol);
    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    let mut open = 0;

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let mut chain = vec![segments[first]];
        let origin = segments[first].start();
        loop {
            let tip = chain[chain.len() - 1].end();
            if (tip - origin).norm() <= tol {
                break;
            }
            match index.find(&tip, &segments, &used) {
                Some((next, is_end)) => {
                    used[next] = true;
                    chain.push(if is_end {
                        segments[next].reversed()
                    } else {
                        segments[next]
                    });
                }
                None => {
                    open += 1;
                    break;
                }
            }
        }
        let closed = (chain[chain.len() - 1].end() - origin).norm() <= tol;
        if closed {
            loops.push(Loop::new(chain));
        }
    }
    (loops, open)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: f64, size: f64) -> Vec<Segment> {
        let p = |x: f64, y: f64| Point2::new(offset + x * size, offset + y * size);
        vec![
            Segment::line(p(0.0, 0.0), p(1.0, 0.0)),
            // stored backwards, as drawings often are
            Segment::line(p(1.0, 1.0), p(1.0, 0.0)),
            Segment::line(p(1.0, 1.0), p(0.0, 1.0)),
            Segment::line(p(0.0, 1.0), p(0.0, 0.0)),
        ]
    }

    #[test]
    fn test_chains_shuffled_segments() {
        let mut segments = square(0.0, 10.0);
        segments.extend(square(3.0, 2.0));
        segments.swap(1, 6);
        let (loops, open) = chain_loops(segments, 1e-6);
        assert_eq!(open, 0);
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.max_gap() <= 1e-6));
        let areas: Vec<f64> = loops.iter().map(|l| l.signed_area().abs()).collect();
        assert!(areas.contains(&100.0));
        assert!(areas.contains(&4.0));
    }

    #[test]
    fn test_small_gaps_within_tolerance_close() {
        let mut segments = square(0.0, 10.0);
        segments[2] = Segment::line(Point2::new(10.0, 10.00005), Point2::new(0.0, 10.0));
        let (loops, open) = chain_loops(segments, 1e-4);
        assert_eq!((loops.len(), open), (1, 0));
    }

    #[test]
    fn test_open_chain_is_counted() {
        let mut segments = square(0.0, 10.0);
        segments.pop();
        let (loops, open) = chain_loops(segments, 1e-6);
        assert!(loops.is_empty());
        assert_eq!(open, 1);
    }

    #[test]
    fn test_full_circle_is_its_own_loop() {
        let (loops, open) = chain_loops(vec![Segment::circle(Point2::new(1.0, 1.0), 2.0)], 1e-6);
        assert_eq!((loops.len(), open), (1, 0));
    }
}
