//! Convex hull (Andrew's monotone chain).

use flatcut_math::Point2;

/// Convex hull of `points` in counter-clockwise order, without collinear
/// points or a repeated closing point. Fewer than three distinct points are
/// returned as-is (deduplicated).
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    let mut pts: Vec<Point2> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2, a: &Point2, b: &Point2| (a - o).perp(&(b - o));

    let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_with_interior_points() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.5),
            Point2::new(1.0, 1.0),
            Point2::new(0.5, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_eq!(hull[0], Point2::new(0.0, 0.0));
        assert_eq!(hull[1], Point2::new(1.0, 0.0));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(convex_hull(&[]).is_empty());
        let same = vec![Point2::new(2.0, 2.0); 5];
        assert_eq!(convex_hull(&same).len(), 1);
        // collinear points collapse to the two extremes
        let line: Vec<Point2> = (0..5).map(|i| Point2::new(i as f64, 0.0)).collect();
        assert_eq!(convex_hull(&line).len(), 2);
    }
}
