//! Axis-aligned bounding box in the plane.

use flatcut_math::Point2;

/// Axis-aligned 2D box. An empty box has `min > max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    /// Lower-left corner.
    pub min: Point2,
    /// Upper-right corner.
    pub max: Point2,
}

impl Aabb2 {
    /// Box containing nothing.
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.include(p);
        }
        bb
    }

    /// Grow to contain `p`.
    pub fn include(&mut self, p: &Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb2) -> Self {
        let mut bb = *self;
        bb.include(&other.min);
        bb.include(&other.max);
        bb
    }

    /// Whether the box contains at least one point.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Extent along X.
    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    /// Extent along Y.
    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    /// Width times height.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Perimeter of the box.
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    /// Whether `p` lies inside or within `tol` of the box.
    pub fn contains(&self, p: &Point2, tol: f64) -> bool {
        p.x >= self.min.x - tol
            && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol
            && p.y <= self.max.y + tol
    }
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self::empty()
    }
}
