//! Straight line segment.

use super::{BoundingBoxF, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// A directed segment from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub a: PointF,
    pub b: PointF,
}

impl Line {
    #[inline]
    pub const fn new(a: PointF, b: PointF) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn vector(&self) -> PointF {
        self.b - self.a
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    /// Unit direction from `a` to `b`; zero for a degenerate segment.
    #[inline]
    pub fn direction(&self) -> PointF {
        self.vector().normalize()
    }

    #[inline]
    pub fn midpoint(&self) -> PointF {
        (self.a + self.b) * 0.5
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.length() <= crate::EPSILON
    }

    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points(&[self.a, self.b])
    }

    /// Closest point on the segment to `p`, with its parameter `t` in `[0, 1]`.
    pub fn closest_point(&self, p: &PointF) -> (PointF, CoordF) {
        let v = self.vector();
        let len_sq = v.length_squared();
        if len_sq <= 0.0 {
            return (self.a, 0.0);
        }
        let t = ((*p - self.a).dot(&v) / len_sq).clamp(0.0, 1.0);
        (self.a + v * t, t)
    }

    #[inline]
    pub fn distance_to(&self, p: &PointF) -> CoordF {
        self.closest_point(p).0.distance(p)
    }

    /// Positive if `p` is on the left-hand side of the direction `a -> b`.
    #[inline]
    pub fn side(&self, p: &PointF) -> CoordF {
        self.vector().cross(&(*p - self.a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_closest_point_clamps_to_endpoints() {
        let line = Line::new(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0));
        let (p, t) = line.closest_point(&PointF::new(5.0, 3.0));
        assert_eq!(p, PointF::new(5.0, 0.0));
        assert_abs_diff_eq!(t, 0.5);

        let (p, t) = line.closest_point(&PointF::new(-4.0, 3.0));
        assert_eq!(p, line.a);
        assert_abs_diff_eq!(t, 0.0);
        assert_abs_diff_eq!(line.distance_to(&PointF::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn test_degenerate_line() {
        let p = PointF::new(1.0, 1.0);
        let line = Line::new(p, p);
        assert!(line.is_degenerate());
        assert_eq!(line.direction(), PointF::zero());
        assert_abs_diff_eq!(line.distance_to(&PointF::new(4.0, 5.0)), 5.0);
    }

    #[test]
    fn test_side() {
        let line = Line::new(PointF::new(0.0, 0.0), PointF::new(1.0, 0.0));
        assert!(line.side(&PointF::new(0.5, 1.0)) > 0.0);
        assert!(line.side(&PointF::new(0.5, -1.0)) < 0.0);
    }
}
