//! 2D axis-aligned bounding box.

use super::PointF;
use crate::CoordF;
use std::fmt;

/// Axis-aligned box in millimeters. `None` bounds mean nothing has been added yet.
#[derive(Clone, Copy, Default, PartialEq)]
pub struct BoundingBoxF {
    bounds: Option<(PointF, PointF)>,
}

impl BoundingBoxF {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[PointF]) -> Self {
        let mut bb = Self::new();
        points.iter().for_each(|p| bb.merge_point(*p));
        bb
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.bounds.is_some()
    }

    #[inline]
    pub fn min(&self) -> Option<PointF> {
        self.bounds.map(|(min, _)| min)
    }

    #[inline]
    pub fn max(&self) -> Option<PointF> {
        self.bounds.map(|(_, max)| max)
    }

    pub fn merge_point(&mut self, p: PointF) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (
                PointF::new(min.x.min(p.x), min.y.min(p.y)),
                PointF::new(max.x.max(p.x), max.y.max(p.y)),
            ),
            None => (p, p),
        });
    }

    pub fn merge(&mut self, other: &BoundingBoxF) {
        if let Some((min, max)) = other.bounds {
            self.merge_point(min);
            self.merge_point(max);
        }
    }

    /// Extent along X; zero when undefined.
    #[inline]
    pub fn width(&self) -> CoordF {
        self.bounds.map_or(0.0, |(min, max)| max.x - min.x)
    }

    /// Extent along Y; zero when undefined.
    #[inline]
    pub fn height(&self) -> CoordF {
        self.bounds.map_or(0.0, |(min, max)| max.y - min.y)
    }

    /// Index of the longest axis (0 = X, 1 = Y).
    #[inline]
    pub fn longest_axis(&self) -> usize {
        usize::from(self.height() > self.width())
    }

    /// Squared distance from `p` to the box, zero inside and `CoordF::MAX` when undefined.
    #[inline]
    pub fn squared_exterior_distance(&self, p: &PointF) -> CoordF {
        let Some((min, max)) = self.bounds else {
            return CoordF::MAX;
        };
        let dx = (min.x - p.x).max(0.0).max(p.x - max.x);
        let dy = (min.y - p.y).max(0.0).max(p.y - max.y);
        dx * dx + dy * dy
    }
}

impl fmt::Debug for BoundingBoxF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds {
            Some((min, max)) => write!(f, "BoundingBoxF({:?} - {:?})", min, max),
            None => write!(f, "BoundingBoxF(undefined)"),
        }
    }
}
