//! Closed polygons: convex footprints and island outlines.
//!
//! Hull construction, area, centroid and containment are delegated to the `geo` crate.
//! Boundary distance queries run directly over the edges since both shapes are small.

use super::{BoundingBoxF, Line, PointF};
use crate::{CoordF, EPSILON};
use geo::{Area, Centroid, Contains, ConvexHull};
use serde::{Deserialize, Serialize};
use std::fmt;

#[inline]
fn to_coord(p: &PointF) -> geo::Coord<CoordF> {
    geo::Coord { x: p.x, y: p.y }
}

#[inline]
fn from_coord(c: &geo::Coord<CoordF>) -> PointF {
    PointF::new(c.x, c.y)
}

fn ring_to_line_string(ring: &[PointF]) -> geo::LineString<CoordF> {
    geo::LineString::from(ring.iter().map(to_coord).collect::<Vec<_>>())
}

/// Edges of a closed ring, including the closing edge.
fn ring_lines(ring: &[PointF]) -> impl Iterator<Item = Line> + '_ {
    let n = ring.len();
    (0..n).map(move |i| Line::new(ring[i], ring[(i + 1) % n]))
}

/// Closest point on the boundary of a closed ring.
fn ring_nearest_point(ring: &[PointF], p: &PointF) -> Option<PointF> {
    match ring.len() {
        0 => None,
        1 => Some(ring[0]),
        _ => ring_lines(ring)
            .map(|l| l.closest_point(p).0)
            .min_by(|x, y| x.distance_squared(p).total_cmp(&y.distance_squared(p))),
    }
}

/// Convex hull of a point set, counter-clockwise.
///
/// The hull may be degenerate: empty, a single point, or collinear points.
/// Degenerate hulls have zero area and contain nothing.
#[derive(Clone, Default)]
pub struct ConvexPolygon {
    /// Hull vertices, counter-clockwise, without the closing duplicate.
    points: Vec<PointF>,
    area: CoordF,
    centroid: Option<PointF>,
    hull: Option<geo::Polygon<CoordF>>,
}

impl ConvexPolygon {
    pub fn from_points(points: &[PointF]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let mut unique = points.to_vec();
        unique.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        unique.dedup_by(|a, b| a.approx_eq(b, EPSILON));

        let multi_point: geo::MultiPoint<CoordF> = unique
            .iter()
            .map(|p| geo::Point::new(p.x, p.y))
            .collect::<Vec<_>>()
            .into();
        let hull = multi_point.convex_hull();
        let area = hull.unsigned_area();

        let vertices: Vec<PointF> = if area > EPSILON {
            let mut vertices: Vec<PointF> = hull.exterior().coords().map(from_coord).collect();
            // Drop the closing vertex and any repeated vertices.
            vertices.dedup_by(|a, b| a.approx_eq(b, EPSILON));
            if vertices.len() > 1 && vertices[0].approx_eq(&vertices[vertices.len() - 1], EPSILON) {
                vertices.pop();
            }
            vertices
        } else {
            // Collinear samples: the segment between the lexicographic extremes.
            match (unique.first(), unique.last()) {
                (Some(first), Some(last)) if unique.len() > 1 => vec![*first, *last],
                _ => vec![points[0]],
            }
        };

        let centroid = if area > EPSILON {
            hull.centroid().map(|c| PointF::new(c.x(), c.y()))
        } else {
            let sum = vertices.iter().fold(PointF::zero(), |acc, p| acc + *p);
            Some(sum / vertices.len() as CoordF)
        };

        Self {
            points: vertices,
            area,
            centroid,
            hull: Some(hull),
        }
    }

    #[inline]
    pub fn points(&self) -> &[PointF] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fewer than three vertices or (numerically) no area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.area <= EPSILON
    }

    #[inline]
    pub fn area(&self) -> CoordF {
        self.area
    }

    /// Area centroid, or the vertex average for a degenerate hull. `None` when empty.
    #[inline]
    pub fn centroid(&self) -> Option<PointF> {
        self.centroid
    }

    /// Strict interior containment. Boundary points are not contained.
    pub fn contains(&self, p: &PointF) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.hull
            .as_ref()
            .is_some_and(|hull| hull.contains(&geo::Point::new(p.x, p.y)))
    }

    /// Closest point on the hull boundary. `None` when the hull is empty.
    pub fn nearest_boundary_point(&self, p: &PointF) -> Option<PointF> {
        ring_nearest_point(&self.points, p)
    }

    /// Distance from `p` to the hull boundary, `+inf` when the hull is empty.
    pub fn distance_to_boundary(&self, p: &PointF) -> CoordF {
        self.nearest_boundary_point(p)
            .map_or(CoordF::INFINITY, |q| q.distance(p))
    }

    pub fn lines(&self) -> Vec<Line> {
        if self.points.len() < 2 {
            return Vec::new();
        }
        ring_lines(&self.points).collect()
    }
}

impl fmt::Debug for ConvexPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvexPolygon")
            .field("points", &self.points)
            .field("area", &self.area)
            .finish()
    }
}

/// An island outline: one counter-clockwise contour with optional clockwise holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    contour: Vec<PointF>,
    #[serde(default)]
    holes: Vec<Vec<PointF>>,
}

impl Polygon {
    pub fn new(contour: Vec<PointF>) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(contour: Vec<PointF>, holes: Vec<Vec<PointF>>) -> Self {
        Self { contour, holes }
    }

    /// Axis-aligned rectangle, mostly useful for tests and synthetic inputs.
    pub fn rectangle(min: PointF, max: PointF) -> Self {
        Self::new(vec![
            min,
            PointF::new(max.x, min.y),
            max,
            PointF::new(min.x, max.y),
        ])
    }

    #[inline]
    pub fn contour(&self) -> &[PointF] {
        &self.contour
    }

    #[inline]
    pub fn holes(&self) -> &[Vec<PointF>] {
        &self.holes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.len() < 3
    }

    fn to_geo(&self) -> geo::Polygon<CoordF> {
        geo::Polygon::new(
            ring_to_line_string(&self.contour),
            self.holes.iter().map(|h| ring_to_line_string(h)).collect(),
        )
    }

    /// Area of the contour minus its holes.
    pub fn area(&self) -> CoordF {
        if self.is_empty() {
            return 0.0;
        }
        self.to_geo().unsigned_area()
    }

    /// Strict interior containment (outside every hole).
    pub fn contains(&self, p: &PointF) -> bool {
        !self.is_empty() && self.to_geo().contains(&geo::Point::new(p.x, p.y))
    }

    /// Distance from `p` to the nearest contour or hole edge.
    pub fn distance_to_boundary(&self, p: &PointF) -> CoordF {
        std::iter::once(self.contour.as_slice())
            .chain(self.holes.iter().map(Vec::as_slice))
            .filter_map(|ring| ring_nearest_point(ring, p))
            .map(|q| q.distance(p))
            .fold(CoordF::INFINITY, CoordF::min)
    }

    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points(&self.contour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(size: CoordF) -> Vec<PointF> {
        vec![
            PointF::new(0.0, 0.0),
            PointF::new(size, 0.0),
            PointF::new(size, size),
            PointF::new(0.0, size),
        ]
    }

    #[test]
    fn test_hull_of_square_with_interior_points() {
        let mut points = square(10.0);
        points.push(PointF::new(5.0, 5.0));
        points.push(PointF::new(2.0, 7.0));
        let hull = ConvexPolygon::from_points(&points);

        assert_eq!(hull.len(), 4);
        assert!(!hull.is_degenerate());
        assert_abs_diff_eq!(hull.area(), 100.0, epsilon = 1e-9);
        let c = hull.centroid().unwrap();
        assert_abs_diff_eq!(c.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c.y, 5.0, epsilon = 1e-9);
        assert!(hull.contains(&PointF::new(1.0, 9.0)));
        assert!(!hull.contains(&PointF::new(11.0, 5.0)));
    }

    #[test]
    fn test_nearest_boundary_point() {
        let hull = ConvexPolygon::from_points(&square(10.0));
        let q = hull.nearest_boundary_point(&PointF::new(5.0, 2.0)).unwrap();
        assert!(q.approx_eq(&PointF::new(5.0, 0.0), 1e-9));
        let q = hull.nearest_boundary_point(&PointF::new(300.0, 5.0)).unwrap();
        assert!(q.approx_eq(&PointF::new(10.0, 5.0), 1e-9));
        assert_abs_diff_eq!(hull.distance_to_boundary(&PointF::new(5.0, 2.0)), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_hulls() {
        let empty = ConvexPolygon::from_points(&[]);
        assert!(empty.is_degenerate());
        assert!(empty.centroid().is_none());
        assert!(empty.nearest_boundary_point(&PointF::zero()).is_none());

        let single = ConvexPolygon::from_points(&[PointF::new(3.0, 4.0)]);
        assert!(single.is_degenerate());
        assert_eq!(single.points(), &[PointF::new(3.0, 4.0)]);

        let collinear = ConvexPolygon::from_points(&[
            PointF::new(0.0, 0.0),
            PointF::new(5.0, 0.0),
            PointF::new(10.0, 0.0),
        ]);
        assert!(collinear.is_degenerate());
        assert_abs_diff_eq!(collinear.area(), 0.0, epsilon = 1e-12);
        assert!(!collinear.contains(&PointF::new(5.0, 0.0)));
    }

    #[test]
    fn test_island_polygon_with_hole() {
        let hole = vec![
            PointF::new(4.0, 4.0),
            PointF::new(4.0, 6.0),
            PointF::new(6.0, 6.0),
            PointF::new(6.0, 4.0),
        ];
        let island = Polygon::with_holes(square(10.0), vec![hole]);
        assert_abs_diff_eq!(island.area(), 96.0, epsilon = 1e-9);
        assert!(island.contains(&PointF::new(2.0, 2.0)));
        assert!(!island.contains(&PointF::new(5.0, 5.0)));
        assert_abs_diff_eq!(island.distance_to_boundary(&PointF::new(5.0, 5.0)), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rectangle() {
        let r = Polygon::rectangle(PointF::new(0.0, 0.0), PointF::new(4.0, 2.0));
        assert_abs_diff_eq!(r.area(), 8.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.bounding_box().width(), 4.0);
    }
}
