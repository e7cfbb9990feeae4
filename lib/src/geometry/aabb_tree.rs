//! AABB tree over 2D line segments.
//!
//! This module provides the spatial line index used to measure how far a point of the
//! current layer is from the extrusions of the layer below:
//! - Closest segment queries
//! - Signed distance queries (inside/outside by segment winding)
//! - Range queries (all segments within a radius)
//!
//! # Algorithm
//!
//! The tree is a balanced binary tree built over the bounding boxes of the segments.
//! It is balanced by splitting the segments at each level along the longest axis of
//! their combined bounding box, around the median of the segment midpoints.
//!
//! Tree storage uses an implicit indexing scheme where children of node `i` are
//! at positions `2*i + 1` (left) and `2*i + 2` (right). This eliminates the need
//! for explicit child pointers and improves cache locality.
//!
//! An index is built once from an immutable sequence of segments and is read-only
//! afterwards, so it can be shared across threads for concurrent queries.

use super::{BoundingBoxF, Line, PointF};
use crate::CoordF;

/// Anything that can be stored in a [`LineIndex`].
pub trait AsLine {
    fn as_line(&self) -> &Line;
}

impl AsLine for Line {
    #[inline]
    fn as_line(&self) -> &Line {
        self
    }
}

/// Special index values for tree nodes.
const NPOS: usize = usize::MAX;
const INNER: usize = usize::MAX - 1;

/// Parameter slack used to decide whether a closest point is an endpoint.
const ENDPOINT_EPSILON: CoordF = 1e-9;

/// A single node in the AABB tree.
#[derive(Debug, Clone)]
struct AABBNode {
    /// Index of the segment for leaf nodes.
    /// INNER for internal nodes, NPOS for invalid nodes.
    idx: usize,
    bbox: BoundingBoxF,
}

impl AABBNode {
    #[inline]
    fn empty() -> Self {
        Self {
            idx: NPOS,
            bbox: BoundingBoxF::new(),
        }
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.idx != NPOS
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.is_valid() && self.idx != INNER
    }
}

/// Input item for building the tree.
#[derive(Debug, Clone)]
struct BuildInput {
    idx: usize,
    bbox: BoundingBoxF,
    /// Segment midpoint, used for balancing.
    centroid: PointF,
}

impl BuildInput {
    #[inline]
    fn centroid_component(&self, dimension: usize) -> CoordF {
        if dimension == 0 {
            self.centroid.x
        } else {
            self.centroid.y
        }
    }
}

/// Balanced AABB tree with implicit child indexing.
#[derive(Debug, Clone, Default)]
struct AABBTree {
    nodes: Vec<AABBNode>,
}

impl AABBTree {
    #[inline]
    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    fn node(&self, idx: usize) -> Option<&AABBNode> {
        self.nodes.get(idx)
    }

    #[inline]
    fn left_child_idx(idx: usize) -> usize {
        idx * 2 + 1
    }

    #[inline]
    fn right_child_idx(idx: usize) -> usize {
        idx * 2 + 2
    }

    fn build_from_lines<L: AsLine>(lines: &[L]) -> Self {
        if lines.is_empty() {
            return Self::default();
        }

        let mut input: Vec<BuildInput> = lines
            .iter()
            .enumerate()
            .map(|(idx, l)| {
                let line = l.as_line();
                BuildInput {
                    idx,
                    bbox: line.bounding_box(),
                    centroid: line.midpoint(),
                }
            })
            .collect();

        let input_len = input.len();
        let mut tree = Self {
            nodes: vec![AABBNode::empty(); input_len.next_power_of_two() * 2 - 1],
        };
        tree.build_recursive(&mut input, 0, 0, input_len - 1);
        tree
    }

    fn build_recursive(
        &mut self,
        input: &mut [BuildInput],
        node_idx: usize,
        left: usize,
        right: usize,
    ) {
        debug_assert!(node_idx < self.nodes.len());
        debug_assert!(left <= right);

        if left == right {
            self.nodes[node_idx].idx = input[left].idx;
            self.nodes[node_idx].bbox = input[left].bbox;
            return;
        }

        let mut bbox = input[left].bbox;
        for item in &input[(left + 1)..=right] {
            bbox.merge(&item.bbox);
        }

        let dimension = bbox.longest_axis();
        let center = (left + right) / 2;
        Self::partition_input(input, dimension, left, right, center);

        self.nodes[node_idx].idx = INNER;
        self.nodes[node_idx].bbox = bbox;

        self.build_recursive(input, Self::left_child_idx(node_idx), left, center);
        self.build_recursive(input, Self::right_child_idx(node_idx), center + 1, right);
    }

    /// QuickSelect: afterwards every element left of `k` is not greater than element `k`
    /// along `dimension`, and every element right of it is not smaller.
    fn partition_input(
        input: &mut [BuildInput],
        dimension: usize,
        mut left: usize,
        mut right: usize,
        k: usize,
    ) {
        while left < right {
            let center = (left + right) / 2;

            // Median-of-three pivot selection
            if input[left].centroid_component(dimension) > input[center].centroid_component(dimension) {
                input.swap(left, center);
            }
            if input[left].centroid_component(dimension) > input[right].centroid_component(dimension) {
                input.swap(left, right);
            }
            if input[center].centroid_component(dimension) > input[right].centroid_component(dimension) {
                input.swap(center, right);
            }
            if right <= left + 2 {
                break;
            }

            let pivot = input[center].centroid_component(dimension);
            let mut i = left;
            let mut j = right - 1;
            input.swap(center, j);

            loop {
                loop {
                    i += 1;
                    if input[i].centroid_component(dimension) >= pivot {
                        break;
                    }
                }
                loop {
                    j -= 1;
                    if input[j].centroid_component(dimension) <= pivot || i >= j {
                        break;
                    }
                }
                if i >= j {
                    break;
                }
                input.swap(i, j);
            }
            input.swap(i, right - 1);

            if k < i {
                right = i - 1;
            } else if k == i {
                break;
            } else {
                left = i + 1;
            }
        }
    }
}

/// Result of a signed distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedDistance {
    /// Euclidean distance to the closest segment, negative on its inner side.
    /// `+inf` when the index is empty.
    pub distance: CoordF,
    /// Index of the closest segment, `None` when the index is empty.
    pub line_idx: Option<usize>,
    /// Closest point on that segment.
    pub nearest_point: PointF,
}

impl SignedDistance {
    /// The answer of an empty index: no coverage anywhere.
    pub const fn none() -> Self {
        Self {
            distance: CoordF::INFINITY,
            line_idx: None,
            nearest_point: PointF::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Closest {
    idx: usize,
    point: PointF,
    t: CoordF,
    squared_distance: CoordF,
}

/// Spatial index over an immutable, ordered sequence of segments.
///
/// Segment ids are positions in the sequence passed to [`LineIndex::new`].
#[derive(Debug, Clone)]
pub struct LineIndex<L> {
    lines: Vec<L>,
    tree: AABBTree,
}

impl<L> Default for LineIndex<L> {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            tree: AABBTree::default(),
        }
    }
}

impl<L: AsLine> LineIndex<L> {
    pub fn new(lines: Vec<L>) -> Self {
        let tree = AABBTree::build_from_lines(&lines);
        Self { lines, tree }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn lines(&self) -> &[L] {
        &self.lines
    }

    /// The segment with id `idx`.
    #[inline]
    pub fn line(&self, idx: usize) -> Option<&L> {
        self.lines.get(idx)
    }

    /// Distance to the closest segment, negated when `point` lies on the left-hand side
    /// of that segment's direction.
    ///
    /// The side is only defined where the closest point is strictly inside the segment;
    /// a point whose closest point is a segment endpoint gets the unsigned distance.
    pub fn signed_distance(&self, point: &PointF) -> SignedDistance {
        let Some(closest) = self.closest(point) else {
            return SignedDistance::none();
        };

        let distance = closest.squared_distance.sqrt();
        let interior = closest.t > ENDPOINT_EPSILON && closest.t < 1.0 - ENDPOINT_EPSILON;
        let inside = interior && self.lines[closest.idx].as_line().side(point) > 0.0;

        SignedDistance {
            distance: if inside { -distance } else { distance },
            line_idx: Some(closest.idx),
            nearest_point: closest.point,
        }
    }

    /// Ids of all segments closer than `radius` to `point`, in tree order.
    pub fn lines_within(&self, point: &PointF, radius: CoordF) -> Vec<usize> {
        let mut found = Vec::new();
        if !self.tree.is_empty() {
            self.lines_within_recursive(point, 0, radius * radius, &mut found);
        }
        found
    }

    fn closest(&self, point: &PointF) -> Option<Closest> {
        if self.tree.is_empty() {
            return None;
        }
        let mut result = Closest {
            idx: NPOS,
            point: PointF::zero(),
            t: 0.0,
            squared_distance: CoordF::MAX,
        };
        self.closest_recursive(point, 0, CoordF::MAX, &mut result);
        (result.idx != NPOS).then_some(result)
    }

    fn closest_recursive(
        &self,
        point: &PointF,
        node_idx: usize,
        mut up_sqr_d: CoordF,
        result: &mut Closest,
    ) -> CoordF {
        let node = match self.tree.node(node_idx) {
            Some(n) if n.is_valid() => n,
            _ => return up_sqr_d,
        };

        if node.is_leaf() {
            let (closest, t) = self.lines[node.idx].as_line().closest_point(point);
            let sqr_dist = closest.distance_squared(point);
            if sqr_dist < up_sqr_d {
                *result = Closest {
                    idx: node.idx,
                    point: closest,
                    t,
                    squared_distance: sqr_dist,
                };
                up_sqr_d = sqr_dist;
            }
            return up_sqr_d;
        }

        let left_idx = AABBTree::left_child_idx(node_idx);
        let right_idx = AABBTree::right_child_idx(node_idx);
        let child_dist = |idx: usize| {
            self.tree
                .node(idx)
                .filter(|n| n.is_valid())
                .map(|n| n.bbox.squared_exterior_distance(point))
                .unwrap_or(CoordF::MAX)
        };
        let left_dist = child_dist(left_idx);
        let right_dist = child_dist(right_idx);

        // Visit closer child first
        let ordered = if left_dist <= right_dist {
            [(left_idx, left_dist), (right_idx, right_dist)]
        } else {
            [(right_idx, right_dist), (left_idx, left_dist)]
        };
        for (idx, dist) in ordered {
            if dist < up_sqr_d {
                up_sqr_d = self.closest_recursive(point, idx, up_sqr_d, result);
            }
        }
        up_sqr_d
    }

    fn lines_within_recursive(
        &self,
        point: &PointF,
        node_idx: usize,
        dist_sq_limit: CoordF,
        found: &mut Vec<usize>,
    ) {
        let node = match self.tree.node(node_idx) {
            Some(n) if n.is_valid() => n,
            _ => return,
        };
        if node.bbox.squared_exterior_distance(point) >= dist_sq_limit {
            return;
        }

        if node.is_leaf() {
            let distance = self.lines[node.idx].as_line().distance_to(point);
            if distance * distance < dist_sq_limit {
                found.push(node.idx);
            }
            return;
        }

        self.lines_within_recursive(point, AABBTree::left_child_idx(node_idx), dist_sq_limit, found);
        self.lines_within_recursive(point, AABBTree::right_child_idx(node_idx), dist_sq_limit, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Counter-clockwise 10x10 square starting at the origin.
    fn ccw_square() -> Vec<Line> {
        let p = [
            PointF::new(0.0, 0.0),
            PointF::new(10.0, 0.0),
            PointF::new(10.0, 10.0),
            PointF::new(0.0, 10.0),
        ];
        (0..4).map(|i| Line::new(p[i], p[(i + 1) % 4])).collect()
    }

    fn brute_force_distance(lines: &[Line], p: &PointF) -> CoordF {
        lines
            .iter()
            .map(|l| l.distance_to(p))
            .fold(CoordF::INFINITY, CoordF::min)
    }

    #[test]
    fn test_empty_index_returns_infinity() {
        let index: LineIndex<Line> = LineIndex::new(Vec::new());
        assert!(index.is_empty());
        let result = index.signed_distance(&PointF::new(1.0, 2.0));
        assert!(result.distance.is_infinite() && result.distance > 0.0);
        assert_eq!(result.line_idx, None);
        assert!(index.lines_within(&PointF::zero(), 100.0).is_empty());
    }

    #[test]
    fn test_signed_distance_inside_is_negative() {
        let index = LineIndex::new(ccw_square());
        let inside = index.signed_distance(&PointF::new(5.0, 2.0));
        assert_abs_diff_eq!(inside.distance, -2.0, epsilon = 1e-12);
        assert_eq!(inside.line_idx, Some(0));
        assert_eq!(inside.nearest_point, PointF::new(5.0, 0.0));

        let outside = index.signed_distance(&PointF::new(13.0, 5.0));
        assert_abs_diff_eq!(outside.distance, 3.0, epsilon = 1e-12);
        assert_eq!(outside.line_idx, Some(1));
    }

    #[test]
    fn test_signed_distance_at_endpoint_is_unsigned() {
        let index = LineIndex::new(vec![Line::new(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0))]);
        // Left of the direction, but beyond the end of the segment.
        let result = index.signed_distance(&PointF::new(13.0, 4.0));
        assert_abs_diff_eq!(result.distance, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_matches_brute_force() {
        let mut lines = Vec::new();
        for i in 0..37 {
            let y = i as CoordF * 0.7;
            let x0 = (i % 5) as CoordF * 1.3;
            lines.push(Line::new(PointF::new(x0, y), PointF::new(x0 + 4.0 + i as CoordF * 0.1, y + 0.3)));
        }
        let index = LineIndex::new(lines.clone());
        for probe in [
            PointF::new(-3.0, 2.0),
            PointF::new(5.0, 11.1),
            PointF::new(20.0, 30.0),
            PointF::new(2.2, 0.05),
        ] {
            let result = index.signed_distance(&probe);
            assert_abs_diff_eq!(result.distance.abs(), brute_force_distance(&lines, &probe), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lines_within() {
        let index = LineIndex::new(ccw_square());
        let mut found = index.lines_within(&PointF::new(0.5, 0.5), 1.0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 3]);
        assert!(index.lines_within(&PointF::new(5.0, 5.0), 1.0).is_empty());
    }

    #[test]
    fn test_single_degenerate_line() {
        let p = PointF::new(2.0, 2.0);
        let index = LineIndex::new(vec![Line::new(p, p)]);
        let result = index.signed_distance(&PointF::new(5.0, 6.0));
        assert_abs_diff_eq!(result.distance, 5.0, epsilon = 1e-12);
        assert_eq!(index.line(0).map(|l| l.a), Some(p));
    }
}
