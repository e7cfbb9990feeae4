//! Local bridging detection.
//!
//! Each extrusion path is cut into short lines and walked in print order. Every line end
//! is checked against the layer below: a supported end attaches the line to the part it
//! rests on, an unsupported end extends the current run over air. A run leaving support
//! stays with the part it left; only a path that starts in the air opens a new floating
//! part. Once a run is longer than the tolerated span a local [`SupportPoint`] is placed.
//! The tolerated span shrinks as the run curves.
//!
//! Sampling ([`sample_path`]) only reads the previous layer and can run in parallel over
//! paths. The walk ([`check_extrusion_path`]) mutates the connectivity graph and runs
//! sequentially in path order.

use super::accumulator::{AccumulatorId, ConnectivityGraph};
use super::{LayerInfo, SupportPoint, SupportPointCause};
use crate::config::SupportSpotsConfig;
use crate::extrusion::{ExtrusionPath, ExtrusionRole};
use crate::geometry::{AsLine, Line, LineIndex};
use crate::{CoordF, EPSILON};
use std::f64::consts::PI;
use tracing::trace;

/// One sampled piece of an extrusion path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrusionLine {
    pub line: Line,
    pub len: CoordF,
    pub width: CoordF,
    pub mm3_per_mm: f64,
    pub role: ExtrusionRole,
    /// Position of the source path within its layer.
    pub path_idx: usize,
    /// Signed angle turning from this line into the next line of the same path.
    pub turn: f64,
    /// Signed distance from `line.b` to the layer below, `+inf` when nothing is below.
    pub below_distance: CoordF,
    /// Line of the layer below closest to `line.b`.
    pub below_line: Option<usize>,
    /// Part this line belongs to, set during attribution.
    pub acc_id: Option<AccumulatorId>,
    /// Unsupported length of the run after walking this line, zero on support and
    /// right after a local point.
    pub unsupported_distance: CoordF,
    pub curled_up_height: CoordF,
    pub island: Option<usize>,
}

impl ExtrusionLine {
    pub fn new(line: Line, path: &ExtrusionPath, path_idx: usize) -> Self {
        Self {
            line,
            len: line.length(),
            width: path.width(),
            mm3_per_mm: path.mm3_per_mm(),
            role: path.role(),
            path_idx,
            turn: 0.0,
            below_distance: CoordF::INFINITY,
            below_line: None,
            acc_id: None,
            unsupported_distance: 0.0,
            curled_up_height: 0.0,
            island: None,
        }
    }

    /// The end of this line rests on the layer below.
    #[inline]
    pub fn is_supported(&self) -> bool {
        self.below_distance < self.width
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.len <= EPSILON
    }
}

impl AsLine for ExtrusionLine {
    #[inline]
    fn as_line(&self) -> &Line {
        &self.line
    }
}

/// Cut `path` into lines no longer than `max_line_length`, starting with a zero-length
/// line at the first point so that the path start is checked like every other point.
pub fn subdivide_path(path: &ExtrusionPath, path_idx: usize, max_line_length: CoordF) -> Vec<ExtrusionLine> {
    let Some(first) = path.first_point() else {
        return Vec::new();
    };

    let mut lines = vec![ExtrusionLine::new(Line::new(first, first), path, path_idx)];
    for segment in path.lines() {
        let len = segment.length();
        if len <= EPSILON {
            continue;
        }
        let pieces = (len / max_line_length).ceil().max(1.0) as usize;
        let step = segment.vector() / pieces as CoordF;
        let mut a = segment.a;
        for i in 1..=pieces {
            let b = if i == pieces { segment.b } else { segment.a + step * i as CoordF };
            lines.push(ExtrusionLine::new(Line::new(a, b), path, path_idx));
            a = b;
        }
    }

    for i in 0..lines.len().saturating_sub(1) {
        let (current, next) = (lines[i], lines[i + 1]);
        if !current.is_degenerate() && !next.is_degenerate() {
            lines[i].turn = current.line.vector().angle_to(&next.line.vector());
        }
    }
    lines
}

/// Subdivide `path` and measure every line end against the layer below.
pub fn sample_path(
    path: &ExtrusionPath,
    path_idx: usize,
    below: &LineIndex<ExtrusionLine>,
    config: &SupportSpotsConfig,
) -> Vec<ExtrusionLine> {
    let mut lines = subdivide_path(path, path_idx, config.bridge_sampling_distance);
    for line in &mut lines {
        let probe = below.signed_distance(&line.line.b);
        line.below_distance = probe.distance;
        line.below_line = probe.line_idx;
    }
    lines
}

/// Running sums of the unsupported stretch since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtrusionPropertiesAccumulator {
    /// Unsupported length (mm).
    pub distance: CoordF,
    /// Signed sum of turn angles, clamped to one full turn either way.
    pub curvature: f64,
    /// Largest `|curvature|` seen.
    pub max_curvature: f64,
}

impl ExtrusionPropertiesAccumulator {
    pub fn add_distance(&mut self, distance: CoordF) {
        self.distance += distance;
    }

    pub fn add_angle(&mut self, angle: f64) {
        self.curvature = (self.curvature + angle).clamp(-2.0 * PI, 2.0 * PI);
        self.max_curvature = self.max_curvature.max(self.curvature.abs());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Longest span over air tolerated at the current curvature.
    pub fn tolerated_distance(&self, config: &SupportSpotsConfig) -> CoordF {
        let decrease = config.bridge_distance_decrease_by_curvature_factor * self.curvature.abs() / PI;
        config.bridge_distance / decrease.max(1.0)
    }
}

/// State of one path walk.
#[derive(Debug, Clone, Copy)]
pub struct BridgeTracker {
    pub properties: ExtrusionPropertiesAccumulator,
    /// Path length since the last emitted local point.
    pub distance_since_last_point: CoordF,
}

impl BridgeTracker {
    /// The first point of a path is immediately eligible for a support point.
    pub fn new(config: &SupportSpotsConfig) -> Self {
        Self {
            properties: ExtrusionPropertiesAccumulator {
                distance: config.bridge_distance + 1.0,
                ..Default::default()
            },
            distance_since_last_point: CoordF::INFINITY,
        }
    }

    pub fn should_emit(&self, config: &SupportSpotsConfig) -> bool {
        self.distance_since_last_point > config.min_distance_between_support_points
            && self.properties.distance > self.properties.tolerated_distance(config)
    }

    pub fn emitted(&mut self) {
        self.properties.reset();
        self.distance_since_last_point = 0.0;
    }
}

fn local_cause(line_idx: usize, line_count: usize, properties: &ExtrusionPropertiesAccumulator) -> SupportPointCause {
    if line_idx == 0 || line_idx + 1 == line_count {
        SupportPointCause::FloatingBridgeAnchor
    } else if properties.max_curvature <= EPSILON {
        SupportPointCause::LongBridge
    } else {
        SupportPointCause::FloatingExtrusion
    }
}

fn emit_local_point(
    cause: SupportPointCause,
    line: &ExtrusionLine,
    run: AccumulatorId,
    graph: &mut ConnectivityGraph,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    points: &mut Vec<SupportPoint>,
) {
    let position = line.line.b;
    // Local points anchor the hull but never count as adhesion.
    graph.add_support_point(run, position, 0.0);
    let point = SupportPoint::local(
        cause,
        position.to_3d(layer.print_z),
        config.support_points_interface_radius,
        line.line.direction(),
    );
    trace!(
        cause = ?cause,
        position = %point.position(),
        layer = layer.index,
        path = line.path_idx,
        "local support point"
    );
    points.push(point);
}

/// Walk the sampled lines of one path (above the first layer), attributing every line to a
/// part and emitting local support points over long unsupported runs.
pub fn check_extrusion_path(
    lines: &mut [ExtrusionLine],
    below: &LineIndex<ExtrusionLine>,
    graph: &mut ConnectivityGraph,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    points: &mut Vec<SupportPoint>,
) {
    let line_count = lines.len();
    let mut tracker = BridgeTracker::new(config);
    // Part the walk is attached to: the supporting part once the path touched support,
    // a floating part while it has not.
    let mut current: Option<AccumulatorId> = None;

    for idx in 0..line_count {
        let line = lines[idx];
        tracker.distance_since_last_point += line.len;

        let owner = if line.is_supported() {
            line.below_line
                .and_then(|below_idx| below.line(below_idx))
                .and_then(|below_line| below_line.acc_id)
        } else {
            None
        };

        let part = match owner {
            Some(owner) => {
                let mut owner = graph.resolve(owner);
                if let Some(previous) = current {
                    owner = graph.merge(previous, owner);
                }
                tracker.properties.reset();
                owner
            }
            None => match current {
                Some(id) => graph.resolve(id),
                None => graph.create(),
            },
        };
        graph.add_extrusion(part, &line.line, layer.mid_z(), line.mm3_per_mm);
        lines[idx].acc_id = Some(part);
        current = Some(part);

        if owner.is_none() {
            tracker.properties.add_distance(line.len);
            tracker.properties.add_angle(line.turn);
            if tracker.should_emit(config) {
                let cause = local_cause(idx, line_count, &tracker.properties);
                emit_local_point(cause, &line, part, graph, layer, config, points);
                tracker.emitted();
            }
        }
        lines[idx].unsupported_distance = tracker.properties.distance;
    }

    // A bridge left hanging at its end needs an anchor there.
    if let (Some(last), Some(part)) = (lines.last(), current) {
        let is_bridge = last.role == ExtrusionRole::BridgeInfill;
        if is_bridge
            && !last.is_supported()
            && tracker.distance_since_last_point > config.min_distance_between_support_points
        {
            emit_local_point(
                SupportPointCause::FloatingBridgeAnchor,
                last,
                graph.resolve(part),
                graph,
                layer,
                config,
                points,
            );
        }
    }
}
