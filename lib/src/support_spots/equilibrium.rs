//! Global equilibrium of printed parts.
//!
//! After a layer has been attributed, every part touched by the layer is checked line by
//! line against the push of the nozzle at that line's end. The part pivots around the edge
//! of its footprint hull in the push direction:
//!
//! ```text
//! destabilizing = bed movement (mass × acceleration × centroid height)
//!               + nozzle conflict (conflict force × lever arm about the pivot)
//! stabilizing   = sticking (adhesion × pivot-to-hull-centroid distance)
//!               + weight (only while the mass centroid sits over the hull)
//! ```
//!
//! When the balance is unfavorable a global support point is placed at the line end and
//! added to the part, so the remaining lines of the layer see the added stability.
//!
//! The same push is also checked against the part's connection to the layer below, which
//! breaks when the supported area is too small for the material's yield strength.

use super::accumulator::{AccumulatorId, ConnectivityGraph, StabilityAccumulator};
use super::bridging::ExtrusionLine;
use super::{LayerInfo, SupportPoint, SupportPointCause};
use crate::config::SupportSpotsConfig;
use crate::geometry::{ConvexPolygon, Line, Point3F, PointF};
use crate::CoordF;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::trace;

/// How far ahead of a line end the pivot search looks (mm).
const PIVOT_LOOKAHEAD: CoordF = 300.0;

/// Downward slope of the nozzle push.
const CONFLICT_SLOPE: f64 = 0.2;

/// Smallest footprint of a global point, relative to the interface radius.
const MIN_SPOT_RADIUS_FACTOR: f64 = 0.2;

/// Torques acting on a part for one pushed line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueBalance {
    pub pivot: PointF,
    pub sticking: f64,
    pub weight: f64,
    pub bed_movement: f64,
    pub extruder_conflict: f64,
}

impl TorqueBalance {
    /// Destabilizing minus stabilizing torque. Positive means the part gives way.
    pub fn net(&self) -> f64 {
        self.bed_movement + self.extruder_conflict - self.weight - self.sticking
    }
}

/// Lines of `lines` grouped by the part they belong to, ordered by part id.
pub fn group_lines_by_part(
    lines: &[ExtrusionLine],
    graph: &ConnectivityGraph,
) -> BTreeMap<AccumulatorId, Vec<usize>> {
    let mut groups: BTreeMap<AccumulatorId, Vec<usize>> = BTreeMap::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(id) = line.acc_id {
            groups.entry(graph.resolve(id)).or_default().push(idx);
        }
    }
    groups
}

/// Lever arm of the nozzle push at `end`, at `height` above `pivot`.
///
/// The push acts along `direction` tilted slightly downward; the arm is the distance
/// from the pivot to that line of action.
pub fn nozzle_conflict_arm(end: PointF, pivot: PointF, height: CoordF, direction: PointF) -> CoordF {
    let offset = Point3F::new(end.x - pivot.x, end.y - pivot.y, height);
    let push = Point3F::new(direction.x, direction.y, -CONFLICT_SLOPE).normalize();
    offset.cross(&push).length()
}

#[inline]
fn part_mass(acc: &StabilityAccumulator, config: &SupportSpotsConfig) -> f64 {
    acc.accumulated_volume() * config.filament_density
}

/// Torque balance of `acc` when the nozzle pushes at the end of `line` at `print_z`.
///
/// Returns `None` for a zero-length line or an empty footprint.
pub fn torque_balance(
    acc: &mut StabilityAccumulator,
    line: &Line,
    print_z: CoordF,
    config: &SupportSpotsConfig,
) -> Option<TorqueBalance> {
    if line.is_degenerate() {
        return None;
    }
    let direction = line.direction();
    let mass = part_mass(acc, config);
    let mass_centroid = acc.centroid();
    let sticking_force = acc.sticking_force();

    let hull = acc.footprint_hull();
    let pivot = hull.nearest_boundary_point(&(line.b + direction * PIVOT_LOOKAHEAD))?;
    let hull_centroid = hull.centroid().unwrap_or(pivot);
    let over_base = hull.contains(&mass_centroid.to_2d());

    let weight = if over_base {
        mass * config.gravity_constant * pivot.distance(&mass_centroid.to_2d())
    } else {
        0.0
    };

    Some(TorqueBalance {
        pivot,
        sticking: sticking_force * pivot.distance(&hull_centroid),
        weight,
        bed_movement: mass * config.max_acceleration * mass_centroid.z,
        extruder_conflict: config.standard_extruder_conflict_force
            * nozzle_conflict_arm(line.b, pivot, print_z, direction),
    })
}

fn global_cause(acc: &StabilityAccumulator) -> SupportPointCause {
    if acc.is_bed_anchored() {
        SupportPointCause::SeparationFromBed
    } else {
        SupportPointCause::UnstableFloatingPart
    }
}

/// Give a part whose footprint has no area an anchor disc around its first sample.
fn anchor_degenerate_part(
    acc: &mut StabilityAccumulator,
    fallback: PointF,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    points: &mut Vec<SupportPoint>,
) {
    let radius = config.support_points_interface_radius;
    let anchor = acc.support_points().first().copied().unwrap_or(fallback);
    let weight = part_mass(acc, config) * config.gravity_constant;

    let point = SupportPoint::new(
        global_cause(acc),
        anchor.to_3d(layer.print_z),
        weight,
        radius,
        PointF::zero(),
    );
    trace!(cause = ?point.cause(), position = %point.position(), "anchoring degenerate part");
    points.push(point);

    acc.add_support_point(anchor, PI * radius * radius * config.support_points_adhesion_strength);
    for k in 0..3 {
        let angle = 2.0 * PI * k as f64 / 3.0;
        acc.add_support_point(anchor + PointF::new(angle.cos(), angle.sin()) * radius, 0.0);
    }
}

/// Footprint radius of a new global point at `position`: the interface radius, shrunk
/// by how deep the point already sits inside the hull.
fn spot_radius(hull: &ConvexPolygon, position: &PointF, config: &SupportSpotsConfig) -> CoordF {
    let radius = config.support_points_interface_radius;
    if !hull.contains(position) {
        return radius;
    }
    let depth = hull.distance_to_boundary(position);
    (radius * (1.0 - depth / radius)).max(MIN_SPOT_RADIUS_FACTOR * radius)
}

/// Check every part touched by `lines` and add global support points where needed.
pub fn check_global_stability(
    lines: &[ExtrusionLine],
    groups: &BTreeMap<AccumulatorId, Vec<usize>>,
    graph: &mut ConnectivityGraph,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    points: &mut Vec<SupportPoint>,
) {
    for (&acc_id, line_ids) in groups {
        let Some(&first_idx) = line_ids.first() else {
            continue;
        };
        let acc = graph.get_mut(acc_id);

        if acc.footprint_hull().is_degenerate() {
            anchor_degenerate_part(acc, lines[first_idx].line.a, layer, config, points);
        }

        for &idx in line_ids {
            let line = &lines[idx].line;
            let Some(balance) = torque_balance(acc, line, layer.print_z, config) else {
                continue;
            };
            if balance.net() <= 0.0 {
                continue;
            }

            let radius = spot_radius(acc.footprint_hull(), &line.b, config);
            let point = SupportPoint::new(
                global_cause(acc),
                line.b.to_3d(layer.print_z),
                balance.extruder_conflict - balance.sticking,
                radius,
                line.direction(),
            );
            trace!(
                cause = ?point.cause(),
                position = %point.position(),
                net_torque = balance.net(),
                "global support point"
            );
            points.push(point);
            acc.add_support_point(line.b, PI * radius * radius * config.support_points_adhesion_strength);
        }
    }
}

/// Check that each part's connection to the layer below withstands the nozzle push.
///
/// At most one point per part and layer is placed, at the line with the largest deficit.
pub fn check_weak_connections(
    lines: &[ExtrusionLine],
    groups: &BTreeMap<AccumulatorId, Vec<usize>>,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    points: &mut Vec<SupportPoint>,
) {
    if layer.is_first() {
        return;
    }

    for line_ids in groups.values() {
        let connection: Vec<&ExtrusionLine> = line_ids
            .iter()
            .map(|&idx| &lines[idx])
            .filter(|l| l.is_supported() && !l.is_degenerate())
            .collect();
        if connection.is_empty() {
            continue;
        }

        let area: f64 = connection.iter().map(|l| l.len * l.width).sum();
        let samples: Vec<PointF> = connection
            .iter()
            .flat_map(|l| [l.line.a, l.line.b])
            .collect();
        let hull = ConvexPolygon::from_points(&samples);
        let Some(centroid) = hull.centroid() else {
            continue;
        };

        let mut worst: Option<(f64, &ExtrusionLine)> = None;
        for line in line_ids.iter().map(|&idx| &lines[idx]) {
            if line.is_degenerate() {
                continue;
            }
            let direction = line.line.direction();
            let Some(pivot) = hull.nearest_boundary_point(&(line.line.b + direction * PIVOT_LOOKAHEAD)) else {
                continue;
            };
            let conflict = config.standard_extruder_conflict_force
                * nozzle_conflict_arm(line.line.b, pivot, layer.height, direction);
            let resistance = config.material_yield_strength * area * pivot.distance(&centroid);
            let deficit = conflict - resistance;
            if deficit > 0.0 && worst.map_or(true, |(d, _)| deficit > d) {
                worst = Some((deficit, line));
            }
        }

        if let Some((deficit, line)) = worst {
            let point = SupportPoint::new(
                SupportPointCause::WeakObjectPart,
                line.line.b.to_3d(layer.print_z),
                deficit,
                config.support_points_interface_radius,
                line.line.direction(),
            );
            trace!(position = %point.position(), deficit, "weak object part");
            points.push(point);
        }
    }
}
