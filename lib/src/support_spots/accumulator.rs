//! Connectivity graph of printed parts.
//!
//! Every physically contiguous mass of material seen so far is a [`StabilityAccumulator`].
//! Accumulators live in an arena and are addressed by [`AccumulatorId`]; when two parts
//! turn out to be connected one is merged into the other and its id is redirected. Old ids
//! stay valid forever: always go through [`ConnectivityGraph::resolve`] (all graph methods
//! do this for you).

use crate::geometry::{ConvexPolygon, Line, Point3F, PointF};
use crate::CoordF;

pub type AccumulatorId = usize;

/// Aggregated physical attributes of one printed part.
#[derive(Debug, Clone, Default)]
pub struct StabilityAccumulator {
    /// Hull samples: first-layer extrusion endpoints and added support points.
    support_points: Vec<PointF>,
    /// Volume-weighted sum of extrusion positions.
    centroid_accumulator: Point3F,
    accumulated_volume: f64,
    sticking_force: f64,
    bed_anchored: bool,
    hull: Option<ConvexPolygon>,
}

impl StabilityAccumulator {
    /// First-layer extrusion: contributes volume, bed adhesion and hull samples.
    pub fn add_base_extrusion(&mut self, line: &Line, sticking_force: f64, z: CoordF, mm3_per_mm: f64) {
        self.add_extrusion(line, z, mm3_per_mm);
        self.sticking_force += sticking_force;
        // Consecutive lines of a path share an endpoint.
        for p in [line.a, line.b] {
            if self.support_points.last() != Some(&p) {
                self.support_points.push(p);
            }
        }
        self.bed_anchored = true;
        self.hull = None;
    }

    /// Extrusion above the first layer: volume and centroid only.
    pub fn add_extrusion(&mut self, line: &Line, z: CoordF, mm3_per_mm: f64) {
        let volume = line.length() * mm3_per_mm;
        self.accumulated_volume += volume;
        self.centroid_accumulator += line.midpoint().to_3d(z) * volume;
    }

    pub fn add_support_point(&mut self, position: PointF, sticking_force: f64) {
        self.support_points.push(position);
        self.sticking_force += sticking_force;
        self.hull = None;
    }

    /// Absorb everything `other` holds.
    pub fn add_from(&mut self, other: StabilityAccumulator) {
        self.support_points.extend(other.support_points);
        self.centroid_accumulator += other.centroid_accumulator;
        self.accumulated_volume += other.accumulated_volume;
        self.sticking_force += other.sticking_force;
        self.bed_anchored |= other.bed_anchored;
        self.hull = None;
    }

    /// Volume-weighted centroid; the origin while no volume has been added.
    pub fn centroid(&self) -> Point3F {
        if self.accumulated_volume > 0.0 {
            self.centroid_accumulator / self.accumulated_volume
        } else {
            Point3F::zero()
        }
    }

    #[inline]
    pub fn accumulated_volume(&self) -> f64 {
        self.accumulated_volume
    }

    #[inline]
    pub fn sticking_force(&self) -> f64 {
        self.sticking_force
    }

    #[inline]
    pub fn support_points(&self) -> &[PointF] {
        &self.support_points
    }

    /// Whether any of this part's material lies on the bed.
    #[inline]
    pub fn is_bed_anchored(&self) -> bool {
        self.bed_anchored
    }

    /// Convex hull of the support points, cached until the samples change.
    pub fn footprint_hull(&mut self) -> &ConvexPolygon {
        let points = &self.support_points;
        self.hull
            .get_or_insert_with(|| ConvexPolygon::from_points(points))
    }
}

/// Union-find over accumulators with attribute payloads.
#[derive(Debug, Default)]
pub struct ConnectivityGraph {
    accumulators: Vec<StabilityAccumulator>,
    /// `mapping[id] == id` for live accumulators, otherwise a step towards the owner.
    mapping: Vec<AccumulatorId>,
}

impl ConnectivityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty accumulator.
    pub fn create(&mut self) -> AccumulatorId {
        let id = self.accumulators.len();
        self.accumulators.push(StabilityAccumulator::default());
        self.mapping.push(id);
        id
    }

    /// Number of ids ever created, live or merged away.
    #[inline]
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    /// Current owner of `id`.
    ///
    /// `id` must have been returned by [`ConnectivityGraph::create`].
    pub fn resolve(&self, id: AccumulatorId) -> AccumulatorId {
        let mut current = id;
        while self.mapping[current] != current {
            current = self.mapping[current];
        }
        current
    }

    /// Join the parts of `a` and `b` and return the surviving id.
    ///
    /// The younger (higher) resolved id is always merged into the older one, so the
    /// direction does not depend on argument order. Merging a part with itself is a no-op.
    pub fn merge(&mut self, a: AccumulatorId, b: AccumulatorId) -> AccumulatorId {
        let ra = self.resolve(a);
        let rb = self.resolve(b);
        if ra == rb {
            return ra;
        }
        let (keep, gone) = if ra < rb { (ra, rb) } else { (rb, ra) };

        let taken = std::mem::take(&mut self.accumulators[gone]);
        self.accumulators[keep].add_from(taken);
        self.mapping[gone] = keep;
        self.mapping[a] = keep;
        self.mapping[b] = keep;
        keep
    }

    pub fn get(&self, id: AccumulatorId) -> &StabilityAccumulator {
        &self.accumulators[self.resolve(id)]
    }

    pub fn get_mut(&mut self, id: AccumulatorId) -> &mut StabilityAccumulator {
        let id = self.resolve(id);
        &mut self.accumulators[id]
    }

    pub fn add_base_extrusion(
        &mut self,
        id: AccumulatorId,
        line: &Line,
        sticking_force: f64,
        z: CoordF,
        mm3_per_mm: f64,
    ) {
        self.get_mut(id)
            .add_base_extrusion(line, sticking_force, z, mm3_per_mm);
    }

    pub fn add_extrusion(&mut self, id: AccumulatorId, line: &Line, z: CoordF, mm3_per_mm: f64) {
        self.get_mut(id).add_extrusion(line, z, mm3_per_mm);
    }

    pub fn add_support_point(&mut self, id: AccumulatorId, position: PointF, sticking_force: f64) {
        self.get_mut(id).add_support_point(position, sticking_force);
    }

    pub fn footprint_hull(&mut self, id: AccumulatorId) -> &ConvexPolygon {
        self.get_mut(id).footprint_hull()
    }

    /// Ids of accumulators that have not been merged away.
    pub fn live_ids(&self) -> impl Iterator<Item = AccumulatorId> + '_ {
        self.mapping
            .iter()
            .enumerate()
            .filter(|(id, owner)| *id == **owner)
            .map(|(id, _)| id)
    }
}
