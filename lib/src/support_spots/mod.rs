//! Support spot detection.
//!
//! Entry points are [`find_support_spots`] for one object and
//! [`find_support_spots_for_print`] for a whole print. The analysis is split into:
//!
//! - [`accumulator`] - connectivity graph of printed parts and their physical attributes
//! - [`bridging`] - per-path walk that finds extrusions hanging in the air
//! - [`equilibrium`] - torque balance of each part, and of its connection to the part below
//! - [`curling`] - estimate of filament curling up on overhangs
//! - [`islands`] - per-island bookkeeping when the slicer provides island outlines

pub mod accumulator;
pub mod bridging;
pub mod curling;
mod driver;
pub mod equilibrium;
pub mod islands;

use crate::config::{ConfigError, SupportSpotsConfig};
use crate::geometry::{Point3F, PointF};
use crate::print::{Print, PrintObject};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

pub use islands::{IslandConnection, IslandReport};

/// Force value carried by local support points, which are not the result of a force balance.
pub const LOCAL_FORCE_SENTINEL: f64 = -1.0;

/// Error type for the analysis.
#[derive(Debug, Error)]
pub enum SupportSpotsError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("analysis cancelled after {completed_objects} object(s)")]
    Cancelled { completed_objects: usize },
}

pub type SupportSpotsResult<T> = Result<T, SupportSpotsError>;

/// Why a support point was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportPointCause {
    /// A straight span over air longer than the tolerated bridge distance.
    LongBridge,
    /// An unsupported start or end of a path, where the bridge has nothing to hold on to.
    FloatingBridgeAnchor,
    /// A curved extrusion over air.
    FloatingExtrusion,
    /// A bed-anchored part that would be torn off the bed.
    SeparationFromBed,
    /// A part without any bed contact that would topple.
    UnstableFloatingPart,
    /// A part whose connection to the material below would break.
    WeakObjectPart,
}

impl SupportPointCause {
    /// Causes found by the per-path walk, as opposed to the force balance.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SupportPointCause::LongBridge
                | SupportPointCause::FloatingBridgeAnchor
                | SupportPointCause::FloatingExtrusion
        )
    }
}

/// A location that needs support, with the reason and the force involved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportPoint {
    cause: SupportPointCause,
    position: Point3F,
    /// Force deficit for global points, [`LOCAL_FORCE_SENTINEL`] for local ones.
    force: f64,
    spot_radius: CoordF,
    /// Direction of the destabilizing push, in the XY plane.
    direction: PointF,
}

impl SupportPoint {
    pub fn new(
        cause: SupportPointCause,
        position: Point3F,
        force: f64,
        spot_radius: CoordF,
        direction: PointF,
    ) -> Self {
        Self {
            cause,
            position,
            force,
            spot_radius,
            direction,
        }
    }

    /// A point found by the per-path walk.
    pub fn local(cause: SupportPointCause, position: Point3F, spot_radius: CoordF, direction: PointF) -> Self {
        Self::new(cause, position, LOCAL_FORCE_SENTINEL, spot_radius, direction)
    }

    #[inline]
    pub fn cause(&self) -> SupportPointCause {
        self.cause
    }

    #[inline]
    pub fn position(&self) -> Point3F {
        self.position
    }

    #[inline]
    pub fn force(&self) -> f64 {
        self.force
    }

    #[inline]
    pub fn spot_radius(&self) -> CoordF {
        self.spot_radius
    }

    #[inline]
    pub fn direction(&self) -> PointF {
        self.direction
    }

    #[inline]
    pub fn is_local_support_point(&self) -> bool {
        self.cause.is_local()
    }
}

/// Estimated height a filament end curls up by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurledFilament {
    pub position: Point3F,
    pub estimated_height: CoordF,
}

/// Result of analysing one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportSpotsReport {
    support_points: Vec<SupportPoint>,
    curled_filaments: Vec<CurledFilament>,
    islands: Vec<IslandReport>,
}

impl SupportSpotsReport {
    #[inline]
    pub fn support_points(&self) -> &[SupportPoint] {
        &self.support_points
    }

    #[inline]
    pub fn curled_filaments(&self) -> &[CurledFilament] {
        &self.curled_filaments
    }

    /// Islands of layers that supplied outlines, bottom to top.
    #[inline]
    pub fn islands(&self) -> &[IslandReport] {
        &self.islands
    }

    pub fn local_support_points(&self) -> impl Iterator<Item = &SupportPoint> {
        self.support_points.iter().filter(|p| p.is_local_support_point())
    }

    pub fn global_support_points(&self) -> impl Iterator<Item = &SupportPoint> {
        self.support_points.iter().filter(|p| !p.is_local_support_point())
    }

    pub fn is_empty(&self) -> bool {
        self.support_points.is_empty()
    }

    pub fn into_support_points(self) -> Vec<SupportPoint> {
        self.support_points
    }
}

/// Geometry of the layer under analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LayerInfo {
    pub index: usize,
    pub print_z: CoordF,
    pub height: CoordF,
}

impl LayerInfo {
    /// Height of the center of this layer's extrusions, used for centroids.
    #[inline]
    pub fn mid_z(&self) -> CoordF {
        self.print_z - 0.5 * self.height
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Analyse one object bottom to top.
pub fn find_support_spots(
    object: &PrintObject,
    config: &SupportSpotsConfig,
) -> SupportSpotsResult<SupportSpotsReport> {
    config.validate()?;

    info!(
        object = object.name(),
        layers = object.layers().len(),
        "searching support spots"
    );
    let report = driver::analyze_object(object, config);
    info!(
        object = object.name(),
        support_points = report.support_points.len(),
        curled_filaments = report.curled_filaments.len(),
        "support spot search finished"
    );
    Ok(report)
}

/// Analyse every object of `print`, one after the other.
///
/// `cancel` is checked before each object; once it is set the call returns
/// [`SupportSpotsError::Cancelled`]. An object whose analysis has started always finishes.
pub fn find_support_spots_for_print(
    print: &Print,
    config: &SupportSpotsConfig,
    cancel: &AtomicBool,
) -> SupportSpotsResult<Vec<SupportSpotsReport>> {
    config.validate()?;

    let mut reports = Vec::with_capacity(print.object_count());
    for object in print.objects() {
        if cancel.load(Ordering::Relaxed) {
            info!(completed_objects = reports.len(), "support spot search cancelled");
            return Err(SupportSpotsError::Cancelled {
                completed_objects: reports.len(),
            });
        }
        reports.push(find_support_spots(object, config)?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_locality() {
        assert!(SupportPointCause::LongBridge.is_local());
        assert!(SupportPointCause::FloatingBridgeAnchor.is_local());
        assert!(SupportPointCause::FloatingExtrusion.is_local());
        assert!(!SupportPointCause::SeparationFromBed.is_local());
        assert!(!SupportPointCause::UnstableFloatingPart.is_local());
        assert!(!SupportPointCause::WeakObjectPart.is_local());
    }

    #[test]
    fn test_local_point_carries_sentinel_force() {
        let p = SupportPoint::local(
            SupportPointCause::LongBridge,
            Point3F::new(1.0, 2.0, 0.4),
            1.5,
            PointF::new(1.0, 0.0),
        );
        assert_eq!(p.force(), LOCAL_FORCE_SENTINEL);
        assert!(p.is_local_support_point());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SupportSpotsConfig {
            bridge_distance: 0.0,
            ..Default::default()
        };
        let result = find_support_spots(&PrintObject::new("empty"), &config);
        assert!(matches!(result, Err(SupportSpotsError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_object() {
        let report = find_support_spots(&PrintObject::new("empty"), &SupportSpotsConfig::default()).unwrap();
        assert!(report.is_empty());
        assert!(report.curled_filaments().is_empty());
    }

    #[test]
    fn test_cancel_before_first_object() {
        let mut print = Print::new();
        print.add_object(PrintObject::new("a"));
        let cancel = AtomicBool::new(true);
        let result = find_support_spots_for_print(&print, &SupportSpotsConfig::default(), &cancel);
        assert!(matches!(
            result,
            Err(SupportSpotsError::Cancelled { completed_objects: 0 })
        ));

        let cancel = AtomicBool::new(false);
        let reports = find_support_spots_for_print(&print, &SupportSpotsConfig::default(), &cancel).unwrap();
        assert_eq!(reports.len(), 1);
    }
}
