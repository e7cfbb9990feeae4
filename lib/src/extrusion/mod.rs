//! Extrusion entities produced by the slicer.
//!
//! Each layer region exposes two collections of [`ExtrusionEntity`] values (perimeters and
//! fills). An entity is either a single [`ExtrusionPath`] or a nested collection of them,
//! as ordered by the upstream toolpath generator.

use crate::flow::{Flow, FlowResult};
use crate::geometry::{Line, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// What an extrusion prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrusionRole {
    #[default]
    None,
    Perimeter,
    ExternalPerimeter,
    OverhangPerimeter,
    InternalInfill,
    SolidInfill,
    TopSolidInfill,
    BridgeInfill,
    GapFill,
    Skirt,
    SupportMaterial,
    SupportMaterialInterface,
    Mixed,
}

impl ExtrusionRole {
    /// Check if role is a perimeter type
    pub fn is_perimeter(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::Perimeter
                | ExtrusionRole::ExternalPerimeter
                | ExtrusionRole::OverhangPerimeter
        )
    }

    pub fn is_external_perimeter(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::ExternalPerimeter | ExtrusionRole::OverhangPerimeter
        )
    }

    /// Perimeters that are not on the outside of the object.
    pub fn is_internal_perimeter(&self) -> bool {
        matches!(self, ExtrusionRole::Perimeter)
    }

    /// Check if role is any infill type
    pub fn is_infill(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::InternalInfill
                | ExtrusionRole::SolidInfill
                | ExtrusionRole::TopSolidInfill
                | ExtrusionRole::BridgeInfill
        )
    }

    pub fn is_bridge(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::BridgeInfill | ExtrusionRole::OverhangPerimeter
        )
    }

    pub fn is_gap_fill(&self) -> bool {
        matches!(self, ExtrusionRole::GapFill)
    }

    /// Check if role is support material
    pub fn is_support(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::SupportMaterial | ExtrusionRole::SupportMaterialInterface
        )
    }
}

/// An open polyline extruded with constant width, height and flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionPath {
    points: Vec<PointF>,
    role: ExtrusionRole,
    /// Extrusion width (mm).
    width: CoordF,
    /// Extrusion height (mm).
    height: CoordF,
    /// Volume per millimeter of travel (mm³/mm).
    mm3_per_mm: CoordF,
}

impl ExtrusionPath {
    pub fn new(
        points: Vec<PointF>,
        role: ExtrusionRole,
        width: CoordF,
        height: CoordF,
        mm3_per_mm: CoordF,
    ) -> Self {
        Self {
            points,
            role,
            width,
            height,
            mm3_per_mm,
        }
    }

    /// Path whose dimensions and volume come from `flow`.
    pub fn from_flow(points: Vec<PointF>, role: ExtrusionRole, flow: &Flow) -> FlowResult<Self> {
        Ok(Self::new(
            points,
            role,
            flow.width(),
            flow.height(),
            flow.mm3_per_mm()?,
        ))
    }

    /// Closed loop: the first point is repeated at the end.
    pub fn closed_loop(mut points: Vec<PointF>, role: ExtrusionRole, flow: &Flow) -> FlowResult<Self> {
        if let Some(&first) = points.first() {
            if points.last() != Some(&first) || points.len() == 1 {
                points.push(first);
            }
        }
        Self::from_flow(points, role, flow)
    }

    #[inline]
    pub fn points(&self) -> &[PointF] {
        &self.points
    }

    #[inline]
    pub fn role(&self) -> ExtrusionRole {
        self.role
    }

    #[inline]
    pub fn width(&self) -> CoordF {
        self.width
    }

    #[inline]
    pub fn height(&self) -> CoordF {
        self.height
    }

    #[inline]
    pub fn mm3_per_mm(&self) -> CoordF {
        self.mm3_per_mm
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_point(&self) -> Option<PointF> {
        self.points.first().copied()
    }

    pub fn last_point(&self) -> Option<PointF> {
        self.points.last().copied()
    }

    /// Consecutive segments of the polyline.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.points.windows(2).map(|w| Line::new(w[0], w[1]))
    }

    pub fn length(&self) -> CoordF {
        self.lines().map(|l| l.length()).sum()
    }

    /// Material volume of the whole path (mm³).
    pub fn volume(&self) -> CoordF {
        self.length() * self.mm3_per_mm
    }
}

/// Either a single path or an ordered, possibly nested, group of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtrusionEntity {
    Path(ExtrusionPath),
    Collection(Vec<ExtrusionEntity>),
}

impl ExtrusionEntity {
    /// Role of a single path; collections report `Mixed` unless all children agree.
    pub fn role(&self) -> ExtrusionRole {
        match self {
            ExtrusionEntity::Path(path) => path.role(),
            ExtrusionEntity::Collection(children) => {
                let mut roles = children.iter().map(ExtrusionEntity::role);
                match roles.next() {
                    None => ExtrusionRole::None,
                    Some(first) => {
                        if roles.all(|r| r == first) {
                            first
                        } else {
                            ExtrusionRole::Mixed
                        }
                    }
                }
            }
        }
    }

    /// Call `f` on every path in print order, descending into collections.
    pub fn visit_paths<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a ExtrusionPath),
    {
        match self {
            ExtrusionEntity::Path(path) => f(path),
            ExtrusionEntity::Collection(children) => {
                for child in children {
                    child.visit_paths(f);
                }
            }
        }
    }

    /// All paths in print order.
    pub fn flatten(&self) -> Vec<&ExtrusionPath> {
        let mut paths = Vec::new();
        self.visit_paths(&mut |p| paths.push(p));
        paths
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ExtrusionEntity::Path(path) => path.is_empty(),
            ExtrusionEntity::Collection(children) => children.iter().all(ExtrusionEntity::is_empty),
        }
    }
}

impl From<ExtrusionPath> for ExtrusionEntity {
    fn from(path: ExtrusionPath) -> Self {
        ExtrusionEntity::Path(path)
    }
}
