//! # Extrusion flow
//!
//! Volume of material laid down per millimeter of an extrusion path. The stability
//! analysis turns this into part mass and mass centroid.
//!
//! Regular extrusions are squashed into a rectangle with semicircular ends:
//!
//! ```text
//! area = height × (width - height × (1 - π/4))
//! ```
//!
//! Bridge threads hang freely and stay round, with the width as diameter.

use crate::extrusion::ExtrusionRole;
use std::f64::consts::PI;
use thiserror::Error;

/// Flow construction errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// The width is too small for the height to leave a positive cross-section.
    #[error("extrusion {width} mm wide cannot be {height} mm high")]
    NegativeSpacing { width: f64, height: f64 },

    #[error("flow cross-section is not positive")]
    NegativeFlow,

    #[error("invalid flow argument: {0}")]
    InvalidArgument(String),
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Cross-section of one extrusion, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    width: f64,
    height: f64,
    bridge: bool,
}

fn check_dimension(name: &str, value: f64) -> FlowResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FlowError::InvalidArgument(format!("{name} must be positive, got {value}")))
    }
}

impl Flow {
    /// Flattened extrusion of the given width and layer height.
    pub fn new(width: f64, height: f64) -> FlowResult<Self> {
        check_dimension("width", width)?;
        check_dimension("height", height)?;
        if width - height * (1.0 - 0.25 * PI) <= 0.0 {
            return Err(FlowError::NegativeSpacing { width, height });
        }
        Ok(Self {
            width,
            height,
            bridge: false,
        })
    }

    /// Round bridge thread.
    pub fn bridging_flow(diameter: f64) -> FlowResult<Self> {
        check_dimension("diameter", diameter)?;
        Ok(Self {
            width: diameter,
            height: diameter,
            bridge: true,
        })
    }

    /// Flow for an extrusion of `role`: bridge infill is printed as round threads.
    pub fn for_role(role: ExtrusionRole, width: f64, height: f64) -> FlowResult<Self> {
        if role == ExtrusionRole::BridgeInfill {
            Self::bridging_flow(width)
        } else {
            Self::new(width, height)
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    /// Cross-sectional area (mm²), i.e. mm³ per mm of travel.
    pub fn mm3_per_mm(&self) -> FlowResult<f64> {
        let area = if self.bridge {
            0.25 * PI * self.width * self.width
        } else {
            self.height * (self.width - self.height * (1.0 - 0.25 * PI))
        };
        if area > 0.0 {
            Ok(area)
        } else {
            Err(FlowError::NegativeFlow)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flattened_cross_section() {
        let flow = Flow::new(0.45, 0.2).unwrap();
        assert!(!flow.is_bridge());
        // 0.2 × (0.45 - 0.2 × 0.2146)
        assert_relative_eq!(flow.mm3_per_mm().unwrap(), 0.081415926535, max_relative = 1e-9);
        // A plain rectangle overestimates by about ten percent.
        assert!(0.45 * 0.2 > flow.mm3_per_mm().unwrap() * 1.1);
    }

    #[test]
    fn test_bridge_thread_is_round() {
        let flow = Flow::bridging_flow(0.4).unwrap();
        assert!(flow.is_bridge());
        assert_relative_eq!(flow.height(), 0.4);
        assert_relative_eq!(flow.mm3_per_mm().unwrap(), PI * 0.04, max_relative = 1e-12);
    }

    #[test]
    fn test_flow_by_role() {
        let bridge = Flow::for_role(ExtrusionRole::BridgeInfill, 0.45, 0.2).unwrap();
        assert!(bridge.is_bridge());
        assert_relative_eq!(bridge.height(), 0.45);
        let wall = Flow::for_role(ExtrusionRole::ExternalPerimeter, 0.45, 0.2).unwrap();
        assert!(!wall.is_bridge());
        assert_relative_eq!(wall.height(), 0.2);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(Flow::new(0.0, 0.2), Err(FlowError::InvalidArgument(_))));
        assert!(matches!(Flow::new(0.45, f64::NAN), Err(FlowError::InvalidArgument(_))));
        assert!(matches!(Flow::bridging_flow(-1.0), Err(FlowError::InvalidArgument(_))));
        assert!(matches!(
            Flow::new(0.1, 0.5),
            Err(FlowError::NegativeSpacing { .. })
        ));
    }
}
