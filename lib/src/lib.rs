//! # Support spots
//!
//! Printability analysis over already-sliced extrusion paths. The object is walked layer by
//! layer, bottom to top, to predict two classes of failure before they happen:
//!
//! - **Local**: extrusion laid over open air for long enough to sag or curl
//!   (see [`support_spots::bridging`]).
//! - **Global**: a connected mass of material whose hold on the bed, or on the material
//!   below it, is too weak against inertia, nozzle drag and its own weight
//!   (see [`support_spots::equilibrium`]).
//!
//! The result is a flat list of [`SupportPoint`]s plus an ancillary list of
//! [`CurledFilament`]s. Nothing is persisted and the input is never modified.
//!
//! ```rust,ignore
//! use support_spots::{find_support_spots, PrintObject, SupportSpotsConfig};
//!
//! let object = PrintObject::from_json(&std::fs::read_to_string("object.json")?)?;
//! let report = find_support_spots(&object, &SupportSpotsConfig::default())?;
//! for point in report.support_points() {
//!     println!("{:?} at {}", point.cause(), point.position());
//! }
//! ```

pub mod config;
pub mod extrusion;
pub mod flow;
pub mod geometry;
pub mod print;
pub mod slice;
pub mod support_spots;

/// Floating-point coordinate in millimeters.
pub type CoordF = f64;

/// Tolerance used for degenerate geometry checks (mm).
pub const EPSILON: CoordF = 1e-6;

pub use config::{ConfigError, ConfigResult, SupportSpotsConfig};
pub use extrusion::{ExtrusionEntity, ExtrusionPath, ExtrusionRole};
pub use geometry::{PointF, Point3F};
pub use print::{Print, PrintObject};
pub use slice::{Layer, LayerRegion};
pub use support_spots::{
    find_support_spots, find_support_spots_for_print, CurledFilament, SupportPoint,
    SupportPointCause, SupportSpotsError, SupportSpotsReport, SupportSpotsResult,
};
