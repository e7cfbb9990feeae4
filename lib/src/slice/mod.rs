//! Sliced layer data consumed by the analysis.

mod layer;

pub use layer::{Layer, LayerRegion, Layers};
