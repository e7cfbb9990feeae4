//! Layer data structure.
//!
//! A [`Layer`] is one horizontal slice of an object as handed over by the slicer: its
//! height, the extrusion entities of each region, and optionally the outlines of its
//! islands (connected areas of the slice).

use crate::extrusion::{ExtrusionEntity, ExtrusionPath};
use crate::geometry::Polygon;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a single layer of a sliced object.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Layer index (0-based).
    #[serde(default)]
    id: usize,

    /// Z coordinate of the top of this layer (mm).
    print_z: CoordF,

    /// Height/thickness of this layer (mm).
    height: CoordF,

    /// The printing regions at this layer.
    #[serde(default)]
    regions: Vec<LayerRegion>,

    /// Outlines of the connected areas of this layer, if known.
    #[serde(default)]
    islands: Vec<Polygon>,
}

impl Layer {
    /// Create a new layer.
    pub fn new(id: usize, print_z: CoordF, height: CoordF) -> Self {
        Self {
            id,
            print_z,
            height,
            regions: Vec::new(),
            islands: Vec::new(),
        }
    }

    /// Get the layer ID.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Get the top Z coordinate of the layer (mm).
    #[inline]
    pub fn print_z(&self) -> CoordF {
        self.print_z
    }

    /// Get the bottom Z coordinate (mm).
    #[inline]
    pub fn bottom_z(&self) -> CoordF {
        self.print_z - self.height
    }

    /// Get the layer height/thickness (mm).
    #[inline]
    pub fn height(&self) -> CoordF {
        self.height
    }

    /// Get the layer regions.
    #[inline]
    pub fn regions(&self) -> &[LayerRegion] {
        &self.regions
    }

    /// Add a region to this layer.
    pub fn add_region(&mut self, region: LayerRegion) {
        self.regions.push(region);
    }

    /// Get or create a region at the given index.
    pub fn get_or_create_region(&mut self, idx: usize) -> &mut LayerRegion {
        while self.regions.len() <= idx {
            self.regions.push(LayerRegion::new());
        }
        &mut self.regions[idx]
    }

    #[inline]
    pub fn islands(&self) -> &[Polygon] {
        &self.islands
    }

    pub fn set_islands(&mut self, islands: Vec<Polygon>) {
        self.islands = islands;
    }

    /// Check if this is the first layer.
    #[inline]
    pub fn is_first_layer(&self) -> bool {
        self.id == 0
    }

    /// Every extrusion path of the layer in print order: region by region, perimeters
    /// before fills.
    pub fn extrusion_paths(&self) -> Vec<&ExtrusionPath> {
        let mut paths = Vec::new();
        for region in &self.regions {
            region.visit_paths(&mut |p| paths.push(p));
        }
        paths
    }

    /// Check if this layer has no extrusions.
    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(LayerRegion::is_empty)
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer(id={}, z={:.3}mm, height={:.3}mm, {} regions, {} islands)",
            self.id,
            self.print_z,
            self.height,
            self.regions.len(),
            self.islands.len()
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer {} at z={:.3}mm (height={:.3}mm)",
            self.id, self.print_z, self.height
        )
    }
}

/// The extrusions of one printing region within a layer.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerRegion {
    /// Perimeter extrusion entities.
    #[serde(default)]
    pub perimeters: Vec<ExtrusionEntity>,

    /// Fill extrusion entities (infill, gap fill, bridges).
    #[serde(default)]
    pub fills: Vec<ExtrusionEntity>,
}

impl LayerRegion {
    /// Create a new empty layer region.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(perimeters: Vec<ExtrusionEntity>, fills: Vec<ExtrusionEntity>) -> Self {
        Self { perimeters, fills }
    }

    /// Check if this region has no extrusions.
    pub fn is_empty(&self) -> bool {
        self.perimeters.iter().all(ExtrusionEntity::is_empty)
            && self.fills.iter().all(ExtrusionEntity::is_empty)
    }

    /// Visit perimeters then fills, descending into collections.
    pub fn visit_paths<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a ExtrusionPath),
    {
        for entity in self.perimeters.iter().chain(self.fills.iter()) {
            entity.visit_paths(f);
        }
    }
}

impl fmt::Debug for LayerRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LayerRegion({} perimeters, {} fills)",
            self.perimeters.len(),
            self.fills.len()
        )
    }
}

/// Type alias for a collection of layers.
pub type Layers = Vec<Layer>;
