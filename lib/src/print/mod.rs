//! Analysis input: the sliced objects of one print.
//!
//! - [`Print`] - the objects sharing a bed, analysed one after the other
//! - [`PrintObject`] - layers of one object plus the filament types it is printed with

use crate::config::{ConfigError, ConfigResult};
use crate::slice::Layer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every object placed on the bed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Print {
    #[serde(default)]
    objects: Vec<PrintObject>,
}

impl Print {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: PrintObject) {
        self.objects.push(object);
    }

    /// Objects in the order they were added, which is also the analysis order.
    pub fn objects(&self) -> &[PrintObject] {
        &self.objects
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// A single sliced object.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PrintObject {
    /// Label used in log records.
    #[serde(default)]
    name: String,
    /// Filament types used by the object's extruders, e.g. `["PLA"]`.
    #[serde(default)]
    filament_types: Vec<String>,
    /// Sliced layers, bottom to top.
    #[serde(default)]
    layers: Vec<Layer>,
}

impl PrintObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an object from its layers. Layer ids are renumbered bottom to top.
    pub fn with_layers(name: impl Into<String>, layers: Vec<Layer>) -> Self {
        let mut object = Self::new(name);
        object.set_layers(layers);
        object
    }

    /// Load an object from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse an object from JSON and check that its layers go upwards.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let mut object: PrintObject = serde_json::from_str(json)?;
        let layers = std::mem::take(&mut object.layers);
        object.set_layers(layers);
        object.validate()?;
        Ok(object)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for layer in &self.layers {
            if !(layer.height().is_finite() && layer.height() > 0.0 && layer.print_z().is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "layer {} has invalid height {} or print_z {}",
                    layer.id(),
                    layer.height(),
                    layer.print_z()
                )));
            }
        }
        for pair in self.layers.windows(2) {
            if pair[1].print_z() <= pair[0].print_z() {
                return Err(ConfigError::Invalid(format!(
                    "layers are not ordered bottom to top: layer {} at z={} follows z={}",
                    pair[1].id(),
                    pair[1].print_z(),
                    pair[0].print_z()
                )));
            }
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Replace the layers, numbering them from the bed up.
    pub fn set_layers(&mut self, mut layers: Vec<Layer>) {
        for (id, layer) in layers.iter_mut().enumerate() {
            layer.set_id(id);
        }
        self.layers = layers;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filament_types(&self) -> &[String] {
        &self.filament_types
    }

    pub fn set_filament_types(&mut self, types: Vec<String>) {
        self.filament_types = types;
    }

    /// `false` for an object without layers, which yields an empty report.
    pub fn is_sliced(&self) -> bool {
        self.layers.iter().any(|layer| !layer.is_empty())
    }
}
