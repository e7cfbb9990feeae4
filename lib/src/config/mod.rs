//! Configuration module for the support-spot analysis.
//!
//! - [`SupportSpotsConfig`] - tunable physical and geometric constants, loadable from JSON
//! - [`bed_adhesion_for_material`] - built-in bed adhesion table per filament type

mod material;
mod support_spots_config;

pub use material::{bed_adhesion_for_material, PLA_BED_ADHESION};
pub use support_spots_config::SupportSpotsConfig;

/// Error type for configuration and input loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
