//! Bed adhesion strength per filament type.

/// Bed adhesion yield strength of PLA, also the fallback for unknown materials.
pub const PLA_BED_ADHESION: f64 = 0.018e6;

/// Built-in bed adhesion yield strength for a filament type, matched case-insensitively.
///
/// Returns `None` for materials without a table entry.
pub fn bed_adhesion_for_material(filament_type: &str) -> Option<f64> {
    match filament_type.trim().to_ascii_uppercase().as_str() {
        "PLA" => Some(PLA_BED_ADHESION),
        "PET" | "PETG" => Some(0.3e6),
        "ABS" | "ASA" => Some(0.1e6),
        "TPU" => Some(0.2e6),
        _ => None,
    }
}
