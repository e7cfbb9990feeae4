//! Estimate of filament curling up on overhangs.
//!
//! Filament laid slightly past the edge of the layer below swells up, and the curl carries
//! over (reduced by each new layer) to extrusions printed on top of it.

use super::bridging::ExtrusionLine;
use super::{CurledFilament, LayerInfo};
use crate::config::SupportSpotsConfig;
use crate::geometry::LineIndex;
use crate::CoordF;
use std::f64::consts::PI;

/// Lines closer than this many widths to the layer below inherit its curl.
const INHERIT_DISTANCE_FACTOR: f64 = 3.0;

/// Share of the layer height by which an inherited curl is flattened.
const FLATTENING_FACTOR: f64 = 0.75;

/// Curl height at the end of `line`, given the curl of the line below it.
pub fn curled_height(line: &ExtrusionLine, below_curl: CoordF, layer_height: CoordF, config: &SupportSpotsConfig) -> CoordF {
    let distance = line.below_distance;
    if !distance.is_finite() {
        return 0.0;
    }

    let mut curled = 0.0;
    if distance.abs() < INHERIT_DISTANCE_FACTOR * line.width {
        curled = (below_curl - FLATTENING_FACTOR * layer_height).max(0.0);
    }

    let band_min = config.curling_min_distance_factor * line.width;
    let band_max = config.curling_max_distance_factor * line.width;
    if distance > band_min && distance < band_max {
        let swelling = ((layer_height + distance) / 2.0 - layer_height).max(0.0);
        // Convex turns lift the filament further.
        let convexity = layer_height * line.turn.max(0.0) / PI;
        curled += swelling + convexity;
    }
    curled
}

/// Set the curl height of every line of the layer and report the ones worth mentioning.
pub fn estimate_curling(
    lines: &mut [ExtrusionLine],
    below: &LineIndex<ExtrusionLine>,
    layer: &LayerInfo,
    config: &SupportSpotsConfig,
    curled: &mut Vec<CurledFilament>,
) {
    for line in lines.iter_mut() {
        let below_curl = line
            .below_line
            .and_then(|idx| below.line(idx))
            .map_or(0.0, |l| l.curled_up_height);
        let height = curled_height(line, below_curl, layer.height, config);
        line.curled_up_height = height;

        if height > config.min_curled_height {
            curled.push(CurledFilament {
                position: line.line.b.to_3d(layer.print_z),
                estimated_height: height,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::{ExtrusionPath, ExtrusionRole};
    use crate::geometry::{Line, PointF};
    use approx::assert_abs_diff_eq;

    fn layer() -> LayerInfo {
        LayerInfo {
            index: 5,
            print_z: 1.2,
            height: 0.2,
        }
    }

    /// One line of the previous layer along y = 0, heading +x, with the given curl.
    fn below(curl: CoordF) -> LineIndex<ExtrusionLine> {
        let path = ExtrusionPath::new(vec![], ExtrusionRole::ExternalPerimeter, 0.45, 0.2, 0.08);
        let mut line = ExtrusionLine::new(Line::new(PointF::new(-10.0, 0.0), PointF::new(10.0, 0.0)), &path, 0);
        line.curled_up_height = curl;
        LineIndex::new(vec![line])
    }

    fn current_line(y: CoordF, below: &LineIndex<ExtrusionLine>) -> ExtrusionLine {
        let path = ExtrusionPath::new(vec![], ExtrusionRole::ExternalPerimeter, 0.45, 0.2, 0.08);
        let mut line = ExtrusionLine::new(Line::new(PointF::new(-1.0, y), PointF::new(1.0, y)), &path, 0);
        let probe = below.signed_distance(&line.line.b);
        line.below_distance = probe.distance;
        line.below_line = probe.line_idx;
        line
    }

    #[test]
    fn test_overhang_in_band_curls() {
        let below = below(0.0);
        // 0.4 mm outside the edge (right of the direction).
        let mut lines = vec![current_line(-0.4, &below)];
        let mut curled = Vec::new();
        estimate_curling(&mut lines, &below, &layer(), &SupportSpotsConfig::default(), &mut curled);

        assert_abs_diff_eq!(lines[0].curled_up_height, 0.1, epsilon = 1e-12);
        assert_eq!(curled.len(), 1);
        assert_abs_diff_eq!(curled[0].position.z, 1.2);
    }

    #[test]
    fn test_small_overhang_does_not_curl() {
        let below = below(0.0);
        let mut lines = vec![current_line(-0.1, &below), current_line(1.0, &below)];
        let mut curled = Vec::new();
        estimate_curling(&mut lines, &below, &layer(), &SupportSpotsConfig::default(), &mut curled);
        assert!(curled.is_empty());
        assert_eq!(lines[0].curled_up_height, 0.0);
    }

    #[test]
    fn test_curl_is_inherited_and_flattened() {
        let below = below(0.5);
        let mut lines = vec![current_line(0.2, &below)];
        let mut curled = Vec::new();
        estimate_curling(&mut lines, &below, &layer(), &SupportSpotsConfig::default(), &mut curled);
        assert_abs_diff_eq!(lines[0].curled_up_height, 0.35, epsilon = 1e-12);
        assert_eq!(curled.len(), 1);
    }

    #[test]
    fn test_far_from_layer_below_forgets_curl() {
        let below = below(0.5);
        let line = current_line(-5.0, &below);
        assert_eq!(curled_height(&line, 0.5, 0.2, &SupportSpotsConfig::default()), 0.0);
    }

    #[test]
    fn test_convex_turn_adds_curl() {
        let below = below(0.0);
        let mut line = current_line(-0.4, &below);
        let straight = curled_height(&line, 0.0, 0.2, &SupportSpotsConfig::default());
        line.turn = PI / 2.0;
        let turning = curled_height(&line, 0.0, 0.2, &SupportSpotsConfig::default());
        assert_abs_diff_eq!(turning - straight, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_nothing_below() {
        let empty = LineIndex::default();
        let line = current_line(0.0, &empty);
        assert_eq!(curled_height(&line, 0.0, 0.2, &SupportSpotsConfig::default()), 0.0);
    }
}
