//! Per-island bookkeeping.
//!
//! When a layer carries island outlines, every sampled line is assigned to the island
//! around its midpoint. Each island then gets a report with its area, a representative
//! sample point, the part it belongs to and the islands below it rests on.

use super::accumulator::{AccumulatorId, ConnectivityGraph};
use super::bridging::ExtrusionLine;
use super::LayerInfo;
use crate::extrusion::ExtrusionRole;
use crate::geometry::{LineIndex, Polygon, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contact between an island and one island of the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IslandConnection {
    /// Index of the island in the layer below.
    pub island: usize,
    /// Supported extrusion area resting on it (mm²).
    pub area: CoordF,
}

/// Summary of one island of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandReport {
    pub layer: usize,
    /// Index of the island within its layer.
    pub index: usize,
    pub area: CoordF,
    /// Part the island belongs to, once the whole object has been analysed.
    pub object_part: Option<AccumulatorId>,
    /// Midpoint of a representative extrusion, `None` for an island without extrusions.
    pub sample: Option<PointF>,
    pub connected_below: Vec<IslandConnection>,
}

/// Sampling preference: inner material first, the outer wall last.
const SAMPLE_PREFERENCE: [fn(&ExtrusionRole) -> bool; 4] = [
    ExtrusionRole::is_infill,
    ExtrusionRole::is_internal_perimeter,
    ExtrusionRole::is_gap_fill,
    ExtrusionRole::is_external_perimeter,
];

/// Island containing the midpoint of `line`, or the one with the closest boundary.
fn island_of(line: &ExtrusionLine, islands: &[Polygon]) -> Option<usize> {
    let midpoint = line.line.midpoint();
    if let Some(idx) = islands.iter().position(|island| island.contains(&midpoint)) {
        return Some(idx);
    }

    let mut best: Option<(usize, CoordF)> = None;
    for (idx, island) in islands.iter().enumerate() {
        let distance = island.distance_to_boundary(&midpoint);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Set `island` on every line. Lines keep `None` when the layer has no outlines.
pub fn assign_islands(lines: &mut [ExtrusionLine], islands: &[Polygon]) {
    if islands.is_empty() {
        return;
    }
    for line in lines.iter_mut() {
        line.island = island_of(line, islands);
    }
}

/// Representative line of an island, following [`SAMPLE_PREFERENCE`].
pub fn sample_island(lines: &[ExtrusionLine], island: usize) -> Option<&ExtrusionLine> {
    SAMPLE_PREFERENCE.iter().find_map(|prefers| {
        lines
            .iter()
            .find(|l| l.island == Some(island) && !l.is_degenerate() && prefers(&l.role))
    })
}

/// Supported area of `island` resting on each island of the layer below.
pub fn island_connections(
    lines: &[ExtrusionLine],
    below: &LineIndex<ExtrusionLine>,
    island: usize,
) -> Vec<IslandConnection> {
    let mut areas: BTreeMap<usize, CoordF> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.island == Some(island) && l.is_supported()) {
        let below_island = line
            .below_line
            .and_then(|idx| below.line(idx))
            .and_then(|l| l.island);
        if let Some(below_island) = below_island {
            *areas.entry(below_island).or_default() += line.len * line.width;
        }
    }
    areas
        .into_iter()
        .map(|(island, area)| IslandConnection { island, area })
        .collect()
}

/// Assign the layer's lines to `islands` and describe each island.
///
/// `object_part` is left unresolved; see [`resolve_object_parts`].
pub(crate) fn collect_layer_islands(
    lines: &mut [ExtrusionLine],
    below: &LineIndex<ExtrusionLine>,
    layer: &LayerInfo,
    islands: &[Polygon],
) -> Vec<IslandReport> {
    assign_islands(lines, islands);

    islands
        .iter()
        .enumerate()
        .map(|(index, outline)| {
            let sample = sample_island(lines, index);
            IslandReport {
                layer: layer.index,
                index,
                area: outline.area(),
                object_part: sample.and_then(|l| l.acc_id),
                sample: sample.map(|l| l.line.midpoint()),
                connected_below: island_connections(lines, below, index),
            }
        })
        .collect()
}

/// Replace the recorded part ids with their final merged ids.
pub(crate) fn resolve_object_parts(reports: &mut [IslandReport], graph: &ConnectivityGraph) {
    for report in reports {
        report.object_part = report.object_part.map(|id| graph.resolve(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::ExtrusionPath;
    use crate::geometry::Line;
    use approx::assert_abs_diff_eq;

    fn line(a: (f64, f64), b: (f64, f64), role: ExtrusionRole) -> ExtrusionLine {
        let path = ExtrusionPath::new(vec![], role, 0.5, 0.2, 0.1);
        ExtrusionLine::new(
            Line::new(PointF::new(a.0, a.1), PointF::new(b.0, b.1)),
            &path,
            0,
        )
    }

    fn two_islands() -> Vec<Polygon> {
        vec![
            Polygon::rectangle(PointF::new(0.0, 0.0), PointF::new(10.0, 10.0)),
            Polygon::rectangle(PointF::new(20.0, 0.0), PointF::new(30.0, 10.0)),
        ]
    }

    #[test]
    fn test_lines_follow_their_midpoint() {
        let mut lines = vec![
            line((1.0, 1.0), (5.0, 1.0), ExtrusionRole::Perimeter),
            line((21.0, 1.0), (25.0, 1.0), ExtrusionRole::Perimeter),
            // Outside both, closer to the second.
            line((16.0, 5.0), (17.0, 5.0), ExtrusionRole::Perimeter),
        ];
        assign_islands(&mut lines, &two_islands());
        assert_eq!(lines[0].island, Some(0));
        assert_eq!(lines[1].island, Some(1));
        assert_eq!(lines[2].island, Some(1));
    }

    #[test]
    fn test_equidistant_line_goes_to_lower_index() {
        let mut lines = vec![line((15.0, 4.0), (15.0, 6.0), ExtrusionRole::Perimeter)];
        assign_islands(&mut lines, &two_islands());
        assert_eq!(lines[0].island, Some(0));
    }

    #[test]
    fn test_no_outlines_leaves_lines_unassigned() {
        let mut lines = vec![line((1.0, 1.0), (5.0, 1.0), ExtrusionRole::Perimeter)];
        assign_islands(&mut lines, &[]);
        assert_eq!(lines[0].island, None);
    }

    #[test]
    fn test_sample_prefers_infill() {
        let mut lines = vec![
            line((0.5, 0.5), (9.5, 0.5), ExtrusionRole::ExternalPerimeter),
            line((1.0, 1.0), (9.0, 1.0), ExtrusionRole::Perimeter),
            line((2.0, 5.0), (8.0, 5.0), ExtrusionRole::InternalInfill),
            line((21.0, 1.0), (25.0, 1.0), ExtrusionRole::ExternalPerimeter),
        ];
        assign_islands(&mut lines, &two_islands());

        let sample = sample_island(&lines, 0).unwrap();
        assert_eq!(sample.role, ExtrusionRole::InternalInfill);
        let sample = sample_island(&lines, 1).unwrap();
        assert_eq!(sample.role, ExtrusionRole::ExternalPerimeter);
    }

    #[test]
    fn test_connections_sum_supported_area() {
        let mut below_lines = vec![
            line((0.0, 5.0), (10.0, 5.0), ExtrusionRole::InternalInfill),
            line((20.0, 5.0), (30.0, 5.0), ExtrusionRole::InternalInfill),
        ];
        assign_islands(&mut below_lines, &two_islands());
        let below = LineIndex::new(below_lines);

        let mut lines = vec![
            line((1.0, 5.0), (3.0, 5.0), ExtrusionRole::InternalInfill),
            line((3.0, 5.0), (5.0, 5.0), ExtrusionRole::InternalInfill),
            line((8.0, 5.0), (9.0, 5.0), ExtrusionRole::InternalInfill),
        ];
        for l in &mut lines {
            let probe = below.signed_distance(&l.line.b);
            l.below_distance = probe.distance;
            l.below_line = probe.line_idx;
        }
        // The last line hangs in the air.
        lines[2].below_distance = 5.0;

        let layer = LayerInfo {
            index: 1,
            print_z: 0.4,
            height: 0.2,
        };
        let reports = collect_layer_islands(&mut lines, &below, &layer, &two_islands()[..1]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].layer, 1);
        assert_abs_diff_eq!(reports[0].area, 100.0, epsilon = 1e-9);
        assert_eq!(reports[0].connected_below.len(), 1);
        assert_eq!(reports[0].connected_below[0].island, 0);
        assert_abs_diff_eq!(reports[0].connected_below[0].area, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parts_are_resolved() {
        let mut graph = ConnectivityGraph::new();
        let a = graph.create();
        let b = graph.create();
        let keep = graph.merge(a, b);

        let mut reports = vec![IslandReport {
            layer: 0,
            index: 0,
            area: 1.0,
            object_part: Some(b),
            sample: None,
            connected_below: Vec::new(),
        }];
        resolve_object_parts(&mut reports, &graph);
        assert_eq!(reports[0].object_part, Some(keep));
    }
}
