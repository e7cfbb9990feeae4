//! Layer-by-layer analysis of one object.

use super::accumulator::{AccumulatorId, ConnectivityGraph};
use super::bridging::{check_extrusion_path, sample_path, ExtrusionLine};
use super::curling::estimate_curling;
use super::equilibrium::{check_global_stability, check_weak_connections, group_lines_by_part};
use super::islands::{collect_layer_islands, resolve_object_parts};
use super::{LayerInfo, SupportSpotsReport};
use crate::config::SupportSpotsConfig;
use crate::extrusion::ExtrusionPath;
use crate::geometry::LineIndex;
use crate::print::PrintObject;
use crate::slice::Layer;
use rayon::prelude::*;
use tracing::debug;

/// State carried from one layer to the next.
pub(crate) struct ObjectAnalysisContext<'c> {
    config: &'c SupportSpotsConfig,
    bed_adhesion: f64,
    graph: ConnectivityGraph,
    /// Sampled lines of the last processed layer.
    previous: LineIndex<ExtrusionLine>,
    report: SupportSpotsReport,
}

impl<'c> ObjectAnalysisContext<'c> {
    pub fn new(config: &'c SupportSpotsConfig, bed_adhesion: f64) -> Self {
        Self {
            config,
            bed_adhesion,
            graph: ConnectivityGraph::new(),
            previous: LineIndex::default(),
            report: SupportSpotsReport::default(),
        }
    }

    pub fn process_layer(&mut self, index: usize, layer: &Layer) {
        let info = LayerInfo {
            index,
            print_z: layer.print_z(),
            height: layer.height(),
        };
        let paths = layer.extrusion_paths();
        let first_new_id = self.graph.len();

        let mut sampled = self.sample_paths(&paths);
        let mut support_points = Vec::new();
        if info.is_first() {
            self.attach_to_bed(&mut sampled, &info);
        } else {
            for lines in &mut sampled {
                check_extrusion_path(
                    lines,
                    &self.previous,
                    &mut self.graph,
                    &info,
                    self.config,
                    &mut support_points,
                );
            }
        }

        let mut lines: Vec<ExtrusionLine> = sampled.into_iter().flatten().collect();
        if !info.is_first() {
            estimate_curling(
                &mut lines,
                &self.previous,
                &info,
                self.config,
                &mut self.report.curled_filaments,
            );
        }
        let islands = collect_layer_islands(&mut lines, &self.previous, &info, layer.islands());

        let current = LineIndex::new(lines);
        self.merge_touching_parts(&current, first_new_id, &info);

        let groups = group_lines_by_part(current.lines(), &self.graph);
        check_global_stability(
            current.lines(),
            &groups,
            &mut self.graph,
            &info,
            self.config,
            &mut support_points,
        );
        check_weak_connections(current.lines(), &groups, &info, self.config, &mut support_points);

        debug!(
            layer = index,
            print_z = info.print_z,
            lines = current.len(),
            parts = groups.len(),
            support_points = support_points.len(),
            "layer analysed"
        );

        self.report.support_points.extend(support_points);
        self.report.islands.extend(islands);
        self.previous = current;
    }

    /// Subdivide every path and measure it against the previous layer.
    fn sample_paths(&self, paths: &[&ExtrusionPath]) -> Vec<Vec<ExtrusionLine>> {
        let previous = &self.previous;
        let config = self.config;
        if config.parallel {
            paths
                .par_iter()
                .enumerate()
                .map(|(idx, path)| sample_path(path, idx, previous, config))
                .collect()
        } else {
            paths
                .iter()
                .enumerate()
                .map(|(idx, path)| sample_path(path, idx, previous, config))
                .collect()
        }
    }

    /// First layer: every path is its own part, stuck to the bed along its whole length.
    fn attach_to_bed(&mut self, sampled: &mut [Vec<ExtrusionLine>], info: &LayerInfo) {
        for lines in sampled.iter_mut().filter(|lines| !lines.is_empty()) {
            let id = self.graph.create();
            for line in lines.iter_mut() {
                let sticking = line.len * line.width * self.bed_adhesion;
                self.graph
                    .add_base_extrusion(id, &line.line, sticking, info.mid_z(), line.mm3_per_mm);
                line.acc_id = Some(id);
            }
        }
    }

    /// Merge parts whose lines touch within this layer.
    ///
    /// On the first layer every contact counts. Above it, only parts created on this layer
    /// are joined; parts that already existed merge only through the material below.
    fn merge_touching_parts(&mut self, current: &LineIndex<ExtrusionLine>, first_new_id: AccumulatorId, info: &LayerInfo) {
        for line in current.lines() {
            let Some(id) = line.acc_id else {
                continue;
            };
            for other_idx in current.lines_within(&line.line.b, line.width) {
                let Some(other) = current.line(other_idx).and_then(|l| l.acc_id) else {
                    continue;
                };
                let (a, b) = (self.graph.resolve(id), self.graph.resolve(other));
                if a == b {
                    continue;
                }
                if info.is_first() || (a >= first_new_id && b >= first_new_id) {
                    self.graph.merge(a, b);
                }
            }
        }
    }

    pub fn finish(mut self) -> SupportSpotsReport {
        resolve_object_parts(&mut self.report.islands, &self.graph);
        self.report
    }
}

/// Run the whole analysis for `object`. The configuration must already be validated.
pub(crate) fn analyze_object(object: &PrintObject, config: &SupportSpotsConfig) -> SupportSpotsReport {
    let bed_adhesion = config.bed_adhesion_yield_strength(object.filament_types());
    let mut context = ObjectAnalysisContext::new(config, bed_adhesion);
    for (index, layer) in object.layers().iter().enumerate() {
        context.process_layer(index, layer);
    }
    context.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::{ExtrusionPath, ExtrusionRole};
    use crate::geometry::{PointF, Polygon};
    use crate::slice::LayerRegion;
    use crate::support_spots::SupportPointCause;

    fn square_loop(min: (f64, f64), size: f64) -> ExtrusionPath {
        let (x, y) = min;
        ExtrusionPath::new(
            vec![
                PointF::new(x, y),
                PointF::new(x + size, y),
                PointF::new(x + size, y + size),
                PointF::new(x, y + size),
                PointF::new(x, y),
            ],
            ExtrusionRole::ExternalPerimeter,
            0.45,
            0.2,
            0.08,
        )
    }

    fn layer_with(index: usize, paths: Vec<ExtrusionPath>) -> Layer {
        let mut layer = Layer::new(index, 0.2 * (index + 1) as f64, 0.2);
        layer.add_region(LayerRegion::with_entities(
            paths.into_iter().map(Into::into).collect(),
            Vec::new(),
        ));
        layer
    }

    #[test]
    fn test_first_layer_parts_touching_merge() {
        let config = SupportSpotsConfig::default();
        let mut context = ObjectAnalysisContext::new(&config, 1.0);
        // Two loops 0.3 mm apart share a corner neighbourhood.
        context.process_layer(
            0,
            &layer_with(0, vec![square_loop((0.0, 0.0), 10.0), square_loop((10.3, 0.0), 10.0)]),
        );
        let live: Vec<_> = context.graph.live_ids().collect();
        assert_eq!(live.len(), 1);
        assert!(context.graph.get(live[0]).is_bed_anchored());
    }

    #[test]
    fn test_first_layer_separate_parts_stay_apart() {
        let config = SupportSpotsConfig::default();
        let mut context = ObjectAnalysisContext::new(&config, 1.0);
        context.process_layer(
            0,
            &layer_with(0, vec![square_loop((0.0, 0.0), 10.0), square_loop((30.0, 0.0), 10.0)]),
        );
        assert_eq!(context.graph.live_ids().count(), 2);
    }

    #[test]
    fn test_stacked_loops_join_their_base() {
        let config = SupportSpotsConfig::default();
        let mut context = ObjectAnalysisContext::new(&config, 1.0);
        for index in 0..5 {
            context.process_layer(index, &layer_with(index, vec![square_loop((0.0, 0.0), 20.0)]));
        }
        assert_eq!(context.graph.live_ids().count(), 1);
        let report = context.finish();
        assert_eq!(report.local_support_points().count(), 0);
    }

    #[test]
    fn test_loop_in_the_air_gets_local_points() {
        let config = SupportSpotsConfig::default();
        let mut context = ObjectAnalysisContext::new(&config, 1.0);
        context.process_layer(0, &layer_with(0, vec![square_loop((0.0, 0.0), 10.0)]));
        context.process_layer(1, &layer_with(1, vec![square_loop((50.0, 0.0), 20.0)]));
        let report = context.finish();

        let local: Vec<_> = report.local_support_points().collect();
        assert!(!local.is_empty());
        assert_eq!(local[0].cause(), SupportPointCause::FloatingBridgeAnchor);
        assert!(local.iter().all(|p| p.position().x >= 50.0 - 1e-9));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let parallel = SupportSpotsConfig::default();
        let sequential = SupportSpotsConfig {
            parallel: false,
            ..Default::default()
        };
        let mut object = PrintObject::new("steps");
        object.set_layers(
            (0..6)
                .map(|i| layer_with(i, vec![square_loop((3.0 * i as f64, 0.0), 10.0)]))
                .collect(),
        );
        assert_eq!(analyze_object(&object, &parallel), analyze_object(&object, &sequential));
    }

    #[test]
    fn test_island_reports_are_collected() {
        let config = SupportSpotsConfig::default();
        let mut object = PrintObject::new("islands");
        let mut layers = Vec::new();
        for i in 0..3 {
            let mut layer = layer_with(i, vec![square_loop((0.0, 0.0), 10.0)]);
            layer.set_islands(vec![Polygon::rectangle(
                PointF::new(-0.2, -0.2),
                PointF::new(10.2, 10.2),
            )]);
            layers.push(layer);
        }
        object.set_layers(layers);

        let report = analyze_object(&object, &config);
        assert_eq!(report.islands().len(), 3);
        assert!(report.islands()[0].connected_below.is_empty());
        assert_eq!(report.islands()[2].connected_below.len(), 1);
        let part = report.islands()[0].object_part;
        assert!(part.is_some());
        assert!(report.islands().iter().all(|i| i.object_part == part));
    }
}
