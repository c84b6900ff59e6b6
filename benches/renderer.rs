use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use stage_funnel::config::Config;
use stage_funnel::graph::build;
use stage_funnel::ir::{FieldDescriptor, FieldValue, QueryFields, Row};
use stage_funnel::layout::LayoutEngine;
use stage_funnel::normalize::{normalize_rows, visible_dimensions};
use stage_funnel::render::render_svg;
use stage_funnel::text_metrics::FallbackMetrics;
use stage_funnel::vis::build_frame;
use stage_funnel::VisConfig;
use std::hint::black_box;

const STAGES: [(&str, &str); 4] = [
    ("Eligible", "Ineligible"),
    ("Targeting Matched", "Targeting Unmatched"),
    ("Post-Processing Passed", "Post-Processing Dropped"),
    ("Bid OK", "No Bid"),
];

fn fields(extra_dims: usize) -> QueryFields {
    let mut dimension_like: Vec<FieldDescriptor> = (0..extra_dims)
        .map(|idx| FieldDescriptor::new(&format!("segment_{idx}"), &format!("Segment {idx}")))
        .collect();
    for (idx, _) in STAGES.iter().enumerate() {
        dimension_like.push(FieldDescriptor::new(&format!("stage_{idx}"), &format!("Stage {idx}")));
    }
    QueryFields {
        dimension_like,
        measure_like: vec![FieldDescriptor::new("count", "Requests")],
        pivots: Vec::new(),
    }
}

/// Rows failing at every stage in turn, fanned out over `segments` values per
/// extra dimension.
fn funnel_rows(extra_dims: usize, segments: usize) -> Vec<Row> {
    let mut rows = Vec::new();
    let combos = segments.pow(extra_dims as u32);
    for combo in 0..combos {
        for fail_at in 0..=STAGES.len() {
            let mut row = Row::new();
            let mut rest = combo;
            for dim in 0..extra_dims {
                row.insert(
                    format!("segment_{dim}"),
                    FieldValue::new(format!("S{}", rest % segments)),
                );
                rest /= segments;
            }
            for (idx, (success, failure)) in STAGES.iter().enumerate() {
                let value = if idx < fail_at {
                    json!(success)
                } else if idx == fail_at {
                    json!(failure)
                } else {
                    json!(null)
                };
                row.insert(format!("stage_{idx}"), FieldValue::new(value));
            }
            row.insert(
                "count".to_string(),
                FieldValue::new(((combo + 1) * 100 + fail_at * 7) as f64),
            );
            rows.push(row);
        }
    }
    rows
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");
    let config = Config::default();
    for (extra_dims, segments) in [(1usize, 4usize), (2, 6), (3, 8)] {
        let fields = fields(extra_dims);
        let rows = funnel_rows(extra_dims, segments);
        let name = format!("rows_{}", rows.len());
        group.bench_with_input(BenchmarkId::from_parameter(name), &rows, |b, rows| {
            b.iter(|| {
                let visible = visible_dimensions(&fields.dimension_like, &[]);
                let paths = normalize_rows(
                    black_box(rows),
                    &visible,
                    &fields.measure_like[0],
                    &config.stages,
                );
                black_box(build(&paths, &config.stages).links.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = Config::default();
    let engine = config.layout_engine();
    for (extra_dims, segments) in [(1usize, 4usize), (2, 6), (3, 8)] {
        let fields = fields(extra_dims);
        let rows = funnel_rows(extra_dims, segments);
        let visible = visible_dimensions(&fields.dimension_like, &[]);
        let paths = normalize_rows(&rows, &visible, &fields.measure_like[0], &config.stages);
        let graph = build(&paths, &config.stages);
        let extent = stage_funnel::layout::Extent::new(28.0, 20.0, 810.0, 500.0);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("nodes_{}", graph.nodes.len())),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let layout = engine.layout(black_box(graph), extent);
                    black_box(layout.nodes.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    let engine = config.layout_engine();
    let vis_config = VisConfig::default();
    for (extra_dims, segments) in [(1usize, 4usize), (2, 6)] {
        let fields = fields(extra_dims);
        let rows = funnel_rows(extra_dims, segments);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("rows_{}", rows.len())),
            &rows,
            |b, rows| {
                b.iter(|| {
                    let frame = build_frame(
                        black_box(rows),
                        &fields,
                        &vis_config,
                        960.0,
                        540.0,
                        &config,
                        &engine,
                        &FallbackMetrics,
                    )
                    .expect("valid fields");
                    black_box(render_svg(&frame, &config).len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_graph, bench_layout, bench_end_to_end);
criterion_main!(benches);
