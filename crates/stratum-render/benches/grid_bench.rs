//! Cell grid write paths: single-cell patches, strings, fills, diffing.
//!
//! Run with: cargo bench -p stratum-render --bench grid_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use stratum_core::geometry::Rect;
use stratum_core::ids::NodeId;
use stratum_render::cell::CellPatch;
use stratum_render::color::PackedRgba;
use stratum_render::diff::FrameDiff;
use stratum_render::grid::CellGrid;

const SIZES: [(u16, u16); 3] = [(80, 24), (120, 40), (200, 60)];

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/fill");
    let patch = CellPatch::char('.')
        .bg(PackedRgba::BLUE)
        .owned_by(NodeId(1), 0);

    for (w, h) in SIZES {
        group.throughput(Throughput::Elements(w as u64 * h as u64));
        let mut grid = CellGrid::new(w, h);
        group.bench_with_input(BenchmarkId::new("fill_region", format!("{w}x{h}")), &(), |b, _| {
            b.iter(|| {
                grid.fill_region(Rect::from_size(w, h), black_box(&patch));
                grid.mark_clean();
            })
        });

        let mut grid = CellGrid::new(w, h);
        group.bench_with_input(BenchmarkId::new("clear", format!("{w}x{h}")), &(), |b, _| {
            b.iter(|| {
                grid.clear();
                black_box(&grid);
            })
        });
    }
    group.finish();
}

fn bench_write_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/write_string");
    let base = CellPatch::new().owned_by(NodeId(1), 0);
    let line = "The quick brown fox jumps over the lazy dog. ".repeat(4);
    let styled = "\x1b[1mbold\x1b[0m and \x1b[38;2;255;0;0mred\x1b[0m text ".repeat(4);
    let wide = "日本語のテキスト ".repeat(8);

    for (name, text) in [("ascii", &line), ("sgr", &styled), ("wide", &wide)] {
        let mut grid = CellGrid::new(200, 1);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new(name, text.len()), text, |b, text| {
            b.iter(|| black_box(grid.write_string(0, 0, black_box(text), &base)))
        });
    }
    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/diff");

    for (w, h) in SIZES {
        let old = CellGrid::new(w, h);
        let mut sparse = old.clone();
        for y in (0..h).step_by(4) {
            sparse.write_string(0, y, "changed", &CellPatch::new());
        }
        let mut dense = old.clone();
        dense.fill_region(Rect::from_size(w, h), &CellPatch::char('#'));

        group.throughput(Throughput::Elements(w as u64 * h as u64));
        group.bench_with_input(
            BenchmarkId::new("identical", format!("{w}x{h}")),
            &(&old, &old),
            |b, (a, z)| b.iter(|| black_box(FrameDiff::compute(a, z))),
        );
        group.bench_with_input(
            BenchmarkId::new("sparse", format!("{w}x{h}")),
            &(&old, &sparse),
            |b, (a, z)| b.iter(|| black_box(FrameDiff::compute(a, z))),
        );
        group.bench_with_input(
            BenchmarkId::new("dense", format!("{w}x{h}")),
            &(&old, &dense),
            |b, (a, z)| b.iter(|| black_box(FrameDiff::compute(a, z).runs())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fill, bench_write_string, bench_diff);
criterion_main!(benches);
