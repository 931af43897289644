//! Benchmarks for in-process CSG.
//!
//! Run with: cargo bench -p litho-booleans

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use litho_booleans::csg;
use litho_mesh::{Point3, TriangleMesh};

fn slab(divisions: usize) -> TriangleMesh {
    // Tiled cuboids approximate a finely triangulated lithophane slab
    let step = 40.0 / divisions as f64;
    let mut mesh = TriangleMesh::new();
    for i in 0..divisions {
        let x = i as f64 * step;
        mesh.merge(&TriangleMesh::cuboid(
            Point3::new(x, 0.0, 0.0),
            Point3::new(x + step * 0.999, 40.0, 3.0),
        ));
    }
    mesh
}

fn bench_csg(c: &mut Criterion) {
    let mut group = c.benchmark_group("Csg");
    group.sample_size(10);

    let base = TriangleMesh::cuboid(Point3::origin(), Point3::new(40.0, 40.0, 3.0));
    let hanger = TriangleMesh::cuboid(Point3::new(15.0, 35.0, -1.0), Point3::new(25.0, 38.0, 4.0));
    let stand = TriangleMesh::cuboid(Point3::new(-5.0, -5.0, -1.0), Point3::new(45.0, 1.0, 0.5));

    group.bench_function("difference_box", |b| {
        b.iter(|| csg::difference(black_box(&base), black_box(&hanger)));
    });

    group.bench_function("union_box", |b| {
        b.iter(|| csg::union(black_box(&base), black_box(&stand)));
    });

    let tiled = slab(20);
    group.bench_function("difference_tiled_20", |b| {
        b.iter(|| csg::difference(black_box(&tiled), black_box(&hanger)));
    });

    group.finish();
}

criterion_group!(benches, bench_csg);
criterion_main!(benches);
