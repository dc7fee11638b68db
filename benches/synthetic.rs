use criterion::{black_box, criterion_group, criterion_main, Criterion};

use curveclip::{
    binary_op,
    generators::{checkerboard, circles, slanted_checkerboard},
    overlay,
    sweep::SweepQueue,
    BinaryOp,
};

fn just_the_sweep(c: &mut Criterion) {
    let (even, odd) = checkerboard(10);
    let extents: Vec<Vec<(f64, f64)>> = [even, odd]
        .iter()
        .map(|region| {
            region
                .rings()
                .iter()
                .flat_map(|r| r.curves())
                .map(|c| {
                    let bbox = c.bounding_box();
                    (bbox.x0, bbox.x1)
                })
                .collect()
        })
        .collect();

    c.bench_function("just the sweep", |b| {
        b.iter(|| {
            let mut queues = [SweepQueue::new(), SweepQueue::new()];
            for (q, ext) in queues.iter_mut().zip(&extents) {
                for (i, &(lo, hi)) in ext.iter().enumerate() {
                    q.add(i, lo, hi);
                }
            }
            let mut pairs = 0usize;
            while let Some(i) = SweepQueue::next(&mut queues) {
                queues[i].take();
                pairs += queues[1 - i].active().count();
            }
            black_box(pairs)
        })
    });
}

fn build_overlay(c: &mut Criterion) {
    let (even, odd) = checkerboard(10);
    c.bench_function("build overlay", |b| {
        b.iter(|| black_box(overlay(&even, &odd)))
    });
}

fn ops(c: &mut Criterion) {
    let (even, odd) = checkerboard(10);
    for (name, op) in [
        ("union", BinaryOp::Union),
        ("intersection", BinaryOp::Intersection),
        ("difference", BinaryOp::Difference),
    ] {
        c.bench_function(name, |b| b.iter(|| black_box(binary_op(&even, &odd, op))));
    }

    let (even, odd) = slanted_checkerboard(10);
    c.bench_function("slanted union", |b| {
        b.iter(|| black_box(binary_op(&even, &odd, BinaryOp::Union)))
    });

    let (even, odd) = circles(6);
    c.bench_function("circle union", |b| {
        b.iter(|| black_box(binary_op(&even, &odd, BinaryOp::Union)))
    });
}

criterion_group!(benches, build_overlay, just_the_sweep, ops);
criterion_main!(benches);
