use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pd_layout::config::LayoutConfig;
use pd_layout::layout::{OuterTarget, compute_layout};
use pd_layout::parser::parse_pd_code;
use std::hint::black_box;

const KNOTS: [(&str, &str); 4] = [
    ("kink", "[[1,1,2,2]]"),
    ("two_crossings", "[[1,2,3,4],[2,1,4,3]]"),
    ("trefoil", "[[1,5,2,4],[3,1,4,6],[5,3,6,2]]"),
    ("figure_eight", "[[4,2,5,1],[8,6,1,5],[6,3,7,4],[2,7,3,8]]"),
];

fn bench_layout(c: &mut Criterion) {
    let config = LayoutConfig::default();
    let mut group = c.benchmark_group("compute_layout");
    for (name, source) in KNOTS {
        let Ok(pd) = parse_pd_code(source) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &pd, |b, pd| {
            b.iter(|| {
                let _ = black_box(compute_layout(
                    black_box(pd),
                    OuterTarget::LargestId,
                    &config,
                ));
            })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_pd_code", |b| {
        b.iter(|| parse_pd_code(black_box("PD[X[4,2,5,1], X[8,6,1,5], X[6,3,7,4], X[2,7,3,8]]")))
    });
}

criterion_group!(benches, bench_layout, bench_parse);
criterion_main!(benches);
