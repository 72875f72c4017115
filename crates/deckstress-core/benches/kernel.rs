use criterion::{Criterion, black_box, criterion_group, criterion_main};
use deckstress_core::kernel::{comb, hypergeom_p_ge_1};

fn kernel_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    group.bench_function("comb_99_49", |b| b.iter(|| comb(black_box(99), black_box(49))));
    for (successes, draws) in [(10i64, 7i64), (12, 12), (36, 12)] {
        group.bench_function(format!("p_ge_1_99_{successes}_{draws}"), |b| {
            b.iter(|| hypergeom_p_ge_1(black_box(99), black_box(successes), black_box(draws)))
        });
    }
    group.finish();
}

criterion_group!(benches, kernel_bench);
criterion_main!(benches);
