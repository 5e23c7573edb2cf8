use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};

use fixpoint::builtin::Closure;
use fixpoint::fact::Fact;
use fixpoint::locked::LockedBitSet;
use fixpoint::solver::Solver;

fn test_and_set_contended(c: &mut Criterion) {
    c.bench_function("test_and_set 4 threads x 10k", |b| {
        b.iter(|| {
            let set = Arc::new(LockedBitSet::new());
            let handles: Vec<_> = (0..4u64)
                .map(|t| {
                    let set = Arc::clone(&set);
                    // overlapping ranges so half of the calls lose the race
                    thread::spawn(move || {
                        (t * 5_000..t * 5_000 + 10_000)
                            .filter(|&id| set.test_and_set(Fact::new(id)))
                            .count()
                    })
                })
                .collect();
            let won: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            black_box(won)
        })
    });
}

fn ring_closure(c: &mut Criterion) {
    let edges: Vec<(u64, u64)> = (0..80).map(|n| (n, (n + 1) % 80)).collect();
    let closure = Closure::new(&edges).unwrap();
    for threads in [1, 4] {
        c.bench_function(&format!("closure of an 80-ring, {threads} threads"), |b| {
            b.iter(|| {
                let mut solver = Solver::new(closure.program());
                solver.init(threads).unwrap();
                solver.compute().unwrap();
                black_box(solver.end().unwrap().len())
            })
        });
    }
}

criterion_group!(benches, test_and_set_contended, ring_closure);
criterion_main!(benches);
