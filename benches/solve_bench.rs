use criterion::{black_box, criterion_group, criterion_main, Criterion};

use compartmental_tree::{CompartmentParams, Node, ReceptorKind, ReceptorParams};

fn passive(c_m: f64, g_c: f64, g_l: f64, e_l: f64) -> CompartmentParams {
    CompartmentParams {
        c_m,
        g_c,
        g_l,
        e_l,
    }
}

fn build_chain(n: usize) -> Node {
    let mut node = Node::new(0.1, 0.0, 16);
    node.add_compartment(0, -1, passive(1.0, 0.0, 0.1, -70.0))
        .unwrap();
    for i in 1..n {
        node.add_compartment(i as i64, (i - 1) as i64, passive(1.0, 0.5, 0.1, -70.0))
            .unwrap();
    }
    node
}

fn build_balanced_tree(depth: u32) -> Node {
    let mut node = Node::new(0.1, 0.0, 16);
    node.add_compartment(0, -1, passive(1.0, 0.0, 0.1, -70.0))
        .unwrap();
    let mut next_idx = 1i64;
    let mut frontier = vec![0i64];
    for _ in 0..depth {
        let mut next_frontier = Vec::new();
        for &parent in &frontier {
            for _ in 0..2 {
                node.add_compartment(next_idx, parent, passive(1.0, 0.5, 0.1, -70.0))
                    .unwrap();
                next_frontier.push(next_idx);
                next_idx += 1;
            }
        }
        frontier = next_frontier;
    }
    node
}

fn bench_single_step_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_chain");
    for &n in &[2usize, 8, 32, 128] {
        group.bench_function(format!("n{n}"), |b| {
            let mut node = build_chain(n);
            b.iter(|| {
                node.tick(black_box(0), black_box(0), black_box(1)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_balanced_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_balanced_tree");
    for &depth in &[2u32, 4, 6] {
        group.bench_function(format!("depth{depth}"), |b| {
            let mut node = build_balanced_tree(depth);
            b.iter(|| {
                node.tick(black_box(0), black_box(0), black_box(1)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_with_active_currents(c: &mut Criterion) {
    c.bench_function("tick_hh_plus_ampa", |b| {
        let mut node = Node::new(0.1, 0.0, 16);
        node.add_compartment(0, -1, passive(1.0, 0.0, 0.0003, -54.4))
            .unwrap();
        node.set_na_channel(0, 0.12, 50.0).unwrap();
        node.set_k_channel(0, 0.036, -77.0).unwrap();
        let receptor = node
            .add_receptor(0, ReceptorKind::Ampa, ReceptorParams::default())
            .unwrap();
        node.deliver_spike(receptor, 0, 1.0, 1.0).unwrap();
        b.iter(|| {
            node.tick(black_box(0), black_box(0), black_box(16)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_single_step_chain,
    bench_balanced_tree,
    bench_with_active_currents
);
criterion_main!(benches);
