//! Benchmark: hydration reordering on large child lists

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use reinhardt_hydration::lis::longest_non_decreasing;
use reinhardt_hydration::{Document, init_hydrate, plan_reorder};

/// Deterministic shuffle so runs are comparable.
fn scrambled(n: u32) -> Vec<u32> {
	let mut state = 0x2545_f491_u64;
	let mut orders: Vec<u32> = (0..n).collect();
	for i in (1..orders.len()).rev() {
		state ^= state << 13;
		state ^= state >> 7;
		state ^= state << 17;
		let j = (state % (i as u64 + 1)) as usize;
		orders.swap(i, j);
	}
	orders
}

fn benchmark_lis(c: &mut Criterion) {
	let mut group = c.benchmark_group("longest_non_decreasing");
	for n in [64u32, 1_024, 16_384] {
		let orders = scrambled(n);
		group.bench_with_input(BenchmarkId::from_parameter(n), &orders, |b, orders| {
			b.iter(|| longest_non_decreasing(black_box(orders)))
		});
	}
	group.finish();
}

fn benchmark_plan(c: &mut Criterion) {
	let orders = scrambled(4_096);
	c.bench_function("plan_reorder_4096", |b| {
		b.iter(|| plan_reorder(black_box(&orders)))
	});
}

fn benchmark_init_hydrate(c: &mut Criterion) {
	let orders = scrambled(1_024);
	c.bench_function("init_hydrate_1024", |b| {
		b.iter_with_setup(
			|| {
				let mut doc = Document::new();
				let root = doc.root();
				for &order in &orders {
					let node = doc.create_element("li");
					doc.append_child(root, node).unwrap();
					doc.set_claim_order(node, Some(order)).unwrap();
				}
				doc
			},
			|mut doc| {
				let root = doc.root();
				init_hydrate(&mut doc, root).unwrap();
				doc
			},
		)
	});
}

criterion_group!(
	benches,
	benchmark_lis,
	benchmark_plan,
	benchmark_init_hydrate
);
criterion_main!(benches);
