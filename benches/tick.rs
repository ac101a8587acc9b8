//! Tick benchmarks for the SimpleAI kernel
//!
//! Run with: cargo bench --bench tick

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use simpleai_kernel::aggro::AggroMgr;
use simpleai_kernel::tree::TreeNodeStatus;
use simpleai_kernel::{Ai, AiRef, AiRegistry, BasicCharacter, TreeBuilder, Vec3, Zone};

const TREE: &str = r#"{
    "type": "PrioritySelector",
    "name": "root",
    "children": [
        { "type": "Chase", "name": "chase", "condition": "Filter(First(SelectHighestAggro))" },
        {
            "type": "Sequence",
            "name": "roam",
            "children": [
                { "type": "Step", "name": "step" },
                { "type": "Idle{100}", "name": "rest" }
            ]
        }
    ]
}"#;

fn build_tree() -> simpleai_kernel::TreeNodeRef {
    let registry = AiRegistry::new();
    registry.register_task("Chase", |_ai, chr, _dt| {
        chr.set_position(chr.position() + Vec3::ONE);
        Ok(TreeNodeStatus::Running)
    });
    registry.register_task("Step", |_ai, chr, _dt| {
        chr.set_position(chr.position() + Vec3::UP);
        Ok(TreeNodeStatus::Finished)
    });
    TreeBuilder::new(Arc::new(registry))
        .from_json(TREE)
        .expect("benchmark tree is valid")
}

/// Zone with `count` AIs in groups of 8, every other AI with some aggro
fn create_zone(count: i32) -> Arc<Zone> {
    let zone = Zone::new("bench", 4).expect("zone pool");
    let root = build_tree();
    let mut rng = rand::thread_rng();

    for id in 0..count {
        let position = Vec3::new(rng.gen_range(-500.0..500.0), 0.0, rng.gen_range(-500.0..500.0));
        let ai: AiRef = Ai::shared(root.clone());
        ai.set_character(Some(BasicCharacter::shared(id, position)));
        if id % 2 == 0 {
            ai.aggro_mgr().add_aggro(rng.gen_range(0..count), rng.gen_range(1.0..100.0));
        }
        zone.group_mgr().add(id / 8, &ai);
        zone.add_ai(ai);
    }

    // apply the scheduled adds
    zone.update(0);
    zone
}

fn bench_zone_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("zone_update");
    group.sample_size(50);

    for count in [100, 500, 1000, 5000] {
        let zone = create_zone(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, _| {
            b.iter(|| zone.update(black_box(16)))
        });
    }
    group.finish();
}

fn bench_group_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_update");
    group.sample_size(50);

    for count in [100, 1000, 5000] {
        let zone = create_zone(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("mean_position", count), &count, |b, _| {
            b.iter(|| zone.group_mgr().update(black_box(16)))
        });
    }
    group.finish();
}

fn bench_aggro_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggro_update");

    for entries in [10, 100, 1000] {
        let mut rng = rand::thread_rng();
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_ratio(0.01, 1.0);
        for id in 0..entries {
            mgr.add_aggro(id, rng.gen_range(1000.0..10_000.0));
        }

        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::new("ratio", entries), &entries, |b, _| {
            b.iter(|| {
                mgr.update(black_box(1));
                black_box(mgr.highest_entry().map(|e| e.character_id))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_zone_update, bench_group_update, bench_aggro_update);
criterion_main!(benches);
