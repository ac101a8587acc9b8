use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simpleai_kernel::tree::TreeNodeStatus;
use simpleai_kernel::{
    Ai, AiRegistry, BasicCharacter, Character, KernelConfig, ThreadScheduler, TreeBuilder, Vec3,
    Zone,
};

const DEMO_AIS: i32 = 64;

const DEMO_TREE: &str = r#"{
    "type": "PrioritySelector",
    "name": "root",
    "children": [
        { "type": "FollowLeader", "name": "follow", "condition": "IsInGroup" },
        {
            "type": "Sequence",
            "name": "roam",
            "children": [
                { "type": "Steer(Wander{0.6})", "name": "wander" },
                { "type": "Idle{500}", "name": "rest" }
            ]
        }
    ]
}"#;

fn registry() -> Arc<AiRegistry> {
    let registry = AiRegistry::new();

    // Members walk towards their leader, leaders fall through to roaming
    registry.register_task("FollowLeader", |ai, chr, dt| {
        let Some(zone) = ai.zone() else {
            return Ok(TreeNodeStatus::CannotExecute);
        };
        let Some(group) = zone.group_mgr().group_ids_of(ai).first().copied() else {
            return Ok(TreeNodeStatus::CannotExecute);
        };
        if zone.group_mgr().is_group_leader(group, ai) {
            return Ok(TreeNodeStatus::CannotExecute);
        }

        let target = ai.get_group_leader_position(group);
        if target.is_infinite() {
            return Ok(TreeNodeStatus::Failed);
        }
        let position = chr.position();
        let to_target = target - position;
        let distance = to_target.length();
        let step = chr.speed() * dt as f32 / 1000.0;
        if distance <= step.max(1.0) {
            return Ok(TreeNodeStatus::Finished);
        }
        chr.set_position(position + to_target / distance * step);
        Ok(TreeNodeStatus::Running)
    });

    Arc::new(registry)
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("SimpleAI kernel v{}", env!("CARGO_PKG_VERSION"));

    let config = KernelConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: zone_threads={}, tick={:?}, run_for={:?}",
        config.zone_threads, config.tick, config.run_for
    );

    let builder = TreeBuilder::new(registry());
    let root = builder.from_json(DEMO_TREE)?;

    let zone = Zone::new("demo", config.zone_threads)?;
    zone.set_debug(config.debug_zone);

    let mut rng = rand::thread_rng();
    for id in 0..DEMO_AIS {
        let position = Vec3::new(rng.gen_range(-100.0..100.0), 0.0, rng.gen_range(-100.0..100.0));
        let character = Arc::new(BasicCharacter::with_position(id, position));
        character.set_speed(rng.gen_range(2.0..6.0));

        let ai = Ai::shared(root.clone());
        ai.set_character(Some(character));
        zone.group_mgr().add(id / 2, &ai);
        zone.add_ai(ai);
    }

    let scheduler = ThreadScheduler::with_idle_interval(config.scheduler_idle);
    let reporting = zone.clone();
    scheduler.schedule_at_fixed_rate(Duration::from_secs(1), Duration::from_secs(1), move || {
        let metrics = reporting.metrics().to_json();
        info!(
            "Zone '{}': {} AIs, {} groups, {}",
            reporting.name(),
            reporting.size(),
            reporting.group_mgr().group_count(),
            metrics["performance"]
        );
    });

    let started = Instant::now();
    while started.elapsed() < config.run_for {
        let frame = Instant::now();
        zone.update(config.tick_millis());

        let spent = frame.elapsed();
        match config.tick.checked_sub(spent) {
            Some(rest) => std::thread::sleep(rest),
            None => warn!("Tick took {:?}, budget is {:?}", spent, config.tick),
        }
    }

    drop(scheduler);

    if let Some(ai) = zone.get_ai(0) {
        info!("Final state of AI 0:\n{}", ai.snapshot().to_json_pretty()?);
    }
    info!(
        "Stopped after {} ticks",
        zone.metrics().tick_count.load(Ordering::Relaxed)
    );

    Ok(())
}
