//! Quadfield headless simulation driver.
//!
//! Stands in for a presentation layer: seeds the field, runs the tick loop,
//! and periodically probes the index, logging what a renderer would draw.

use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use field::{BoundingBox, Config, World};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Quadfield v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Loaded configuration");
    info!("  Field: {}x{}", config.field.width, config.field.height);
    info!("  Min cell size: {}", config.grid.min_cell_size);
    info!("  Initial points: {}", config.sim.initial_points);

    let mut world = World::new(&config);
    world.spawn_random(config.sim.initial_points)?;
    info!("Seeded {} points", world.len());

    // A fixed probe over the center quarter of the field, queried at every
    // stats interval the way an interactive selection would be.
    let probe = BoundingBox::new(world.border.extent / 2.0, world.border.extent / 4.0);

    let tick = Duration::from_millis(config.sim.tick_interval_ms);
    let dt = tick.as_secs_f32();
    let stats_every = Duration::from_secs(config.sim.stats_interval_secs);

    let mut ticks: u64 = 0;
    let mut ticks_at_stats: u64 = 0;
    let mut last_stats = Instant::now();
    loop {
        let started = Instant::now();
        world.step(dt)?;
        ticks += 1;

        if last_stats.elapsed() >= stats_every {
            let rate = (ticks - ticks_at_stats) as f64 / last_stats.elapsed().as_secs_f64();
            let selected = world.points_within(&probe).len();
            info!(
                "{:.1} ticks/s, {} points, {} leaf cells, {} in center probe",
                rate,
                world.len(),
                world.tree.leaf_bounds().count(),
                selected
            );
            ticks_at_stats = ticks;
            last_stats = Instant::now();
        }

        if config.sim.run_ticks != 0 && ticks >= config.sim.run_ticks {
            break;
        }
        let elapsed = started.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }

    info!("Finished after {} ticks with {} points", ticks, world.len());
    Ok(())
}
