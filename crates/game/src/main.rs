//! openrun — headless endless-runner track simulation.
//!
//! Assembles the track generator, the actor pool, and the content hook with
//! explicit ownership, then drives everything from one fixed-step loop.

mod config;
mod content;
mod runner;

use anyhow::Result;
use hecs::World;
use runner_core::{Pose, TickClock};

use config::RunnerConfig;
use content::{Coin, LaneContent, Obstacle, WorldContent};
use pool::ActorPool;
use runner::AutoRunner;
use track::GenPhase;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RunnerConfig::load();
    let mut world = World::new();
    let mut generator = config.build_generator()?;
    let mut pool = ActorPool::new(&mut world, config.pool_config());
    let mut content = LaneContent::new(
        config.content.obstacle_chance,
        config.content.coin_chance,
        config.seed,
    );
    let mut player = AutoRunner::new(config.runner_speed, config.seed);

    // Seed the conveyor; every release afterwards spawns its own replacement.
    for _ in 0..config.pool.initial_actors {
        pool.spawn_next(&mut world);
    }

    let tick_rate = config.tick_rate.max(1.0);
    let dt = 1.0 / tick_rate;
    let total_ticks = (config.sim_seconds * tick_rate).ceil() as u64;
    log::info!(
        "simulating {:.0}s at {} Hz ({} segments in set)",
        config.sim_seconds,
        tick_rate,
        generator.library().len()
    );

    let mut clock = TickClock::default();
    let mut placed = 0u64;
    let mut recycled = 0u64;
    let mut destroyed = 0u64;
    let mut rebases = 0u64;
    let mut announced_halt = false;

    for tick in 0..total_ticks {
        clock.tick();

        if let Some((segment, choose_left)) = player.advance(&generator, dt) {
            generator.choose_split_exit(segment, choose_left);
        }

        let report = {
            let mut hook = WorldContent {
                content: &mut content,
                world: &mut world,
            };
            generator.tick(player.position, &mut hook)
        };
        placed += report.placed as u64;
        recycled += report.recycled as u64;
        destroyed += report.destroyed as u64;

        if let Some(offset) = report.rebase {
            rebases += 1;
            player.apply_offset(offset);
            for (_, pose) in world.query_mut::<&mut Pose>() {
                pose.position += offset;
            }
            pool.apply_offset(&mut world, offset);
        }

        pool.tick(&mut world, dt);

        if report.phase == Some(GenPhase::Halted) && !announced_halt {
            announced_halt = true;
            log::info!("finite track complete at tick {}", tick);
        }
        if (tick + 1) % tick_rate as u64 == 0 {
            log::debug!(
                "t={:>4.0}s player z={:>8.1} segments={} placed={}",
                (tick + 1) as f32 * dt,
                player.position.z,
                generator.chain().len(),
                placed
            );
        }
    }

    let obstacles = world.query::<&Obstacle>().iter().count();
    let coins = world.query::<&Coin>().iter().count();
    log::info!(
        "done in {:.2}s wall ({:.0} ticks/s)",
        clock.elapsed_seconds(),
        clock.average_rate()
    );
    log::info!(
        "segments: {} placed, {} recycled, {} destroyed, {} re-bases, {} live",
        placed,
        recycled,
        destroyed,
        rebases,
        generator.chain().len()
    );
    log::info!(
        "content: {} obstacles, {} coins live; pool elapsed {:.0}s",
        obstacles,
        coins,
        pool.elapsed_seconds()
    );
    Ok(())
}
