// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! AOI simulation driver (aoi-sim)
//!
//! Spawns a population of walkers on a square world, drives each one through
//! a walk/rest state machine, and feeds every step into an [`AoiManager`].
//! Totals are reported through `tracing` at `info`, which stays the floor for
//! every target. Per-tick output needs a target directive such as
//! `RUST_LOG=aoi_sim=debug`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use echo_aoi::{AdjustStats, AoiConfig, AoiManager, AoiObserver, EntityId};
use echo_fsm::{StateMachine, StateSpec, Transition};

#[derive(Parser, Debug)]
#[command(author, version, about = "Random-walk driver for the Echo AOI index")]
struct Args {
    /// Number of walkers to spawn
    #[arg(long, default_value_t = 1_000)]
    entities: usize,
    /// Simulation ticks to run
    #[arg(long, default_value_t = 100)]
    ticks: u32,
    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,
    /// Side length of the square world
    #[arg(long, default_value_t = 1_000.0)]
    world: f32,
    /// Walking speed in world units per second
    #[arg(long, default_value_t = 5.0)]
    speed: f32,
    /// Interest radius; overrides the config file
    #[arg(long)]
    radius: Option<f32>,
    /// JSON file with an AOI config
    #[arg(long)]
    config: Option<PathBuf>,
    /// RNG seed for spawn positions and headings
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Check index invariants after every tick
    #[arg(long)]
    validate: bool,
}

/// Per-walker notification counters.
#[derive(Debug, Default)]
struct Tally {
    entered: u64,
    left: u64,
}

impl AoiObserver for Tally {
    fn on_enter_aoi(&mut self, _me: EntityId, _other: EntityId) {
        self.entered += 1;
    }

    fn on_leave_aoi(&mut self, _me: EntityId, _other: EntityId) {
        self.left += 1;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Gait {
    Resting,
    Walking,
}

struct Stride {
    rng: StdRng,
    heading: (f32, f32),
    timer: f32,
}

struct Walker {
    id: EntityId,
    gait: StateMachine<Gait, Stride>,
    stride: Stride,
}

fn gait_machine() -> StateMachine<Gait, Stride> {
    StateMachine::new(Gait::Resting)
        .with_state(
            Gait::Resting,
            StateSpec::new()
                .allow(Gait::Walking)
                .on_enter(|s: &mut Stride| {
                    s.timer = s.rng.gen_range(0.2..1.5);
                    Transition::Stay
                })
                .on_tick(|dt, s: &mut Stride| {
                    s.timer -= dt;
                    if s.timer <= 0.0 {
                        Transition::To(Gait::Walking)
                    } else {
                        Transition::Stay
                    }
                }),
        )
        .with_state(
            Gait::Walking,
            StateSpec::new()
                .allow(Gait::Resting)
                .on_enter(|s: &mut Stride| {
                    let angle = s.rng.gen_range(0.0..std::f32::consts::TAU);
                    s.heading = (angle.cos(), angle.sin());
                    s.timer = s.rng.gen_range(0.5..4.0);
                    Transition::Stay
                })
                .on_tick(|dt, s: &mut Stride| {
                    s.timer -= dt;
                    if s.timer <= 0.0 {
                        Transition::To(Gait::Resting)
                    } else {
                        Transition::Stay
                    }
                }),
        )
}

/// Steps one coordinate and bounces it off the world edge.
fn bounce(pos: f32, dir: &mut f32, step: f32, half: f32) -> f32 {
    let next = pos + *dir * step;
    if next.abs() > half {
        *dir = -*dir;
        return next.clamp(-half, half);
    }
    next
}

fn load_config(args: &Args) -> Result<AoiConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read config {}", path.display()))?;
            AoiConfig::from_json_slice(&bytes)
                .with_context(|| format!("decode config {}", path.display()))?
        }
        None => AoiConfig::default(),
    };
    if let Some(radius) = args.radius {
        config.default_radius = radius;
    }
    config.initial_capacity = config.initial_capacity.max(args.entities);
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = load_config(&args)?;
    info!(
        entities = args.entities,
        ticks = args.ticks,
        radius = config.default_radius,
        world = args.world,
        seed = args.seed,
        "starting aoi-sim"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut aoi: AoiManager<Tally> = AoiManager::with_config(config)?;
    let half = args.world * 0.5;

    let mut walkers = Vec::with_capacity(args.entities);
    for _ in 0..args.entities {
        let x = rng.gen_range(-half..=half);
        let z = rng.gen_range(-half..=half);
        let id = aoi.enter(config.entity(Tally::default()), x, z)?;
        let mut stride = Stride {
            rng: StdRng::seed_from_u64(rng.gen()),
            heading: (0.0, 0.0),
            timer: 0.0,
        };
        let mut gait = gait_machine();
        gait.enter_state(Gait::Walking, &mut stride)?;
        walkers.push(Walker { id, gait, stride });
    }

    let step = args.speed * args.dt;
    let mut total = AdjustStats::default();
    for tick in 0..args.ticks {
        let mut moved = 0usize;
        for walker in &mut walkers {
            walker.gait.tick(args.dt, &mut walker.stride)?;
            if walker.gait.current() != Gait::Walking {
                continue;
            }
            let (x, z) = aoi
                .position(walker.id)
                .context("walker missing from index")?;
            let (mut dx, mut dz) = walker.stride.heading;
            let nx = bounce(x, &mut dx, step, half);
            let nz = bounce(z, &mut dz, step, half);
            walker.stride.heading = (dx, dz);

            let stats = aoi.moved(walker.id, nx, nz)?;
            total.visited += stats.visited;
            total.resorted += stats.resorted;
            total.entered += stats.entered;
            total.left += stats.left;
            moved += 1;
        }
        if args.validate {
            aoi.validate()
                .with_context(|| format!("invariants broken after tick {tick}"))?;
        }
        debug!(tick, moved, "tick done");
    }

    let (entered, left) = aoi
        .ids()
        .filter_map(|id| aoi.get(id))
        .fold((0u64, 0u64), |(e, l), entity| {
            (e + entity.payload.entered, l + entity.payload.left)
        });
    let pairs = aoi.ids().map(|id| aoi.neighbor_count(id)).sum::<usize>() / 2;

    info!(
        visited = total.visited,
        resorted = total.resorted,
        joined = total.entered,
        broken = total.left,
        "adjust totals"
    );
    info!(entered, left, pairs, "notifications delivered");
    Ok(())
}
