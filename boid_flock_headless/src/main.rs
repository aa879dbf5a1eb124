use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use boid_flock::na::UnitQuaternion;
use boid_flock::*;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(name = "boid-flock")]
#[command(about = "Runs a flock without a renderer and logs how it behaves")]
struct Cli {
    /// Path to a YAML flock config. Built-in defaults are used without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Neighbour lookup, overriding the config (octree, brute_force, location_hash)
    #[arg(long)]
    lookup: Option<NeighbourLookup>,

    /// Seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks between two progress reports
    #[arg(long, default_value_t = 60)]
    report_every: u64,
}

/// Scatter the population inside the containment box, each boid heading off
/// in a random direction.
fn spawn_bodies(config: &FlockConfig, rng: &mut StdRng) -> Result<Vec<PointMassBody>, FlockError> {
    let containment = config.containment_box()?;
    let min = containment.min();
    let max = containment.max();
    let mut coordinate = |axis: usize| {
        if min[axis] < max[axis] {
            rng.gen_range(min[axis]..max[axis])
        } else {
            min[axis]
        }
    };

    let mut bodies = Vec::with_capacity(config.population);
    for _ in 0..config.population {
        let position = Point::new(coordinate(0), coordinate(1), coordinate(2));
        bodies.push(PointMassBody::new(position, UnitQuaternion::identity()));
    }
    for body in bodies.iter_mut() {
        body.orientation = UnitQuaternion::from_euler_angles(
            rng.gen_range(-0.5f64..0.5f64),
            rng.gen_range(0f64..std::f64::consts::TAU),
            0f64,
        );
        body.velocity = body.forward() * config.boid.desired_speed;
    }
    Ok(bodies)
}

fn log_progress(flock: &FlockCoordinator<PointMassBody>, report: &TickReport) {
    let bodies = flock.bodies();
    let count = bodies.len().max(1) as f64;
    let mean_speed = bodies.iter().map(|body| body.velocity.norm()).sum::<f64>() / count;
    let centroid = bodies.iter().fold(Point::zeros(), |sum, body| sum + body.position) / count;
    info!(
        "tick {}: mean speed {:.2}, centroid ({:.1}, {:.1}, {:.1}), {} outside the index, {:.1} neighbours each",
        flock.tick(),
        mean_speed,
        centroid.x,
        centroid.y,
        centroid.z,
        report.out_of_bounds,
        report.neighbour_pairs as f64 / count
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FlockConfig::from_yaml(&std::fs::read_to_string(path)?)?,
        None => FlockConfig::default(),
    };
    if let Some(lookup) = cli.lookup {
        config.neighbour_lookup = lookup;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if !(cli.dt.is_finite() && cli.dt > 0f64) {
        return Err(format!("dt must be positive, got {}", cli.dt).into());
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let bodies = spawn_bodies(&config, &mut rng)?;
    let behaviour = Arc::new(FlockingBehaviour::new(config.boid));

    info!(
        "simulating {} boids for {} ticks using the {} lookup",
        config.population, cli.ticks, config.neighbour_lookup
    );
    let mut flock = FlockCoordinator::new(config)?;
    flock.add_agents(bodies, behaviour);

    let dt = Duration::from_secs_f64(cli.dt);
    let started = Instant::now();
    for _ in 0..cli.ticks {
        let report = flock.step();
        for body in flock.bodies_mut() {
            body.integrate(dt);
        }
        if cli.report_every > 0 && flock.tick() % cli.report_every == 0 {
            log_progress(&flock, &report);
        }
    }

    let elapsed = started.elapsed();
    info!(
        "done in {:.2?}, {:.1} ticks per second",
        elapsed,
        cli.ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}
