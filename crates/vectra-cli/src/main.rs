use anyhow::Result;
use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::time::Instant;
use vectra_core::config::{ModelConfig, DAYS_PER_YEAR};
use vectra_core::farm::Farm;
use vectra_core::grid::{MidgeGrid, WeatherGrid};
use vectra_core::movement::MovementNetwork;
use vectra_core::vector::Culicoides;
use vectra_core::world::{RunSummary, SimulationState};

/// Synthetic-scenario driver for the VECTRA simulation core: builds a farm
/// lattice over seasonal weather, seeds one infected flock and one pocket of
/// infectious midges, and runs the day pipeline over Monte Carlo replicates.
#[derive(Parser, Debug)]
#[command(name = "vectra")]
struct Args {
    /// Number of farms on the synthetic lattice.
    #[arg(long, default_value_t = 100)]
    farms: usize,
    /// Days to simulate per replicate.
    #[arg(long, default_value_t = 180)]
    days: u32,
    /// Monte Carlo replicates, run in parallel with per-replicate seeds.
    #[arg(long, default_value_t = 4)]
    reps: u64,
    /// Base seed; replicate r uses seed + r.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Sampling interval for day records.
    #[arg(long, default_value_t = 7)]
    sample_every: u32,
    /// Print the first replicate's summary as JSON.
    #[arg(long)]
    json: bool,
}

fn seasonal_temperature(rows: usize, cols: usize) -> WeatherGrid {
    let days = DAYS_PER_YEAR as usize;
    let mut data = Vec::with_capacity(rows * cols * days);
    for _cell in 0..rows * cols {
        for doy in 0..days {
            let phase = 2.0 * PI * (doy as f64 - 105.0) / days as f64;
            data.push(12.0 + 8.0 * phase.sin());
        }
    }
    WeatherGrid::from_raw(rows, cols, data)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ModelConfig::default();

    let start = Instant::now();
    let summaries: Vec<RunSummary> = (0..args.reps)
        .into_par_iter()
        .map(|rep| -> Result<RunSummary> {
            let rep_seed = args.seed.wrapping_add(rep);
            let mut state = build_state(&args, &config, rep_seed)?;
            let mut rng = ChaCha12Rng::seed_from_u64(rep_seed);
            let summary = state.run_days(&mut rng, args.days, args.sample_every)?;
            state.check_invariants()?;
            Ok(summary)
        })
        .collect::<Result<Vec<_>>>()?;
    let elapsed = start.elapsed();
    if summaries.is_empty() {
        println!("No replicates requested.");
        return Ok(());
    }

    println!(
        "Ran {} replicates of {} days over {} farms in {:?} ({:?}/replicate)",
        args.reps,
        args.days,
        args.farms,
        elapsed,
        elapsed / args.reps.max(1) as u32
    );
    let mean_detections =
        summaries.iter().map(|s| s.total_detections).sum::<u64>() as f64 / summaries.len() as f64;
    let mean_transmissions = summaries
        .iter()
        .map(|s| s.movement_transmissions)
        .sum::<u64>() as f64
        / summaries.len() as f64;
    println!("Mean detections per replicate: {mean_detections:.2}");
    println!("Mean movement transmissions per replicate: {mean_transmissions:.2}");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries[0])?);
    }
    Ok(())
}

fn build_state(args: &Args, config: &ModelConfig, seed: u64) -> Result<SimulationState> {
    let grid = config.grid;
    let mut rng = ChaCha12Rng::seed_from_u64(seed ^ 0x5eed);
    let extent_x = grid.midge_cols as f64 * grid.midge_cell_size;
    let extent_y = grid.midge_rows as f64 * grid.midge_cell_size;
    let stride = grid.stride();

    let mut farms = Vec::with_capacity(args.farms);
    for id in 0..args.farms {
        let x = rng.random::<f64>() * extent_x;
        let y = rng.random::<f64>() * extent_y;
        let num_sheep = 40.0 + (rng.random::<f64>() * 160.0).floor();
        let num_cattle = 10.0 + (rng.random::<f64>() * 80.0).floor();
        let mut farm = Farm::new(
            id as u32,
            [x, y],
            (x / (extent_x / 4.0)) as u32,
            num_sheep,
            num_cattle,
            config.epi.num_sheep_stages,
            config.epi.num_cattle_stages,
        );
        let midge_row = ((y / grid.midge_cell_size) as usize).min(grid.midge_rows - 1);
        let midge_col = ((x / grid.midge_cell_size) as usize).min(grid.midge_cols - 1);
        farm.midge_cell = (midge_row, midge_col);
        farm.temp_cell = (midge_row / stride, midge_col / stride);
        farm.rain_cell = farm.temp_cell;
        farm.regression.intercept = -1.5 + rng.random::<f64>() * 0.5;
        farm.regression.temp_effect = 0.02;
        farms.push(farm);
    }
    if let Some(first) = farms.first_mut() {
        first.sheep.seed_infection(5.0);
        first.ever_been_infected = true;
    }

    // Ring edges plus a handful of random long-range links.
    let mut movements = MovementNetwork::new();
    if args.farms > 1 {
        for idx in 0..args.farms {
            movements.push(idx, (idx + 1) % args.farms, 0.05);
        }
        for _ in 0..args.farms / 10 {
            let from = rng.random_range(0..args.farms);
            let mut to = rng.random_range(0..args.farms - 1);
            if to >= from {
                to += 1;
            }
            movements.push(from, to, 0.02);
        }
    }

    let mut midges = MidgeGrid::new(
        grid.midge_rows,
        grid.midge_cols,
        grid.midge_cell_size,
        config.epi.num_eip_stages,
    );
    midges.set_uniform_diffusion(50_000.0);
    midges.seed_infectious(grid.midge_rows / 2, grid.midge_cols / 2, 500.0);

    let temperature = seasonal_temperature(grid.weather_rows, grid.weather_cols);
    let rainfall = WeatherGrid::constant(grid.weather_rows, grid.weather_cols, 2.0);

    Ok(SimulationState::try_new(
        farms,
        midges,
        temperature,
        rainfall,
        movements,
        *config,
        Box::new(Culicoides),
    )?)
}
