//! Simulation core of VECTRA: a stochastic spatial model of Bluetongue
//! virus transmission between livestock farms, mediated by biting-midge
//! vectors.
//!
//! The core advances one mutable [`world::SimulationState`] a day at a time
//! through a fixed pipeline: control, midge mortality + incubation, midge
//! diffusion, movement, and per-farm epidemic updates. Loading of farm
//! rosters, weather rasters and movement edges, output, and the Monte Carlo
//! replicate loop live outside this crate.

pub mod config;
pub mod farm;
pub mod grid;
pub mod movement;
pub mod rng;
pub mod spatial;
pub mod vector;
pub mod world;
