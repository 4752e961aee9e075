mod control;
mod day;
mod epidemic;
mod midge;
mod movement;
pub mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::config::{ConfigError, ModelConfig};
use crate::farm::{Farm, Herd};
use crate::grid::{MidgeGrid, WeatherGrid};
use crate::movement::MovementNetwork;
use crate::spatial::{self, FarmLocation};
use crate::vector::VectorSpecies;
use rstar::RTree;
use std::{error::Error, fmt};

/// Hard-coded farm sub-day step; `dt_farm` in the config is accepted but
/// this value is normative.
pub(crate) const FARM_SUBSTEP: f64 = 0.1;
pub(crate) const FARM_SUBSTEPS_PER_DAY: usize = 10;

/// Hard-coded daily sheep mortality; `sheep_mort_rate` in the config is
/// accepted but this value is normative.
pub(crate) const SHEEP_MORT_RATE: f64 = 0.0055;

/// The whole mutable world advanced one day at a time.
///
/// Farms, grids and the movement edge list are populated by an external
/// loader before day 0; only the mutable fields evolve afterwards. All
/// stochastic methods take an explicit generator handle.
pub struct SimulationState {
    pub farms: Vec<Farm>,
    pub midges: MidgeGrid,
    pub temperature: WeatherGrid,
    pub rainfall: WeatherGrid,
    pub movements: MovementNetwork,
    pub daily: DailyCounters,
    pub totals: CumulativeCounters,
    pub outbreak: OutbreakStatus,
    pub(crate) config: ModelConfig,
    pub(crate) species: Box<dyn VectorSpecies>,
    pub(crate) farm_tree: RTree<FarmLocation>,
    pub(crate) day: u32,
    pub(crate) day_of_year: u32,
}

impl fmt::Debug for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationState")
            .field("farms", &self.farms)
            .field("midges", &self.midges)
            .field("temperature", &self.temperature)
            .field("rainfall", &self.rainfall)
            .field("movements", &self.movements)
            .field("daily", &self.daily)
            .field("totals", &self.totals)
            .field("outbreak", &self.outbreak)
            .field("config", &self.config)
            .field("species", &"<dyn VectorSpecies>")
            .field("day", &self.day)
            .field("day_of_year", &self.day_of_year)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateInitError {
    Config(ConfigError),
    TooManyFarms {
        max: usize,
        actual: usize,
    },
    GridDimensionMismatch {
        grid: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    CellSizeMismatch {
        expected: f64,
        actual: f64,
    },
    LatentStageMismatch {
        expected: usize,
        actual: usize,
    },
    FarmCellOutOfRange {
        farm: u32,
        grid: &'static str,
    },
    FarmStageMismatch {
        farm: u32,
        species: &'static str,
        expected: usize,
        actual: usize,
    },
    NegativeCompartment {
        farm: u32,
        species: &'static str,
    },
    HerdBookkeepingMismatch {
        farm: u32,
        species: &'static str,
    },
    EdgeArraysMisaligned,
    EdgeEndpointOutOfRange {
        edge: usize,
    },
    EdgeSelfLoop {
        edge: usize,
    },
    EdgeRiskOutOfRange {
        edge: usize,
        risk: f64,
    },
    NegativeDiffusionCoefficient {
        cell: usize,
    },
    DiffusionUnstable {
        max_coefficient: f64,
        limit: f64,
    },
}

impl fmt::Display for StateInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateInitError::Config(e) => write!(f, "{e}"),
            StateInitError::TooManyFarms { max, actual } => {
                write!(f, "farm count ({actual}) exceeds supported maximum ({max})")
            }
            StateInitError::GridDimensionMismatch {
                grid,
                expected,
                actual,
            } => write!(
                f,
                "{grid} grid is {}x{} but config declares {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            StateInitError::CellSizeMismatch { expected, actual } => {
                write!(f, "midge cell size ({actual}) does not match config ({expected})")
            }
            StateInitError::LatentStageMismatch { expected, actual } => {
                write!(f, "midge grid has {actual} latent stages, config declares {expected}")
            }
            StateInitError::FarmCellOutOfRange { farm, grid } => {
                write!(f, "farm {farm} references a cell outside the {grid} grid")
            }
            StateInitError::FarmStageMismatch {
                farm,
                species,
                expected,
                actual,
            } => write!(
                f,
                "farm {farm} has {actual} {species} stages, config declares {expected}"
            ),
            StateInitError::NegativeCompartment { farm, species } => {
                write!(f, "farm {farm} has a negative {species} compartment")
            }
            StateInitError::HerdBookkeepingMismatch { farm, species } => {
                write!(f, "farm {farm} {species} totals do not match initial population")
            }
            StateInitError::EdgeArraysMisaligned => {
                write!(f, "movement from/to/risk arrays differ in length")
            }
            StateInitError::EdgeEndpointOutOfRange { edge } => {
                write!(f, "movement edge {edge} references a non-existent farm")
            }
            StateInitError::EdgeSelfLoop { edge } => {
                write!(f, "movement edge {edge} is a self-loop")
            }
            StateInitError::EdgeRiskOutOfRange { edge, risk } => {
                write!(f, "movement edge {edge} risk ({risk}) must lie in [0, 1]")
            }
            StateInitError::NegativeDiffusionCoefficient { cell } => {
                write!(f, "diffusion coefficient at cell {cell} is negative or non-finite")
            }
            StateInitError::DiffusionUnstable {
                max_coefficient,
                limit,
            } => write!(
                f,
                "diffusion coefficient {max_coefficient} exceeds the explicit-Euler \
                 stability limit {limit} for the configured dt and cell size"
            ),
        }
    }
}

impl From<ConfigError> for StateInitError {
    fn from(err: ConfigError) -> Self {
        StateInitError::Config(err)
    }
}

impl Error for StateInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StateInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    InvalidSampleEvery,
    TooManyDays { max: u32, actual: u32 },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            RunError::TooManyDays { max, actual } => {
                write!(f, "days ({actual}) exceed supported maximum ({max})")
            }
        }
    }
}

impl Error for RunError {}

/// A violated day-boundary invariant, reported by `check_invariants`.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    HerdConservation {
        farm: u32,
        species: &'static str,
        total: f64,
        expected: f64,
    },
    NegativeCompartment {
        farm: u32,
        species: &'static str,
    },
    NegativeDensity {
        field: &'static str,
        cell: usize,
    },
    ScratchNotZero {
        cell: usize,
    },
    OutbreakFlagsInconsistent,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::HerdConservation {
                farm,
                species,
                total,
                expected,
            } => write!(
                f,
                "farm {farm} {species} total {total} diverged from bookkeeping total {expected}"
            ),
            InvariantViolation::NegativeCompartment { farm, species } => {
                write!(f, "farm {farm} has a negative {species} compartment")
            }
            InvariantViolation::NegativeDensity { field, cell } => {
                write!(f, "{field} density at cell {cell} is negative")
            }
            InvariantViolation::ScratchNotZero { cell } => {
                write!(f, "diffusion scratch at cell {cell} is non-zero between days")
            }
            InvariantViolation::OutbreakFlagsInconsistent => {
                write!(f, "btv_observed is set without a consistent first-detected farm")
            }
        }
    }
}

impl Error for InvariantViolation {}

const CONSERVATION_TOL: f64 = 1e-6;

impl SimulationState {
    pub const MAX_FARMS: usize = 100_000;
    pub const MAX_RUN_DAYS: u32 = 100_000;

    pub fn new(
        farms: Vec<Farm>,
        midges: MidgeGrid,
        temperature: WeatherGrid,
        rainfall: WeatherGrid,
        movements: MovementNetwork,
        config: ModelConfig,
        species: Box<dyn VectorSpecies>,
    ) -> Self {
        Self::try_new(farms, midges, temperature, rainfall, movements, config, species)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(
        farms: Vec<Farm>,
        midges: MidgeGrid,
        temperature: WeatherGrid,
        rainfall: WeatherGrid,
        movements: MovementNetwork,
        config: ModelConfig,
        species: Box<dyn VectorSpecies>,
    ) -> Result<Self, StateInitError> {
        config.validate()?;
        if (config.sim.dt_farm - FARM_SUBSTEP).abs() > f64::EPSILON {
            tracing::warn!(
                declared = config.sim.dt_farm,
                normative = FARM_SUBSTEP,
                "dt_farm differs from the hard-coded farm sub-step; the declared value is ignored"
            );
        }
        if (config.epi.sheep_mort_rate - SHEEP_MORT_RATE).abs() > f64::EPSILON {
            tracing::warn!(
                declared = config.epi.sheep_mort_rate,
                normative = SHEEP_MORT_RATE,
                "sheep_mort_rate differs from the hard-coded rate; the declared value is ignored"
            );
        }

        if farms.len() > Self::MAX_FARMS {
            return Err(StateInitError::TooManyFarms {
                max: Self::MAX_FARMS,
                actual: farms.len(),
            });
        }

        let grid_cfg = &config.grid;
        if (midges.rows(), midges.cols()) != (grid_cfg.midge_rows, grid_cfg.midge_cols) {
            return Err(StateInitError::GridDimensionMismatch {
                grid: "midge",
                expected: (grid_cfg.midge_rows, grid_cfg.midge_cols),
                actual: (midges.rows(), midges.cols()),
            });
        }
        if (midges.cell_size() - grid_cfg.midge_cell_size).abs() > f64::EPSILON {
            return Err(StateInitError::CellSizeMismatch {
                expected: grid_cfg.midge_cell_size,
                actual: midges.cell_size(),
            });
        }
        if midges.num_eip_stages() != config.epi.num_eip_stages {
            return Err(StateInitError::LatentStageMismatch {
                expected: config.epi.num_eip_stages,
                actual: midges.num_eip_stages(),
            });
        }
        for (grid, raster) in [("temperature", &temperature), ("rainfall", &rainfall)] {
            if (raster.rows(), raster.cols()) != (grid_cfg.weather_rows, grid_cfg.weather_cols) {
                return Err(StateInitError::GridDimensionMismatch {
                    grid,
                    expected: (grid_cfg.weather_rows, grid_cfg.weather_cols),
                    actual: (raster.rows(), raster.cols()),
                });
            }
        }

        for farm in &farms {
            for (grid, cell, dims) in [
                ("temperature", farm.temp_cell, (temperature.rows(), temperature.cols())),
                ("rainfall", farm.rain_cell, (rainfall.rows(), rainfall.cols())),
                ("midge", farm.midge_cell, (midges.rows(), midges.cols())),
            ] {
                if cell.0 >= dims.0 || cell.1 >= dims.1 {
                    return Err(StateInitError::FarmCellOutOfRange { farm: farm.id, grid });
                }
            }
            for (species_name, herd, expected) in [
                ("sheep", &farm.sheep, config.epi.num_sheep_stages),
                ("cattle", &farm.cattle, config.epi.num_cattle_stages),
            ] {
                if herd.infectious.len() != expected {
                    return Err(StateInitError::FarmStageMismatch {
                        farm: farm.id,
                        species: species_name,
                        expected,
                        actual: herd.infectious.len(),
                    });
                }
                if herd.susceptible < 0.0
                    || herd.recovered < 0.0
                    || herd.infectious.iter().any(|&i| i < 0.0)
                {
                    return Err(StateInitError::NegativeCompartment {
                        farm: farm.id,
                        species: species_name,
                    });
                }
                if (herd.total() - herd.expected_total()).abs() > CONSERVATION_TOL {
                    return Err(StateInitError::HerdBookkeepingMismatch {
                        farm: farm.id,
                        species: species_name,
                    });
                }
            }
        }

        if movements.from.len() != movements.to.len()
            || movements.from.len() != movements.risk.len()
        {
            return Err(StateInitError::EdgeArraysMisaligned);
        }
        for edge in 0..movements.len() {
            let (from, to) = (movements.from[edge], movements.to[edge]);
            if from >= farms.len() || to >= farms.len() {
                return Err(StateInitError::EdgeEndpointOutOfRange { edge });
            }
            if from == to {
                return Err(StateInitError::EdgeSelfLoop { edge });
            }
            let risk = movements.risk[edge];
            if !risk.is_finite() || !(0.0..=1.0).contains(&risk) {
                return Err(StateInitError::EdgeRiskOutOfRange { edge, risk });
            }
        }

        let mut max_coefficient = 0.0f64;
        for (cell, &coefficient) in midges.diffusion.iter().enumerate() {
            if !coefficient.is_finite() || coefficient < 0.0 {
                return Err(StateInitError::NegativeDiffusionCoefficient { cell });
            }
            max_coefficient = max_coefficient.max(coefficient);
        }
        let h_sq = grid_cfg.midge_cell_size * grid_cfg.midge_cell_size;
        // Outflow per sub-step is 2 * D * dt / h^2 of the cell content;
        // keeping it <= 1 keeps every density non-negative.
        let limit = 0.5 * h_sq / config.sim.dt;
        if max_coefficient > limit {
            return Err(StateInitError::DiffusionUnstable {
                max_coefficient,
                limit,
            });
        }

        let farm_tree = spatial::build_index(&farms);
        let day_of_year = config.sim.start_day_of_year;
        Ok(Self {
            farms,
            midges,
            temperature,
            rainfall,
            movements,
            daily: DailyCounters::default(),
            totals: CumulativeCounters::default(),
            outbreak: OutbreakStatus::default(),
            config,
            species,
            farm_tree,
            day: 0,
            day_of_year,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn day_of_year(&self) -> u32 {
        self.day_of_year
    }

    pub fn num_farms(&self) -> usize {
        self.farms.len()
    }

    /// Verify the day-boundary invariants. Intended for test suites and
    /// debug harnesses; the pipeline itself relies on construction-time
    /// validation plus the guard clauses in each phase.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for farm in &self.farms {
            for (species, herd) in [("sheep", &farm.sheep), ("cattle", &farm.cattle)] {
                check_herd(farm.id, species, herd)?;
            }
        }
        if let Some(cell) = self.midges.infectious.iter().position(|&v| v < 0.0) {
            return Err(InvariantViolation::NegativeDensity {
                field: "infectious",
                cell,
            });
        }
        for stage in &self.midges.latent {
            if let Some(cell) = stage.iter().position(|&v| v < 0.0) {
                return Err(InvariantViolation::NegativeDensity {
                    field: "latent",
                    cell,
                });
            }
        }
        if let Some(cell) = self.midges.scratch.iter().position(|&v| v != 0.0) {
            return Err(InvariantViolation::ScratchNotZero { cell });
        }
        if self.outbreak.btv_observed {
            let consistent = self
                .outbreak
                .first_detected_farm
                .and_then(|idx| self.farms.get(idx))
                .is_some_and(|farm| farm.ever_been_detected);
            if !consistent {
                return Err(InvariantViolation::OutbreakFlagsInconsistent);
            }
        }
        Ok(())
    }
}

fn check_herd(farm: u32, species: &'static str, herd: &Herd) -> Result<(), InvariantViolation> {
    if herd.susceptible < 0.0 || herd.recovered < 0.0 || herd.infectious.iter().any(|&i| i < 0.0)
    {
        return Err(InvariantViolation::NegativeCompartment { farm, species });
    }
    let total = herd.total();
    let expected = herd.expected_total();
    if (total - expected).abs() > CONSERVATION_TOL {
        return Err(InvariantViolation::HerdConservation {
            farm,
            species,
            total,
            expected,
        });
    }
    Ok(())
}
