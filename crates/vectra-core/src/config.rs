use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Calendar length of the weather rasters; day-of-year wraps at this value.
pub const DAYS_PER_YEAR: u32 = 365;

/// Static maximum for the per-species Erlang infectious chains.
pub const MAX_ERLANG_STAGES: usize = 32;

/// Static maximum for the extrinsic-incubation stage chain.
pub const MAX_EIP_STAGES: usize = 32;

/// Clock and stepping parameters.
///
/// `dt_farm` is accepted for compatibility with existing parameter files but
/// the farm sub-day loop runs at the hard-coded `0.1`; a differing declared
/// value is logged at construction and ignored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Diffusion sub-step, in days.
    pub dt: f64,
    pub dt_farm: f64,
    pub num_days: u32,
    pub num_reps: u32,
    pub start_day_of_year: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            dt_farm: 0.1,
            num_days: 180,
            num_reps: 1,
            start_day_of_year: 90,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 || self.dt > 1.0 {
            return Err(ConfigError::DtOutOfRange(self.dt));
        }
        if self.start_day_of_year >= DAYS_PER_YEAR {
            return Err(ConfigError::StartDayOutOfRange(self.start_day_of_year));
        }
        Ok(())
    }
}

/// Epidemiological parameters shared by the midge and farm engines.
///
/// `sheep_mort_rate` is accepted but the deaths loop uses the hard-coded
/// `0.0055`, mirroring `dt_farm` above. `diffusion_length_scale` is consumed
/// by the loader when it builds the diffusion-coefficient grid; the core
/// receives that grid ready-made.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EpiConfig {
    pub detection_prob_sheep: f64,
    pub detection_prob_cattle: f64,
    pub diffusion_length_scale: f64,
    pub num_sheep_stages: usize,
    pub num_cattle_stages: usize,
    pub num_eip_stages: usize,
    /// Probability an infectious bite infects the vector.
    pub p_v: f64,
    /// Probability an infectious bite infects the host.
    pub p_h: f64,
    pub sheep_mort_rate: f64,
    pub recovery_rate_sheep: f64,
    pub recovery_rate_cattle: f64,
    /// Vector feeding preference for sheep relative to cattle.
    pub preference_for_sheep: f64,
    pub transmission_scalar: f64,
    /// Weight of the local infectious-midge density in the force of infection.
    pub rel_local_weight: f64,
}

impl Default for EpiConfig {
    fn default() -> Self {
        Self {
            detection_prob_sheep: 0.015,
            detection_prob_cattle: 0.005,
            diffusion_length_scale: 1500.0,
            num_sheep_stages: 5,
            num_cattle_stages: 5,
            num_eip_stages: 10,
            p_v: 0.1,
            p_h: 0.9,
            sheep_mort_rate: 0.0055,
            recovery_rate_sheep: 0.061,
            recovery_rate_cattle: 0.0485,
            preference_for_sheep: 0.15,
            transmission_scalar: 1.0,
            rel_local_weight: 1.0,
        }
    }
}

impl EpiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("detection_prob_sheep", self.detection_prob_sheep),
            ("detection_prob_cattle", self.detection_prob_cattle),
            ("p_v", self.p_v),
            ("p_h", self.p_h),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("diffusion_length_scale", self.diffusion_length_scale),
            ("sheep_mort_rate", self.sheep_mort_rate),
            ("recovery_rate_sheep", self.recovery_rate_sheep),
            ("recovery_rate_cattle", self.recovery_rate_cattle),
            ("preference_for_sheep", self.preference_for_sheep),
            ("transmission_scalar", self.transmission_scalar),
            ("rel_local_weight", self.rel_local_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        if self.num_sheep_stages == 0 || self.num_sheep_stages > MAX_ERLANG_STAGES {
            return Err(ConfigError::StageCountOutOfRange {
                species: "sheep",
                count: self.num_sheep_stages,
                max: MAX_ERLANG_STAGES,
            });
        }
        if self.num_cattle_stages == 0 || self.num_cattle_stages > MAX_ERLANG_STAGES {
            return Err(ConfigError::StageCountOutOfRange {
                species: "cattle",
                count: self.num_cattle_stages,
                max: MAX_ERLANG_STAGES,
            });
        }
        if self.num_eip_stages == 0 || self.num_eip_stages > MAX_EIP_STAGES {
            return Err(ConfigError::EipStageCountOutOfRange {
                count: self.num_eip_stages,
                max: MAX_EIP_STAGES,
            });
        }
        Ok(())
    }
}

/// Reactive-control switches and radii (metres).
///
/// `pre_movement_tests` is reserved: accepted, never consumed by the core.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub ban_radius: f64,
    pub pz_radius: f64,
    pub sz_radius: f64,
    pub no_control: bool,
    pub no_farm_ban: bool,
    pub county_ban: bool,
    pub total_ban: bool,
    pub restriction_zones: bool,
    pub pre_movement_tests: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ban_radius: 2000.0,
            pz_radius: 100_000.0,
            sz_radius: 150_000.0,
            no_control: false,
            no_farm_ban: false,
            county_ban: false,
            total_ban: false,
            restriction_zones: true,
            pre_movement_tests: false,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("ban_radius", self.ban_radius),
            ("pz_radius", self.pz_radius),
            ("sz_radius", self.sz_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Shipment-size negative-binomial parameters per species.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub shipment_k_sheep: f64,
    pub shipment_p_sheep: f64,
    pub shipment_k_cattle: f64,
    pub shipment_p_cattle: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            shipment_k_sheep: 0.5,
            shipment_p_sheep: 0.9,
            shipment_k_cattle: 0.5,
            shipment_p_cattle: 0.8,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("shipment_k_sheep", self.shipment_k_sheep),
            ("shipment_k_cattle", self.shipment_k_cattle),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ShipmentParamOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("shipment_p_sheep", self.shipment_p_sheep),
            ("shipment_p_cattle", self.shipment_p_cattle),
        ] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ConfigError::ShipmentParamOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Discretisation of the midge and weather rasters.
///
/// The weather grids are coarser than the midge grid by an integer stride,
/// identical in both dimensions.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub midge_rows: usize,
    pub midge_cols: usize,
    pub weather_rows: usize,
    pub weather_cols: usize,
    /// Midge cell width in metres.
    pub midge_cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            midge_rows: 40,
            midge_cols: 40,
            weather_rows: 8,
            weather_cols: 8,
            midge_cell_size: 1000.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.midge_rows < 3 || self.midge_cols < 3 {
            return Err(ConfigError::GridTooSmall {
                rows: self.midge_rows,
                cols: self.midge_cols,
            });
        }
        if self.weather_rows == 0
            || self.weather_cols == 0
            || self.midge_rows % self.weather_rows != 0
            || self.midge_cols % self.weather_cols != 0
            || self.midge_rows / self.weather_rows != self.midge_cols / self.weather_cols
        {
            return Err(ConfigError::GridResolutionMismatch {
                midge: (self.midge_rows, self.midge_cols),
                weather: (self.weather_rows, self.weather_cols),
            });
        }
        if !self.midge_cell_size.is_finite() || self.midge_cell_size <= 0.0 {
            return Err(ConfigError::NonPositiveCellSize(self.midge_cell_size));
        }
        Ok(())
    }

    /// Midge cells per weather cell along each axis.
    pub fn stride(&self) -> usize {
        self.midge_rows / self.weather_rows
    }
}

/// All configuration consumed by the simulation core.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub sim: SimConfig,
    pub epi: EpiConfig,
    pub control: ControlConfig,
    pub movement: MovementConfig,
    pub grid: GridConfig,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        self.epi.validate()?;
        self.control.validate()?;
        self.movement.validate()?;
        self.grid.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    DtOutOfRange(f64),
    StartDayOutOfRange(u32),
    StageCountOutOfRange {
        species: &'static str,
        count: usize,
        max: usize,
    },
    EipStageCountOutOfRange {
        count: usize,
        max: usize,
    },
    ProbabilityOutOfRange {
        name: &'static str,
        value: f64,
    },
    NegativeParameter {
        name: &'static str,
        value: f64,
    },
    ShipmentParamOutOfRange {
        name: &'static str,
        value: f64,
    },
    GridTooSmall {
        rows: usize,
        cols: usize,
    },
    GridResolutionMismatch {
        midge: (usize, usize),
        weather: (usize, usize),
    },
    NonPositiveCellSize(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DtOutOfRange(dt) => {
                write!(f, "dt ({dt}) must lie in (0, 1]")
            }
            ConfigError::StartDayOutOfRange(day) => {
                write!(f, "start_day_of_year ({day}) must be < {DAYS_PER_YEAR}")
            }
            ConfigError::StageCountOutOfRange { species, count, max } => {
                write!(f, "{species} stage count ({count}) must lie in 1..={max}")
            }
            ConfigError::EipStageCountOutOfRange { count, max } => {
                write!(f, "EIP stage count ({count}) must lie in 1..={max}")
            }
            ConfigError::ProbabilityOutOfRange { name, value } => {
                write!(f, "{name} ({value}) must lie in [0, 1]")
            }
            ConfigError::NegativeParameter { name, value } => {
                write!(f, "{name} ({value}) must be finite and non-negative")
            }
            ConfigError::ShipmentParamOutOfRange { name, value } => {
                write!(f, "{name} ({value}) is outside the valid shipment-size range")
            }
            ConfigError::GridTooSmall { rows, cols } => {
                write!(f, "midge grid ({rows}x{cols}) needs at least 3 cells per axis")
            }
            ConfigError::GridResolutionMismatch { midge, weather } => {
                write!(
                    f,
                    "midge grid {}x{} is not an integer multiple of weather grid {}x{}",
                    midge.0, midge.1, weather.0, weather.1
                )
            }
            ConfigError::NonPositiveCellSize(size) => {
                write!(f, "midge cell size ({size}) must be positive")
            }
        }
    }
}

impl Error for ConfigError {}
