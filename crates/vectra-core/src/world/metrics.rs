use super::SimulationState;
use serde::{Deserialize, Serialize};

/// Counters zeroed at the start of every simulated day.
#[derive(Clone, Copy, Debug, Default)]
pub struct DailyCounters {
    pub detections: u32,
    pub new_sheep_infections: u64,
    pub new_cattle_infections: u64,
    pub sheep_deaths: f64,
}

/// Counters accumulated over the whole run.
#[derive(Clone, Copy, Debug, Default)]
pub struct CumulativeCounters {
    pub interrupted_movements: u64,
    pub risky_moves_blocked: u64,
    pub movement_transmissions: u64,
    /// Animals tested during active surveillance.
    pub tests: f64,
    pub positive_tests: f64,
    pub farms_checked: u64,
    /// Farm-days spent under a movement ban.
    pub ban_days: u64,
}

/// Outbreak-level flags. `btv_observed` and `first_detected_farm` are set on
/// the first detection and never cleared.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutbreakStatus {
    pub btv_observed: bool,
    pub first_detected_farm: Option<usize>,
    pub restriction_zones_implemented: bool,
    pub active_surveillance_performed: bool,
    pub days_since_last_detection: u32,
}

/// Snapshot of one day's counters plus derived aggregates.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DayRecord {
    pub day: u32,
    pub detections: u32,
    pub new_sheep_infections: u64,
    pub new_cattle_infections: u64,
    pub sheep_deaths: f64,
    pub infected_farms: usize,
    pub detected_farms: usize,
    pub banned_farms: usize,
    pub infectious_midge_mass: f64,
    pub latent_midge_mass: f64,
}

fn default_schema_version() -> u32 {
    1
}

/// Result of a multi-day run: sampled day records plus run totals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub days: u32,
    pub sample_every: u32,
    pub samples: Vec<DayRecord>,
    pub total_detections: u64,
    pub total_sheep_deaths: f64,
    pub movement_transmissions: u64,
    pub interrupted_movements: u64,
}

impl SimulationState {
    pub(crate) fn collect_day_record(&self) -> DayRecord {
        let mut infected_farms = 0;
        let mut detected_farms = 0;
        let mut banned_farms = 0;
        for farm in &self.farms {
            if farm.is_infected() {
                infected_farms += 1;
            }
            if farm.detected {
                detected_farms += 1;
            }
            if farm.movement_banned {
                banned_farms += 1;
            }
        }
        DayRecord {
            day: self.day,
            detections: self.daily.detections,
            new_sheep_infections: self.daily.new_sheep_infections,
            new_cattle_infections: self.daily.new_cattle_infections,
            sheep_deaths: self.daily.sheep_deaths,
            infected_farms,
            detected_farms,
            banned_farms,
            infectious_midge_mass: self.midges.infectious_mass(),
            latent_midge_mass: self.midges.latent_mass(),
        }
    }
}
