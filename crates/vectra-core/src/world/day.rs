use super::{DailyCounters, RunError, RunSummary, SimulationState};
use crate::config::DAYS_PER_YEAR;
use rand::Rng;

impl SimulationState {
    /// Advance the world by one day through the fixed six-phase pipeline:
    /// control, midge mortality + incubation, midge diffusion, movement,
    /// per-farm epidemic updates in stored order, then the clock.
    pub fn simulate_day<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.daily = DailyCounters::default();

        self.control_step();
        self.totals.ban_days += self.farms.iter().filter(|f| f.movement_banned).count() as u64;

        self.midge_mortality_and_incubation();
        self.midge_diffusion();
        self.movement_step(rng);

        for idx in 0..self.farms.len() {
            self.read_weather(idx, rng);
            self.deaths_and_recoveries(idx, rng);
            self.midge_to_host(idx, rng);
            self.host_to_midge(idx);
        }

        if self.outbreak.btv_observed && self.daily.detections == 0 {
            self.outbreak.days_since_last_detection += 1;
        }
        self.day += 1;
        self.day_of_year = (self.config.sim.start_day_of_year + self.day) % DAYS_PER_YEAR;
        tracing::debug!(
            day = self.day,
            detections = self.daily.detections,
            "day pipeline complete"
        );
    }

    /// Run the pipeline for `days` days, sampling a `DayRecord` every
    /// `sample_every` days and on the final day.
    pub fn run_days<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        days: u32,
        sample_every: u32,
    ) -> Result<RunSummary, RunError> {
        if sample_every == 0 {
            return Err(RunError::InvalidSampleEvery);
        }
        if days > Self::MAX_RUN_DAYS {
            return Err(RunError::TooManyDays {
                max: Self::MAX_RUN_DAYS,
                actual: days,
            });
        }

        let mut samples = Vec::new();
        let mut total_detections = 0u64;
        let mut total_sheep_deaths = 0.0;
        for day in 1..=days {
            self.simulate_day(rng);
            total_detections += u64::from(self.daily.detections);
            total_sheep_deaths += self.daily.sheep_deaths;
            if day % sample_every == 0 || day == days {
                samples.push(self.collect_day_record());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            days,
            sample_every,
            samples,
            total_detections,
            total_sheep_deaths,
            movement_transmissions: self.totals.movement_transmissions,
            interrupted_movements: self.totals.interrupted_movements,
        })
    }
}
