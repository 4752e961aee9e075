use super::{SimulationState, FARM_SUBSTEP, FARM_SUBSTEPS_PER_DAY, SHEEP_MORT_RATE};
use crate::farm::Herd;
use crate::rng;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

const OVERDISPERSION_SCALE: f64 = 1.08 + 0.3763;
const MAX_BITES_PER_HOST: f64 = 5000.0;

/// Midges acquire new infections only strictly between these days of year.
const ACTIVE_SEASON_START: u32 = 60;
const ACTIVE_SEASON_END: u32 = 330;

impl SimulationState {
    /// Copy today's weather into the farm cache and redraw the abundance
    /// overdispersion term.
    pub(crate) fn read_weather<R: Rng + ?Sized>(&mut self, idx: usize, rng: &mut R) {
        let doy = self.day_of_year as usize;
        let (temp_row, temp_col) = self.farms[idx].temp_cell;
        let (rain_row, rain_col) = self.farms[idx].rain_cell;
        let temp = self.temperature.at(temp_row, temp_col, doy);
        let rain = self.rainfall.at(rain_row, rain_col, doy);
        let z: f64 = rng.sample(StandardNormal);

        let farm = &mut self.farms[idx];
        farm.weather.temperature = temp;
        farm.weather.rainfall = rain;
        farm.overdispersion = z * OVERDISPERSION_SCALE;
    }

    /// Erlang-staged recovery and sheep mortality in ten sub-day steps, with
    /// detection triggered by observed deaths, then the end-of-day passive
    /// detection draw for infected farms that have not been found yet.
    pub(crate) fn deaths_and_recoveries<R: Rng + ?Sized>(&mut self, idx: usize, rng: &mut R) {
        let epi = self.config.epi;
        let mut deaths_observed = false;
        {
            let farm = &mut self.farms[idx];
            for _ in 0..FARM_SUBSTEPS_PER_DAY {
                let died =
                    erlang_substep(rng, &mut farm.sheep, epi.recovery_rate_sheep, SHEEP_MORT_RATE);
                if died > 0.0 {
                    self.daily.sheep_deaths += died;
                    deaths_observed = true;
                }
                erlang_substep(rng, &mut farm.cattle, epi.recovery_rate_cattle, 0.0);
            }
        }
        if deaths_observed {
            self.trigger_detection(idx);
        }

        let farm = &self.farms[idx];
        if farm.detected || !farm.is_infected() {
            return;
        }
        // P(at least one detection) = 1 - (1-p_c)^c * (1-p_s)^s, evaluated in
        // log space.
        let infected_cattle = farm.cattle.infected();
        let infected_sheep = farm.sheep.infected();
        let mut log_miss = 0.0;
        if infected_cattle > 0.0 {
            log_miss += infected_cattle * (1.0 - epi.detection_prob_cattle).ln();
        }
        if infected_sheep > 0.0 {
            log_miss += infected_sheep * (1.0 - epi.detection_prob_sheep).ln();
        }
        let p_detect = 1.0 - log_miss.exp();
        if rng::uniform(rng) < p_detect {
            self.trigger_detection(idx);
        }
    }

    /// New host infections from the local infectious-midge density.
    pub(crate) fn midge_to_host<R: Rng + ?Sized>(&mut self, idx: usize, rng: &mut R) {
        let epi = self.config.epi;
        let (midge_row, midge_col) = self.farms[idx].midge_cell;
        let infectious_midges = self.midges.infectious_at(midge_row, midge_col);
        let p_bite = 1.0 - (-self.species.biting_rate(self.farms[idx].weather.temperature)).exp();
        let force = epi.rel_local_weight * infectious_midges * p_bite;

        let farm = &mut self.farms[idx];
        let eff_hosts = farm.cattle.total() + epi.preference_for_sheep * farm.sheep.total();
        if eff_hosts < 1.0 {
            return;
        }
        let p_sheep = 1.0 - (-force * epi.preference_for_sheep / eff_hosts * epi.p_h).exp();
        let p_cattle = 1.0 - (-force / eff_hosts * epi.p_h).exp();

        let new_sheep = (rng::binomial_approx(rng, farm.sheep.susceptible as u64, p_sheep) as f64)
            .min(farm.sheep.susceptible);
        farm.sheep.susceptible -= new_sheep;
        farm.sheep.infectious[0] += new_sheep;
        self.daily.new_sheep_infections += new_sheep as u64;

        let new_cattle = (rng::binomial_approx(rng, farm.cattle.susceptible as u64, p_cattle)
            as f64)
            .min(farm.cattle.susceptible);
        farm.cattle.susceptible -= new_cattle;
        farm.cattle.infectious[0] += new_cattle;
        self.daily.new_cattle_infections += new_cattle as u64;

        if new_sheep > 0.0 || new_cattle > 0.0 {
            farm.ever_been_infected = true;
        }
    }

    /// Seed the latent midge field from the farm's infected hosts, scaled by
    /// the climate regression of vector abundance. Outside the active season
    /// midges acquire no new infections.
    pub(crate) fn host_to_midge(&mut self, idx: usize) {
        if self.day_of_year <= ACTIVE_SEASON_START || self.day_of_year >= ACTIVE_SEASON_END {
            return;
        }
        let epi = self.config.epi;
        let farm = &self.farms[idx];
        let eff_infected =
            farm.cattle.infected() + epi.preference_for_sheep * farm.sheep.infected();
        if eff_infected <= 0.0 {
            return;
        }

        // The regression clock runs on the unwrapped simulation day.
        let year_angle = 2.0 * PI * self.day as f64 / 365.25;
        let temp = farm.weather.temperature;
        let reg = &farm.regression;
        let climate = reg.intercept
            + reg.sin_annual * year_angle.sin()
            + reg.cos_annual * year_angle.cos()
            + reg.sin_semiannual * (2.0 * year_angle).sin()
            + reg.cos_semiannual * (2.0 * year_angle).cos()
            + reg.cos_quadrimestrial * (3.0 * year_angle).cos()
            + reg.temp_effect * temp
            + reg.temp_effect_sq * temp * temp
            + farm.overdispersion
            + reg.autocorr;
        let bites = (epi.transmission_scalar * climate.exp()).min(MAX_BITES_PER_HOST);

        let (midge_row, midge_col) = farm.midge_cell;
        let cell = self.midges.idx(midge_row, midge_col);
        self.midges.latent[0][cell] += epi.p_v * eff_infected * bites;
    }
}

/// One sub-day step over a herd's Erlang chain: recovery out of the final
/// stage, then mortality on it, then progression and mortality for each
/// earlier stage from the back of the chain forwards. Returns the deaths
/// drawn this step (zero when `mortality_rate` is zero, as for cattle).
fn erlang_substep<R: Rng + ?Sized>(
    rng: &mut R,
    herd: &mut Herd,
    recovery_rate: f64,
    mortality_rate: f64,
) -> f64 {
    let stages = herd.infectious.len();
    let last = stages - 1;
    let mut deaths = 0.0;

    let recovery = FARM_SUBSTEP * stages as f64 * recovery_rate * herd.infectious[last];
    let recovered = (rng::poisson(rng, recovery) as f64).min(herd.infectious[last]);
    herd.infectious[last] -= recovered;
    herd.recovered += recovered;
    if mortality_rate > 0.0 {
        deaths += draw_mortality(rng, herd, last, mortality_rate);
    }

    for stage in (0..last).rev() {
        let progression = FARM_SUBSTEP * stages as f64 * recovery_rate * herd.infectious[stage];
        let progressed = (rng::poisson(rng, progression) as f64).min(herd.infectious[stage]);
        herd.infectious[stage] -= progressed;
        herd.infectious[stage + 1] += progressed;
        if mortality_rate > 0.0 {
            deaths += draw_mortality(rng, herd, stage, mortality_rate);
        }
    }
    deaths
}

fn draw_mortality<R: Rng + ?Sized>(
    rng: &mut R,
    herd: &mut Herd,
    stage: usize,
    mortality_rate: f64,
) -> f64 {
    let mortality = FARM_SUBSTEP * mortality_rate * herd.infectious[stage];
    let died = (rng::poisson(rng, mortality) as f64).min(herd.infectious[stage]);
    herd.infectious[stage] -= died;
    herd.deaths += died;
    died
}
