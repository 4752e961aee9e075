//! Per-farm state: host demography, SIR compartments, vector-abundance
//! regression coefficients, control flags, and the daily weather cache.

/// One species' herd: susceptible, an Erlang chain of infectious
/// compartments, and recovered. Counts are real-valued but represent whole
/// animals; every stochastic update draws integers and clamps to what is
/// left, so compartments stay integral in practice.
///
/// `moved_in`/`moved_out`/`deaths` accumulate so that
/// `S + sum(I) + R == initial_population - deaths - moved_out + moved_in`
/// holds exactly at every day boundary.
#[derive(Clone, Debug, Default)]
pub struct Herd {
    pub susceptible: f64,
    pub infectious: Vec<f64>,
    pub recovered: f64,
    pub initial_population: f64,
    pub moved_in: f64,
    pub moved_out: f64,
    pub deaths: f64,
}

impl Herd {
    pub fn new(population: f64, num_stages: usize) -> Self {
        Self {
            susceptible: population,
            infectious: vec![0.0; num_stages],
            recovered: 0.0,
            initial_population: population,
            moved_in: 0.0,
            moved_out: 0.0,
            deaths: 0.0,
        }
    }

    pub fn infected(&self) -> f64 {
        self.infectious.iter().sum()
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected() + self.recovered
    }

    /// What `total()` must equal given the recorded flows.
    pub fn expected_total(&self) -> f64 {
        self.initial_population - self.deaths - self.moved_out + self.moved_in
    }

    /// Move up to `count` animals from susceptible into the first infectious
    /// stage (initial seeding).
    pub fn seed_infection(&mut self, count: f64) {
        let moved = count.min(self.susceptible);
        self.susceptible -= moved;
        self.infectious[0] += moved;
    }
}

/// Climate-regression coefficients for the farm's vector abundance, plus the
/// loader-sampled spatial-autocorrelation noise term.
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorRegression {
    pub intercept: f64,
    pub sin_annual: f64,
    pub cos_annual: f64,
    pub sin_semiannual: f64,
    pub cos_semiannual: f64,
    pub cos_quadrimestrial: f64,
    pub temp_effect: f64,
    pub temp_effect_sq: f64,
    pub autocorr: f64,
}

/// Today's weather at the farm. `wind` is populated by the loader; the daily
/// pipeline does not consume it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Weather {
    pub temperature: f64,
    pub rainfall: f64,
    pub wind: f64,
}

#[derive(Clone, Debug)]
pub struct Farm {
    pub id: u32,
    pub position: [f64; 2],
    pub county: u32,
    /// Cached (row, col) into the temperature raster.
    pub temp_cell: (usize, usize),
    /// Cached (row, col) into the rainfall raster.
    pub rain_cell: (usize, usize),
    /// Cached (row, col) into the midge grids.
    pub midge_cell: (usize, usize),
    pub sheep: Herd,
    pub cattle: Herd,
    pub regression: VectorRegression,
    pub weather: Weather,
    /// Daily overdispersion draw for the abundance regression.
    pub overdispersion: f64,
    pub detected: bool,
    pub movement_banned: bool,
    pub protection_zone: bool,
    pub surveillance_zone: bool,
    pub free_area: bool,
    pub ever_been_detected: bool,
    pub ever_been_infected: bool,
    pub first_infected_due_to_movement: bool,
    /// Indices of farms within the local-ban radius; populated on this
    /// farm's first detection and never cleared.
    pub(crate) local_farms: Option<Vec<usize>>,
}

impl Farm {
    pub fn new(
        id: u32,
        position: [f64; 2],
        county: u32,
        num_sheep: f64,
        num_cattle: f64,
        sheep_stages: usize,
        cattle_stages: usize,
    ) -> Self {
        Self {
            id,
            position,
            county,
            temp_cell: (0, 0),
            rain_cell: (0, 0),
            midge_cell: (0, 0),
            sheep: Herd::new(num_sheep, sheep_stages),
            cattle: Herd::new(num_cattle, cattle_stages),
            regression: VectorRegression::default(),
            weather: Weather::default(),
            overdispersion: 0.0,
            detected: false,
            movement_banned: false,
            protection_zone: false,
            surveillance_zone: false,
            free_area: true,
            ever_been_detected: false,
            ever_been_infected: false,
            first_infected_due_to_movement: false,
            local_farms: None,
        }
    }

    pub fn infected_total(&self) -> f64 {
        self.sheep.infected() + self.cattle.infected()
    }

    pub fn is_infected(&self) -> bool {
        self.infected_total() > 0.0
    }

    pub fn herd_size(&self) -> f64 {
        self.sheep.total() + self.cattle.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn herd_bookkeeping_stays_exact_through_flows() {
        let mut herd = Herd::new(100.0, 3);
        herd.seed_infection(10.0);
        assert_relative_eq!(herd.total(), herd.expected_total());

        herd.infectious[0] -= 2.0;
        herd.moved_out += 2.0;
        assert_relative_eq!(herd.total(), herd.expected_total());

        herd.infectious[2] += 1.0;
        herd.moved_in += 1.0;
        herd.infectious[0] -= 3.0;
        herd.deaths += 3.0;
        assert_relative_eq!(herd.total(), herd.expected_total());
    }

    #[test]
    fn seeding_is_capped_by_susceptibles() {
        let mut herd = Herd::new(4.0, 2);
        herd.seed_infection(10.0);
        assert_eq!(herd.susceptible, 0.0);
        assert_eq!(herd.infectious[0], 4.0);
    }

    #[test]
    fn new_farm_starts_free_and_clean() {
        let farm = Farm::new(7, [100.0, 200.0], 3, 50.0, 20.0, 5, 5);
        assert!(farm.free_area);
        assert!(!farm.detected);
        assert!(!farm.is_infected());
        assert_eq!(farm.herd_size(), 70.0);
        assert!(farm.local_farms.is_none());
    }
}
