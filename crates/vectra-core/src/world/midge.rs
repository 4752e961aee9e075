use super::SimulationState;
use crate::rng;

impl SimulationState {
    /// Temperature-driven mortality plus staged progression through the
    /// extrinsic incubation period, in place.
    ///
    /// The loop strides the midge grid by the midge/weather resolution ratio
    /// and updates only the top-left midge cell of each temperature block;
    /// unaligned cells are left untouched. The temperature is not
    /// re-evaluated at finer resolution.
    pub(crate) fn midge_mortality_and_incubation(&mut self) {
        let doy = self.day_of_year as usize;
        let stride = self.config.grid.stride();
        let num_stages = self.midges.num_eip_stages();
        let mut staged = vec![0.0f64; num_stages];

        for row in (0..self.midges.rows()).step_by(stride) {
            for col in (0..self.midges.cols()).step_by(stride) {
                let temp = self.temperature.at(row / stride, col / stride, doy);
                let survival = (-self.species.mortality_rate(temp)).exp();
                let incubation = num_stages as f64 * self.species.incubation_rate(temp);
                let cell = self.midges.idx(row, col);

                self.midges.infectious[cell] *= survival;
                for stage in 0..num_stages {
                    self.midges.latent[stage][cell] *= survival;
                }

                let latent_total: f64 =
                    (0..num_stages).map(|s| self.midges.latent[s][cell]).sum();
                if incubation <= 0.0 || latent_total <= 0.0 {
                    continue;
                }

                // Discrete-time staged-Poisson redistribution: mass in stage
                // `from` lands in stage `to` with PoissonPMF(to - from) and
                // emerges to infectious with the matching survival tail.
                staged.fill(0.0);
                let mut emerged = 0.0;
                for from in 0..num_stages {
                    let mass = self.midges.latent[from][cell];
                    if mass <= 0.0 {
                        continue;
                    }
                    for to in from..num_stages {
                        staged[to] += mass * rng::poisson_pmf((to - from) as u64, incubation);
                    }
                    emerged +=
                        mass * rng::poisson_survival((num_stages - from - 1) as u64, incubation);
                }
                for stage in 0..num_stages {
                    self.midges.latent[stage][cell] = staged[stage];
                }
                self.midges.infectious[cell] += emerged;
            }
        }
    }

    /// Sub-day explicit-Euler diffusion over the whole day, each latent
    /// stage first, then the infectious field.
    pub(crate) fn midge_diffusion(&mut self) {
        let dt = self.config.sim.dt;
        let num_stages = self.midges.num_eip_stages();
        let mut elapsed = 0.0;
        while elapsed < 1.0 {
            for stage in 0..num_stages {
                self.midges.diffusion_substep(Some(stage), dt);
            }
            self.midges.diffusion_substep(None, dt);
            elapsed += dt;
        }
    }
}
