//! Dense 2-D fields: the midge-density grids and the daily weather rasters.
//! All grids store flat row-major `Vec<f64>` data.

use crate::config::DAYS_PER_YEAR;

/// Densities at or below this threshold are treated as inactive and
/// contribute no diffusion flux.
pub(crate) const DENSITY_EPS: f64 = 1e-5;

/// Midge-density field: one infectious layer, one layer per extrinsic
/// incubation stage, the diffusion-coefficient grid, and a scratch
/// accumulator used by the explicit-Euler diffusion sub-steps.
#[derive(Clone, Debug)]
pub struct MidgeGrid {
    rows: usize,
    cols: usize,
    cell_size: f64,
    pub infectious: Vec<f64>,
    /// Latent density per EIP stage, stage-major.
    pub latent: Vec<Vec<f64>>,
    pub diffusion: Vec<f64>,
    pub(crate) scratch: Vec<f64>,
}

impl MidgeGrid {
    pub fn new(rows: usize, cols: usize, cell_size: f64, num_eip_stages: usize) -> Self {
        let cells = rows * cols;
        Self {
            rows,
            cols,
            cell_size,
            infectious: vec![0.0; cells],
            latent: vec![vec![0.0; cells]; num_eip_stages],
            diffusion: vec![0.0; cells],
            scratch: vec![0.0; cells],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn num_eip_stages(&self) -> usize {
        self.latent.len()
    }

    pub fn idx(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    pub fn infectious_at(&self, row: usize, col: usize) -> f64 {
        self.infectious[self.idx(row, col)]
    }

    pub fn latent_at(&self, stage: usize, row: usize, col: usize) -> f64 {
        self.latent[stage][self.idx(row, col)]
    }

    /// Add infectious density at a cell (initial seeding).
    pub fn seed_infectious(&mut self, row: usize, col: usize, density: f64) {
        let cell = self.idx(row, col);
        self.infectious[cell] += density;
    }

    /// Set a uniform diffusion coefficient over the whole grid.
    pub fn set_uniform_diffusion(&mut self, coefficient: f64) {
        self.diffusion.fill(coefficient);
    }

    pub fn infectious_mass(&self) -> f64 {
        self.infectious.iter().sum()
    }

    pub fn latent_mass(&self) -> f64 {
        self.latent.iter().map(|stage| stage.iter().sum::<f64>()).sum()
    }

    /// One explicit-Euler diffusion sub-step of length `dt` over a single
    /// field (`Some(stage)` for a latent stage, `None` for infectious).
    ///
    /// Flux leaves only interior cells; boundary cells absorb deposits and
    /// never emit. The scratch accumulator is folded into the field and
    /// zeroed before returning.
    pub(crate) fn diffusion_substep(&mut self, stage: Option<usize>, dt: f64) {
        let (rows, cols) = (self.rows, self.cols);
        let h_sq = self.cell_size * self.cell_size;
        let field: &mut [f64] = match stage {
            Some(s) => &mut self.latent[s],
            None => &mut self.infectious,
        };
        for row in 1..rows - 1 {
            for col in 1..cols - 1 {
                let cell = row * cols + col;
                let density = field[cell];
                if density <= DENSITY_EPS {
                    continue;
                }
                let flux = self.diffusion[cell] * dt * density / h_sq;
                self.scratch[cell] -= 2.0 * flux;
                self.scratch[cell - cols] += 0.5 * flux;
                self.scratch[cell + cols] += 0.5 * flux;
                self.scratch[cell - 1] += 0.5 * flux;
                self.scratch[cell + 1] += 0.5 * flux;
            }
        }
        for (value, delta) in field.iter_mut().zip(self.scratch.iter_mut()) {
            *value += *delta;
            *delta = 0.0;
        }
    }
}

/// Read-only daily raster indexed by `(row, col, day_of_year)`.
#[derive(Clone, Debug)]
pub struct WeatherGrid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl WeatherGrid {
    /// A raster holding `value` in every cell on every day.
    pub fn constant(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols * DAYS_PER_YEAR as usize],
        }
    }

    /// Wrap loader-supplied data laid out cell-major, day-minor.
    pub fn from_raw(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols * DAYS_PER_YEAR as usize,
            "weather raster length must be rows * cols * {DAYS_PER_YEAR}"
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn at(&self, row: usize, col: usize, day_of_year: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        debug_assert!(day_of_year < DAYS_PER_YEAR as usize);
        self.data[(row * self.cols + col) * DAYS_PER_YEAR as usize + day_of_year]
    }

    pub fn set(&mut self, row: usize, col: usize, day_of_year: usize, value: f64) {
        let idx = (row * self.cols + col) * DAYS_PER_YEAR as usize + day_of_year;
        self.data[idx] = value;
    }
}
