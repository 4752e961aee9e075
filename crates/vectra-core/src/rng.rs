//! Draw adapters over an explicit generator handle.
//!
//! Every stochastic component in the crate takes `&mut R where R: Rng + ?Sized`
//! and goes through these functions; there is no global generator. Degenerate
//! parameters (zero rates, empty populations) short-circuit without consuming
//! randomness.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Gamma, Poisson};

/// A uniform draw in `[0, 1)`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random::<f64>()
}

pub fn poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> u64 {
    if lambda <= 0.0 {
        return 0;
    }
    let dist = Poisson::new(lambda).expect("poisson rate must be finite and positive");
    dist.sample(rng) as u64
}

pub fn binomial<R: Rng + ?Sized>(rng: &mut R, n: u64, p: f64) -> u64 {
    if n == 0 || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    let dist = Binomial::new(n, p).expect("binomial probability must be finite");
    dist.sample(rng)
}

pub fn gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, scale: f64) -> f64 {
    if shape <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    let dist = Gamma::new(shape, scale).expect("gamma parameters must be finite and positive");
    dist.sample(rng)
}

/// Negative binomial composed as a Poisson–Gamma mixture:
/// `g ~ Gamma(shape = k, scale = p / (1 - p))`, then `Poisson(g)`.
///
/// The mixture form matches the library NB in distribution but keeps the
/// draw identical across sampling libraries.
pub fn neg_binomial<R: Rng + ?Sized>(rng: &mut R, k: f64, p: f64) -> u64 {
    if p <= 0.0 {
        return 0;
    }
    assert!(p < 1.0, "neg_binomial requires p < 1");
    let mixed_rate = gamma(rng, k, p / (1.0 - p));
    poisson(rng, mixed_rate)
}

/// Binomial draw with a Poisson shortcut for the large-`n`, small-`p` regime
/// (`n > 100`, `p < 0.01`, `np < 20`); the Poisson draw is clamped to `n`.
pub fn binomial_approx<R: Rng + ?Sized>(rng: &mut R, n: u64, p: f64) -> u64 {
    let np = n as f64 * p;
    if n > 100 && p < 0.01 && np < 20.0 {
        poisson(rng, np).min(n)
    } else {
        binomial(rng, n, p)
    }
}

/// `P(X = x)` for `X ~ Poisson(lambda)`, via the multiplicative recurrence.
pub fn poisson_pmf(x: u64, lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return if x == 0 { 1.0 } else { 0.0 };
    }
    let mut pmf = (-lambda).exp();
    for k in 0..x {
        pmf *= lambda / (k + 1) as f64;
    }
    pmf
}

/// `P(X <= x)` for `X ~ Poisson(lambda)`.
pub fn poisson_cdf(x: u64, lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut pmf = (-lambda).exp();
    let mut cdf = pmf;
    for k in 0..x {
        pmf *= lambda / (k + 1) as f64;
        cdf += pmf;
    }
    cdf.min(1.0)
}

/// `P(X > x)` for `X ~ Poisson(lambda)`.
pub fn poisson_survival(x: u64, lambda: f64) -> f64 {
    (1.0 - poisson_cdf(x, lambda)).max(0.0)
}
