//! Simulated deviation paths shared by unit tests, integration tests and benches

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const BURN_IN: usize = 200;

/// ARMA(1,1) path `mean + x_t`, `x_t = phi x_{t-1} + e_t + theta e_{t-1}`,
/// with `e_t ~ N(0, sigma²)` drawn from a seeded `StdRng`.
pub fn simulate_arma(
    n: usize,
    mean: f64,
    phi: f64,
    theta: f64,
    sigma: f64,
    seed: u64,
) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let innovations = Normal::new(0.0, sigma).expect("sigma must be finite and non-negative");

    let (mut x, mut prev_eps) = (0.0, 0.0);
    let mut out = Vec::with_capacity(n);
    for i in 0..n + BURN_IN {
        let eps = innovations.sample(&mut rng);
        x = phi * x + eps + theta * prev_eps;
        prev_eps = eps;
        if i >= BURN_IN {
            out.push(mean + x);
        }
    }
    out
}
