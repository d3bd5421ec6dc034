use rand::prelude::*;

use super::state::Ticks;

/// Seeded source of burst-length jitter.
///
/// Every CPU burst is jittered once, when it is first dispatched, and every
/// I/O burst once, when the process blocks on it. A fixed seed therefore
/// reproduces the same schedule for the same input.
#[derive(Debug)]
pub struct VarianceGen {
    rng: StdRng,
    cpu_variance: f64,
    io_variance: f64,
}

impl VarianceGen {
    pub fn new(cpu_variance: f64, io_variance: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            cpu_variance,
            io_variance,
        }
    }

    pub fn cpu_burst(&mut self, nominal: Ticks) -> Ticks {
        jitter(&mut self.rng, nominal, self.cpu_variance)
    }

    pub fn io_burst(&mut self, nominal: Ticks) -> Ticks {
        jitter(&mut self.rng, nominal, self.io_variance)
    }
}

/// Draw a length in `[round(n*(1-v)), round(n*(1+v))]`, never below 1.
///
/// Zero variance and zero-length bursts are returned as-is without touching
/// the generator.
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, nominal: Ticks, variance: f64) -> Ticks {
    if nominal == 0 || variance == 0.0 {
        return nominal;
    }

    let n = nominal as f64;
    let lo = ((n * (1.0 - variance)).round() as Ticks).max(1);
    let hi = ((n * (1.0 + variance)).round() as Ticks).max(lo);
    rng.random_range(lo..=hi)
}
