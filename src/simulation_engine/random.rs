use rand::rngs::{SmallRng, StdRng};
use rand::Rng;
use std::collections::VecDeque;

/// The single source of randomness injected into the engine. Arrivals, bursts,
/// emergency spawns, crash rolls and exploration all draw from it.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }

    /// Uniform index in `0..n`. `n` must be non-zero.
    fn pick(&mut self, n: usize) -> usize {
        let index = (self.next_unit() * n as f64) as usize;
        index.min(n.saturating_sub(1))
    }
}

impl RandomSource for SmallRng {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Replays a fixed list of rolls, then repeats `fallback` forever.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// A source where every `chance` fails (for any probability below 1).
    pub fn never() -> Self {
        Self::new([], 0.999_999)
    }

    /// A source where every `chance` with a positive probability succeeds.
    pub fn always() -> Self {
        Self::new([], 0.0)
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RandomSource for ScriptedRolls {
    fn next_unit(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }
}
