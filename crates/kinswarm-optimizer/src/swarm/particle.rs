//! Particle: one candidate team plus its velocity and personal best

use rand::seq::index;
use rand::Rng;

/// Velocity-update coefficients
#[derive(Debug, Clone, Copy)]
pub(crate) struct Motion {
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
    pub clamp: f64,
}

#[derive(Debug, Clone)]
pub struct Particle {
    position: Vec<bool>,
    velocity: Vec<f64>,
    fitness: f64,
    best_position: Vec<bool>,
    best_fitness: f64,
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn bit(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Particle {
    /// Random team of a size drawn from `[min, min(max, n)]`, velocity in [-1, 1]
    pub(crate) fn random<R: Rng + ?Sized>(n: usize, min: usize, max: usize, rng: &mut R) -> Self {
        let upper = max.min(n);
        let size = rng.gen_range(min..=upper);
        let mut position = vec![false; n];
        for i in index::sample(rng, n, size) {
            position[i] = true;
        }
        let velocity = (0..n).map(|_| rng.gen_range(-1.0..=1.0)).collect();

        Self {
            best_position: position.clone(),
            position,
            velocity,
            fitness: f64::NEG_INFINITY,
            best_fitness: f64::NEG_INFINITY,
        }
    }

    pub fn position(&self) -> &[bool] {
        &self.position
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn best_position(&self) -> &[bool] {
        &self.best_position
    }

    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Number of selected workers
    pub fn team_size(&self) -> usize {
        self.position.iter().filter(|b| **b).count()
    }

    /// Indices of selected workers, ascending
    pub fn team(&self) -> Vec<usize> {
        decode(&self.position)
    }

    /// Velocity update followed by sigmoid sampling of every bit
    pub(crate) fn fly<R: Rng + ?Sized>(&mut self, global_best: &[bool], motion: Motion, rng: &mut R) {
        for d in 0..self.position.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            let x = bit(self.position[d]);
            let v = motion.inertia * self.velocity[d]
                + motion.cognitive * r1 * (bit(self.best_position[d]) - x)
                + motion.social * r2 * (bit(global_best[d]) - x);
            self.velocity[d] = v.clamp(-motion.clamp, motion.clamp);
        }

        for d in 0..self.position.len() {
            let p = sigmoid(self.velocity[d]);
            self.position[d] = rng.gen::<f64>() < p;
        }
    }

    /// Add or drop uniformly random workers until the size is in `[min, max]`
    pub(crate) fn repair<R: Rng + ?Sized>(&mut self, min: usize, max: usize, rng: &mut R) {
        let size = self.team_size();
        if size < min {
            let unset: Vec<usize> = (0..self.position.len()).filter(|&i| !self.position[i]).collect();
            let needed = (min - size).min(unset.len());
            for k in index::sample(rng, unset.len(), needed) {
                self.position[unset[k]] = true;
            }
        } else if size > max {
            let set = self.team();
            for k in index::sample(rng, set.len(), size - max) {
                self.position[set[k]] = false;
            }
        }
    }

    /// Record a new evaluation; returns `true` if the personal best improved
    pub(crate) fn record(&mut self, fitness: f64) -> bool {
        self.fitness = fitness;
        if fitness > self.best_fitness {
            self.best_fitness = fitness;
            self.best_position.clone_from(&self.position);
            return true;
        }
        false
    }
}

/// Indices of set bits
pub fn decode(position: &[bool]) -> Vec<usize> {
    position
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MOTION: Motion = Motion {
        inertia: 0.7,
        cognitive: 1.5,
        social: 1.5,
        clamp: 4.0,
    };

    #[test]
    fn test_random_particle_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = Particle::random(12, 2, 5, &mut rng);
            assert!((2..=5).contains(&p.team_size()));
            assert!(p.velocity().iter().all(|v| (-1.0..=1.0).contains(v)));
            assert_eq!(p.position(), p.best_position());
        }
    }

    #[test]
    fn test_repair_grows_and_shrinks() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut p = Particle::random(10, 1, 1, &mut rng);
        p.repair(4, 6, &mut rng);
        assert_eq!(p.team_size(), 4);

        p.position = vec![true; 10];
        p.repair(4, 6, &mut rng);
        assert_eq!(p.team_size(), 6);
    }

    #[test]
    fn test_velocity_clamped_after_fly() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Particle::random(8, 1, 8, &mut rng);
        p.velocity = vec![100.0; 8];
        let global = vec![true; 8];
        p.fly(&global, MOTION, &mut rng);
        assert!(p.velocity().iter().all(|v| v.abs() <= 4.0));
    }

    #[test]
    fn test_record_tracks_personal_best() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = Particle::random(4, 1, 4, &mut rng);
        assert!(p.record(0.4));
        assert!(!p.record(0.3));
        assert_eq!(p.best_fitness(), 0.4);
        assert_eq!(p.fitness(), 0.3);
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode(&[true, false, true]), vec![0, 2]);
        assert!(decode(&[false, false]).is_empty());
    }
}
