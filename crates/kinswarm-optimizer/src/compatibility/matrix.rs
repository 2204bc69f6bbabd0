//! Compatibility matrix: compat[i][j] = min(1, jaccard(modules) × kin_bonus)
//!
//! Built once per roster and shared read-only across runs.

use std::collections::BTreeSet;

use kinswarm_common::Roster;
use tracing::debug;

use crate::DEFAULT_KIN_BONUS;

/// Immutable N×N relatedness matrix with values in [0, 1] and a unit diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityMatrix {
    size: usize,
    values: Vec<f64>,
}

/// |a ∩ b| / |a ∪ b|, 0 when both are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

impl CompatibilityMatrix {
    /// Build with the default kin bonus
    pub fn build(roster: &Roster) -> Self {
        Self::build_with_kin_bonus(roster, DEFAULT_KIN_BONUS)
    }

    pub fn build_with_kin_bonus(roster: &Roster, kin_bonus: f64) -> Self {
        let size = roster.len();
        let mut values = vec![0.0; size * size];

        for i in 0..size {
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                let (a, b) = (&roster[i], &roster[j]);
                let overlap = jaccard(&a.modules, &b.modules);
                let bonus = if a.genotype == b.genotype { kin_bonus } else { 1.0 };
                let compat = (overlap * bonus).clamp(0.0, 1.0);
                values[i * size + j] = compat;
                values[j * size + i] = compat;
            }
        }

        debug!(workers = size, "Built compatibility matrix");
        Self { size, values }
    }

    /// Roster size N
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.size..(i + 1) * self.size]
    }

    /// Mean over unordered pairs of `members`; `None` for fewer than two
    pub fn mean_pairwise(&self, members: &[usize]) -> Option<f64> {
        if members.len() < 2 {
            return None;
        }
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                sum += self.get(i, j);
                pairs += 1;
            }
        }
        Some(sum / pairs as f64)
    }

    /// Mean compatibility of `member` with every other index in `team`
    pub fn mean_with(&self, member: usize, team: &[usize]) -> Option<f64> {
        let others: Vec<f64> = team
            .iter()
            .filter(|&&j| j != member)
            .map(|&j| self.get(member, j))
            .collect();
        if others.is_empty() {
            return None;
        }
        Some(others.iter().sum::<f64>() / others.len() as f64)
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| (0..i).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinswarm_common::{GenotypeGroup, Worker};
    use proptest::prelude::*;

    fn roster(workers: Vec<Worker>) -> Roster {
        Roster::new(workers).unwrap()
    }

    #[test]
    fn test_kin_with_identical_modules_is_capped() {
        let r = roster(vec![
            Worker::new("a", "dev", GenotypeGroup::Altruist).with_modules(["llm"]),
            Worker::new("b", "dev", GenotypeGroup::Altruist).with_modules(["llm"]),
        ]);
        let m = CompatibilityMatrix::build(&r);
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 0), 1.0);
    }

    #[test]
    fn test_kin_bonus_applies_only_to_same_genotype() {
        let r = roster(vec![
            Worker::new("a", "dev", GenotypeGroup::Altruist).with_modules(["llm", "web"]),
            Worker::new("b", "dev", GenotypeGroup::Altruist).with_modules(["llm", "db"]),
            Worker::new("c", "dev", GenotypeGroup::Explorer).with_modules(["llm", "db"]),
        ]);
        let m = CompatibilityMatrix::build(&r);
        // jaccard({llm,web},{llm,db}) = 1/3
        assert!((m.get(0, 1) - 0.5).abs() < 1e-12);
        assert!((m.get(0, 2) - 1.0 / 3.0).abs() < 1e-12);
        // identical modules, different genotype
        assert!((m.get(1, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_modules_give_zero() {
        let r = roster(vec![
            Worker::new("a", "dev", GenotypeGroup::Altruist),
            Worker::new("b", "dev", GenotypeGroup::Altruist),
        ]);
        let m = CompatibilityMatrix::build(&r);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(0, 0), 1.0);
    }

    #[test]
    fn test_single_worker_roster() {
        let r = roster(vec![Worker::new("solo", "dev", GenotypeGroup::Sentinel)]);
        let m = CompatibilityMatrix::build(&r);
        assert_eq!(m.len(), 1);
        assert_eq!(m.row(0), &[1.0]);
    }

    #[test]
    fn test_mean_pairwise() {
        let r = roster(vec![
            Worker::new("a", "dev", GenotypeGroup::Altruist).with_modules(["x"]),
            Worker::new("b", "dev", GenotypeGroup::Explorer).with_modules(["x"]),
            Worker::new("c", "dev", GenotypeGroup::Sentinel).with_modules(["y"]),
        ]);
        let m = CompatibilityMatrix::build(&r);
        // pairs: (a,b)=1, (a,c)=0, (b,c)=0
        assert!((m.mean_pairwise(&[0, 1, 2]).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.mean_pairwise(&[0]), None);
        assert_eq!(m.mean_with(0, &[0, 1, 2]), Some(0.5));
    }

    fn arb_worker(index: usize) -> impl Strategy<Value = Worker> {
        (
            0..GenotypeGroup::COUNT,
            prop::collection::btree_set("[a-e]", 0..5),
        )
            .prop_map(move |(g, modules)| {
                Worker::new(format!("w{index}"), "dev", GenotypeGroup::ALL[g]).with_modules(modules)
            })
    }

    fn arb_roster() -> impl Strategy<Value = Roster> {
        (1usize..12)
            .prop_flat_map(|n| (0..n).map(arb_worker).collect::<Vec<_>>())
            .prop_map(|workers| Roster::new(workers).unwrap())
    }

    proptest! {
        #[test]
        fn prop_symmetric_with_unit_diagonal(r in arb_roster()) {
            let m = CompatibilityMatrix::build(&r);
            prop_assert!(m.is_symmetric());
            for i in 0..m.len() {
                prop_assert_eq!(m.get(i, i), 1.0);
                for j in 0..m.len() {
                    prop_assert!((0.0..=1.0).contains(&m.get(i, j)));
                }
            }
        }
    }
}
