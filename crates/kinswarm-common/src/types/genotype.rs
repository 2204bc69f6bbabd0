//! GenotypeGroup - coarse cooperation-affinity category
//!
//! Every worker belongs to exactly one group for the lifetime of a run.
//! Workers sharing a group are treated as kin by the compatibility model
//! and the set of distinct groups in a team drives its diversity score.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of cooperation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenotypeGroup {
    /// Shares work freely, optimizes for team outcome
    Altruist,
    /// Cooperates in proportion to cooperation received
    Reciprocator,
    /// Deep single-domain contributor
    Specialist,
    /// Seeks novel approaches, tolerates risk
    Explorer,
    /// Reviews, verifies, guards quality
    Sentinel,
}

impl GenotypeGroup {
    /// Every group, in declaration order
    pub const ALL: [GenotypeGroup; 5] = [
        GenotypeGroup::Altruist,
        GenotypeGroup::Reciprocator,
        GenotypeGroup::Specialist,
        GenotypeGroup::Explorer,
        GenotypeGroup::Sentinel,
    ];

    /// Total number of groups (denominator of the diversity score)
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index in `0..COUNT`
    #[inline]
    pub fn index(self) -> usize {
        match self {
            GenotypeGroup::Altruist => 0,
            GenotypeGroup::Reciprocator => 1,
            GenotypeGroup::Specialist => 2,
            GenotypeGroup::Explorer => 3,
            GenotypeGroup::Sentinel => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenotypeGroup::Altruist => "altruist",
            GenotypeGroup::Reciprocator => "reciprocator",
            GenotypeGroup::Specialist => "specialist",
            GenotypeGroup::Explorer => "explorer",
            GenotypeGroup::Sentinel => "sentinel",
        }
    }
}

impl fmt::Display for GenotypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a known group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGenotype(pub String);

impl FromStr for GenotypeGroup {
    type Err = UnknownGenotype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        GenotypeGroup::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == tag)
            .ok_or_else(|| UnknownGenotype(s.to_string()))
    }
}

/// Presence set over genotype groups, one flag per group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenotypeSet {
    present: [bool; GenotypeGroup::COUNT],
}

impl GenotypeSet {
    pub fn insert(&mut self, group: GenotypeGroup) {
        self.present[group.index()] = true;
    }

    /// Number of distinct groups present
    pub fn len(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<GenotypeGroup> for GenotypeSet {
    fn from_iter<I: IntoIterator<Item = GenotypeGroup>>(iter: I) -> Self {
        let mut set = GenotypeSet::default();
        for group in iter {
            set.insert(group);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_dense() {
        for (i, group) in GenotypeGroup::ALL.iter().enumerate() {
            assert_eq!(group.index(), i);
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Explorer".parse::<GenotypeGroup>(), Ok(GenotypeGroup::Explorer));
        assert_eq!(" sentinel ".parse::<GenotypeGroup>(), Ok(GenotypeGroup::Sentinel));
        assert!("martian".parse::<GenotypeGroup>().is_err());
    }

    #[test]
    fn test_genotype_set_counts_distinct() {
        let set: GenotypeSet = [
            GenotypeGroup::Altruist,
            GenotypeGroup::Altruist,
            GenotypeGroup::Sentinel,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(GenotypeSet::default().is_empty());
    }
}
