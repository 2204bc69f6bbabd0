//! Post-hoc patterns among the best teams of a run

use std::collections::BTreeSet;
use std::fmt;

use kinswarm_common::{GenotypeGroup, GenotypeSet, Roster};
use serde::{Deserialize, Serialize};

use crate::swarm::TeamSnapshot;

/// Snapshots needed before anything is reported
pub const MIN_SNAPSHOTS: usize = 5;

/// Number of top teams examined
pub const TOP_TEAMS: usize = 5;

/// Top teams that must show a pattern for it to be reported
pub const SUPPORT_THRESHOLD: usize = 3;

/// Combined capability count below which a team counts as specialized
pub const SPECIALIZATION_LIMIT: usize = 10;

/// Distinct genotype groups at which a team counts as hybrid
pub const HYBRID_GROUPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    KinClustering,
    CapabilitySpecialization,
    HybridTeams,
}

impl StrategyKind {
    /// Report order
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::KinClustering,
        StrategyKind::CapabilitySpecialization,
        StrategyKind::HybridTeams,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::KinClustering => "Kin Clustering",
            StrategyKind::CapabilitySpecialization => "Capability Specialization",
            StrategyKind::HybridTeams => "Hybrid Teams",
        }
    }

    fn matches(self, team: &TeamProfile) -> bool {
        match self {
            StrategyKind::KinClustering => team.largest_group * 2 > team.size,
            StrategyKind::CapabilitySpecialization => team.capabilities < SPECIALIZATION_LIMIT,
            StrategyKind::HybridTeams => team.groups >= HYBRID_GROUPS,
        }
    }
}

/// A pattern and how many of the top teams showed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergentStrategy {
    pub kind: StrategyKind,
    pub support: usize,
    pub examined: usize,
}

impl fmt::Display for EmergentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match self.kind {
            StrategyKind::KinClustering => "dominated by a single genotype group",
            StrategyKind::CapabilitySpecialization => "combine fewer than 10 distinct capabilities",
            StrategyKind::HybridTeams => "span at least 3 genotype groups",
        };
        write!(
            f,
            "{}: {} of the top {} teams are {}",
            self.kind.label(),
            self.support,
            self.examined,
            detail
        )
    }
}

struct TeamProfile {
    size: usize,
    largest_group: usize,
    groups: usize,
    capabilities: usize,
}

impl TeamProfile {
    fn of(members: &[usize], roster: &Roster) -> Self {
        let mut counts = [0usize; GenotypeGroup::COUNT];
        let mut capabilities = BTreeSet::new();
        for worker in roster.select(members) {
            counts[worker.genotype.index()] += 1;
            capabilities.extend(worker.capabilities.iter().map(String::as_str));
        }
        let groups: GenotypeSet = roster.select(members).map(|w| w.genotype).collect();

        Self {
            size: members.len(),
            largest_group: counts.iter().copied().max().unwrap_or(0),
            groups: groups.len(),
            capabilities: capabilities.len(),
        }
    }
}

/// Patterns shared by at least 3 of the 5 fittest snapshots.
///
/// Fewer than 5 snapshots yields nothing. Ties keep the earlier snapshot.
pub fn detect_strategies(snapshots: &[TeamSnapshot], roster: &Roster) -> Vec<EmergentStrategy> {
    if snapshots.len() < MIN_SNAPSHOTS {
        return Vec::new();
    }

    let mut ranked: Vec<&TeamSnapshot> = snapshots.iter().collect();
    // stable: equal fitness keeps record order
    ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

    let profiles: Vec<TeamProfile> = ranked
        .into_iter()
        .take(TOP_TEAMS)
        .filter(|s| !s.members.is_empty())
        .map(|s| TeamProfile::of(&s.members, roster))
        .collect();

    StrategyKind::ALL
        .iter()
        .filter_map(|&kind| {
            let support = profiles.iter().filter(|p| kind.matches(p)).count();
            (support >= SUPPORT_THRESHOLD).then_some(EmergentStrategy {
                kind,
                support,
                examined: profiles.len(),
            })
        })
        .collect()
}

/// Human-readable form of [`detect_strategies`]
pub fn describe_strategies(snapshots: &[TeamSnapshot], roster: &Roster) -> Vec<String> {
    detect_strategies(snapshots, roster)
        .iter()
        .map(ToString::to_string)
        .collect()
}
