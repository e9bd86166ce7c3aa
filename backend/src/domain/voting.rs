//! Schulze-method resolution of meal plan options.
//!
//! Each household member ranks the options proposed for a meal plan event;
//! lower ranks are preferred and options a voter left unranked are less
//! preferred than any ranked option. Abstentions record participation without
//! contributing a ranking.
//!
//! Results are deterministic for a fixed set of ballots except when several
//! candidates share the highest win count, in which case the [`TieBreaker`]
//! picks one of them at random.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::{OsRng, SmallRng};
use rand::seq::SliceRandom;

use super::meal_plans::MealPlanOptionVote;
use super::text_enum::text_enum;

/// One voter's ranking of candidate options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ballot {
    ranks: BTreeMap<String, u16>,
}

impl Ballot {
    /// Record `rank` for `candidate`.
    pub fn rank(&mut self, candidate: impl Into<String>, rank: u16) {
        self.ranks.insert(candidate.into(), rank);
    }

    /// Whether this ballot prefers `a` over `b`.
    fn prefers(&self, a: &str, b: &str) -> bool {
        match (self.ranks.get(a), self.ranks.get(b)) {
            (Some(rank_a), Some(rank_b)) => rank_a < rank_b,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// A candidate and the number of rivals it beats on strongest paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Option identifier.
    pub candidate: String,
    /// Rivals beaten by a stronger strongest path.
    pub wins: usize,
}

/// Rank `candidates` by Schulze wins, most wins first.
///
/// Candidates with equal wins are ordered by identifier so the output is
/// stable for identical input.
pub fn schulze_standings(candidates: &[String], ballots: &[Ballot]) -> Vec<Standing> {
    let n = candidates.len();

    let mut preferences = vec![vec![0_u32; n]; n];
    for ballot in ballots {
        for (i, a) in candidates.iter().enumerate() {
            for (j, b) in candidates.iter().enumerate() {
                if i != j && ballot.prefers(a, b) {
                    preferences[i][j] += 1;
                }
            }
        }
    }

    let mut strengths = vec![vec![0_u32; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j && preferences[i][j] > preferences[j][i] {
                strengths[i][j] = preferences[i][j];
            }
        }
    }

    // Widest paths.
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            for k in 0..n {
                if k == i || k == j {
                    continue;
                }
                let through_i = strengths[j][i].min(strengths[i][k]);
                if through_i > strengths[j][k] {
                    strengths[j][k] = through_i;
                }
            }
        }
    }

    let mut standings: Vec<Standing> = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| Standing {
            candidate: candidate.clone(),
            wins: (0..n)
                .filter(|&j| j != i && strengths[i][j] > strengths[j][i])
                .count(),
        })
        .collect();
    standings.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| a.candidate.cmp(&b.candidate))
    });
    standings
}

text_enum! {
    /// Randomness source used to break voting ties.
    pub enum TieBreakSource {
        /// Process-wide PRNG seeded once at startup.
        ProcessPrng => "prng",
        /// Operating system CSPRNG, consulted on every tie.
        Crypto => "crypto",
    }
}

impl Default for TieBreakSource {
    fn default() -> Self {
        Self::ProcessPrng
    }
}

#[derive(Debug)]
enum TieBreakRng {
    Process(Mutex<SmallRng>),
    Os,
}

/// Picks uniformly among tied candidates.
#[derive(Debug)]
pub struct TieBreaker {
    rng: TieBreakRng,
}

impl TieBreaker {
    /// Tie breaker drawing from `source`. The process PRNG is seeded from
    /// entropy here, once.
    pub fn new(source: TieBreakSource) -> Self {
        let rng = match source {
            TieBreakSource::ProcessPrng => {
                TieBreakRng::Process(Mutex::new(SmallRng::from_entropy()))
            }
            TieBreakSource::Crypto => TieBreakRng::Os,
        };
        Self { rng }
    }

    /// A process PRNG with a fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: TieBreakRng::Process(Mutex::new(SmallRng::seed_from_u64(seed))),
        }
    }

    /// Choose one of `tied`, or `None` when it is empty.
    pub fn pick<'a, T>(&self, tied: &'a [T]) -> Option<&'a T> {
        match &self.rng {
            TieBreakRng::Process(rng) => {
                let mut guard = rng.lock().unwrap_or_else(PoisonError::into_inner);
                tied.choose(&mut *guard)
            }
            TieBreakRng::Os => tied.choose(&mut OsRng),
        }
    }
}

impl Default for TieBreaker {
    fn default() -> Self {
        Self::new(TieBreakSource::default())
    }
}

/// Outcome of resolving the options of one meal plan event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionResolution {
    /// Whether an option was picked.
    pub chosen: bool,
    /// Whether the pick needed the tie breaker.
    pub tiebroken: bool,
    /// Identifier of the picked option.
    pub winner: Option<String>,
}

impl OptionResolution {
    /// No decision could be made.
    pub fn undecided() -> Self {
        Self::default()
    }

    fn decided(winner: String, tiebroken: bool) -> Self {
        Self {
            chosen: true,
            tiebroken,
            winner: Some(winner),
        }
    }
}

/// Decide the winning option from the votes cast on one event.
///
/// `members` are the household's current members. When any of them has no
/// vote on record the event cannot be decided yet. Abstentions satisfy that
/// guard and make the option a candidate, but carry no ranking.
pub fn resolve_options(
    votes: &[MealPlanOptionVote],
    members: &[String],
    tie_breaker: &TieBreaker,
) -> OptionResolution {
    let voters: HashSet<&str> = votes.iter().map(|v| v.by_user.as_str()).collect();
    if members.iter().any(|member| !voters.contains(member.as_str())) {
        return OptionResolution::undecided();
    }

    let mut ballots: BTreeMap<&str, Ballot> = BTreeMap::new();
    let mut candidates: BTreeSet<&str> = BTreeSet::new();
    for vote in votes {
        let ballot = ballots.entry(vote.by_user.as_str()).or_default();
        candidates.insert(vote.belongs_to_meal_plan_option.as_str());
        if !vote.abstain {
            ballot.rank(vote.belongs_to_meal_plan_option.as_str(), vote.rank);
        }
    }
    if candidates.is_empty() {
        return OptionResolution::undecided();
    }

    let candidates: Vec<String> = candidates.into_iter().map(str::to_owned).collect();
    let ballots: Vec<Ballot> = ballots.into_values().collect();
    let standings = schulze_standings(&candidates, &ballots);

    let Some(top_wins) = standings.first().map(|s| s.wins) else {
        return OptionResolution::undecided();
    };
    let tied: Vec<&Standing> = standings.iter().take_while(|s| s.wins == top_wins).collect();

    match tied.as_slice() {
        [] => OptionResolution::undecided(),
        [only] => OptionResolution::decided(only.candidate.clone(), false),
        several => tie_breaker
            .pick(several)
            .map_or_else(OptionResolution::undecided, |picked| {
                OptionResolution::decided(picked.candidate.clone(), true)
            }),
    }
}
