use serde::{Deserialize, Serialize};

use crate::score::Score;

// ── Constants ──────────────────────────────────────────────────────────

/// Highest elimination count the decider-based bracket can express.
pub const MAX_ELIMINATIONS: u8 = 2;
/// A pairing with more entries than this is never valid history.
pub const MAX_PAIRING_ENTRIES: usize = 2;

// ── Tournament domain types ────────────────────────────────────────────

pub type TeamId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    /// Only used for seeding when the bracket is rebuilt.
    #[serde(default)]
    pub rating: Option<i64>,
}

impl Team {
    pub fn new(id: TeamId, rating: i64) -> Self {
        Team {
            id,
            rating: Some(rating),
        }
    }

    pub fn unrated(id: TeamId) -> Self {
        Team { id, rating: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingEntry {
    pub team: TeamId,
    #[serde(default)]
    pub score: Option<Score>,
}

/// One scheduled unit of play. Zero entries is a placeholder, one entry is
/// a bye, two entries is a match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pairing {
    pub entries: Vec<PairingEntry>,
}

impl Pairing {
    pub fn bye(team: TeamId) -> Self {
        Pairing {
            entries: vec![PairingEntry { team, score: None }],
        }
    }

    pub fn matchup(a: TeamId, b: TeamId) -> Self {
        Pairing {
            entries: vec![
                PairingEntry { team: a, score: None },
                PairingEntry { team: b, score: None },
            ],
        }
    }

    pub fn scored(a: TeamId, score_a: Score, b: TeamId, score_b: Score) -> Self {
        Pairing {
            entries: vec![
                PairingEntry {
                    team: a,
                    score: Some(score_a),
                },
                PairingEntry {
                    team: b,
                    score: Some(score_b),
                },
            ],
        }
    }

    pub fn teams(&self) -> Vec<TeamId> {
        self.entries.iter().map(|entry| entry.team).collect()
    }

    pub fn is_bye(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn contains(&self, team: TeamId) -> bool {
        self.entries.iter().any(|entry| entry.team == team)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Round {
    pub pairings: Vec<Pairing>,
}

impl Round {
    pub fn new(pairings: Vec<Pairing>) -> Self {
        Round { pairings }
    }

    pub fn find(&self, team: TeamId) -> Option<&Pairing> {
        self.pairings.iter().find(|pairing| pairing.contains(team))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub team: TeamId,
    pub rank: usize,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GeneratorState {
    NotInitialized,
    Initialized,
}

/// Shape of the bracket to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BracketOptions {
    pub eliminations: u8,
    /// Double elimination only: the loser-bracket champion must win the
    /// grand final twice.
    pub grand_final_reset: bool,
}

impl Default for BracketOptions {
    fn default() -> Self {
        BracketOptions {
            eliminations: 1,
            grand_final_reset: true,
        }
    }
}

impl BracketOptions {
    pub fn single() -> Self {
        BracketOptions::default()
    }

    pub fn double() -> Self {
        BracketOptions {
            eliminations: 2,
            grand_final_reset: true,
        }
    }
}
