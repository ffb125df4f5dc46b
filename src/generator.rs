use tracing::info;

use crate::bracket::Bracket;
use crate::builder::{build_bracket, build_seeded, has_history, seed_from_history, validate_options};
use crate::error::{Result, TournamentError};
use crate::ranking::rank_teams;
use crate::reconcile::Reconciler;
use crate::schedule::next_round;
use crate::types::{BracketOptions, GeneratorState, Ranking, Round, Team};

/// A tournament format that turns recorded history into the next round.
pub trait PairingGenerator {
    fn name(&self) -> &str;

    fn state(&self) -> GeneratorState;

    /// Whether teams may join once a round exists.
    fn supports_late_entry(&self) -> bool;

    fn reset(&mut self);

    /// Rebuilds the tournament from scratch and replays `rounds` onto it.
    /// On failure the previously loaded state is kept.
    fn load_state(&mut self, teams: &[Team], rounds: &[Round]) -> Result<()>;

    /// `Ok(None)` means the tournament is over.
    fn create_next_round(&self, places: Option<usize>) -> Result<Option<Round>>;

    fn generate_rankings(&self) -> Result<Vec<Ranking>>;
}

#[derive(Debug, Clone)]
pub struct EliminationGenerator {
    options: BracketOptions,
    bracket: Option<Bracket>,
}

impl EliminationGenerator {
    pub fn new(options: BracketOptions) -> Result<Self> {
        validate_options(&options)?;
        Ok(EliminationGenerator {
            options,
            bracket: None,
        })
    }

    pub fn single_elimination() -> Self {
        EliminationGenerator {
            options: BracketOptions::single(),
            bracket: None,
        }
    }

    pub fn double_elimination() -> Self {
        EliminationGenerator {
            options: BracketOptions::double(),
            bracket: None,
        }
    }

    /// The reconciled bracket of the last successful load.
    pub fn bracket(&self) -> Option<&Bracket> {
        self.bracket.as_ref()
    }

    fn loaded(&self) -> Result<&Bracket> {
        self.bracket.as_ref().ok_or(TournamentError::NotInitialized)
    }
}

impl PairingGenerator for EliminationGenerator {
    fn name(&self) -> &str {
        if self.options.eliminations == 1 {
            "Single Elimination"
        } else {
            "Double Elimination"
        }
    }

    fn state(&self) -> GeneratorState {
        match self.bracket {
            Some(_) => GeneratorState::Initialized,
            None => GeneratorState::NotInitialized,
        }
    }

    fn supports_late_entry(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.bracket = None;
    }

    /// Without history the bracket is seeded by rating. Once rounds exist the
    /// seeds come from the history itself, so edited ratings cannot move
    /// teams that have already played.
    fn load_state(&mut self, teams: &[Team], rounds: &[Round]) -> Result<()> {
        let mut bracket = if has_history(rounds) {
            build_seeded(&seed_from_history(teams, rounds)?, &self.options)?
        } else {
            build_bracket(teams, &self.options)?
        };
        let byes_locked = {
            let mut reconciler = Reconciler::new(&mut bracket);
            reconciler.replay(rounds)?;
            reconciler.byes_locked()
        };
        info!(
            format = self.name(),
            teams = teams.len(),
            rounds = rounds.len(),
            byes_locked,
            "loaded tournament state"
        );
        self.bracket = Some(bracket);
        Ok(())
    }

    fn create_next_round(&self, places: Option<usize>) -> Result<Option<Round>> {
        if places == Some(0) {
            return Err(TournamentError::InvalidArgument(
                "places must be at least 1".to_string(),
            ));
        }
        next_round(self.loaded()?, places)
    }

    fn generate_rankings(&self) -> Result<Vec<Ranking>> {
        rank_teams(self.loaded()?)
    }
}
