use std::collections::HashMap;

use crate::bracket::{Bracket, DeciderId};
use crate::decider::{DeciderKind, Region, Resolution};
use crate::error::{Result, TournamentError};
use crate::types::{Ranking, TeamId};

/// Final standings of a decided bracket.
///
/// Teams knocked out at the same depth share a rank, and the next rank
/// skips past them (1, 2, 3, 3, 5, ...). Teams sharing a rank are listed by id.
pub fn rank_teams(bracket: &Bracket) -> Result<Vec<Ranking>> {
    let champion = match bracket.resolve(bracket.root_decider())? {
        Resolution::Decided { winner, .. } => winner,
        Resolution::Pending => {
            return Err(TournamentError::invalid_state(
                "rankings are only available once the final has been decided",
            ))
        }
    };

    let eliminations = eliminations(bracket)?;
    let losers_rounds = bracket
        .decider_ids()
        .filter(|id| bracket.decider(*id).region == Region::Losers)
        .map(|id| bracket.decider_depth(id))
        .max();

    let mut placed = Vec::new();
    for team in bracket.leaf_teams() {
        if Some(team) == champion {
            placed.push((team, 0, "Winner".to_string()));
            continue;
        }
        let (depth, decider) = eliminations.get(&team).copied().ok_or_else(|| {
            TournamentError::invalid_state(format!(
                "team {team} was never eliminated although the final is decided"
            ))
        })?;
        placed.push((
            team,
            depth + 1,
            describe(bracket, decider, depth, losers_rounds),
        ));
    }

    let mut rankings = placed
        .iter()
        .map(|(team, key, description)| Ranking {
            team: *team,
            rank: 1 + placed.iter().filter(|(_, other, _)| other < key).count(),
            description: description.clone(),
        })
        .collect::<Vec<_>>();
    rankings.sort_by_key(|ranking| (ranking.rank, ranking.team));
    Ok(rankings)
}

/// For every team, the shallowest decided match it lost without dropping
/// somewhere else.
fn eliminations(bracket: &Bracket) -> Result<HashMap<TeamId, (usize, DeciderId)>> {
    let mut out: HashMap<TeamId, (usize, DeciderId)> = HashMap::new();
    for id in bracket.decider_ids() {
        if !bracket.decider(id).is_match() || bracket.loser_continues(id) {
            continue;
        }
        let Resolution::Decided {
            loser: Some(loser), ..
        } = bracket.resolve(id)?
        else {
            continue;
        };
        let depth = bracket.decider_depth(id);
        let entry = out.entry(loser).or_insert((depth, id));
        if depth < entry.0 {
            *entry = (depth, id);
        }
    }
    Ok(out)
}

fn describe(bracket: &Bracket, decider: DeciderId, depth: usize, losers_rounds: Option<usize>) -> String {
    let decider = bracket.decider(decider);
    match decider.region {
        Region::GrandFinal => match decider.kind {
            DeciderKind::Stay(_) => "Lost in grand final reset".to_string(),
            _ => "Lost in grand final".to_string(),
        },
        Region::Losers => {
            let deepest = losers_rounds.unwrap_or(depth);
            format!("Eliminated in losers round {}", deepest.saturating_sub(depth) + 1)
        }
        Region::Winners => match depth {
            0 => "Lost in final".to_string(),
            1 => "Lost in semi-final".to_string(),
            2 => "Lost in quarter-final".to_string(),
            _ => format!("Lost in round of {}", 1usize << (depth + 1)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_bracket;
    use crate::reconcile::Reconciler;
    use crate::schedule::next_round;
    use crate::score::Score;
    use crate::types::{BracketOptions, Pairing, Round, Team};

    /// Plays every scheduled round with the lower id winning.
    fn play_out(count: u64, options: BracketOptions) -> Bracket {
        let teams = (1..=count)
            .map(|id| Team::new(id, 1000 - id as i64))
            .collect::<Vec<_>>();
        let mut bracket = build_bracket(&teams, &options).unwrap();
        while let Some(round) = next_round(&bracket, None).unwrap() {
            let played = round
                .pairings
                .iter()
                .map(|pairing| match pairing.teams().as_slice() {
                    [a, b] => Pairing::scored(
                        *a,
                        Score::Points(-(*a as i64)),
                        *b,
                        Score::Points(-(*b as i64)),
                    ),
                    _ => pairing.clone(),
                })
                .collect();
            Reconciler::new(&mut bracket)
                .replay(&[Round::new(played)])
                .unwrap();
        }
        bracket
    }

    fn find(rankings: &[Ranking], team: TeamId) -> &Ranking {
        rankings.iter().find(|ranking| ranking.team == team).unwrap()
    }

    #[test]
    fn test_undecided_bracket_has_no_rankings() {
        let teams = vec![Team::new(1, 10), Team::new(2, 5)];
        let bracket = build_bracket(&teams, &BracketOptions::single()).unwrap();
        assert!(rank_teams(&bracket).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_three_team_standings() {
        let rankings = rank_teams(&play_out(3, BracketOptions::single())).unwrap();
        let summary = rankings
            .iter()
            .map(|ranking| (ranking.team, ranking.rank))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![(1, 1), (2, 2), (3, 3)]);
        assert_eq!(rankings[0].description, "Winner");
        assert_eq!(rankings[1].description, "Lost in final");
        assert_eq!(rankings[2].description, "Lost in semi-final");
    }

    #[test]
    fn test_shared_ranks_skip() {
        let rankings = rank_teams(&play_out(16, BracketOptions::single())).unwrap();
        assert_eq!(find(&rankings, 3).rank, 3);
        assert_eq!(find(&rankings, 4).rank, 3);
        assert_eq!((rankings[2].team, rankings[3].team), (3, 4));
        assert_eq!(find(&rankings, 5).rank, 5);
        assert_eq!(find(&rankings, 5).description, "Lost in quarter-final");
        assert_eq!(find(&rankings, 16).rank, 9);
        assert_eq!(find(&rankings, 16).description, "Lost in round of 16");
    }

    #[test]
    fn test_double_elimination_standings() {
        let rankings = rank_teams(&play_out(4, BracketOptions::double())).unwrap();
        assert_eq!(find(&rankings, 1).description, "Winner");
        assert_eq!(find(&rankings, 2).rank, 2);
        assert_eq!(find(&rankings, 2).description, "Lost in grand final");
        assert_eq!(find(&rankings, 3).rank, 3);
        assert_eq!(find(&rankings, 3).description, "Eliminated in losers round 2");
        assert_eq!(find(&rankings, 4).rank, 4);
        assert_eq!(find(&rankings, 4).description, "Eliminated in losers round 1");
    }

    #[test]
    fn test_single_team_wins_outright() {
        let bracket = build_bracket(&[Team::new(9, 1)], &BracketOptions::single()).unwrap();
        let rankings = rank_teams(&bracket).unwrap();
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].rank, 1);
    }
}
