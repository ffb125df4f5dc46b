#![allow(dead_code)]

use bracket_scheduler::{EliminationGenerator, Pairing, PairingGenerator, Round, Score, Team, TeamId};

/// Teams `1..=count`; a lower id is a higher rating.
pub fn rated(count: u64) -> Vec<Team> {
    (1..=count)
        .map(|id| Team::new(id, 10_000 - id as i64))
        .collect()
}

pub fn win(winner: TeamId, loser: TeamId) -> Pairing {
    Pairing::scored(winner, Score::Points(3), loser, Score::Points(1))
}

/// Scores every match of `round` with `pick` choosing the winner.
pub fn play_round<F>(round: &Round, pick: &mut F) -> Round
where
    F: FnMut(TeamId, TeamId) -> TeamId,
{
    let pairings = round
        .pairings
        .iter()
        .map(|pairing| match pairing.teams().as_slice() {
            [a, b] => {
                if pick(*a, *b) == *a {
                    Pairing::scored(*a, Score::Points(3), *b, Score::Points(1))
                } else {
                    Pairing::scored(*a, Score::Points(1), *b, Score::Points(3))
                }
            }
            _ => pairing.clone(),
        })
        .collect();
    Round::new(pairings)
}

/// Reloads, schedules and plays until the generator reports no next round.
pub fn run_to_completion<F>(generator: &mut EliminationGenerator, teams: &[Team], mut pick: F) -> Vec<Round>
where
    F: FnMut(TeamId, TeamId) -> TeamId,
{
    let mut history = Vec::new();
    for _ in 0..256 {
        generator.load_state(teams, &history).unwrap();
        let Some(round) = generator.create_next_round(None).unwrap() else {
            return history;
        };
        assert!(!round.pairings.is_empty());
        history.push(play_round(&round, &mut pick));
    }
    panic!("tournament did not finish");
}

/// Losses per team over a played history.
pub fn losses(history: &[Round]) -> std::collections::HashMap<TeamId, usize> {
    let mut out = std::collections::HashMap::new();
    for round in history {
        for pairing in &round.pairings {
            if let [a, b] = pairing.entries.as_slice() {
                let (Some(score_a), Some(score_b)) = (&a.score, &b.score) else {
                    continue;
                };
                let loser = if score_a.try_cmp(score_b).unwrap().is_gt() { b.team } else { a.team };
                *out.entry(loser).or_insert(0) += 1;
            }
        }
    }
    out
}
