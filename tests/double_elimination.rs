mod common;

use bracket_scheduler::{
    BracketOptions, EliminationGenerator, Pairing, PairingGenerator, Ranking, Round,
};
use common::{losses, rated, run_to_completion, win};

fn summary(rankings: &[Ranking]) -> Vec<(u64, usize, &str)> {
    rankings
        .iter()
        .map(|ranking| (ranking.team, ranking.rank, ranking.description.as_str()))
        .collect()
}

fn next(generator: &mut EliminationGenerator, history: &[Round]) -> Option<Round> {
    generator.load_state(&rated(4), history).unwrap();
    generator.create_next_round(None).unwrap()
}

#[test]
fn test_four_teams_with_grand_final_reset() {
    let mut generator = EliminationGenerator::double_elimination();
    let mut history = Vec::new();

    let round = next(&mut generator, &history).unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(1, 4), Pairing::matchup(2, 3)]);
    history.push(Round::new(vec![win(1, 4), win(2, 3)]));

    let round = next(&mut generator, &history).unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(4, 3), Pairing::matchup(1, 2)]);
    history.push(Round::new(vec![win(3, 4), win(1, 2)]));

    let round = next(&mut generator, &history).unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(3, 2)]);
    history.push(Round::new(vec![win(2, 3)]));

    let round = next(&mut generator, &history).unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(1, 2)]);
    history.push(Round::new(vec![win(2, 1)]));

    let reset = next(&mut generator, &history).unwrap();
    assert_eq!(reset.pairings, vec![Pairing::matchup(1, 2)]);
    history.push(Round::new(vec![win(2, 1)]));

    assert_eq!(next(&mut generator, &history), None);
    let rankings = generator.generate_rankings().unwrap();
    assert_eq!(
        summary(&rankings),
        vec![
            (2, 1, "Winner"),
            (1, 2, "Lost in grand final reset"),
            (3, 3, "Eliminated in losers round 2"),
            (4, 4, "Eliminated in losers round 1"),
        ]
    );
}

#[test]
fn test_incumbent_wins_first_grand_final() {
    let mut generator = EliminationGenerator::double_elimination();
    let history = vec![
        Round::new(vec![win(1, 4), win(2, 3)]),
        Round::new(vec![win(3, 4), win(1, 2)]),
        Round::new(vec![win(2, 3)]),
        Round::new(vec![win(1, 2)]),
    ];
    assert_eq!(next(&mut generator, &history), None);
    let rankings = generator.generate_rankings().unwrap();
    assert_eq!(rankings[0].team, 1);
    assert_eq!(rankings[1].description, "Lost in grand final");
}

#[test]
fn test_without_reset_one_grand_final_decides() {
    let options = BracketOptions {
        eliminations: 2,
        grand_final_reset: false,
    };
    let mut generator = EliminationGenerator::new(options).unwrap();
    let history = vec![
        Round::new(vec![win(1, 4), win(2, 3)]),
        Round::new(vec![win(3, 4), win(1, 2)]),
        Round::new(vec![win(2, 3)]),
        Round::new(vec![win(2, 1)]),
    ];
    assert_eq!(next(&mut generator, &history), None);
    let rankings = generator.generate_rankings().unwrap();
    assert_eq!(rankings[0].team, 2);
    assert_eq!(rankings[1].team, 1);
    assert_eq!(rankings[1].description, "Lost in grand final");
}

#[test]
fn test_every_loser_needs_two_losses() {
    for count in 2..=12 {
        let teams = rated(count);
        let mut generator = EliminationGenerator::double_elimination();
        let history = run_to_completion(&mut generator, &teams, |a, b| {
            if (a + b) % 3 == 0 {
                a.max(b)
            } else {
                a.min(b)
            }
        });
        let champion = generator.generate_rankings().unwrap()[0].team;
        let losses = losses(&history);
        for team in teams.iter().map(|team| team.id) {
            let lost = losses.get(&team).copied().unwrap_or(0);
            if team == champion {
                assert!(lost <= 1, "count {count}: champion lost {lost} times");
            } else {
                assert_eq!(lost, 2, "count {count}: team {team}");
            }
        }
    }
}

#[test]
fn test_loser_bracket_bye_for_dropped_team() {
    // team 1 has a first-round bye, so the loser of (2 v 3) meets nobody.
    let teams = rated(3);
    let mut generator = EliminationGenerator::double_elimination();
    let history = vec![Round::new(vec![Pairing::bye(1), win(2, 3)])];
    generator.load_state(&teams, &history).unwrap();
    let round = generator.create_next_round(None).unwrap().unwrap();
    assert_eq!(round.pairings, vec![Pairing::bye(3), Pairing::matchup(1, 2)]);
}

#[test]
fn test_rating_edit_keeps_double_elimination_loadable() {
    let mut teams = rated(6);
    let mut generator = EliminationGenerator::double_elimination();
    let history = vec![Round::new(vec![
        Pairing::bye(1),
        win(4, 5),
        Pairing::bye(2),
        win(3, 6),
    ])];
    generator.load_state(&teams, &history).unwrap();
    let expected = generator.create_next_round(None).unwrap().unwrap();

    teams[5].rating = Some(50_000);
    teams[0].rating = None;
    generator.load_state(&teams, &history).unwrap();
    assert_eq!(generator.create_next_round(None).unwrap().unwrap(), expected);
}
