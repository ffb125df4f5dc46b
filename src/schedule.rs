use std::cmp::Ordering;

use tracing::debug;

use crate::bracket::{Bracket, DeciderId};
use crate::decider::SlotResolution;
use crate::error::{Result, TournamentError};
use crate::types::{Pairing, Round};

/// Collects the matches that can be played now.
///
/// Returns `None` once the root is decided. Ready matches are ordered
/// earliest round first and cut to `places` when given. A recorded tie
/// anywhere fails the call.
pub fn next_round(bracket: &Bracket, places: Option<usize>) -> Result<Option<Round>> {
  if let Some(id) = find_tie(bracket)? {
    let children = bracket.decider(id).children();
    let tied_at = bracket
      .node(children[0])
      .score
      .as_ref()
      .map(|score| format!(" at {score}"))
      .unwrap_or_default();
    return Err(TournamentError::invalid_state(format!(
      "the match between {} and {} is tied{tied_at} and ties are never resolved automatically",
      bracket.describe(children[0]),
      bracket.describe(children[1])
    )));
  }
  if bracket.is_decided(bracket.root_decider())? {
    return Ok(None);
  }

  let mut ready = Vec::new();
  for (order, id) in bracket.deciders_in_order().into_iter().enumerate() {
    if let Some(pairing) = ready_pairing(bracket, id)? {
      ready.push((bracket.decider_depth(id), order, pairing));
    }
  }
  if ready.is_empty() {
    return Err(diagnose_blocker(bracket)?);
  }

  ready.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
  if let Some(places) = places {
    ready.truncate(places);
  }
  debug!(pairings = ready.len(), "scheduled next round");
  Ok(Some(Round::new(
    ready.into_iter().map(|(_, _, pairing)| pairing).collect(),
  )))
}

fn ready_pairing(bracket: &Bracket, id: DeciderId) -> Result<Option<Pairing>> {
  let decider = bracket.decider(id);
  if !decider.is_match() || bracket.has_scores(id) || bracket.is_decided(id)? {
    return Ok(None);
  }
  let children = decider.children();
  let pairing = match (bracket.slot(children[0])?, bracket.slot(children[1])?) {
    (SlotResolution::Ready(a), SlotResolution::Ready(b)) => Some(Pairing::matchup(a, b)),
    (SlotResolution::Ready(team), SlotResolution::Empty)
    | (SlotResolution::Empty, SlotResolution::Ready(team)) => Some(Pairing::bye(team)),
    _ => None,
  };
  Ok(pairing)
}

fn find_tie(bracket: &Bracket) -> Result<Option<DeciderId>> {
  for id in bracket.deciders_in_order() {
    let decider = bracket.decider(id);
    if !decider.is_match() || bracket.is_decided(id)? {
      continue;
    }
    let children = decider.children();
    let scores = (
      bracket.node(children[0]).score.as_ref(),
      bracket.node(children[1]).score.as_ref(),
    );
    if let (Some(a), Some(b)) = scores {
      if a.try_cmp(b)? == Ordering::Equal {
        return Ok(Some(id));
      }
    }
  }
  Ok(None)
}

/// Explains why nothing is playable although the final is undecided.
fn diagnose_blocker(bracket: &Bracket) -> Result<TournamentError> {
  for id in bracket.deciders_in_order() {
    let decider = bracket.decider(id);
    if !decider.is_match() || bracket.is_decided(id)? || !bracket.has_scores(id) {
      continue;
    }
    let children = decider.children();
    return Ok(TournamentError::invalid_state(format!(
      "the match between {} and {} has only one recorded score",
      bracket.describe(children[0]),
      bracket.describe(children[1])
    )));
  }
  Ok(TournamentError::invalid_state(
    "no match can be played but the final is undecided",
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builder::build_bracket;
  use crate::reconcile::Reconciler;
  use crate::score::Score;
  use crate::types::{BracketOptions, PairingEntry, Team};

  fn three_teams() -> Bracket {
    let teams = vec![Team::new(1, 1000), Team::new(2, 900), Team::new(3, 800)];
    build_bracket(&teams, &BracketOptions::single()).unwrap()
  }

  fn record(bracket: &mut Bracket, pairings: Vec<Pairing>) {
    Reconciler::new(bracket).replay(&[Round::new(pairings)]).unwrap();
  }

  #[test]
  fn test_first_round_has_bye_and_match() {
    let round = next_round(&three_teams(), None).unwrap().unwrap();
    assert_eq!(round.pairings, vec![Pairing::bye(1), Pairing::matchup(2, 3)]);
  }

  #[test]
  fn test_second_round_after_results() {
    let mut bracket = three_teams();
    record(
      &mut bracket,
      vec![
        Pairing::bye(1),
        Pairing::scored(2, Score::Points(3), 3, Score::Points(1)),
      ],
    );
    let round = next_round(&bracket, None).unwrap().unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(1, 2)]);
  }

  #[test]
  fn test_places_truncates() {
    let teams = (1..=8).map(|id| Team::new(id, 100 - id as i64)).collect::<Vec<_>>();
    let bracket = build_bracket(&teams, &BracketOptions::single()).unwrap();
    let round = next_round(&bracket, Some(3)).unwrap().unwrap();
    assert_eq!(round.pairings.len(), 3);
    assert_eq!(round.pairings[0], Pairing::matchup(1, 8));
  }

  #[test]
  fn test_finished_bracket_returns_none() {
    let teams = vec![Team::new(1, 10), Team::new(2, 5)];
    let mut bracket = build_bracket(&teams, &BracketOptions::single()).unwrap();
    record(
      &mut bracket,
      vec![Pairing::scored(1, Score::Points(2), 2, Score::Points(0))],
    );
    assert_eq!(next_round(&bracket, None).unwrap(), None);
  }

  #[test]
  fn test_tie_is_an_error() {
    let mut bracket = three_teams();
    record(
      &mut bracket,
      vec![
        Pairing::bye(1),
        Pairing::scored(2, Score::Points(1), 3, Score::Points(1)),
      ],
    );
    let err = next_round(&bracket, None).unwrap_err();
    assert!(err.is_invalid_state());
    assert!(err.to_string().contains("tied at 1 "), "{err}");
  }

  #[test]
  fn test_half_scored_match_blocks() {
    let teams = vec![Team::new(1, 10), Team::new(2, 5)];
    let mut bracket = build_bracket(&teams, &BracketOptions::single()).unwrap();
    let half = Pairing {
      entries: vec![
        PairingEntry {
          team: 1,
          score: Some(Score::Points(2)),
        },
        PairingEntry { team: 2, score: None },
      ],
    };
    record(&mut bracket, vec![half]);
    let err = next_round(&bracket, None).unwrap_err();
    assert!(err.to_string().contains("one recorded score"));
  }

  #[test]
  fn test_loser_bracket_waits_for_drops() {
    let teams = (1..=4).map(|id| Team::new(id, 100 - id as i64)).collect::<Vec<_>>();
    let mut bracket = build_bracket(&teams, &BracketOptions::double()).unwrap();
    record(
      &mut bracket,
      vec![Pairing::scored(1, Score::Points(2), 4, Score::Points(0))],
    );
    let round = next_round(&bracket, None).unwrap().unwrap();
    assert_eq!(round.pairings, vec![Pairing::matchup(2, 3)]);
  }
}
