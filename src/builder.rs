use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::bracket::{Bracket, DeciderId, NodeId};
use crate::decider::{DeciderKind, Region};
use crate::error::{Result, TournamentError};
use crate::types::{BracketOptions, Round, Team, TeamId, MAX_ELIMINATIONS};

/// Builds the canonical bracket for `teams`.
///
/// Teams are seeded by descending rating (unrated last, ties in input
/// order). Rank `r` first meets rank `size - 1 - r`, so the two best seeds
/// can only meet in the final and bye leaves take the lowest ranks.
pub fn build_bracket(teams: &[Team], options: &BracketOptions) -> Result<Bracket> {
  validate_options(options)?;
  let seeded = seed_order(teams)?;
  build_seeded(&seeded, options)
}

/// Builds the bracket for teams already listed from best to worst seed.
pub fn build_seeded(seeded: &[TeamId], options: &BracketOptions) -> Result<Bracket> {
  validate_options(options)?;
  let mut bracket = Bracket::default();

  if seeded.len() < 2 {
    let kind = seeded
      .first()
      .map(|team| DeciderKind::Team(*team))
      .unwrap_or(DeciderKind::Bye);
    let root = bracket.add_decider(kind, Region::Winners);
    bracket.set_root(root);
    return Ok(bracket);
  }

  let winners_root = build_winners(&mut bracket, seeded)?;
  if options.eliminations == 1 {
    bracket.set_root(winners_root);
  } else {
    let losers_final = build_losers(&mut bracket, winners_root)?;
    graft_grand_final(
      &mut bracket,
      winners_root,
      losers_final,
      options.grand_final_reset,
    );
  }

  debug!(
    teams = seeded.len(),
    byes = bracket.bye_count(),
    eliminations = options.eliminations,
    "built bracket"
  );
  Ok(bracket)
}

pub fn has_history(rounds: &[Round]) -> bool {
  rounds
    .iter()
    .flat_map(|round| &round.pairings)
    .any(|pairing| !pairing.entries.is_empty())
}

/// Seed order recovered from recorded rounds.
///
/// Teams whose first appearance is a bye take the bye slots and teams whose
/// first appearance is a match against another newcomer take the next
/// first-round match, both in bracket order. Teams the history does not
/// place fill the remaining ranks in rating order.
pub fn seed_from_history(teams: &[Team], rounds: &[Round]) -> Result<Vec<TeamId>> {
  let by_rating = seed_order(teams)?;
  let count = by_rating.len();
  if count < 2 {
    return Ok(by_rating);
  }

  let known = by_rating.iter().copied().collect::<HashSet<_>>();
  let mut seen = HashSet::new();
  let mut bye_holders = VecDeque::new();
  let mut pairs = VecDeque::new();
  for pairing in rounds.iter().flat_map(|round| &round.pairings) {
    let named = pairing.teams();
    if named.iter().any(|team| !known.contains(team)) {
      continue;
    }
    match named.as_slice() {
      [team] if !seen.contains(team) => bye_holders.push_back(*team),
      [a, b] if a != b && !seen.contains(a) && !seen.contains(b) => pairs.push_back((*a, *b)),
      _ => {}
    }
    seen.extend(named);
  }

  let mut ranks: Vec<Option<TeamId>> = vec![None; count];
  for slot in fold_order(next_power_of_two(count)).chunks_exact(2) {
    let (top, bottom) = (slot[0], slot[1]);
    if bottom >= count {
      ranks[top] = bye_holders.pop_front();
    } else if let Some((a, b)) = pairs.pop_front() {
      ranks[top] = Some(a);
      ranks[bottom] = Some(b);
    }
  }

  let placed = ranks.iter().flatten().copied().collect::<HashSet<_>>();
  let mut rest = by_rating.into_iter().filter(|team| !placed.contains(team));
  let seeded = ranks
    .into_iter()
    .filter_map(|rank| rank.or_else(|| rest.next()))
    .collect::<Vec<_>>();
  debug!(
    placed = placed.len(),
    teams = seeded.len(),
    "seeded bracket from history"
  );
  Ok(seeded)
}

pub fn validate_options(options: &BracketOptions) -> Result<()> {
  match options.eliminations {
    0 => Err(TournamentError::InvalidArgument(
      "elimination count must be at least 1".to_string(),
    )),
    n if n <= MAX_ELIMINATIONS => Ok(()),
    n => Err(TournamentError::Unsupported(format!(
      "{n}-elimination brackets are not supported (at most {MAX_ELIMINATIONS})"
    ))),
  }
}

/// Team ids from best to worst seed.
pub fn seed_order(teams: &[Team]) -> Result<Vec<TeamId>> {
  let mut seen = HashSet::new();
  for team in teams {
    if !seen.insert(team.id) {
      return Err(TournamentError::InvalidArgument(format!(
        "team {} is listed more than once",
        team.id
      )));
    }
  }
  let mut sorted = teams.iter().collect::<Vec<_>>();
  sorted.sort_by(|a, b| b.rating.cmp(&a.rating));
  Ok(sorted.into_iter().map(|team| team.id).collect())
}

fn build_winners(bracket: &mut Bracket, seeded: &[TeamId]) -> Result<NodeId> {
  let size = next_power_of_two(seeded.len());
  let mut leaves = Vec::with_capacity(size);
  let mut root = add_leaf(bracket, seeded.first().copied());
  leaves.push(root);

  for rank in 1..size {
    let leaf = add_leaf(bracket, seeded.get(rank).copied());
    let existing = leaves[fold_partner(rank)];
    let slot = bracket.position(existing);
    let owner = bracket.add_decider(DeciderKind::Continuation([existing, leaf]), Region::Winners);
    match slot {
      Some((parent, index)) => bracket.put_child(parent, index, owner)?,
      None => root = owner,
    }
    leaves.push(leaf);
  }
  Ok(root)
}

fn add_leaf(bracket: &mut Bracket, team: Option<TeamId>) -> NodeId {
  let kind = team.map(DeciderKind::Team).unwrap_or(DeciderKind::Bye);
  bracket.add_decider(kind, Region::Winners)
}

/// Ranks of the winner-bracket leaves from left to right. Consecutive pairs
/// meet in the first round.
fn fold_order(size: usize) -> Vec<usize> {
  let mut order = vec![0];
  while order.len() < size {
    let span = order.len() * 2;
    order = order.iter().flat_map(|rank| [*rank, span - 1 - rank]).collect();
  }
  order
}

/// The already placed rank that `rank` is inserted next to.
fn fold_partner(rank: usize) -> usize {
  let span = 1usize << (usize::BITS - 1 - rank.leading_zeros());
  2 * span - 1 - rank
}

/// Winner-bracket matches grouped by depth below `root`, left to right.
fn winners_levels(bracket: &Bracket, root: NodeId) -> Vec<Vec<DeciderId>> {
  let mut levels = Vec::new();
  let mut frontier = vec![root];
  loop {
    let deciders = frontier
      .iter()
      .map(|node| bracket.node(*node).decider)
      .filter(|decider| bracket.decider(*decider).is_match())
      .collect::<Vec<_>>();
    if deciders.is_empty() {
      break;
    }
    frontier = deciders
      .iter()
      .flat_map(|decider| bracket.decider(*decider).children().to_vec())
      .collect();
    levels.push(deciders);
  }
  levels
}

fn build_losers(bracket: &mut Bracket, winners_root: NodeId) -> Result<NodeId> {
  let levels = winners_levels(bracket, winners_root);
  let mut survivors: Vec<NodeId> = Vec::new();

  for level in levels.iter().rev() {
    let drops = level
      .iter()
      .map(|decider| bracket.add_loser_node(*decider))
      .collect::<Vec<_>>();

    if survivors.is_empty() {
      survivors = if drops.len() == 1 {
        drops
      } else {
        pair_up(bracket, &drops)
      };
      continue;
    }

    if survivors.len() != drops.len() {
      return Err(TournamentError::invalid_state(format!(
        "loser bracket has {} survivors for {} dropped teams",
        survivors.len(),
        drops.len()
      )));
    }
    survivors = survivors
      .iter()
      .zip(drops)
      .map(|(survivor, dropped)| {
        bracket.add_decider(DeciderKind::Continuation([*survivor, dropped]), Region::Losers)
      })
      .collect();
    if survivors.len() > 1 {
      survivors = pair_up(bracket, &survivors);
    }
  }

  survivors
    .first()
    .copied()
    .ok_or_else(|| TournamentError::invalid_state("loser bracket has no finalist"))
}

/// Pairs neighbouring nodes into loser-bracket matches. An odd node out
/// advances unpaired.
fn pair_up(bracket: &mut Bracket, nodes: &[NodeId]) -> Vec<NodeId> {
  let pairs = nodes.chunks_exact(2);
  let leftover = pairs.remainder().to_vec();
  let mut paired = pairs
    .map(|pair| bracket.add_decider(DeciderKind::Continuation([pair[0], pair[1]]), Region::Losers))
    .collect::<Vec<_>>();
  paired.extend(leftover);
  paired
}

fn graft_grand_final(bracket: &mut Bracket, winners_root: NodeId, losers_final: NodeId, reset: bool) {
  let final_match = bracket.add_decider(
    DeciderKind::Continuation([winners_root, losers_final]),
    Region::GrandFinal,
  );
  if !reset {
    bracket.set_root(final_match);
    return;
  }
  let incumbent = bracket.add_decider(DeciderKind::PassThrough(winners_root), Region::GrandFinal);
  let root = bracket.add_decider(DeciderKind::Stay([incumbent, final_match]), Region::GrandFinal);
  bracket.set_root(root);
}

fn next_power_of_two(n: usize) -> usize {
  n.max(1).next_power_of_two()
}
