use std::collections::HashSet;

use tracing::{debug, warn};

use crate::bracket::{Bracket, DeciderId, NodeId};
use crate::decider::{DeciderKind, Region, SlotResolution};
use crate::error::{Result, TournamentError};
use crate::types::{Pairing, PairingEntry, Round, TeamId, MAX_PAIRING_ENTRIES};

/// Replays recorded rounds onto a freshly built bracket.
///
/// Each pairing is first applied where the bracket already expects it. If
/// that fails the teams are relocated by swapping subtrees. If that fails
/// too, the open byes are locked, the locked byes held by the pairing's
/// teams are taken as played and the pairing is tried once more. A pairing
/// that still fails leaves the bracket as it was.
pub struct Reconciler<'a> {
  bracket: &'a mut Bracket,
  teams: HashSet<TeamId>,
  byes_locked: bool,
  /// Byes taken on a team's behalf by the retry, not by a recorded pairing.
  granted: HashSet<DeciderId>,
}

impl<'a> Reconciler<'a> {
  pub fn new(bracket: &'a mut Bracket) -> Self {
    let teams = bracket.leaf_teams().into_iter().collect();
    Reconciler {
      bracket,
      teams,
      byes_locked: false,
      granted: HashSet::new(),
    }
  }

  pub fn byes_locked(&self) -> bool {
    self.byes_locked
  }

  pub fn replay(&mut self, rounds: &[Round]) -> Result<()> {
    for (round_index, round) in rounds.iter().enumerate() {
      self
        .validate_round(round)
        .map_err(|err| err.in_context(&format!("round {}", round_index + 1)))?;
      for (pairing_index, pairing) in round.pairings.iter().enumerate() {
        self.apply_pairing(pairing).map_err(|err| {
          err.in_context(&format!(
            "round {}, pairing {}",
            round_index + 1,
            pairing_index + 1
          ))
        })?;
      }
    }
    Ok(())
  }

  fn validate_round(&self, round: &Round) -> Result<()> {
    let mut seen = HashSet::new();
    for pairing in &round.pairings {
      if pairing.entries.len() > MAX_PAIRING_ENTRIES {
        return Err(TournamentError::invalid_state(format!(
          "a pairing lists {} teams but elimination pairings hold at most {MAX_PAIRING_ENTRIES}",
          pairing.entries.len()
        )));
      }
      for entry in &pairing.entries {
        if !self.teams.contains(&entry.team) {
          return Err(TournamentError::invalid_state(format!(
            "team {} is not part of this tournament",
            entry.team
          )));
        }
        if !seen.insert(entry.team) {
          return Err(TournamentError::invalid_state(format!(
            "team {} appears more than once in the round",
            entry.team
          )));
        }
      }
    }
    Ok(())
  }

  pub fn apply_pairing(&mut self, pairing: &Pairing) -> Result<()> {
    match pairing.entries.as_slice() {
      [] => Ok(()),
      [entry] => {
        let team = entry.team;
        self.with_bye_lock_retry(&[team], |reconciler| reconciler.try_bye(team))
      }
      [a, b] => self.with_bye_lock_retry(&[a.team, b.team], |reconciler| {
        reconciler.try_match(a, b)
      }),
      entries => Err(TournamentError::invalid_state(format!(
        "a pairing lists {} teams but elimination pairings hold at most {MAX_PAIRING_ENTRIES}",
        entries.len()
      ))),
    }
  }

  fn with_bye_lock_retry<F>(&mut self, teams: &[TeamId], mut attempt: F) -> Result<()>
  where
    F: FnMut(&mut Self) -> Result<()>,
  {
    let snapshot = self.bracket.clone();
    let byes_locked = self.byes_locked;
    let granted = self.granted.clone();

    let result = match attempt(self) {
      Err(err) if err.is_invalid_state() => match self.grant_locked_byes(teams) {
        Ok(0) => Err(err),
        Ok(count) => {
          warn!(%err, granted = count, "pairing did not fit, retrying with byes locked");
          attempt(self)
        }
        Err(grant_err) => Err(grant_err),
      },
      other => other,
    };

    if result.is_err() {
      *self.bracket = snapshot;
      self.byes_locked = byes_locked;
      self.granted = granted;
    }
    result
  }

  /// Freezes every open bye slot and every decided match.
  fn lock_byes(&mut self) -> Result<()> {
    self.byes_locked = true;
    let mut locked = 0usize;
    for id in self.bracket.decider_ids().collect::<Vec<_>>() {
      let decider = self.bracket.decider(id);
      if !decider.is_match() || decider.locked {
        continue;
      }
      if self.bracket.is_decided(id)? || self.is_open_bye(id)? {
        self.bracket.decider_mut(id).locked = true;
        locked += 1;
      }
    }
    debug!(locked, "locked byes");
    Ok(())
  }

  /// Locks the byes, then takes every locked bye held by one of `teams` as
  /// played so the team moves past it. Returns how many byes were taken.
  fn grant_locked_byes(&mut self, teams: &[TeamId]) -> Result<usize> {
    self.lock_byes()?;
    let mut count = 0usize;
    for id in self.bracket.decider_ids().collect::<Vec<_>>() {
      if !self.bracket.decider(id).locked || !self.is_open_bye(id)? {
        continue;
      }
      let holder = self.slots(id)?.into_iter().find_map(SlotResolution::team);
      let Some(team) = holder.filter(|team| teams.contains(team)) else {
        continue;
      };
      self.bracket.decider_mut(id).bye_recorded = true;
      self.granted.insert(id);
      debug!(team, decider = id.0, "took locked bye as played");
      count += 1;
    }
    Ok(count)
  }

  // ── Byes ─────────────────────────────────────────────────────────────

  fn try_bye(&mut self, team: TeamId) -> Result<()> {
    if let Some(id) = self.find_open_bye(team)? {
      self.record_bye(id);
      return Ok(());
    }
    let node = self.locate(team)?;
    let (parent, _) = self.slot_of(node)?;
    if !self.is_movable(parent)? {
      return Err(TournamentError::invalid_state(format!(
        "team {team} is not eligible for a bye: its current match is already fixed"
      )));
    }
    let depth = self.bracket.depth(node);
    let region = self.bracket.decider(parent).region;
    let target = self.bye_targets(depth, region)?.into_iter().next();
    let Some((target, occupant)) = target else {
      return Err(TournamentError::invalid_state(format!(
        "team {team} is not eligible for a bye: no open bye slot at its stage of the bracket can take it"
      )));
    };

    self.bracket.swap_nodes(node, occupant)?;
    debug!(team, target = target.0, "moved team into bye slot");
    self.record_bye(target);
    Ok(())
  }

  /// An open bye offered to `team`, preferring one where it holds the first slot.
  fn find_open_bye(&self, team: TeamId) -> Result<Option<DeciderId>> {
    let mut second_slot = None;
    for id in self.bracket.deciders_in_order() {
      let decider = self.bracket.decider(id);
      if !matches!(decider.kind, DeciderKind::Continuation(_))
        || (decider.bye_recorded && !self.granted.contains(&id))
      {
        continue;
      }
      match self.slots(id)? {
        [SlotResolution::Ready(held), SlotResolution::Empty] if held == team => return Ok(Some(id)),
        [SlotResolution::Empty, SlotResolution::Ready(held)] if held == team => {
          second_slot.get_or_insert(id);
        }
        _ => {}
      }
    }
    Ok(second_slot)
  }

  /// Movable open byes whose child slots sit at `depth`, with the node
  /// currently holding the team.
  fn bye_targets(&self, depth: usize, region: Region) -> Result<Vec<(DeciderId, NodeId)>> {
    let mut targets = Vec::new();
    for id in self.bracket.deciders_in_order() {
      let decider = self.bracket.decider(id);
      if decider.region != region || self.bracket.decider_depth(id) + 1 != depth {
        continue;
      }
      if !self.is_movable(id)? || !self.is_open_bye(id)? {
        continue;
      }
      let holder = decider
        .children()
        .iter()
        .copied()
        .find(|child| matches!(self.bracket.slot(*child), Ok(SlotResolution::Ready(_))));
      if let Some(holder) = holder {
        targets.push((id, holder));
      }
    }
    Ok(targets)
  }

  fn record_bye(&mut self, id: DeciderId) {
    self.granted.remove(&id);
    let decider = self.bracket.decider_mut(id);
    decider.bye_recorded = true;
    decider.locked = true;
  }

  fn is_open_bye(&self, id: DeciderId) -> Result<bool> {
    let decider = self.bracket.decider(id);
    if !matches!(decider.kind, DeciderKind::Continuation(_)) || decider.bye_recorded {
      return Ok(false);
    }
    Ok(matches!(
      self.slots(id)?,
      [SlotResolution::Ready(_), SlotResolution::Empty] | [SlotResolution::Empty, SlotResolution::Ready(_)]
    ))
  }

  // ── Matches ──────────────────────────────────────────────────────────

  fn try_match(&mut self, a: &PairingEntry, b: &PairingEntry) -> Result<()> {
    if a.team == b.team {
      return Err(TournamentError::invalid_state(format!(
        "team {} is paired with itself",
        a.team
      )));
    }
    let candidates = self.direct_candidates(a.team, b.team)?;
    if let [target] = candidates.as_slice() {
      return self.record_match(*target, a, b);
    }

    let node_a = self.locate(a.team)?;
    let node_b = self.locate(b.team)?;
    let (parent_a, _) = self.slot_of(node_a)?;
    let (parent_b, _) = self.slot_of(node_b)?;
    if parent_a == parent_b {
      return self.record_match(parent_a, a, b);
    }

    let depth = self.bracket.depth(node_a);
    let depth_b = self.bracket.depth(node_b);
    if depth != depth_b {
      return Err(TournamentError::invalid_state(format!(
        "teams {} and {} cannot meet yet: they are at different stages of the bracket (depth {depth} and {depth_b})",
        a.team, b.team
      )));
    }
    let region = self.bracket.decider(parent_a).region;
    if region != self.bracket.decider(parent_b).region {
      return Err(TournamentError::invalid_state(format!(
        "teams {} and {} are in different parts of the bracket",
        a.team, b.team
      )));
    }
    for (team, parent) in [(a.team, parent_a), (b.team, parent_b)] {
      if !self.is_movable(parent)? {
        return Err(TournamentError::invalid_state(format!(
          "team {team} cannot be moved to meet its recorded opponent: its current match is fixed"
        )));
      }
    }

    let Some(target) = self.relocation_target(parent_a, parent_b, depth, region)? else {
      return Err(TournamentError::invalid_state(format!(
        "no open match at this stage of the bracket can take teams {} and {}",
        a.team, b.team
      )));
    };
    self.move_into(node_a, target, 0)?;
    self.move_into(node_b, target, 1)?;
    debug!(a = a.team, b = b.team, target = target.0, "relocated match");
    self.record_match(target, a, b)
  }

  /// Undecided matches whose two slots hold exactly `a` and `b`.
  fn direct_candidates(&self, a: TeamId, b: TeamId) -> Result<Vec<DeciderId>> {
    let mut candidates = Vec::new();
    for id in self.bracket.deciders_in_order() {
      if !self.bracket.decider(id).is_match() || self.bracket.is_decided(id)? {
        continue;
      }
      let held = self.slots(id)?;
      let wanted = [SlotResolution::Ready(a), SlotResolution::Ready(b)];
      let flipped = [SlotResolution::Ready(b), SlotResolution::Ready(a)];
      if held == wanted || held == flipped {
        candidates.push(id);
      }
    }
    Ok(candidates)
  }

  fn relocation_target(
    &self,
    parent_a: DeciderId,
    parent_b: DeciderId,
    depth: usize,
    region: Region,
  ) -> Result<Option<DeciderId>> {
    let mut ordered = vec![parent_a, parent_b];
    ordered.extend(self.bracket.deciders_in_order().into_iter().filter(|id| {
      let decider = self.bracket.decider(*id);
      decider.region == region && self.bracket.decider_depth(*id) + 1 == depth
    }));
    for id in ordered {
      if self.is_movable(id)? {
        return Ok(Some(id));
      }
    }
    Ok(None)
  }

  fn move_into(&mut self, node: NodeId, target: DeciderId, index: usize) -> Result<()> {
    let occupant = self.bracket.decider(target).children()[index];
    if occupant != node {
      self.bracket.swap_nodes(node, occupant)?;
    }
    Ok(())
  }

  fn record_match(&mut self, id: DeciderId, a: &PairingEntry, b: &PairingEntry) -> Result<()> {
    let children = self.bracket.decider(id).children().to_vec();
    let held = self.slots(id)?;
    let (node_a, node_b) = if held == [SlotResolution::Ready(a.team), SlotResolution::Ready(b.team)] {
      (children[0], children[1])
    } else if held == [SlotResolution::Ready(b.team), SlotResolution::Ready(a.team)] {
      (children[1], children[0])
    } else {
      return Err(TournamentError::invalid_state(format!(
        "the match found for teams {} and {} holds {} and {}",
        a.team,
        b.team,
        self.bracket.describe(children[0]),
        self.bracket.describe(children[1])
      )));
    };

    if let (Some(score_a), Some(score_b)) = (&a.score, &b.score) {
      score_a.try_cmp(score_b)?;
    }
    for (node, entry) in [(node_a, a), (node_b, b)] {
      if let (Some(_), Some(existing)) = (&entry.score, &self.bracket.node(node).score) {
        return Err(TournamentError::invalid_state(format!(
          "the match between teams {} and {} already has a recorded result ({} for team {})",
          a.team, b.team, existing, entry.team
        )));
      }
    }

    // byes opened by this result stay free to move
    if a.score.is_some() && b.score.is_some() && !self.byes_locked {
      self.lock_byes()?;
    }
    for (node, entry) in [(node_a, a), (node_b, b)] {
      if let Some(score) = &entry.score {
        self.bracket.node_mut(node).score = Some(score.clone());
      }
    }
    Ok(())
  }

  // ── Lookups ──────────────────────────────────────────────────────────

  /// The single node where `team` waits for its next match.
  fn locate(&self, team: TeamId) -> Result<NodeId> {
    let hits = self.frontier(team)?;
    match hits.as_slice() {
      [node] => Ok(*node),
      [] => Err(TournamentError::invalid_state(format!(
        "team {team} is not waiting for a match: an earlier match of theirs is unfinished or they are eliminated"
      ))),
      _ => Err(TournamentError::invalid_state(format!(
        "team {team} is waiting in {} places in the bracket",
        hits.len()
      ))),
    }
  }

  fn frontier(&self, team: TeamId) -> Result<Vec<NodeId>> {
    let mut hits = Vec::new();
    for index in 0..self.bracket.node_count() {
      let id = NodeId(index);
      let node = self.bracket.node(id);
      let Some(parent) = node.parent else {
        continue;
      };
      if matches!(self.bracket.decider(node.decider).kind, DeciderKind::PassThrough(_)) {
        continue;
      }
      if self.bracket.slot(id)? != SlotResolution::Ready(team) {
        continue;
      }
      if !self.bracket.is_decided(parent)? {
        hits.push(id);
      }
    }
    Ok(hits)
  }

  fn slot_of(&self, node: NodeId) -> Result<(DeciderId, usize)> {
    self.bracket.position(node).ok_or_else(|| {
      TournamentError::invalid_state(format!("node {} is not placed in any match", node.0))
    })
  }

  fn slots(&self, id: DeciderId) -> Result<[SlotResolution; 2]> {
    match self.bracket.decider(id).children() {
      [first, second] => Ok([self.bracket.slot(*first)?, self.bracket.slot(*second)?]),
      _ => Err(TournamentError::invalid_state(format!(
        "decider {} is not a match",
        id.0
      ))),
    }
  }

  /// Whether the child slots of `id` may still be rearranged.
  fn is_movable(&self, id: DeciderId) -> Result<bool> {
    let decider = self.bracket.decider(id);
    if !matches!(decider.kind, DeciderKind::Continuation(_))
      || decider.region == Region::GrandFinal
      || decider.locked
      || decider.bye_recorded
      || self.bracket.has_scores(id)
    {
      return Ok(false);
    }
    Ok(!self.bracket.is_decided(id)?)
  }
}
