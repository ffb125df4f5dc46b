use std::cmp::Ordering;

use serde::Serialize;

use crate::bracket::NodeId;
use crate::error::Result;
use crate::score::Score;
use crate::types::TeamId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeciderKind {
  /// Leaf holding a seeded team.
  Team(TeamId),
  /// Leaf padding the bracket to a power of two. Advances nobody.
  Bye,
  /// A match between the teams coming out of two nodes.
  Continuation([NodeId; 2]),
  /// Re-exposes a node that already sits elsewhere in the tree.
  PassThrough(NodeId),
  /// `[incumbent, challenger]`. The incumbent keeps the title without a
  /// match when both slots carry the same team.
  Stay([NodeId; 2]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
  Winners,
  Losers,
  GrandFinal,
}

#[derive(Clone, Debug)]
pub struct Decider {
  pub kind: DeciderKind,
  pub region: Region,
  /// The winner-side node that positions this decider in the tree.
  pub owner: NodeId,
  /// Locked deciders keep their child slots for the rest of a replay.
  pub locked: bool,
  pub bye_recorded: bool,
}

impl Decider {
  pub fn new(kind: DeciderKind, region: Region, owner: NodeId) -> Self {
    Decider {
      kind,
      region,
      owner,
      locked: false,
      bye_recorded: false,
    }
  }

  /// Child slots owned by this decider. A pass-through only references its
  /// node, so it owns none.
  pub fn children(&self) -> &[NodeId] {
    match &self.kind {
      DeciderKind::Continuation(children) | DeciderKind::Stay(children) => children,
      _ => &[],
    }
  }

  pub fn is_match(&self) -> bool {
    matches!(self.kind, DeciderKind::Continuation(_) | DeciderKind::Stay(_))
  }

  pub fn team(&self) -> Option<TeamId> {
    match self.kind {
      DeciderKind::Team(team) => Some(team),
      _ => None,
    }
  }
}

/// What a node currently hands to the decider above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotResolution {
  Ready(TeamId),
  Pending,
  Empty,
}

impl SlotResolution {
  pub fn team(self) -> Option<TeamId> {
    match self {
      SlotResolution::Ready(team) => Some(team),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
  Pending,
  Decided {
    winner: Option<TeamId>,
    loser: Option<TeamId>,
  },
}

impl Resolution {
  pub fn is_decided(self) -> bool {
    matches!(self, Resolution::Decided { .. })
  }

  pub fn winner(self) -> Option<TeamId> {
    match self {
      Resolution::Decided { winner, .. } => winner,
      Resolution::Pending => None,
    }
  }

  pub fn loser(self) -> Option<TeamId> {
    match self {
      Resolution::Decided { loser, .. } => loser,
      Resolution::Pending => None,
    }
  }
}

/// Resolves a two-slot decider from what its slots hold and the scores
/// recorded on them. Equal scores leave the match pending.
pub(crate) fn resolve_match(
  slots: [SlotResolution; 2],
  scores: [Option<&Score>; 2],
  bye_recorded: bool,
  stay: bool,
) -> Result<Resolution> {
  let resolution = match (slots[0], slots[1]) {
    (SlotResolution::Pending, _) | (_, SlotResolution::Pending) => Resolution::Pending,
    (SlotResolution::Empty, SlotResolution::Empty) => Resolution::Decided {
      winner: None,
      loser: None,
    },
    (SlotResolution::Ready(team), SlotResolution::Empty)
    | (SlotResolution::Empty, SlotResolution::Ready(team)) => {
      if bye_recorded {
        Resolution::Decided {
          winner: Some(team),
          loser: None,
        }
      } else {
        Resolution::Pending
      }
    }
    (SlotResolution::Ready(a), SlotResolution::Ready(b)) => {
      if stay && a == b {
        return Ok(Resolution::Decided {
          winner: Some(a),
          loser: None,
        });
      }
      let (Some(score_a), Some(score_b)) = (scores[0], scores[1]) else {
        return Ok(Resolution::Pending);
      };
      match Score::compare(Some(score_a), Some(score_b))? {
        Ordering::Greater => Resolution::Decided {
          winner: Some(a),
          loser: Some(b),
        },
        Ordering::Less => Resolution::Decided {
          winner: Some(b),
          loser: Some(a),
        },
        Ordering::Equal => Resolution::Pending,
      }
    }
  };
  Ok(resolution)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::TournamentError;

  const READY_A: SlotResolution = SlotResolution::Ready(1);
  const READY_B: SlotResolution = SlotResolution::Ready(2);

  #[test]
  fn test_match_needs_both_scores() {
    let points = Score::Points(3);
    let resolution = resolve_match([READY_A, READY_B], [Some(&points), None], false, false).unwrap();
    assert_eq!(resolution, Resolution::Pending);
  }

  #[test]
  fn test_match_winner_by_score() {
    let low = Score::Points(1);
    let high = Score::Points(4);
    let resolution =
      resolve_match([READY_A, READY_B], [Some(&low), Some(&high)], false, false).unwrap();
    assert_eq!(
      resolution,
      Resolution::Decided {
        winner: Some(2),
        loser: Some(1)
      }
    );
  }

  #[test]
  fn test_tie_stays_pending() {
    let score = Score::Points(2);
    let resolution =
      resolve_match([READY_A, READY_B], [Some(&score), Some(&score)], false, false).unwrap();
    assert_eq!(resolution, Resolution::Pending);
  }

  #[test]
  fn test_mismatched_scores_error() {
    let points = Score::Points(2);
    let time = Score::Time(2);
    let err = resolve_match([READY_A, READY_B], [Some(&points), Some(&time)], false, false)
      .unwrap_err();
    assert!(matches!(err, TournamentError::Score(_)));
  }

  #[test]
  fn test_bye_waits_for_record() {
    let open = resolve_match([READY_A, SlotResolution::Empty], [None, None], false, false).unwrap();
    assert_eq!(open, Resolution::Pending);
    let taken = resolve_match([SlotResolution::Empty, READY_A], [None, None], true, false).unwrap();
    assert_eq!(
      taken,
      Resolution::Decided {
        winner: Some(1),
        loser: None
      }
    );
  }

  #[test]
  fn test_two_empty_slots_resolve_without_play() {
    let resolution = resolve_match(
      [SlotResolution::Empty, SlotResolution::Empty],
      [None, None],
      false,
      false,
    )
    .unwrap();
    assert!(resolution.is_decided());
    assert_eq!(resolution.winner(), None);
  }

  #[test]
  fn test_stay_keeps_incumbent_without_match() {
    let resolution = resolve_match([READY_A, READY_A], [None, None], false, true).unwrap();
    assert_eq!(resolution.winner(), Some(1));
    assert_eq!(resolution.loser(), None);

    let pending = resolve_match([READY_A, READY_B], [None, None], false, true).unwrap();
    assert_eq!(pending, Resolution::Pending);
  }

  #[test]
  fn test_pending_slot_blocks() {
    let resolution =
      resolve_match([SlotResolution::Pending, READY_B], [None, None], true, false).unwrap();
    assert_eq!(resolution, Resolution::Pending);
  }
}
