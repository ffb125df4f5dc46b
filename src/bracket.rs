use crate::decider::{resolve_match, Decider, DeciderKind, Region, Resolution, SlotResolution};
use crate::error::{Result, TournamentError};
use crate::score::Score;
use crate::types::TeamId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeciderId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSide {
  Winner,
  Loser,
}

#[derive(Clone, Debug)]
pub struct Node {
  pub side: NodeSide,
  pub decider: DeciderId,
  /// Score of the team leaving this node, recorded in the parent's match.
  pub score: Option<Score>,
  pub parent: Option<DeciderId>,
}

/// Arena holding one tournament's bracket. Nodes and deciders refer to each
/// other by index; a decider's child slots and the children's `parent`
/// fields are always kept in agreement.
#[derive(Clone, Debug, Default)]
pub struct Bracket {
  nodes: Vec<Node>,
  deciders: Vec<Decider>,
  root: NodeId,
}

impl Bracket {
  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn root_decider(&self) -> DeciderId {
    self.nodes[self.root.0].decider
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.0]
  }

  pub fn decider(&self, id: DeciderId) -> &Decider {
    &self.deciders[id.0]
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn decider_ids(&self) -> impl Iterator<Item = DeciderId> {
    (0..self.deciders.len()).map(DeciderId)
  }

  /// Seeded teams in rank order.
  pub fn leaf_teams(&self) -> Vec<TeamId> {
    self.deciders.iter().filter_map(Decider::team).collect()
  }

  pub fn bye_count(&self) -> usize {
    self
      .deciders
      .iter()
      .filter(|decider| decider.kind == DeciderKind::Bye)
      .count()
  }

  pub(crate) fn decider_mut(&mut self, id: DeciderId) -> &mut Decider {
    &mut self.deciders[id.0]
  }

  pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.nodes[id.0]
  }

  pub(crate) fn set_root(&mut self, node: NodeId) {
    self.nodes[node.0].parent = None;
    self.root = node;
  }

  /// Adds a decider together with the winner node that owns it and adopts
  /// the decider's child slots.
  pub(crate) fn add_decider(&mut self, kind: DeciderKind, region: Region) -> NodeId {
    let decider_id = DeciderId(self.deciders.len());
    let owner = NodeId(self.nodes.len());
    let decider = Decider::new(kind, region, owner);
    let children = decider.children().to_vec();
    self.deciders.push(decider);
    self.nodes.push(Node {
      side: NodeSide::Winner,
      decider: decider_id,
      score: None,
      parent: None,
    });
    for child in children {
      self.nodes[child.0].parent = Some(decider_id);
    }
    owner
  }

  /// Adds a node carrying the loser of `decider`.
  pub(crate) fn add_loser_node(&mut self, decider: DeciderId) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(Node {
      side: NodeSide::Loser,
      decider,
      score: None,
      parent: None,
    });
    id
  }

  /// Where `node` sits: its parent decider and slot index.
  pub fn position(&self, node: NodeId) -> Option<(DeciderId, usize)> {
    let parent = self.nodes[node.0].parent?;
    let index = self.deciders[parent.0]
      .children()
      .iter()
      .position(|child| *child == node)?;
    Some((parent, index))
  }

  /// Writes `node` into slot `index` of `parent`, which must be a match.
  pub(crate) fn put_child(&mut self, parent: DeciderId, index: usize, node: NodeId) -> Result<()> {
    match &mut self.deciders[parent.0].kind {
      DeciderKind::Continuation(children) | DeciderKind::Stay(children) => children[index] = node,
      _ => {
        return Err(TournamentError::invalid_state(format!(
          "decider {} has no slots to place node {} in",
          parent.0, node.0
        )))
      }
    }
    self.nodes[node.0].parent = Some(parent);
    Ok(())
  }

  pub fn depth(&self, node: NodeId) -> usize {
    let mut depth = 0;
    let mut current = node;
    while let Some(parent) = self.nodes[current.0].parent {
      depth += 1;
      current = self.deciders[parent.0].owner;
      if depth > self.nodes.len() {
        break;
      }
    }
    depth
  }

  pub fn decider_depth(&self, decider: DeciderId) -> usize {
    self.depth(self.deciders[decider.0].owner)
  }

  pub fn resolve(&self, id: DeciderId) -> Result<Resolution> {
    let decider = &self.deciders[id.0];
    match decider.kind {
      DeciderKind::Team(team) => Ok(Resolution::Decided {
        winner: Some(team),
        loser: None,
      }),
      DeciderKind::Bye => Ok(Resolution::Decided {
        winner: None,
        loser: None,
      }),
      DeciderKind::PassThrough(node) => Ok(match self.slot(node)? {
        SlotResolution::Ready(team) => Resolution::Decided {
          winner: Some(team),
          loser: None,
        },
        SlotResolution::Empty => Resolution::Decided {
          winner: None,
          loser: None,
        },
        SlotResolution::Pending => Resolution::Pending,
      }),
      DeciderKind::Continuation(children) | DeciderKind::Stay(children) => {
        let slots = [self.slot(children[0])?, self.slot(children[1])?];
        let scores = [
          self.nodes[children[0].0].score.as_ref(),
          self.nodes[children[1].0].score.as_ref(),
        ];
        let stay = matches!(decider.kind, DeciderKind::Stay(_));
        resolve_match(slots, scores, decider.bye_recorded, stay)
      }
    }
  }

  pub fn slot(&self, id: NodeId) -> Result<SlotResolution> {
    let node = &self.nodes[id.0];
    let team = match self.resolve(node.decider)? {
      Resolution::Pending => return Ok(SlotResolution::Pending),
      Resolution::Decided { winner, loser } => match node.side {
        NodeSide::Winner => winner,
        NodeSide::Loser => {
          if !self.deciders[node.decider.0].is_match() {
            return Err(TournamentError::invalid_state(format!(
              "node {} asks for the loser of a decider that has none",
              id.0
            )));
          }
          loser
        }
      },
    };
    Ok(team.map(SlotResolution::Ready).unwrap_or(SlotResolution::Empty))
  }

  pub fn is_decided(&self, id: DeciderId) -> Result<bool> {
    Ok(self.resolve(id)?.is_decided())
  }

  pub fn has_scores(&self, id: DeciderId) -> bool {
    self.deciders[id.0]
      .children()
      .iter()
      .any(|child| self.nodes[child.0].score.is_some())
  }

  /// Whether the loser of `id` continues somewhere else in the bracket.
  pub fn loser_continues(&self, id: DeciderId) -> bool {
    self
      .nodes
      .iter()
      .any(|node| node.side == NodeSide::Loser && node.decider == id && node.parent.is_some())
  }

  /// Deciders in left-to-right pre-order, each visited once through the
  /// node that owns it.
  pub fn deciders_in_order(&self) -> Vec<DeciderId> {
    let mut order = Vec::with_capacity(self.deciders.len());
    let mut stack = vec![self.root];
    while let Some(current) = stack.pop() {
      let node = &self.nodes[current.0];
      if node.side == NodeSide::Loser {
        continue;
      }
      order.push(node.decider);
      for child in self.deciders[node.decider.0].children().iter().rev() {
        stack.push(*child);
      }
    }
    order
  }

  /// Exchanges two nodes between their slots. Both nodes move with their
  /// whole subtree and both parents' slots and the nodes' `parent` fields
  /// are rewritten.
  pub fn swap_nodes(&mut self, a: NodeId, b: NodeId) -> Result<()> {
    if a == b {
      return Ok(());
    }
    let (parent_a, index_a) = self
      .position(a)
      .ok_or_else(|| TournamentError::invalid_state(format!("node {} has no slot to swap", a.0)))?;
    let (parent_b, index_b) = self
      .position(b)
      .ok_or_else(|| TournamentError::invalid_state(format!("node {} has no slot to swap", b.0)))?;
    if self.depth(a) != self.depth(b) {
      return Err(TournamentError::invalid_state(format!(
        "nodes {} and {} sit at different depths",
        a.0, b.0
      )));
    }
    self.put_child(parent_a, index_a, b)?;
    self.put_child(parent_b, index_b, a)
  }

  pub fn describe(&self, id: NodeId) -> String {
    match self.slot(id) {
      Ok(SlotResolution::Ready(team)) => format!("team {team}"),
      Ok(SlotResolution::Empty) => "an empty slot".to_string(),
      Ok(SlotResolution::Pending) | Err(_) => "an undecided slot".to_string(),
    }
  }
}
