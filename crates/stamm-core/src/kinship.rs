//! # Kinship Engine
//!
//! Read-only traversals over the family graph held in a [`Store`].
//!
//! There are no adjacency lists. Parent/child edges are derived from
//! child links joined against union spouses:
//! - parents of X: spouses of every union that has X as a child
//! - children of X: children of every union that has X as a spouse
//!
//! Each operation builds its own adjacency memo and drops it on return,
//! so results always reflect the current store contents.

use crate::primitives::{MAX_GENERATIONS, MAX_PATH_LEVELS, MIN_GENERATIONS};
use crate::store::Store;
use crate::types::entity::{ChildLink, Individual, Union};
use crate::types::{IndividualId, StammError, UnionId};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::debug;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// How the second individual relates to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Same,
    Parent,
    Child,
    Sibling,
    Spouse,
    /// Connected only through a longer chain, or not at all.
    Relative,
}

impl Relationship {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Sibling => "sibling",
            Self::Spouse => "spouse",
            Self::Relative => "relative",
        }
    }

    /// Capitalised form used in path descriptions.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Same => "Same",
            Self::Parent => "Parent",
            Self::Child => "Child",
            Self::Sibling => "Sibling",
            Self::Spouse => "Spouse",
            Self::Relative => "Relative",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineageMember {
    pub individual: IndividualId,
    /// 1 for parents (or children), 2 for grandparents, and so on.
    pub generation: usize,
    /// The individual this member was first reached through.
    pub reached_from: IndividualId,
}

/// Ancestors or descendants of `root`, in breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lineage {
    pub root: IndividualId,
    pub generations: usize,
    pub members: Vec<LineageMember>,
}

impl Lineage {
    #[must_use]
    pub fn contains(&self, individual: IndividualId) -> bool {
        self.members.iter().any(|m| m.individual == individual)
    }

    #[must_use]
    pub fn generation_of(&self, individual: IndividualId) -> Option<usize> {
        self.members
            .iter()
            .find(|m| m.individual == individual)
            .map(|m| m.generation)
    }
}

/// A shortest chain of parent/child steps between two individuals.
///
/// `steps[i]` classifies `individuals[i + 1]` relative to `individuals[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KinshipPath {
    pub individuals: Vec<IndividualId>,
    pub steps: Vec<Relationship>,
}

impl KinshipPath {
    /// Number of edges on the path.
    #[must_use]
    pub fn degrees(&self) -> usize {
        self.individuals.len().saturating_sub(1)
    }

    #[must_use]
    pub fn description(&self) -> String {
        match self.steps.as_slice() {
            [] => "Same person".to_string(),
            [single] => single.label().to_string(),
            _ => format!("{} degrees of separation", self.degrees()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

// =============================================================================
// ADJACENCY MEMO
// =============================================================================

/// Parent/child lookups cached for the lifetime of one operation.
struct Adjacency<'s, S: Store> {
    store: &'s S,
    unions: BTreeMap<IndividualId, Vec<Union>>,
    parents: BTreeMap<IndividualId, Vec<IndividualId>>,
    children: BTreeMap<IndividualId, Vec<IndividualId>>,
}

impl<'s, S: Store> Adjacency<'s, S> {
    fn new(store: &'s S) -> Self {
        Self {
            store,
            unions: BTreeMap::new(),
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Unions in which `id` is husband or wife.
    fn unions_of(&mut self, id: IndividualId) -> Result<&[Union], StammError> {
        let unions = match self.unions.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(self.store.filter(|union: &Union| union.has_spouse(id))?)
            }
        };
        Ok(unions.as_slice())
    }

    fn parents(&mut self, id: IndividualId) -> Result<Vec<IndividualId>, StammError> {
        if let Some(cached) = self.parents.get(&id) {
            return Ok(cached.clone());
        }
        let links = self.store.filter(|link: &ChildLink| link.child == id)?;
        let mut parents = BTreeSet::new();
        for link in links {
            if let Some(union) = self.store.get::<Union>(link.union)? {
                parents.extend(union.spouses());
            }
        }
        let parents: Vec<IndividualId> = parents.into_iter().collect();
        self.parents.insert(id, parents.clone());
        Ok(parents)
    }

    fn children(&mut self, id: IndividualId) -> Result<Vec<IndividualId>, StammError> {
        if let Some(cached) = self.children.get(&id) {
            return Ok(cached.clone());
        }
        let union_ids: BTreeSet<UnionId> = self.unions_of(id)?.iter().map(|u| u.id).collect();
        let children: Vec<IndividualId> = if union_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .filter(|link: &ChildLink| union_ids.contains(&link.union))?
                .into_iter()
                .map(|link| link.child)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        self.children.insert(id, children.clone());
        Ok(children)
    }

    fn step(&mut self, id: IndividualId, direction: Direction) -> Result<Vec<IndividualId>, StammError> {
        match direction {
            Direction::Up => self.parents(id),
            Direction::Down => self.children(id),
        }
    }

    /// Parents first, then children. Edges are undirected for path search.
    fn neighbors(&mut self, id: IndividualId) -> Result<Vec<IndividualId>, StammError> {
        let mut neighbors = self.parents(id)?;
        neighbors.extend(self.children(id)?);
        Ok(neighbors)
    }

    fn classify(&mut self, a: IndividualId, b: IndividualId) -> Result<Relationship, StammError> {
        if a == b {
            return Ok(Relationship::Same);
        }
        let parents_a = self.parents(a)?;
        if parents_a.contains(&b) {
            return Ok(Relationship::Parent);
        }
        if self.children(a)?.contains(&b) {
            return Ok(Relationship::Child);
        }
        let parents_b = self.parents(b)?;
        if parents_a.iter().any(|p| parents_b.contains(p)) {
            return Ok(Relationship::Sibling);
        }
        if self.unions_of(a)?.iter().any(|u| u.has_spouse(b)) {
            return Ok(Relationship::Spouse);
        }
        Ok(Relationship::Relative)
    }
}

// =============================================================================
// KINSHIP ENGINE
// =============================================================================

pub struct Kinship<'s, S: Store> {
    store: &'s S,
}

impl<'s, S: Store> Kinship<'s, S> {
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    fn require(&self, id: IndividualId) -> Result<(), StammError> {
        match self.store.get::<Individual>(id)? {
            Some(_) => Ok(()),
            None => Err(StammError::IndividualNotFound(id)),
        }
    }

    /// Spouses of every union listing `id` as a child, ascending and unique.
    pub fn parents_of(&self, id: IndividualId) -> Result<Vec<IndividualId>, StammError> {
        self.require(id)?;
        Adjacency::new(self.store).parents(id)
    }

    /// Children of every union in which `id` is a spouse, ascending and unique.
    pub fn children_of(&self, id: IndividualId) -> Result<Vec<IndividualId>, StammError> {
        self.require(id)?;
        Adjacency::new(self.store).children(id)
    }

    /// Ancestors up to `generations` steps away (1 to 10).
    pub fn ancestors(&self, root: IndividualId, generations: usize) -> Result<Lineage, StammError> {
        self.lineage(root, generations, Direction::Up)
    }

    /// Descendants up to `generations` steps away (1 to 10).
    pub fn descendants(
        &self,
        root: IndividualId,
        generations: usize,
    ) -> Result<Lineage, StammError> {
        self.lineage(root, generations, Direction::Down)
    }

    fn lineage(
        &self,
        root: IndividualId,
        generations: usize,
        direction: Direction,
    ) -> Result<Lineage, StammError> {
        self.require(root)?;
        if !(MIN_GENERATIONS..=MAX_GENERATIONS).contains(&generations) {
            return Err(StammError::InvalidGenerations(generations));
        }

        let mut adjacency = Adjacency::new(self.store);
        let mut seen = BTreeSet::from([root]);
        let mut queue = VecDeque::from([(root, 0usize)]);
        let mut members = Vec::new();

        while let Some((current, generation)) = queue.pop_front() {
            if generation >= generations {
                continue;
            }
            let next_generation = generation.saturating_add(1);
            for next in adjacency.step(current, direction)? {
                // First reach wins; re-convergent lines are not listed twice.
                if seen.insert(next) {
                    members.push(LineageMember {
                        individual: next,
                        generation: next_generation,
                        reached_from: current,
                    });
                    queue.push_back((next, next_generation));
                }
            }
        }

        debug!(
            root = %root,
            generations,
            members = members.len(),
            "lineage expanded"
        );
        Ok(Lineage {
            root,
            generations,
            members,
        })
    }

    /// Shortest path from `start` to `end` along parent/child edges.
    ///
    /// Returns `None` when no path is found within the level bound.
    pub fn path(
        &self,
        start: IndividualId,
        end: IndividualId,
    ) -> Result<Option<KinshipPath>, StammError> {
        self.require(start)?;
        self.require(end)?;

        let mut adjacency = Adjacency::new(self.store);
        let Some(individuals) = bidirectional_search(&mut adjacency, start, end)? else {
            debug!(start = %start, end = %end, "no kinship path");
            return Ok(None);
        };

        let mut steps = Vec::with_capacity(individuals.len().saturating_sub(1));
        for pair in individuals.windows(2) {
            if let [a, b] = pair {
                steps.push(adjacency.classify(*a, *b)?);
            }
        }
        Ok(Some(KinshipPath { individuals, steps }))
    }

    /// Classify `b` relative to `a`: parent, child, sibling, spouse, or relative.
    pub fn relationship(
        &self,
        a: IndividualId,
        b: IndividualId,
    ) -> Result<Relationship, StammError> {
        self.require(a)?;
        self.require(b)?;
        Adjacency::new(self.store).classify(a, b)
    }
}

// =============================================================================
// BIDIRECTIONAL SEARCH
// =============================================================================

/// Predecessor map: node -> the node it was discovered from (`None` at the origin).
type Predecessors = BTreeMap<IndividualId, Option<IndividualId>>;

/// One end of the search, grown a whole level at a time.
struct Side {
    predecessors: Predecessors,
    depths: BTreeMap<IndividualId, usize>,
    frontier: Vec<IndividualId>,
    level: usize,
}

impl Side {
    fn new(origin: IndividualId) -> Self {
        Self {
            predecessors: BTreeMap::from([(origin, None)]),
            depths: BTreeMap::from([(origin, 0)]),
            frontier: vec![origin],
            level: 0,
        }
    }

    fn depth(&self, node: IndividualId) -> Option<usize> {
        self.depths.get(&node).copied()
    }

    /// Expand every node of the current level. Returns the newly discovered nodes.
    fn advance<S: Store>(
        &mut self,
        adjacency: &mut Adjacency<'_, S>,
    ) -> Result<Vec<IndividualId>, StammError> {
        self.level = self.level.saturating_add(1);
        let mut next = Vec::new();
        for current in std::mem::take(&mut self.frontier) {
            for neighbor in adjacency.neighbors(current)? {
                if !self.predecessors.contains_key(&neighbor) {
                    self.predecessors.insert(neighbor, Some(current));
                    self.depths.insert(neighbor, self.level);
                    next.push(neighbor);
                }
            }
        }
        self.frontier.clone_from(&next);
        Ok(next)
    }
}

fn bidirectional_search<S: Store>(
    adjacency: &mut Adjacency<'_, S>,
    start: IndividualId,
    end: IndividualId,
) -> Result<Option<Vec<IndividualId>>, StammError> {
    if start == end {
        return Ok(Some(vec![start]));
    }

    let mut forward = Side::new(start);
    let mut backward = Side::new(end);

    for _ in 0..MAX_PATH_LEVELS {
        if forward.frontier.is_empty() || backward.frontier.is_empty() {
            break;
        }

        // Grow the smaller frontier; ties grow forward.
        let (grown, other) = if forward.frontier.len() <= backward.frontier.len() {
            (&mut forward, &backward)
        } else {
            (&mut backward, &forward)
        };
        let discovered = grown.advance(adjacency)?;

        // Every discovered node sits at the same depth on the grown side, so
        // the best meeting node is the one closest to the other origin.
        let meeting = discovered
            .into_iter()
            .filter_map(|node| other.depth(node).map(|depth| (depth, node)))
            .min();
        if let Some((_, node)) = meeting {
            return Ok(Some(join(&forward.predecessors, &backward.predecessors, node)));
        }
    }
    Ok(None)
}

/// Walk predecessors from `node` back to the search origin.
fn trace(predecessors: &Predecessors, node: IndividualId) -> Vec<IndividualId> {
    let mut chain = vec![node];
    let mut cursor = node;
    while let Some(Some(previous)) = predecessors.get(&cursor) {
        chain.push(*previous);
        cursor = *previous;
    }
    chain
}

/// Forward half (start..=meeting) followed by the backward half without
/// repeating the meeting node.
fn join(forward: &Predecessors, backward: &Predecessors, meeting: IndividualId) -> Vec<IndividualId> {
    let mut path = trace(forward, meeting);
    path.reverse();
    path.extend(trace(backward, meeting).into_iter().skip(1));
    path
}

// =============================================================================
// TESTS
// =============================================================================
