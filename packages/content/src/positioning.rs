//! Reordering siblings: `positionBefore`, `flip` and relative moves.
//!
//! Only the moved idea's rank changes. Its siblings keep theirs, so two
//! sessions reordering the same list never renumber each other's ideas.

use crate::command::{Command, Outcome};
use crate::content::Content;
use crate::errors::{MutationError, MutationResult};
use crate::rank::{self, Rank};
use crate::undo_stack::UndoAction;
use crate::IdeaId;
use serde::{Deserialize, Serialize};

/// Spacing used when moving an idea past the outermost sibling
const END_GAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveOptions {
    /// Treat both sides as one list ordered by rank; crossing zero flips
    /// the idea to the other side
    pub ignore_rank_side: bool,
}

impl Content {
    /// Move `id` just in front of its sibling `before`, or to the end of
    /// its side when `before` is `None`.
    ///
    /// `parent` may name the parent directly instead of having it looked up.
    pub fn position_before(
        &mut self,
        id: impl Into<IdeaId>,
        before: Option<IdeaId>,
        parent: Option<IdeaId>,
    ) -> bool {
        let command = Command::PositionBefore {
            id: id.into(),
            before,
            parent,
        };
        self.execute(command, None).is_success()
    }

    /// Move a child of a root idea to the far end of the other side
    pub fn flip(&mut self, id: impl Into<IdeaId>) -> bool {
        self.execute(Command::Flip { id: id.into() }, None)
            .is_success()
    }

    /// Move an idea `movement` places up (negative) or down (positive)
    /// among its siblings, as one undo step
    pub fn move_relative(&mut self, id: impl Into<IdeaId>, movement: i32, options: MoveOptions) -> bool {
        let id = id.into();
        let Some(parent) = self.find_parent(&id) else {
            return false;
        };
        let parent_id = parent.id.clone();
        let Some(current) = parent.rank_of(&id) else {
            return false;
        };
        let Some(ranks) = self.get_ordered_sibling_ranks(&id, options.ignore_rank_side) else {
            return false;
        };
        let Some(index) = ranks.iter().position(|rank| *rank == current) else {
            return false;
        };
        let at = |index: i64| usize::try_from(index).ok().and_then(|i| ranks.get(i)).copied();

        // positionBefore lands in front of the target, so moving down skips one more
        let (index, movement) = (index as i64, i64::from(movement));
        let mut target = index + if movement > 0 { movement + 1 } else { movement };
        if options.ignore_rank_side {
            if current.is_negative() {
                target = index + if movement < 0 { movement - 1 } else { movement };
                if at(target).is_some_and(|rank| rank.value() > 0.0) {
                    target += 1;
                }
            } else if at(target).is_some_and(Rank::is_negative) {
                target -= 1;
            }
        }

        let out_of_range = if options.ignore_rank_side && current.is_negative() {
            target > ranks.len() as i64 - 1
        } else {
            target < 0
        };
        if out_of_range {
            return false;
        }

        let before_rank = at(target);
        let before = before_rank
            .and_then(|rank| parent.ideas.get(&rank))
            .map(|sibling| sibling.id.clone());
        let crosses_sides = options.ignore_rank_side
            && before.is_some()
            && before_rank.is_some_and(|rank| rank.value() * current.value() < 0.0);

        self.batched(|content| {
            if crosses_sides {
                content.flip(&id);
            }
            content.position_before(id, before, Some(parent_id))
        })
    }

    pub(crate) fn process_position_before(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
        before: Option<IdeaId>,
        parent_hint: Option<IdeaId>,
    ) -> MutationResult<Outcome> {
        let parent = match &parent_hint {
            Some(hint) => self.idea(hint),
            None => self.find_parent(&id),
        }
        .ok_or_else(|| MutationError::ParentNotFound(parent_hint.clone().unwrap_or_else(|| id.clone())))?;
        if before.as_ref() == Some(&id) {
            return Err(MutationError::Unchanged);
        }
        let current = parent
            .rank_of(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;

        let new_rank = match &before {
            Some(before_id) => {
                let after = parent
                    .rank_of(before_id)
                    .ok_or_else(|| MutationError::NotASibling(before_id.clone()))?;
                let previous = rank::same_side_ranks(&parent.ideas, after)
                    .into_iter()
                    .filter(|rank| rank.abs() < after.abs())
                    .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                    .map_or(0.0, Rank::value);
                if previous == current.value() {
                    return Err(MutationError::Unchanged);
                }
                rank::midpoint(previous, after.value())
            }
            None => {
                let outermost = rank::max_key(&parent.ideas, current.sign());
                if outermost == current.value() {
                    return Err(MutationError::Unchanged);
                }
                outermost + END_GAP * current.sign()
            }
        };
        let new_rank = Rank::new(new_rank);
        if new_rank == current {
            return Err(MutationError::Unchanged);
        }
        if parent.ideas.contains_key(&new_rank) {
            return Err(MutationError::RankOccupied(new_rank));
        }

        let parent_id = parent.id.clone();
        self.move_rank(&parent_id, current, new_rank)?;
        let undo = UndoAction::Reorder {
            parent: parent_id,
            from: new_rank,
            to: current,
        };
        let command = Command::PositionBefore {
            id,
            before,
            parent: parent_hint,
        };
        self.log_change(command, undo, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_flip(&mut self, session: &Option<String>, id: IdeaId) -> MutationResult<Outcome> {
        let parent = self
            .find_parent(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        if !self.is_root_node(&parent.id) {
            return Err(MutationError::NotFlippable(id));
        }
        let current = parent
            .rank_of(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        let side = current.sign();
        let new_rank = Rank::new(rank::max_key(&parent.ideas, -side) - END_GAP * side);
        if parent.ideas.contains_key(&new_rank) {
            return Err(MutationError::RankOccupied(new_rank));
        }

        let parent_id = parent.id.clone();
        self.move_rank(&parent_id, current, new_rank)?;
        let undo = UndoAction::Reorder {
            parent: parent_id,
            from: new_rank,
            to: current,
        };
        self.log_change(Command::Flip { id }, undo, session);
        Ok(Outcome::Done)
    }

    fn move_rank(&mut self, parent: &IdeaId, from: Rank, to: Rank) -> MutationResult<()> {
        let parent = self
            .document_mut()
            .idea_mut(parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        let child = parent
            .ideas
            .remove(&from)
            .ok_or(MutationError::Unchanged)?;
        parent.ideas.insert(to, child);
        Ok(())
    }
}
