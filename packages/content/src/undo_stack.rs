//! # Undo history
//!
//! Every applied command is recorded together with an [`UndoAction`], a
//! small reverse patch that names its target by id and rank instead of
//! holding on to live nodes. Each session owns a [`SessionHistory`]:
//!
//! - undo pops the newest entry, applies its reverse patch and moves the
//!   entry to the redo stack
//! - redo replays the recorded command
//! - a fresh command clears the redo stack
//! - an open batch buffers entries until it is closed, then they are
//!   committed as one step
//!
//! Reverse patches check that the tree still looks the way they left it.
//! When another session has changed the spot in the meantime the patch
//! does nothing.

use crate::command::Command;
use crate::document::Document;
use crate::idea::{AttrMap, Idea, Link};
use crate::resources::StoredResource;
use crate::{IdeaId, Rank};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// What a [`UndoAction::RestoreAttr`] writes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AttrTarget {
    Idea { id: IdeaId },
    Link { from: IdeaId, to: IdeaId },
}

/// Reverse patch for one recorded command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UndoAction {
    RestoreTitle {
        id: IdeaId,
        title: String,
    },
    /// Drop the child `id` sitting at `rank` under `parent`
    DetachChild {
        parent: IdeaId,
        rank: Rank,
        id: IdeaId,
    },
    /// Put a removed subtree back into its old slot, if that slot is still
    /// free, and reinstate the link list it took along
    RestoreChild {
        parent: IdeaId,
        rank: Rank,
        idea: Box<Idea>,
        links: Vec<Link>,
    },
    /// Replace the wrapper at `rank` with its child `original`
    Unwrap {
        parent: IdeaId,
        rank: Rank,
        original: IdeaId,
    },
    /// Move `id` from `to_parent`/`to_rank` back to `from_parent`/`from_rank`
    Reparent {
        id: IdeaId,
        from_parent: IdeaId,
        from_rank: Rank,
        to_parent: IdeaId,
        to_rank: Rank,
        position: Option<Value>,
    },
    /// Move the child at `from` back to `to`, if `to` is still free
    Reorder {
        parent: IdeaId,
        from: Rank,
        to: Rank,
    },
    RestoreAttr {
        target: AttrTarget,
        attr: Option<AttrMap>,
    },
    RemoveLink {
        from: IdeaId,
        to: IdeaId,
    },
    RestoreLink {
        link: Link,
    },
    /// Applied in order
    Sequence {
        steps: Vec<UndoAction>,
    },
}

impl UndoAction {
    /// Apply the patch. Returns false if the tree no longer matched and
    /// nothing (or, for sequences, not everything) was changed.
    pub fn apply(&self, document: &mut Document) -> bool {
        let applied = match self {
            UndoAction::RestoreTitle { id, title } => match document.idea_mut(id) {
                Some(idea) => {
                    idea.title = title.clone();
                    true
                }
                None => false,
            },
            UndoAction::DetachChild { parent, rank, id } => match document.idea_mut(parent) {
                Some(parent) if parent.ideas.get(rank).is_some_and(|child| &child.id == id) => {
                    parent.ideas.remove(rank).is_some()
                }
                _ => false,
            },
            UndoAction::RestoreChild {
                parent,
                rank,
                idea,
                links,
            } => {
                if document.contains(&idea.id) {
                    false
                } else {
                    match document.idea_mut(parent) {
                        Some(parent) if !parent.ideas.contains_key(rank) => {
                            parent.ideas.insert(*rank, idea.as_ref().clone());
                            document.links = links.clone();
                            true
                        }
                        _ => false,
                    }
                }
            }
            UndoAction::Unwrap {
                parent,
                rank,
                original,
            } => unwrap(document, parent, *rank, original),
            UndoAction::Reparent {
                id,
                from_parent,
                from_rank,
                to_parent,
                to_rank,
                position,
            } => reparent(document, id, (from_parent, *from_rank), (to_parent, *to_rank), position),
            UndoAction::Reorder { parent, from, to } => match document.idea_mut(parent) {
                Some(parent) if !parent.ideas.contains_key(to) => match parent.ideas.remove(from) {
                    Some(child) => {
                        parent.ideas.insert(*to, child);
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            UndoAction::RestoreAttr { target, attr } => match target {
                AttrTarget::Idea { id } => match document.idea_mut(id) {
                    Some(idea) => {
                        idea.attr = attr.clone();
                        true
                    }
                    None => false,
                },
                AttrTarget::Link { from, to } => {
                    match document.links.iter_mut().find(|link| link.is(from, to)) {
                        Some(link) => {
                            link.attr = attr.clone();
                            true
                        }
                        None => false,
                    }
                }
            },
            UndoAction::RemoveLink { from, to } => {
                match document.links.iter().position(|link| link.is(from, to)) {
                    Some(index) => {
                        document.links.remove(index);
                        true
                    }
                    None => false,
                }
            }
            UndoAction::RestoreLink { link } => {
                document.links.push(link.clone());
                true
            }
            UndoAction::Sequence { steps } => {
                let mut all = true;
                for step in steps {
                    all &= step.apply(document);
                }
                all
            }
        };
        if !applied {
            debug!(action = ?self, "Undo target changed, nothing restored");
        }
        applied
    }
}

fn unwrap(document: &mut Document, parent: &IdeaId, rank: Rank, original: &IdeaId) -> bool {
    let Some(parent) = document.idea_mut(parent) else {
        return false;
    };
    let Some(wrapper) = parent.ideas.get_mut(&rank) else {
        return false;
    };
    let Some(inner) = wrapper
        .rank_of(original)
        .and_then(|inner_rank| wrapper.ideas.remove(&inner_rank))
    else {
        return false;
    };
    parent.ideas.insert(rank, inner);
    true
}

fn reparent(
    document: &mut Document,
    id: &IdeaId,
    (from_parent, from_rank): (&IdeaId, Rank),
    (to_parent, to_rank): (&IdeaId, Rank),
    position: &Option<Value>,
) -> bool {
    let Some(current) = document.idea_mut(to_parent) else {
        return false;
    };
    if current.ideas.get(&to_rank).map(|idea| &idea.id) != Some(id) {
        return false;
    }
    let Some(mut idea) = current.ideas.remove(&to_rank) else {
        return false;
    };
    idea.restore_attr("position", position.clone());

    match document.idea_mut(from_parent) {
        Some(previous) => {
            previous.ideas.insert(from_rank, idea);
            true
        }
        None => {
            // the old parent is gone; leave the idea where it was
            idea.remove_attr("position");
            if let Some(current) = document.idea_mut(to_parent) {
                current.ideas.insert(to_rank, idea);
            }
            false
        }
    }
}

/// One undoable step: the command that was applied and how to revert it
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub command: Command,
    pub undo: UndoAction,
}

impl HistoryEntry {
    pub fn new(command: Command, undo: UndoAction) -> Self {
        Self { command, undo }
    }

    /// Fold several entries into one; their patches run newest first
    pub fn combine(entries: Vec<HistoryEntry>) -> Self {
        let (commands, mut steps): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|entry| (entry.command, entry.undo))
            .unzip();
        steps.reverse();
        Self {
            command: Command::Batch(commands),
            undo: UndoAction::Sequence { steps },
        }
    }

    /// Append a later entry to this one, keeping a single undo step
    pub fn absorb(self, later: HistoryEntry) -> Self {
        let command = match self.command {
            Command::Batch(mut commands) => {
                commands.push(later.command);
                Command::Batch(commands)
            }
            single => Command::Batch(vec![single, later.command]),
        };
        Self {
            command,
            undo: UndoAction::Sequence {
                steps: vec![later.undo, self.undo],
            },
        }
    }
}

/// Undo/redo stacks and the open batch of one session
#[derive(Debug, Default)]
pub struct SessionHistory {
    /// Most recent last
    undo_stack: Vec<HistoryEntry>,

    /// Most recent last
    redo_stack: Vec<HistoryEntry>,

    /// Entries buffered while a batch is open
    current_batch: Option<Vec<HistoryEntry>>,

    /// Resources stored while a batch is open, announced when it closes
    batch_resources: Vec<StoredResource>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_batch_active(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Open an empty batch, replacing any open one
    pub(crate) fn begin_batch(&mut self) {
        self.current_batch = Some(Vec::new());
        self.batch_resources.clear();
    }

    /// Close the open batch and hand back what it buffered
    pub(crate) fn take_batch(&mut self) -> Option<Vec<HistoryEntry>> {
        self.current_batch.take()
    }

    /// Buffer into the open batch; without one the entry is handed back
    pub(crate) fn buffer(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        match self.current_batch.as_mut() {
            Some(batch) => {
                batch.push(entry);
                None
            }
            None => Some(entry),
        }
    }

    /// Hold a stored resource until the open batch closes; without one it is
    /// handed back
    pub(crate) fn buffer_resource(&mut self, stored: StoredResource) -> Option<StoredResource> {
        if self.is_batch_active() {
            self.batch_resources.push(stored);
            None
        } else {
            Some(stored)
        }
    }

    pub(crate) fn take_batch_resources(&mut self) -> Vec<StoredResource> {
        std::mem::take(&mut self.batch_resources)
    }

    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop()
    }

    pub(crate) fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop()
    }

    pub(crate) fn clear_redo(&mut self) {
        self.redo_stack.clear();
    }
}
