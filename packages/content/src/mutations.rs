//! # Structural commands
//!
//! Adding, removing, moving, wrapping and pasting ideas.
//!
//! ## Semantics
//!
//! ### Ids
//! - New ideas get the next free integer, suffixed with the default session
//! - An explicit id must not be in use yet
//!
//! ### Ranks
//! - Children are appended after the outermost sibling of their side
//! - Children of a root idea alternate sides so both halves stay balanced
//!
//! ### Remove
//! - Takes the whole subtree along, together with every link touching it
//! - The last root idea cannot be removed
//!
//! ### Change parent
//! - Fails if the new parent lies inside the moved subtree
//! - Clears the moved idea's `position` attribute

use crate::command::{Command, Outcome};
use crate::content::{init_idea, Content};
use crate::document::Document;
use crate::errors::{MutationError, MutationResult};
use crate::idea::AttrMap;
use crate::rank::{self, Rank};
use crate::undo_stack::UndoAction;
use crate::{Idea, IdeaId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title and attributes for a node created by
/// [`Content::insert_intermediate_multiple`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeaOptions {
    pub title: Option<String>,
    pub attr: Option<AttrMap>,
}

impl Content {
    pub fn update_title(&mut self, id: impl Into<IdeaId>, title: &str) -> bool {
        let command = Command::UpdateTitle {
            id: id.into(),
            title: title.to_string(),
        };
        self.execute(command, None).is_success()
    }

    /// Set the title of a freshly created idea as part of the step that
    /// created it
    pub fn initialise_title(&mut self, id: impl Into<IdeaId>, title: &str) -> bool {
        let command = Command::InitialiseTitle {
            id: id.into(),
            title: title.to_string(),
        };
        self.execute(command, None).is_success()
    }

    /// Append a new child and return its id
    pub fn add_sub_idea(
        &mut self,
        parent: impl Into<IdeaId>,
        title: Option<&str>,
        id: Option<IdeaId>,
    ) -> Option<IdeaId> {
        let command = Command::AddSubIdea {
            parent: parent.into(),
            title: title.map(str::to_string),
            id,
        };
        self.execute(command, None).idea_id()
    }

    pub fn remove_sub_idea(&mut self, id: impl Into<IdeaId>) -> bool {
        self.execute(Command::RemoveSubIdea { id: id.into() }, None)
            .is_success()
    }

    /// Remove several ideas as one undo step
    pub fn remove_multiple(&mut self, ids: &[IdeaId]) -> Vec<bool> {
        self.batched(|content| {
            ids.iter()
                .map(|id| content.remove_sub_idea(id))
                .collect()
        })
    }

    pub fn change_parent(&mut self, id: impl Into<IdeaId>, parent: impl Into<IdeaId>) -> bool {
        let command = Command::ChangeParent {
            id: id.into(),
            parent: parent.into(),
        };
        self.execute(command, None).is_success()
    }

    /// Put a new idea in the place of `id`, with `id` as its only child
    pub fn insert_intermediate(
        &mut self,
        id: impl Into<IdeaId>,
        title: Option<&str>,
        new_id: Option<IdeaId>,
    ) -> Option<IdeaId> {
        let command = Command::InsertIntermediate {
            id: id.into(),
            title: title.map(str::to_string),
            new_id,
        };
        self.execute(command, None).idea_id()
    }

    /// Group several ideas under a new node placed where the first one was.
    ///
    /// One undo step; returns the new node's id.
    pub fn insert_intermediate_multiple(
        &mut self,
        ids: &[IdeaId],
        options: &IdeaOptions,
    ) -> Option<IdeaId> {
        let (first, rest) = ids.split_first()?;
        self.batched(|content| {
            let new_id = content.insert_intermediate(first, options.title.as_deref(), None)?;
            for (name, value) in options.attr.iter().flatten() {
                content.update_attr(&new_id, name, value.clone());
            }
            for id in rest {
                content.change_parent(id, &new_id);
            }
            Some(new_id)
        })
    }

    /// Paste a copied subtree under `parent` (an idea or the document
    /// wrapper) with freshly allocated ids
    pub fn paste(
        &mut self,
        parent: impl Into<IdeaId>,
        json: Value,
        id: Option<IdeaId>,
    ) -> Option<IdeaId> {
        let command = Command::Paste {
            parent: parent.into(),
            json,
            id,
        };
        self.execute(command, None).idea_id()
    }

    /// Paste several subtrees as one undo step
    pub fn paste_multiple(
        &mut self,
        parent: impl Into<IdeaId>,
        items: Vec<Value>,
    ) -> Vec<Option<IdeaId>> {
        let parent = parent.into();
        self.batched(|content| {
            items
                .into_iter()
                .map(|json| content.paste(&parent, json, None))
                .collect()
        })
    }

    pub(crate) fn process_update_title(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
        title: String,
        initialise: bool,
    ) -> MutationResult<Outcome> {
        let idea = self
            .document_mut()
            .idea_mut(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        if idea.title == title {
            return Err(MutationError::Unchanged);
        }
        let previous = std::mem::replace(&mut idea.title, title.clone());
        let undo = UndoAction::RestoreTitle {
            id: id.clone(),
            title: previous,
        };

        if initialise {
            self.append_change(Command::InitialiseTitle { id, title }, undo, session);
        } else {
            self.log_change(Command::UpdateTitle { id, title }, undo, session);
        }
        Ok(Outcome::Done)
    }

    pub(crate) fn process_add_sub_idea(
        &mut self,
        session: &Option<String>,
        parent: IdeaId,
        title: Option<String>,
        id: Option<IdeaId>,
    ) -> MutationResult<Outcome> {
        let rank = append_rank(self.document(), &parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        self.ensure_unused(id.as_ref())?;

        let new_id = self.allocate_id(id);
        let idea = Idea::new(new_id.clone(), title.clone().unwrap_or_default());
        self.attach(&parent, rank, idea)?;

        let command = Command::AddSubIdea {
            parent: parent.clone(),
            title,
            id: Some(new_id.clone()),
        };
        let undo = UndoAction::DetachChild {
            parent,
            rank,
            id: new_id.clone(),
        };
        self.log_change(command, undo, session);
        Ok(Outcome::Created(new_id))
    }

    pub(crate) fn process_remove_sub_idea(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
    ) -> MutationResult<Outcome> {
        if self.is_root_node(&id) && self.root().ideas.len() <= 1 {
            return Err(MutationError::LastRootIdea);
        }
        let (parent, rank) = self
            .locate(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;

        let document = self.document_mut();
        let idea = document
            .idea_mut(&parent)
            .and_then(|parent| parent.ideas.remove(&rank))
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        let removed = idea.subtree_ids();
        let links = document.links.clone();
        document.links.retain(|link| !link.touches(&removed));

        let undo = UndoAction::RestoreChild {
            parent,
            rank,
            idea: Box::new(idea),
            links,
        };
        self.log_change(Command::RemoveSubIdea { id }, undo, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_change_parent(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
        parent: IdeaId,
    ) -> MutationResult<Outcome> {
        if id == parent {
            return Err(MutationError::CycleDetected(id));
        }
        let new_rank = append_rank(self.document(), &parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        let idea = self
            .root()
            .descendant(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        if idea.descendant(&parent).is_some() {
            return Err(MutationError::CycleDetected(id));
        }
        if self.idea(&parent).is_some_and(|target| target.contains_direct_child(&id)) {
            return Err(MutationError::Unchanged);
        }
        let (old_parent, old_rank) = self
            .locate(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;

        let mut idea = self
            .document_mut()
            .idea_mut(&old_parent)
            .and_then(|old| old.ideas.remove(&old_rank))
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        let position = idea.get_attr("position");
        idea.remove_attr("position");
        self.attach(&parent, new_rank, idea)?;

        let undo = UndoAction::Reparent {
            id: id.clone(),
            from_parent: old_parent,
            from_rank: old_rank,
            to_parent: parent.clone(),
            to_rank: new_rank,
            position,
        };
        self.log_change(Command::ChangeParent { id, parent }, undo, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_insert_intermediate(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
        title: Option<String>,
        new_id: Option<IdeaId>,
    ) -> MutationResult<Outcome> {
        if &id == self.id() {
            return Err(MutationError::DocumentRoot);
        }
        let (parent, rank) = self
            .locate(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        self.ensure_unused(new_id.as_ref())?;

        let wrapper_id = self.allocate_id(new_id);
        let slot = self
            .document_mut()
            .idea_mut(&parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        let original = slot
            .ideas
            .remove(&rank)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        let mut wrapper = Idea::new(wrapper_id.clone(), title.clone().unwrap_or_default());
        wrapper.ideas.insert(Rank::from(1), original);
        slot.ideas.insert(rank, wrapper);

        let undo = UndoAction::Unwrap {
            parent,
            rank,
            original: id.clone(),
        };
        let command = Command::InsertIntermediate {
            id,
            title,
            new_id: Some(wrapper_id.clone()),
        };
        self.log_change(command, undo, session);
        Ok(Outcome::Created(wrapper_id))
    }

    pub(crate) fn process_paste(
        &mut self,
        session: &Option<String>,
        parent: IdeaId,
        json: Value,
        id: Option<IdeaId>,
    ) -> MutationResult<Outcome> {
        let rank = append_rank(self.document(), &parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        self.ensure_unused(id.as_ref())?;
        if !json.is_object() {
            return Err(MutationError::NothingToPaste);
        }
        let copied: Idea =
            serde_json::from_value(json.clone()).map_err(|err| MutationError::InvalidArguments {
                command: "paste",
                reason: err.to_string(),
            })?;
        if copied.title.is_empty() && copied.attr.is_none() {
            return Err(MutationError::NothingToPaste);
        }
        let mut pasted = clean_up(copied, &self.configuration().non_cloned_attributes);

        // an explicit id restarts numbering at its leading integer, in its
        // session; without a leading integer numbering continues as usual
        let mut last = match &id {
            Some(explicit) if explicit.numeric() > 0 => explicit.numeric() - 1,
            _ => self.last_id(),
        };
        let id_session = id
            .as_ref()
            .and_then(IdeaId::session)
            .or_else(|| self.session_key())
            .map(str::to_string);
        init_idea(
            &mut pasted,
            &mut || {
                last += 1;
                IdeaId::generated(last, id_session.as_deref())
            },
            true,
        );
        if let Some(taken) = pasted.subtree_ids().into_iter().find(|id| self.contains(id)) {
            return Err(MutationError::DuplicateId(taken));
        }
        if id.is_some() {
            self.invalidate_id_cache();
        } else {
            self.set_id_cache(last);
        }
        pasted.remove_attr("position");

        let new_id = pasted.id.clone();
        self.attach(&parent, rank, pasted)?;

        let command = Command::Paste {
            parent: parent.clone(),
            json,
            id: Some(new_id.clone()),
        };
        let undo = UndoAction::DetachChild {
            parent,
            rank,
            id: new_id.clone(),
        };
        self.log_change(command, undo, session);
        Ok(Outcome::Created(new_id))
    }

    fn ensure_unused(&self, id: Option<&IdeaId>) -> MutationResult<()> {
        match id {
            Some(id) if self.contains(id) => Err(MutationError::DuplicateId(id.clone())),
            _ => Ok(()),
        }
    }

    fn allocate_id(&mut self, explicit: Option<IdeaId>) -> IdeaId {
        match explicit {
            Some(id) => {
                self.invalidate_id_cache();
                id
            }
            None => self.next_id(None),
        }
    }

    fn attach(&mut self, parent: &IdeaId, rank: Rank, idea: Idea) -> MutationResult<()> {
        let parent = self
            .document_mut()
            .idea_mut(parent)
            .ok_or_else(|| MutationError::ParentNotFound(parent.clone()))?;
        parent.ideas.insert(rank, idea);
        Ok(())
    }
}

/// Rank for a new last child of `parent`
pub(crate) fn append_rank(document: &Document, parent: &IdeaId) -> Option<Rank> {
    let children = &document.idea(parent)?.ideas;
    let sign = if document.is_root_node(parent) {
        rank::balanced_sign(children)
    } else {
        1.0
    };
    Some(rank::next_rank(children, sign))
}

/// Strip a copied subtree down to what a paste keeps: no ids, no
/// non-cloned attributes, and children re-ranked `1..n` in sibling order.
fn clean_up(idea: Idea, non_cloned: &[String]) -> Idea {
    let attr = idea
        .attr
        .map(|mut attr| {
            attr.retain(|name, _| !non_cloned.contains(name));
            attr
        })
        .filter(|attr| !attr.is_empty());

    let mut children = idea.ideas;
    let ideas = rank::sorted_ranks(&children)
        .into_iter()
        .filter_map(|rank| children.remove(&rank))
        .zip(1_i32..)
        .map(|(child, index)| (Rank::from(index), clean_up(child, non_cloned)))
        .collect();

    Idea {
        id: IdeaId::default(),
        title: idea.title,
        attr,
        ideas,
        extra: idea.extra,
    }
}
