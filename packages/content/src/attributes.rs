//! Attribute edits on ideas and links, and the link commands themselves.
//!
//! A falsy value, the string `"false"` or an empty object removes an
//! attribute; anything else is stored as a copy. An attribute map that ends
//! up empty is dropped.

use crate::command::{Command, Outcome};
use crate::content::Content;
use crate::errors::{MutationError, MutationResult};
use crate::idea::{is_removal_value, is_truthy, AttrMap, Link};
use crate::undo_stack::{AttrTarget, UndoAction};
use crate::IdeaId;
use serde_json::Value;

impl Content {
    /// Set or (with a removal value) clear an attribute
    pub fn update_attr(&mut self, id: impl Into<IdeaId>, name: &str, value: Value) -> bool {
        let command = Command::UpdateAttr {
            id: id.into(),
            name: name.to_string(),
            value,
        };
        self.execute(command, None).is_success()
    }

    /// Set one property inside an object-valued attribute. A falsy value
    /// removes the property; removing the last one removes the attribute.
    pub fn merge_attr_property(
        &mut self,
        id: impl Into<IdeaId>,
        attr_name: &str,
        property: &str,
        value: Value,
    ) -> bool {
        let id = id.into();
        let mut merged = match self.get_attr_by_id(&id, attr_name) {
            Some(Value::Object(map)) => map,
            _ => AttrMap::new(),
        };
        if is_truthy(&value) {
            merged.insert(property.to_string(), value);
        } else {
            merged.remove(property);
        }
        let value = if merged.is_empty() {
            Value::Bool(false)
        } else {
            Value::Object(merged)
        };
        self.update_attr(id, attr_name, value)
    }

    pub fn add_link(&mut self, from: impl Into<IdeaId>, to: impl Into<IdeaId>) -> bool {
        let command = Command::AddLink {
            from: from.into(),
            to: to.into(),
        };
        self.execute(command, None).is_success()
    }

    /// Remove the link going exactly from `from` to `to`
    pub fn remove_link(&mut self, from: impl Into<IdeaId>, to: impl Into<IdeaId>) -> bool {
        let command = Command::RemoveLink {
            from: from.into(),
            to: to.into(),
        };
        self.execute(command, None).is_success()
    }

    pub fn update_link_attr(
        &mut self,
        from: impl Into<IdeaId>,
        to: impl Into<IdeaId>,
        name: &str,
        value: Value,
    ) -> bool {
        let command = Command::UpdateLinkAttr {
            from: from.into(),
            to: to.into(),
            name: name.to_string(),
            value,
        };
        self.execute(command, None).is_success()
    }

    pub(crate) fn process_update_attr(
        &mut self,
        session: &Option<String>,
        id: IdeaId,
        name: String,
        value: Value,
    ) -> MutationResult<Outcome> {
        let idea = self
            .document_mut()
            .idea_mut(&id)
            .ok_or_else(|| MutationError::IdeaNotFound(id.clone()))?;
        let previous = edit_attr(&mut idea.attr, &name, &value)?;

        let undo = UndoAction::RestoreAttr {
            target: AttrTarget::Idea { id: id.clone() },
            attr: previous,
        };
        self.log_change(Command::UpdateAttr { id, name, value }, undo, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_add_link(
        &mut self,
        session: &Option<String>,
        from: IdeaId,
        to: IdeaId,
    ) -> MutationResult<Outcome> {
        self.validate_link(&from, &to)?;
        if self.links().iter().any(|link| link.connects(&from, &to)) {
            return Err(MutationError::DuplicateLink { from, to });
        }
        self.document_mut()
            .links
            .push(Link::new(from.clone(), to.clone()));

        let undo = UndoAction::RemoveLink {
            from: from.clone(),
            to: to.clone(),
        };
        self.log_change(Command::AddLink { from, to }, undo, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_remove_link(
        &mut self,
        session: &Option<String>,
        from: IdeaId,
        to: IdeaId,
    ) -> MutationResult<Outcome> {
        let links = &mut self.document_mut().links;
        let Some(index) = links.iter().position(|link| link.is(&from, &to)) else {
            return Err(MutationError::LinkNotFound { from, to });
        };
        let link = links.remove(index);

        self.log_change(Command::RemoveLink { from, to }, UndoAction::RestoreLink { link }, session);
        Ok(Outcome::Done)
    }

    pub(crate) fn process_update_link_attr(
        &mut self,
        session: &Option<String>,
        from: IdeaId,
        to: IdeaId,
        name: String,
        value: Value,
    ) -> MutationResult<Outcome> {
        let Some(link) = self
            .document_mut()
            .links
            .iter_mut()
            .find(|link| link.is(&from, &to))
        else {
            return Err(MutationError::LinkNotFound { from, to });
        };
        let previous = edit_attr(&mut link.attr, &name, &value)?;

        let undo = UndoAction::RestoreAttr {
            target: AttrTarget::Link {
                from: from.clone(),
                to: to.clone(),
            },
            attr: previous,
        };
        let command = Command::UpdateLinkAttr {
            from,
            to,
            name,
            value,
        };
        self.log_change(command, undo, session);
        Ok(Outcome::Done)
    }

    /// Both ends exist, differ and are not parent and child
    fn validate_link(&self, from: &IdeaId, to: &IdeaId) -> MutationResult<()> {
        let invalid = || MutationError::InvalidLink {
            from: from.clone(),
            to: to.clone(),
        };
        if from == to {
            return Err(invalid());
        }
        let (Some(source), Some(target)) = (self.idea(from), self.idea(to)) else {
            return Err(invalid());
        };
        if source.contains_direct_child(to) || target.contains_direct_child(from) {
            return Err(invalid());
        }
        Ok(())
    }
}

/// Apply one attribute edit and hand back the map as it was before.
///
/// Fails with [`MutationError::Unchanged`] when the value is already set or
/// there is nothing to remove.
fn edit_attr(attr: &mut Option<AttrMap>, name: &str, value: &Value) -> MutationResult<Option<AttrMap>> {
    let previous = attr.clone();
    if is_removal_value(value) {
        let current = attr
            .as_mut()
            .filter(|map| map.get(name).is_some_and(is_truthy))
            .ok_or(MutationError::Unchanged)?;
        current.remove(name);
    } else {
        if attr.as_ref().and_then(|map| map.get(name)) == Some(value) {
            return Err(MutationError::Unchanged);
        }
        attr.get_or_insert_with(AttrMap::new)
            .insert(name.to_string(), value.clone());
    }
    if attr.as_ref().is_some_and(AttrMap::is_empty) {
        *attr = None;
    }
    Ok(previous)
}
