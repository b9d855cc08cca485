//! # Ideas and links
//!
//! The node type of the document tree, the directed links drawn between
//! nodes, and the truthiness rules used by attribute edits.

use crate::rank::{self, Rank};
use crate::IdeaId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Attribute container of ideas and links
pub type AttrMap = Map<String, Value>;

/// A node of the document tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    #[serde(default, skip_serializing_if = "IdeaId::is_unassigned")]
    pub id: IdeaId,

    #[serde(default, deserialize_with = "title_or_empty")]
    pub title: String,

    /// Absent rather than empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<AttrMap>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub ideas: BTreeMap<Rank, Idea>,

    /// Properties this crate does not interpret, kept as they came in
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Id and title of a matching idea, as returned by searches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaSummary {
    pub id: IdeaId,
    pub title: String,
}

impl Idea {
    pub fn new(id: impl Into<IdeaId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// A descendant (not the idea itself) with the given id
    pub fn find_sub_idea(&self, id: impl Into<IdeaId>) -> Option<&Idea> {
        self.descendant(&id.into())
    }

    pub(crate) fn descendant(&self, id: &IdeaId) -> Option<&Idea> {
        self.ideas
            .values()
            .find(|child| &child.id == id)
            .or_else(|| self.ideas.values().find_map(|child| child.descendant(id)))
    }

    pub(crate) fn descendant_mut(&mut self, id: &IdeaId) -> Option<&mut Idea> {
        if let Some(rank) = self.rank_of(id) {
            return self.ideas.get_mut(&rank);
        }
        self.ideas
            .values_mut()
            .find_map(|child| child.descendant_mut(id))
    }

    /// Rank of a direct child
    pub fn child_rank(&self, id: impl Into<IdeaId>) -> Option<Rank> {
        self.rank_of(&id.into())
    }

    pub(crate) fn rank_of(&self, id: &IdeaId) -> Option<Rank> {
        self.ideas
            .iter()
            .find(|(_, child)| &child.id == id)
            .map(|(rank, _)| *rank)
    }

    pub fn contains_direct_child(&self, id: impl Into<IdeaId>) -> bool {
        self.child_rank(id).is_some()
    }

    /// Parent id and rank of a descendant
    pub(crate) fn locate(&self, id: &IdeaId) -> Option<(IdeaId, Rank)> {
        if let Some(rank) = self.rank_of(id) {
            return Some((self.id.clone(), rank));
        }
        self.ideas.values().find_map(|child| child.locate(id))
    }

    /// Children in sibling order
    pub fn sorted_sub_ideas(&self) -> Vec<&Idea> {
        rank::sorted_children(&self.ideas)
    }

    /// A copy of an attribute, if it is set to a truthy value
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.attr
            .as_ref()
            .and_then(|attr| attr.get(name))
            .filter(|value| is_truthy(value))
            .cloned()
    }

    pub(crate) fn remove_attr(&mut self, name: &str) {
        if let Some(attr) = self.attr.as_mut() {
            attr.remove(name);
            if attr.is_empty() {
                self.attr = None;
            }
        }
    }

    pub(crate) fn restore_attr(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.attr
                    .get_or_insert_with(AttrMap::new)
                    .insert(name.to_string(), value);
            }
            None => self.remove_attr(name),
        }
    }

    pub fn is_group(&self) -> bool {
        self.get_attr("group").is_some()
    }

    /// A group container left without children
    pub fn is_empty_group(&self) -> bool {
        self.is_group() && self.ideas.is_empty()
    }

    /// Ids in this subtree, the idea itself included
    pub(crate) fn subtree_ids(&self) -> HashSet<IdeaId> {
        let mut ids = HashSet::new();
        crate::traverse::traverse(self, crate::Order::Pre, &mut |idea: &Idea, _| {
            ids.insert(idea.id.clone());
        });
        ids
    }

    /// Largest numeric id component in this subtree
    pub(crate) fn max_id(&self) -> u64 {
        self.ideas
            .values()
            .map(Idea::max_id)
            .fold(self.id.numeric(), u64::max)
    }

    /// Pre-order search, this idea included
    pub fn find<P>(&self, mut predicate: P) -> Vec<IdeaSummary>
    where
        P: FnMut(&Idea) -> bool,
    {
        let mut found = Vec::new();
        crate::traverse::traverse(self, crate::Order::Pre, &mut |idea: &Idea, _| {
            if predicate(idea) {
                found.push(IdeaSummary {
                    id: idea.id.clone(),
                    title: idea.title.clone(),
                });
            }
        });
        found
    }
}

/// A directed edge between two ideas that are not parent and child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub idea_id_from: IdeaId,
    pub idea_id_to: IdeaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<AttrMap>,
}

impl Link {
    /// A link with the default dashed red style
    pub fn new(from: IdeaId, to: IdeaId) -> Self {
        let mut attr = AttrMap::new();
        attr.insert(
            "style".to_string(),
            json!({ "color": "#FF0000", "lineStyle": "dashed" }),
        );
        Self {
            idea_id_from: from,
            idea_id_to: to,
            attr: Some(attr),
        }
    }

    /// Exact direction match
    pub fn is(&self, from: &IdeaId, to: &IdeaId) -> bool {
        &self.idea_id_from == from && &self.idea_id_to == to
    }

    /// Match in either direction
    pub fn connects(&self, a: &IdeaId, b: &IdeaId) -> bool {
        self.is(a, b) || self.is(b, a)
    }

    pub fn touches(&self, ids: &HashSet<IdeaId>) -> bool {
        ids.contains(&self.idea_id_from) || ids.contains(&self.idea_id_to)
    }
}

/// `false`, `null`, `0`, `NaN` and `""` are falsy; everything else is truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Values that clear an attribute instead of setting it
pub fn is_removal_value(value: &Value) -> bool {
    match value {
        Value::String(s) if s == "false" => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        other => !is_truthy(other),
    }
}

fn title_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(title) => title,
        other => other.to_string(),
    })
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
