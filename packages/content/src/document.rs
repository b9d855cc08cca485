//! # Document
//!
//! The raw tree behind a [`Content`](crate::Content): a synthetic wrapper
//! idea with id `"root"` whose children are the root ideas, plus links and
//! resources. Everything here is read-only navigation; mutation goes through
//! commands.

use crate::idea::{null_as_default, Idea, IdeaSummary, Link};
use crate::rank::{self, Rank};
use crate::traverse::{self, Order};
use crate::IdeaId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Format produced by [`upgrade`](crate::upgrade::upgrade)
pub const CURRENT_FORMAT_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten)]
    pub(crate) root: Idea,

    #[serde(default)]
    pub(crate) format_version: u32,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub(crate) links: Vec<Link>,

    /// Bodies are shared, never copied
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) resources: BTreeMap<String, Rc<Value>>,
}

impl Document {
    /// The synthetic wrapper idea
    pub fn root(&self) -> &Idea {
        &self.root
    }

    pub fn id(&self) -> &IdeaId {
        &self.root.id
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn resources(&self) -> &BTreeMap<String, Rc<Value>> {
        &self.resources
    }

    /// The stored body itself, not a copy
    pub fn get_resource(&self, key: &str) -> Option<Rc<Value>> {
        self.resources.get(key).cloned()
    }

    /// The wrapper or any idea below it
    pub fn find_by_id(&self, id: impl Into<IdeaId>) -> Option<&Idea> {
        self.idea(&id.into())
    }

    pub(crate) fn idea(&self, id: &IdeaId) -> Option<&Idea> {
        if &self.root.id == id {
            Some(&self.root)
        } else {
            self.root.descendant(id)
        }
    }

    pub(crate) fn idea_mut(&mut self, id: &IdeaId) -> Option<&mut Idea> {
        if &self.root.id == id {
            Some(&mut self.root)
        } else {
            self.root.descendant_mut(id)
        }
    }

    pub fn contains(&self, id: impl Into<IdeaId>) -> bool {
        self.find_by_id(id).is_some()
    }

    /// True for the top-level ideas directly under the wrapper
    pub fn is_root_node(&self, id: impl Into<IdeaId>) -> bool {
        self.root.contains_direct_child(id)
    }

    /// Parent of a non-root idea. Root ideas and the wrapper have none.
    pub fn find_parent(&self, id: impl Into<IdeaId>) -> Option<&Idea> {
        let id = id.into();
        if self.is_root_node(&id) {
            return None;
        }
        let (parent, _) = self.root.locate(&id)?;
        self.idea(&parent)
    }

    /// Parent id and rank of any idea below the wrapper, root ideas included
    pub(crate) fn locate(&self, id: &IdeaId) -> Option<(IdeaId, Rank)> {
        self.root.locate(id)
    }

    /// Ancestors from the immediate parent up to the wrapper.
    ///
    /// Root ideas and the wrapper have an empty path; unknown ids have none.
    pub fn calculate_path(&self, id: impl Into<IdeaId>) -> Option<Vec<&Idea>> {
        let id = id.into();
        if id == self.root.id || self.is_root_node(&id) {
            return Some(Vec::new());
        }
        ancestors(&self.root, &id)
    }

    /// Descendant ids in post-order, the idea itself excluded. An unknown id
    /// lists every idea in the document.
    pub fn get_sub_tree_ids(&self, id: impl Into<IdeaId>) -> Vec<IdeaId> {
        let mut ids = Vec::new();
        let idea = self.idea(&id.into()).unwrap_or(&self.root);
        traverse::traverse_children(idea, Order::Post, &mut |child: &Idea, _| {
            ids.push(child.id.clone())
        });
        ids
    }

    /// Siblings on the same rank side, nearest first
    pub fn same_side_sibling_ids(&self, id: impl Into<IdeaId>) -> Vec<IdeaId> {
        let id = id.into();
        let Some((parent, current)) = self.parent_and_rank(&id) else {
            return Vec::new();
        };
        let mut ranks = rank::same_side_ranks(&parent.ideas, current);
        ranks.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
        ranks
            .iter()
            .filter_map(|rank| parent.ideas.get(rank))
            .filter(|sibling| sibling.id != id)
            .map(|sibling| sibling.id.clone())
            .collect()
    }

    /// The same-side sibling with the next larger absolute rank
    pub fn next_sibling_id(&self, id: impl Into<IdeaId>) -> Option<IdeaId> {
        let (parent, current) = self.parent_and_rank(&id.into())?;
        rank::same_side_ranks(&parent.ideas, current)
            .into_iter()
            .filter(|rank| rank.abs() > current.abs())
            .min_by(|a, b| a.abs().total_cmp(&b.abs()))
            .and_then(|rank| parent.ideas.get(&rank))
            .map(|sibling| sibling.id.clone())
    }

    /// The same-side sibling with the next smaller absolute rank
    pub fn previous_sibling_id(&self, id: impl Into<IdeaId>) -> Option<IdeaId> {
        let (parent, current) = self.parent_and_rank(&id.into())?;
        rank::same_side_ranks(&parent.ideas, current)
            .into_iter()
            .filter(|rank| rank.abs() < current.abs())
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .and_then(|rank| parent.ideas.get(&rank))
            .map(|sibling| sibling.id.clone())
    }

    pub fn has_siblings(&self, id: impl Into<IdeaId>) -> bool {
        let id = id.into();
        if self.is_root_node(&id) {
            return false;
        }
        self.find_parent(&id)
            .is_some_and(|parent| parent.ideas.len() > 1)
    }

    /// Sibling ranks in display order.
    ///
    /// Only the idea's own side unless `ignore_rank_side` is set, in which
    /// case every sibling rank is returned in ascending numeric order.
    pub fn get_ordered_sibling_ranks(
        &self,
        id: impl Into<IdeaId>,
        ignore_rank_side: bool,
    ) -> Option<Vec<Rank>> {
        let (parent, current) = self.parent_and_rank(&id.into())?;
        if ignore_rank_side {
            return Some(parent.ideas.keys().copied().collect());
        }
        let mut ranks = rank::same_side_ranks(&parent.ideas, current);
        ranks.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
        Some(ranks)
    }

    fn parent_and_rank(&self, id: &IdeaId) -> Option<(&Idea, Rank)> {
        let parent = self.find_parent(id)?;
        let rank = parent.rank_of(id)?;
        Some((parent, rank))
    }

    /// Every idea matching the predicate, wrapper included, in pre-order
    pub fn find<P>(&self, predicate: P) -> Vec<IdeaSummary>
    where
        P: FnMut(&Idea) -> bool,
    {
        self.root.find(predicate)
    }

    /// A copy of a truthy attribute value
    pub fn get_attr_by_id(&self, id: impl Into<IdeaId>, name: &str) -> Option<Value> {
        self.find_by_id(id)?.get_attr(name)
    }

    pub fn is_empty_group(&self, id: impl Into<IdeaId>) -> bool {
        let id = id.into();
        !self.is_root_node(&id) && self.idea(&id).is_some_and(Idea::is_empty_group)
    }

    /// The first root idea in sibling order
    pub fn get_default_root_id(&self) -> Option<IdeaId> {
        self.root
            .sorted_sub_ideas()
            .first()
            .map(|idea| idea.id.clone())
    }

    /// The link going exactly from `from` to `to`
    pub fn find_link(&self, from: impl Into<IdeaId>, to: impl Into<IdeaId>) -> Option<&Link> {
        let (from, to) = (from.into(), to.into());
        self.links.iter().find(|link| link.is(&from, &to))
    }

    pub fn get_link_attr(
        &self,
        from: impl Into<IdeaId>,
        to: impl Into<IdeaId>,
        name: &str,
    ) -> Option<Value> {
        self.find_link(from, to)?
            .attr
            .as_ref()?
            .get(name)
            .cloned()
    }

    /// A copy of a subtree; the whole tree for `None` or the wrapper id
    pub fn clone_idea(&self, id: Option<IdeaId>) -> Option<Idea> {
        match id {
            None => Some(self.root.clone()),
            Some(id) => self.idea(&id).cloned(),
        }
    }

    pub fn clone_multiple(&self, ids: &[IdeaId]) -> Vec<Option<Idea>> {
        ids.iter().map(|id| self.clone_idea(Some(id.clone()))).collect()
    }

    /// A fully independent copy, resource bodies included
    pub fn snapshot(&self) -> Document {
        let mut copy = self.clone();
        for body in copy.resources.values_mut() {
            *body = Rc::new((**body).clone());
        }
        copy
    }

    /// Walk every idea in sibling order, skipping the wrapper
    pub fn traverse<'a, F>(&'a self, order: Order, visit: &mut F)
    where
        F: FnMut(&'a Idea, usize),
    {
        traverse::traverse_document(self, order, visit);
    }

    pub(crate) fn max_id(&self) -> u64 {
        self.root.max_id()
    }
}

fn ancestors<'a>(node: &'a Idea, id: &IdeaId) -> Option<Vec<&'a Idea>> {
    if node.rank_of(id).is_some() {
        return Some(vec![node]);
    }
    node.ideas.values().find_map(|child| {
        let mut chain = ancestors(child, id)?;
        chain.push(node);
        Some(chain)
    })
}
