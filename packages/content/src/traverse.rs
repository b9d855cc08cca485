//! # Traversal
//!
//! Depth-first walks over ideas in sibling order. The visitor receives each
//! idea with its depth, starting at level 1.
//!
//! Documents in the current format wrap their root ideas in a synthetic
//! `"root"` idea. [`traverse_document`] never reports that wrapper, so the
//! root ideas are visited at level 1; legacy documents without the wrapper
//! report their top node at level 1 instead.

use crate::document::{Document, CURRENT_FORMAT_VERSION};
use crate::Idea;

/// When a node is visited relative to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Pre,
    Post,
}

/// Walk `idea` and its descendants, `idea` itself at level 1
pub fn traverse<'a, F>(idea: &'a Idea, order: Order, visit: &mut F)
where
    F: FnMut(&'a Idea, usize),
{
    walk(idea, 1, order, visit);
}

/// Walk the descendants of `idea`, its children at level 1
pub fn traverse_children<'a, F>(idea: &'a Idea, order: Order, visit: &mut F)
where
    F: FnMut(&'a Idea, usize),
{
    for child in idea.sorted_sub_ideas() {
        walk(child, 1, order, visit);
    }
}

/// Walk every idea of a document, skipping the synthetic wrapper
pub fn traverse_document<'a, F>(document: &'a Document, order: Order, visit: &mut F)
where
    F: FnMut(&'a Idea, usize),
{
    if document.format_version() >= CURRENT_FORMAT_VERSION {
        traverse_children(document.root(), order, visit);
    } else {
        traverse(document.root(), order, visit);
    }
}

fn walk<'a, F>(idea: &'a Idea, level: usize, order: Order, visit: &mut F)
where
    F: FnMut(&'a Idea, usize),
{
    if order == Order::Pre {
        visit(idea, level);
    }
    for child in idea.sorted_sub_ideas() {
        walk(child, level + 1, order, visit);
    }
    if order == Order::Post {
        visit(idea, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdeaId;
    use serde_json::json;

    fn tree() -> Idea {
        serde_json::from_value(json!({
            "id": 1,
            "ideas": {
                "-5": { "id": 4 },
                "2": { "id": 2, "ideas": { "1": { "id": 3 } } },
                "-1": { "id": 5 }
            }
        }))
        .unwrap()
    }

    fn visited(order: Order, skip_self: bool) -> Vec<(IdeaId, usize)> {
        let idea = tree();
        let mut seen = Vec::new();
        let mut record = |idea: &Idea, level: usize| seen.push((idea.id.clone(), level));
        if skip_self {
            traverse_children(&idea, order, &mut record);
        } else {
            traverse(&idea, order, &mut record);
        }
        seen
    }

    #[test]
    fn test_pre_order_with_levels() {
        assert_eq!(
            visited(Order::Pre, false),
            vec![(1.into(), 1), (2.into(), 2), (3.into(), 3), (5.into(), 2), (4.into(), 2)]
        );
    }

    #[test]
    fn test_post_order_with_levels() {
        assert_eq!(
            visited(Order::Post, false),
            vec![(3.into(), 3), (2.into(), 2), (5.into(), 2), (4.into(), 2), (1.into(), 1)]
        );
    }

    #[test]
    fn test_children_start_at_level_one() {
        assert_eq!(
            visited(Order::Pre, true),
            vec![(2.into(), 1), (3.into(), 2), (5.into(), 1), (4.into(), 1)]
        );
    }

    #[test]
    fn test_document_skips_wrapper() {
        let document: Document = serde_json::from_value(json!({
            "id": "root",
            "formatVersion": 3,
            "ideas": { "1": { "id": 1, "ideas": { "1": { "id": 2 } } } }
        }))
        .unwrap();
        let mut seen = Vec::new();
        traverse_document(&document, Order::Pre, &mut |idea: &Idea, level| {
            seen.push((idea.id.clone(), level))
        });
        assert_eq!(seen, vec![(IdeaId::from(1), 1), (IdeaId::from(2), 2)]);
    }

    #[test]
    fn test_legacy_document_visits_top_node() {
        let document: Document = serde_json::from_value(json!({
            "id": 1,
            "ideas": { "1": { "id": 2 } }
        }))
        .unwrap();
        let mut seen = Vec::new();
        traverse_document(&document, Order::Post, &mut |idea: &Idea, level| {
            seen.push((idea.id.clone(), level))
        });
        assert_eq!(seen, vec![(IdeaId::from(2), 2), (IdeaId::from(1), 1)]);
    }
}
