//! # Schema migration
//!
//! Brings raw document JSON up to [`CURRENT_FORMAT_VERSION`]. Each step runs
//! only when the input is older than the version it produces, so upgrading
//! an up-to-date document changes nothing.
//!
//! - v2: a node's legacy `style` moves to `attr.style`, with
//!   `style.collapsed` lifted to `attr.collapsed`
//! - v3: the old top node becomes the single root idea (rank `1`) under a
//!   synthetic `"root"` wrapper; document-level attributes stay on the
//!   wrapper

use crate::document::CURRENT_FORMAT_VERSION;
use crate::id::ROOT_ID;
use crate::idea::is_truthy;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Attributes that describe the whole document rather than the top idea
const DOCUMENT_ATTRIBUTES: [&str; 4] = ["theme", "measurements-config", "storyboards", "progress-statuses"];

/// Upgrade `content` in place to the current format
pub fn upgrade(content: &mut Value) {
    if !content.is_object() {
        *content = Value::Object(Map::new());
    }
    let Some(document) = content.as_object_mut() else {
        return;
    };
    let version = document
        .get("formatVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if version < 2 {
        debug!(from = version, "Upgrading document styles");
        move_style_to_attr(document);
        document.insert("formatVersion".to_string(), json!(2));
    }
    if version < 3 {
        debug!(from = version, "Wrapping document in a root idea");
        wrap_in_root(document);
        document.insert("formatVersion".to_string(), json!(CURRENT_FORMAT_VERSION));
    }
}

fn move_style_to_attr(idea: &mut Map<String, Value>) {
    if let Some(mut style) = idea.remove("style").filter(is_truthy) {
        let collapsed = style.as_object_mut().and_then(|style| style.remove("collapsed"));
        let mut attr = Map::new();
        attr.insert("style".to_string(), style);
        if let Some(collapsed) = collapsed.filter(is_truthy) {
            attr.insert("collapsed".to_string(), collapsed);
        }
        idea.insert("attr".to_string(), Value::Object(attr));
    }
    if let Some(Value::Object(children)) = idea.get_mut("ideas") {
        for child in children.values_mut() {
            if let Value::Object(child) = child {
                move_style_to_attr(child);
            }
        }
    }
}

fn wrap_in_root(document: &mut Map<String, Value>) {
    let old_attr = match document.remove("attr") {
        Some(Value::Object(attr)) => attr,
        _ => Map::new(),
    };
    let (document_attr, idea_attr): (Map<String, Value>, Map<String, Value>) = old_attr
        .into_iter()
        .partition(|(name, _)| DOCUMENT_ATTRIBUTES.contains(&name.as_str()));

    let mut top = Map::new();
    top.insert("id".to_string(), document.remove("id").unwrap_or(Value::Null));
    top.insert("title".to_string(), document.remove("title").unwrap_or(Value::Null));
    top.insert("attr".to_string(), Value::Object(idea_attr));
    if let Some(ideas) = document.remove("ideas").filter(is_truthy) {
        top.insert("ideas".to_string(), ideas);
    }

    document.insert("id".to_string(), json!(ROOT_ID));
    document.insert("ideas".to_string(), json!({ "1": top }));
    document.insert("attr".to_string(), Value::Object(document_attr));
}
