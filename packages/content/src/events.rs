//! Notifications published by [`Content`](crate::Content).

use crate::command::CommandKind;
use mindmap_common::Event;
use serde_json::Value;
use std::rc::Rc;

pub const CHANGED: &str = "changed";
pub const RESOURCE_STORED: &str = "resourceStored";

#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    /// A command was committed, undone or redone.
    ///
    /// Undo reports empty `args`; a redo replay reports `Redo` with no args.
    Changed {
        method: CommandKind,
        args: Option<Vec<Value>>,
        session: Option<String>,
    },
    /// A resource body was stored under `key`
    ResourceStored {
        body: Rc<Value>,
        key: String,
        session: Option<String>,
    },
}

impl Event for ContentEvent {
    fn name(&self) -> &str {
        match self {
            ContentEvent::Changed { .. } => CHANGED,
            ContentEvent::ResourceStored { .. } => RESOURCE_STORED,
        }
    }
}
