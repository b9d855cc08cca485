//! # MindMap Content
//!
//! Document model and command engine for mind maps.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ upgrade: raw JSON of any format → v3        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Content: document + command engine          │
//! │  - Navigation over the idea tree            │
//! │  - Commands with validation                 │
//! │  - Per-session undo/redo and batches        │
//! │  - Links, attributes and resources          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ EventBus: "changed" / "resourceStored"      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Ranks, not indices**: children are keyed by fractional ranks, so an
//!    insertion never renumbers siblings
//! 2. **Rejected means untouched**: a failed command changes nothing and
//!    announces nothing
//! 3. **Commands are data**: every change can be replayed by name and
//!    positional arguments in another session
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mindmap_content::Content;
//! use serde_json::json;
//!
//! let mut content = Content::new(json!({ "id": 1, "title": "Plan" }), Some("alice"))?;
//!
//! let child = content.add_sub_idea(1, Some("Research"), None).unwrap();
//! content.update_attr(&child, "style", json!({ "background": "#ff0" }));
//!
//! content.add_event_listener("changed", |event| {
//!     println!("{event:?}");
//!     Ok(Propagation::Continue)
//! });
//!
//! content.undo();
//! ```

mod attributes;
mod command;
mod config;
mod content;
mod document;
mod errors;
mod events;
mod id;
mod idea;
mod mutations;
mod positioning;
mod resources;
mod undo_stack;

pub mod rank;
pub mod traverse;
pub mod upgrade;

pub use command::{Command, CommandKind, Outcome};
pub use config::Configuration;
pub use content::Content;
pub use document::{Document, CURRENT_FORMAT_VERSION};
pub use errors::{ContentError, MutationError, MutationResult};
pub use events::{ContentEvent, CHANGED, RESOURCE_STORED};
pub use id::{IdeaId, ROOT_ID};
pub use idea::{is_removal_value, is_truthy, AttrMap, Idea, IdeaSummary, Link};
pub use mutations::IdeaOptions;
pub use positioning::MoveOptions;
pub use rank::Rank;
pub use traverse::Order;
pub use undo_stack::{AttrTarget, HistoryEntry, SessionHistory, UndoAction};

// Re-export the event bus types listeners are written against
pub use mindmap_common::{ListenerId, ListenerResult, Propagation};
