//! # Commands
//!
//! Every change to a document is a [`Command`]. Commands can be built
//! directly or decoded from a name plus positional JSON arguments, which is
//! how remote sessions replay each other's edits:
//!
//! ```rust,ignore
//! content.exec_command("updateTitle", &[json!(1), json!("new title")], Some("remote"));
//! ```
//!
//! [`Command::to_args`] produces the same positional form, so the arguments
//! announced with a `changed` event can be fed straight back into
//! [`exec_command`](crate::Content::exec_command).

use crate::errors::{MutationError, MutationResult};
use crate::IdeaId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

/// Command names as they appear in events and replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    UpdateTitle,
    InitialiseTitle,
    AddSubIdea,
    RemoveSubIdea,
    ChangeParent,
    UpdateAttr,
    Paste,
    InsertIntermediate,
    PositionBefore,
    Flip,
    AddLink,
    RemoveLink,
    UpdateLinkAttr,
    StoreResource,
    Undo,
    Redo,
    Batch,
}

impl CommandKind {
    pub const ALL: [CommandKind; 17] = [
        CommandKind::UpdateTitle,
        CommandKind::InitialiseTitle,
        CommandKind::AddSubIdea,
        CommandKind::RemoveSubIdea,
        CommandKind::ChangeParent,
        CommandKind::UpdateAttr,
        CommandKind::Paste,
        CommandKind::InsertIntermediate,
        CommandKind::PositionBefore,
        CommandKind::Flip,
        CommandKind::AddLink,
        CommandKind::RemoveLink,
        CommandKind::UpdateLinkAttr,
        CommandKind::StoreResource,
        CommandKind::Undo,
        CommandKind::Redo,
        CommandKind::Batch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::UpdateTitle => "updateTitle",
            CommandKind::InitialiseTitle => "initialiseTitle",
            CommandKind::AddSubIdea => "addSubIdea",
            CommandKind::RemoveSubIdea => "removeSubIdea",
            CommandKind::ChangeParent => "changeParent",
            CommandKind::UpdateAttr => "updateAttr",
            CommandKind::Paste => "paste",
            CommandKind::InsertIntermediate => "insertIntermediate",
            CommandKind::PositionBefore => "positionBefore",
            CommandKind::Flip => "flip",
            CommandKind::AddLink => "addLink",
            CommandKind::RemoveLink => "removeLink",
            CommandKind::UpdateLinkAttr => "updateLinkAttr",
            CommandKind::StoreResource => "storeResource",
            CommandKind::Undo => "undo",
            CommandKind::Redo => "redo",
            CommandKind::Batch => "batch",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = MutationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| MutationError::UnknownCommand(name.to_string()))
    }
}

/// A single edit, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UpdateTitle {
        id: IdeaId,
        title: String,
    },
    /// Like `UpdateTitle`, but folds into the previous undo step
    InitialiseTitle {
        id: IdeaId,
        title: String,
    },
    AddSubIdea {
        parent: IdeaId,
        title: Option<String>,
        id: Option<IdeaId>,
    },
    RemoveSubIdea {
        id: IdeaId,
    },
    ChangeParent {
        id: IdeaId,
        parent: IdeaId,
    },
    UpdateAttr {
        id: IdeaId,
        name: String,
        value: Value,
    },
    Paste {
        parent: IdeaId,
        json: Value,
        id: Option<IdeaId>,
    },
    InsertIntermediate {
        id: IdeaId,
        title: Option<String>,
        new_id: Option<IdeaId>,
    },
    /// `parent` is a lookup hint and is not part of the replay arguments
    PositionBefore {
        id: IdeaId,
        before: Option<IdeaId>,
        parent: Option<IdeaId>,
    },
    Flip {
        id: IdeaId,
    },
    AddLink {
        from: IdeaId,
        to: IdeaId,
    },
    RemoveLink {
        from: IdeaId,
        to: IdeaId,
    },
    UpdateLinkAttr {
        from: IdeaId,
        to: IdeaId,
        name: String,
        value: Value,
    },
    StoreResource {
        body: Rc<Value>,
        key: Option<String>,
    },
    Undo,
    Redo,
    Batch(Vec<Command>),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::UpdateTitle { .. } => CommandKind::UpdateTitle,
            Command::InitialiseTitle { .. } => CommandKind::InitialiseTitle,
            Command::AddSubIdea { .. } => CommandKind::AddSubIdea,
            Command::RemoveSubIdea { .. } => CommandKind::RemoveSubIdea,
            Command::ChangeParent { .. } => CommandKind::ChangeParent,
            Command::UpdateAttr { .. } => CommandKind::UpdateAttr,
            Command::Paste { .. } => CommandKind::Paste,
            Command::InsertIntermediate { .. } => CommandKind::InsertIntermediate,
            Command::PositionBefore { .. } => CommandKind::PositionBefore,
            Command::Flip { .. } => CommandKind::Flip,
            Command::AddLink { .. } => CommandKind::AddLink,
            Command::RemoveLink { .. } => CommandKind::RemoveLink,
            Command::UpdateLinkAttr { .. } => CommandKind::UpdateLinkAttr,
            Command::StoreResource { .. } => CommandKind::StoreResource,
            Command::Undo => CommandKind::Undo,
            Command::Redo => CommandKind::Redo,
            Command::Batch(_) => CommandKind::Batch,
        }
    }

    /// Positional arguments for events and replay
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Command::UpdateTitle { id, title } | Command::InitialiseTitle { id, title } => {
                vec![id.to_value(), Value::from(title.as_str())]
            }
            Command::AddSubIdea { parent, title, id } => {
                vec![parent.to_value(), optional_text(title), optional_id(id)]
            }
            Command::RemoveSubIdea { id } | Command::Flip { id } => vec![id.to_value()],
            Command::ChangeParent { id, parent } => vec![id.to_value(), parent.to_value()],
            Command::UpdateAttr { id, name, value } => {
                vec![id.to_value(), Value::from(name.as_str()), value.clone()]
            }
            Command::Paste { parent, json, id } => {
                vec![parent.to_value(), json.clone(), optional_id(id)]
            }
            Command::InsertIntermediate { id, title, new_id } => {
                vec![id.to_value(), optional_text(title), optional_id(new_id)]
            }
            Command::PositionBefore { id, before, .. } => vec![id.to_value(), optional_id(before)],
            Command::AddLink { from, to } | Command::RemoveLink { from, to } => {
                vec![from.to_value(), to.to_value()]
            }
            Command::UpdateLinkAttr { from, to, name, value } => vec![
                from.to_value(),
                to.to_value(),
                Value::from(name.as_str()),
                value.clone(),
            ],
            Command::StoreResource { body, key } => {
                vec![body.as_ref().clone(), optional_text(key)]
            }
            Command::Undo | Command::Redo => Vec::new(),
            Command::Batch(commands) => commands
                .iter()
                .map(|command| {
                    let mut step = vec![Value::from(command.kind().as_str())];
                    step.extend(command.to_args());
                    Value::Array(step)
                })
                .collect(),
        }
    }

    /// Decode a command from its name and positional arguments
    pub fn parse(name: &str, args: &[Value]) -> MutationResult<Command> {
        Command::from_args(name.parse()?, args)
    }

    /// Decode a command of a known kind. Missing trailing arguments read as
    /// `null`; surplus arguments are ignored.
    pub fn from_args(kind: CommandKind, args: &[Value]) -> MutationResult<Command> {
        let args = Args { kind, args };
        Ok(match kind {
            CommandKind::UpdateTitle => Command::UpdateTitle {
                id: args.id(0)?,
                title: args.text(1).unwrap_or_default(),
            },
            CommandKind::InitialiseTitle => Command::InitialiseTitle {
                id: args.id(0)?,
                title: args.text(1).unwrap_or_default(),
            },
            CommandKind::AddSubIdea => Command::AddSubIdea {
                parent: args.id(0)?,
                title: args.text(1),
                id: args.optional_id(2),
            },
            CommandKind::RemoveSubIdea => Command::RemoveSubIdea { id: args.id(0)? },
            CommandKind::ChangeParent => Command::ChangeParent {
                id: args.id(0)?,
                parent: args.id(1)?,
            },
            CommandKind::UpdateAttr => Command::UpdateAttr {
                id: args.id(0)?,
                name: args.name(1)?,
                value: args.value(2),
            },
            CommandKind::Paste => Command::Paste {
                parent: args.id(0)?,
                json: args.value(1),
                id: args.optional_id(2),
            },
            CommandKind::InsertIntermediate => Command::InsertIntermediate {
                id: args.id(0)?,
                title: args.text(1),
                new_id: args.optional_id(2),
            },
            CommandKind::PositionBefore => Command::PositionBefore {
                id: args.id(0)?,
                before: args.optional_id(1),
                parent: None,
            },
            CommandKind::Flip => Command::Flip { id: args.id(0)? },
            CommandKind::AddLink => Command::AddLink {
                from: args.id(0)?,
                to: args.id(1)?,
            },
            CommandKind::RemoveLink => Command::RemoveLink {
                from: args.id(0)?,
                to: args.id(1)?,
            },
            CommandKind::UpdateLinkAttr => Command::UpdateLinkAttr {
                from: args.id(0)?,
                to: args.id(1)?,
                name: args.name(2)?,
                value: args.value(3),
            },
            CommandKind::StoreResource => Command::StoreResource {
                body: Rc::new(args.value(0)),
                key: args.text(1),
            },
            CommandKind::Undo => Command::Undo,
            CommandKind::Redo => Command::Redo,
            // a step that does not parse is skipped, the others still run
            CommandKind::Batch => Command::Batch(
                args.args
                    .iter()
                    .filter_map(|step| {
                        let parsed = match step.as_array().map(Vec::as_slice) {
                            Some([Value::String(name), rest @ ..]) => Command::parse(name, rest),
                            _ => Err(args.invalid("batch steps must be [name, ...args]")),
                        };
                        match parsed {
                            Ok(command) => Some(command),
                            Err(err) => {
                                debug!(reason = %err, "Batch step skipped");
                                None
                            }
                        }
                    })
                    .collect(),
            ),
        })
    }
}

struct Args<'a> {
    kind: CommandKind,
    args: &'a [Value],
}

impl Args<'_> {
    fn value(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Null)
    }

    fn optional_id(&self, index: usize) -> Option<IdeaId> {
        self.args.get(index).and_then(IdeaId::from_value)
    }

    fn id(&self, index: usize) -> MutationResult<IdeaId> {
        self.optional_id(index)
            .ok_or_else(|| self.invalid(format!("argument {index} must be an idea id")))
    }

    fn text(&self, index: usize) -> Option<String> {
        match self.args.get(index)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    fn name(&self, index: usize) -> MutationResult<String> {
        self.text(index)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| self.invalid(format!("argument {index} must be a name")))
    }

    fn invalid(&self, reason: impl Into<String>) -> MutationError {
        MutationError::InvalidArguments {
            command: self.kind.as_str(),
            reason: reason.into(),
        }
    }
}

fn optional_id(id: &Option<IdeaId>) -> Value {
    id.as_ref().map(IdeaId::to_value).unwrap_or(Value::Null)
}

fn optional_text(text: &Option<String>) -> Value {
    text.as_deref().map(Value::from).unwrap_or(Value::Null)
}

/// Result of running a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rejected; nothing changed
    Failed,
    /// Applied
    Done,
    /// Applied, creating the idea with this id
    Created(IdeaId),
    /// A resource is available under this key
    Stored(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed)
    }

    pub fn idea_id(self) -> Option<IdeaId> {
        match self {
            Outcome::Created(id) => Some(id),
            _ => None,
        }
    }

    pub fn resource_key(self) -> Option<String> {
        match self {
            Outcome::Stored(key) => Some(key),
            _ => None,
        }
    }
}
