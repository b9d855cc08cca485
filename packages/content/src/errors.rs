use crate::{IdeaId, Rank};
use thiserror::Error;

/// Failure to build a [`Content`](crate::Content) from raw input
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Why a command was rejected.
///
/// A rejected command leaves the document untouched, records no history and
/// fires no event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments { command: &'static str, reason: String },

    #[error("Idea not found: {0}")]
    IdeaNotFound(IdeaId),

    #[error("Parent not found: {0}")]
    ParentNotFound(IdeaId),

    #[error("Idea id already in use: {0}")]
    DuplicateId(IdeaId),

    #[error("Moving {0} would create a cycle")]
    CycleDetected(IdeaId),

    #[error("Cannot remove the last root idea")]
    LastRootIdea,

    #[error("Cannot wrap the document root")]
    DocumentRoot,

    #[error("Nothing would change")]
    Unchanged,

    #[error("Not a sibling: {0}")]
    NotASibling(IdeaId),

    #[error("Only root ideas can be flipped: {0}")]
    NotFlippable(IdeaId),

    #[error("Rank already taken: {0}")]
    RankOccupied(Rank),

    #[error("Nothing to paste")]
    NothingToPaste,

    #[error("Invalid link: {from} -> {to}")]
    InvalidLink { from: IdeaId, to: IdeaId },

    #[error("Link already exists: {from} -> {to}")]
    DuplicateLink { from: IdeaId, to: IdeaId },

    #[error("Link not found: {from} -> {to}")]
    LinkNotFound { from: IdeaId, to: IdeaId },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type MutationResult<T> = Result<T, MutationError>;
