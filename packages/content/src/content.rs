//! # Content
//!
//! The editing engine wrapped around a [`Document`]. It owns the tree, the
//! per-session undo histories and the event bus, and is the only way to
//! change a document:
//!
//! ```text
//! public method ─► execute(Command, session) ─► processor
//!                                                 │ validate, then mutate
//!                                                 ▼
//!                              log_change(command, undo action, session)
//!                                 │ batch open?      │ otherwise
//!                                 ▼                  ▼
//!                            buffer entry      push undo entry,
//!                                              clear redo, publish "changed"
//! ```
//!
//! Processors check every precondition before touching the tree, so a
//! rejected command leaves no trace: no mutation, no history, no event.
//!
//! Sessions only separate history and id namespaces. All sessions edit the
//! same tree.

use crate::command::{Command, CommandKind, Outcome};
use crate::config::Configuration;
use crate::document::Document;
use crate::errors::{ContentError, MutationError, MutationResult};
use crate::events::ContentEvent;
use crate::rank;
use crate::resources::StoredResource;
use crate::undo_stack::{HistoryEntry, SessionHistory, UndoAction};
use crate::upgrade::upgrade;
use crate::{Idea, IdeaId};
use mindmap_common::{EventBus, ListenerId, ListenerResult};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Deref;
use tracing::{debug, info, trace};
use uuid::Uuid;

/// A document together with its command, history and event machinery
#[derive(Debug)]
pub struct Content {
    document: Document,

    /// Session used when a caller does not name one
    session_key: Option<String>,

    configuration: Configuration,

    /// Last numeric id handed out; `None` when it must be recomputed
    cached_id: Option<u64>,

    histories: HashMap<Option<String>, SessionHistory>,

    redo_in_progress: bool,

    /// `/<uuid>/<session>` appended to generated resource keys
    resource_postfix: String,

    events: EventBus<ContentEvent>,
}

impl Content {
    /// Build an engine from raw document JSON of any format version.
    ///
    /// The input is upgraded, then ideas without ids get fresh ones, empty
    /// attribute maps are dropped and empty groups below the root ideas are
    /// pruned.
    pub fn new(mut json: Value, session_key: Option<&str>) -> Result<Self, ContentError> {
        upgrade(&mut json);
        let mut document: Document = serde_json::from_value(json)?;
        let session_key = session_key
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        let mut last_id = document.max_id();
        let session = session_key.as_deref();
        init_idea(
            &mut document.root,
            &mut || {
                last_id += 1;
                IdeaId::generated(last_id, session)
            },
            false,
        );

        info!(
            session = ?session_key,
            root_ideas = document.root.ideas.len(),
            "Content initialised"
        );

        let resource_postfix = format!(
            "/{}/{}",
            Uuid::new_v4(),
            session_key.as_deref().unwrap_or("")
        );

        Ok(Self {
            document,
            session_key,
            configuration: Configuration::default(),
            cached_id: None,
            histories: HashMap::new(),
            redo_in_progress: false,
            resource_postfix,
            events: EventBus::new(),
        })
    }

    /// Parse document text and build an engine from it
    pub fn from_json_str(text: &str, session_key: Option<&str>) -> Result<Self, ContentError> {
        Self::new(serde_json::from_str(text)?, session_key)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn set_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
    }

    /// Subscribe to `"changed"` and/or `"resourceStored"`
    pub fn add_event_listener<F>(&mut self, events: &str, listener: F) -> ListenerId
    where
        F: FnMut(&ContentEvent) -> ListenerResult + 'static,
    {
        self.events.add_event_listener(events, listener)
    }

    pub fn add_event_listener_with_priority<F>(
        &mut self,
        events: &str,
        priority: i32,
        listener: F,
    ) -> ListenerId
    where
        F: FnMut(&ContentEvent) -> ListenerResult + 'static,
    {
        self.events
            .add_event_listener_with_priority(events, priority, listener)
    }

    pub fn remove_event_listener(&mut self, events: &str, id: ListenerId) -> bool {
        self.events.remove_event_listener(events, id)
    }

    /// Run a command on behalf of `session` (the default session if `None`)
    pub fn execute(&mut self, command: Command, session: Option<&str>) -> Outcome {
        let session = self.resolve_session(session);
        self.dispatch(command, &session)
    }

    /// Run a command given by name and positional arguments.
    ///
    /// Unknown names and malformed arguments fail like any other rejected
    /// command.
    pub fn exec_command(&mut self, name: &str, args: &[Value], session: Option<&str>) -> Outcome {
        match Command::parse(name, args) {
            Ok(command) => self.execute(command, session),
            Err(err) => {
                debug!(command = name, reason = %err, "Command rejected");
                Outcome::Failed
            }
        }
    }

    pub(crate) fn dispatch(&mut self, command: Command, session: &Option<String>) -> Outcome {
        let kind = command.kind();
        trace!(command = %kind, session = ?session, "Executing command");

        let result = match command {
            Command::UpdateTitle { id, title } => self.process_update_title(session, id, title, false),
            Command::InitialiseTitle { id, title } => self.process_update_title(session, id, title, true),
            Command::AddSubIdea { parent, title, id } => {
                self.process_add_sub_idea(session, parent, title, id)
            }
            Command::RemoveSubIdea { id } => self.process_remove_sub_idea(session, id),
            Command::ChangeParent { id, parent } => self.process_change_parent(session, id, parent),
            Command::UpdateAttr { id, name, value } => {
                self.process_update_attr(session, id, name, value)
            }
            Command::Paste { parent, json, id } => self.process_paste(session, parent, json, id),
            Command::InsertIntermediate { id, title, new_id } => {
                self.process_insert_intermediate(session, id, title, new_id)
            }
            Command::PositionBefore { id, before, parent } => {
                self.process_position_before(session, id, before, parent)
            }
            Command::Flip { id } => self.process_flip(session, id),
            Command::AddLink { from, to } => self.process_add_link(session, from, to),
            Command::RemoveLink { from, to } => self.process_remove_link(session, from, to),
            Command::UpdateLinkAttr {
                from,
                to,
                name,
                value,
            } => self.process_update_link_attr(session, from, to, name, value),
            Command::StoreResource { body, key } => self.process_store_resource(session, body, key),
            Command::Undo => self.process_undo(session),
            Command::Redo => self.process_redo(session),
            Command::Batch(commands) => self.process_batch(session, commands),
        };

        result.unwrap_or_else(|err| {
            debug!(command = %kind, session = ?session, reason = %err, "Command rejected");
            Outcome::Failed
        })
    }

    fn resolve_session(&self, session: Option<&str>) -> Option<String> {
        session
            .map(str::to_string)
            .or_else(|| self.session_key.clone())
    }

    // ---- history -------------------------------------------------------

    /// History of a session, if it has recorded anything yet
    pub fn history(&self, session: Option<&str>) -> Option<&SessionHistory> {
        self.histories.get(&self.resolve_session(session))
    }

    /// Whether the default session has something to undo
    pub fn can_undo(&self) -> bool {
        self.history(None).is_some_and(SessionHistory::can_undo)
    }

    /// Whether the default session has something to redo
    pub fn can_redo(&self) -> bool {
        self.history(None).is_some_and(SessionHistory::can_redo)
    }

    /// Undo the default session's last step
    pub fn undo(&mut self) -> bool {
        self.execute(Command::Undo, None).is_success()
    }

    /// Redo the default session's last undone step
    pub fn redo(&mut self) -> bool {
        self.execute(Command::Redo, None).is_success()
    }

    pub fn is_batch_active(&self, session: Option<&str>) -> bool {
        self.history(session)
            .is_some_and(SessionHistory::is_batch_active)
    }

    /// Start buffering a session's commands. An open batch is closed first.
    pub fn start_batch(&mut self, session: Option<&str>) {
        let session = self.resolve_session(session);
        self.close_batch(&session);
        debug!(session = ?session, "Batch started");
        self.histories.entry(session).or_default().begin_batch();
    }

    /// Commit the open batch as one undo step
    pub fn end_batch(&mut self, session: Option<&str>) {
        let session = self.resolve_session(session);
        self.close_batch(&session);
    }

    /// Forget the open batch without committing it.
    ///
    /// Changes made inside the batch stay in the tree; use
    /// [`batch`](Self::batch) to have them reverted on failure.
    pub fn discard_batch(&mut self, session: Option<&str>) {
        let session = self.resolve_session(session);
        let Some(history) = self.histories.get_mut(&session) else {
            return;
        };
        let Some(entries) = history.take_batch() else {
            return;
        };
        let stored = history.take_batch_resources();
        debug!(session = ?session, steps = entries.len(), "Batch discarded");
        for resource in stored {
            self.notify_resource(resource, &session);
        }
    }

    /// Run `op` as a single undo step of the default session.
    ///
    /// A batch is opened only if none is active. If `op` fails, every step
    /// it made is reverted, nothing is recorded and the error is returned.
    pub fn batch<T, E>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        if self.is_batch_active(None) {
            return op(self);
        }
        self.start_batch(None);
        match op(self) {
            Ok(value) => {
                self.end_batch(None);
                Ok(value)
            }
            Err(err) => {
                let session = self.session_key.clone();
                self.rollback_batch(&session);
                Err(err)
            }
        }
    }

    /// [`batch`](Self::batch) for operations that cannot fail
    pub(crate) fn batched<T>(&mut self, op: impl FnOnce(&mut Self) -> T) -> T {
        if self.is_batch_active(None) {
            return op(self);
        }
        self.start_batch(None);
        let value = op(self);
        self.end_batch(None);
        value
    }

    fn close_batch(&mut self, session: &Option<String>) {
        let Some(history) = self.histories.get_mut(session) else {
            return;
        };
        let Some(mut entries) = history.take_batch() else {
            return;
        };
        let stored = history.take_batch_resources();
        debug!(session = ?session, steps = entries.len(), "Batch ended");
        for resource in stored {
            self.notify_resource(resource, session);
        }
        let entry = match entries.len() {
            0 => return,
            1 => match entries.pop() {
                Some(entry) => entry,
                None => return,
            },
            _ => HistoryEntry::combine(entries),
        };
        self.log_change(entry.command, entry.undo, session);
    }

    fn rollback_batch(&mut self, session: &Option<String>) {
        let Some(history) = self.histories.get_mut(session) else {
            return;
        };
        let entries = history.take_batch().unwrap_or_default();
        let stored = history.take_batch_resources();
        for entry in entries.iter().rev() {
            entry.undo.apply(&mut self.document);
        }
        for resource in stored.into_iter().rev() {
            match resource.replaced {
                Some(body) => self.document.resources.insert(resource.key, body),
                None => self.document.resources.remove(&resource.key),
            };
        }
        self.cached_id = None;
        debug!(session = ?session, steps = entries.len(), "Batch rolled back");
    }

    /// Record an applied command, or buffer it while a batch is open
    pub(crate) fn log_change(&mut self, command: Command, undo: UndoAction, session: &Option<String>) {
        let history = self.histories.entry(session.clone()).or_default();
        let Some(entry) = history.buffer(HistoryEntry::new(command, undo)) else {
            return;
        };
        let (kind, args) = (entry.command.kind(), entry.command.to_args());
        history.push_undo(entry);

        if self.redo_in_progress {
            self.notify_change(CommandKind::Redo, None, session);
        } else {
            history.clear_redo();
            self.notify_change(kind, Some(args), session);
        }
    }

    /// Record an applied command as part of the session's previous step
    pub(crate) fn append_change(
        &mut self,
        command: Command,
        undo: UndoAction,
        session: &Option<String>,
    ) {
        let history = self.histories.entry(session.clone()).or_default();
        let previous = if history.is_batch_active() {
            None
        } else {
            history.pop_undo()
        };
        let Some(previous) = previous else {
            return self.log_change(command, undo, session);
        };

        let (kind, args) = (command.kind(), command.to_args());
        history.push_undo(previous.absorb(HistoryEntry::new(command, undo)));

        if self.redo_in_progress {
            self.notify_change(CommandKind::Redo, None, session);
        } else {
            history.clear_redo();
            self.notify_change(kind, Some(args), session);
        }
    }

    pub(crate) fn notify(&mut self, event: ContentEvent) {
        self.events.dispatch_event(&event);
    }

    /// Publish a stored resource, or hold it back while the session's batch
    /// is open
    pub(crate) fn announce_resource(&mut self, stored: StoredResource, session: &Option<String>) {
        let stored = match self.histories.get_mut(session) {
            Some(history) => history.buffer_resource(stored),
            None => Some(stored),
        };
        if let Some(stored) = stored {
            self.notify_resource(stored, session);
        }
    }

    fn notify_resource(&mut self, stored: StoredResource, session: &Option<String>) {
        self.notify(ContentEvent::ResourceStored {
            body: stored.body,
            key: stored.key,
            session: session.clone(),
        });
    }

    fn notify_change(&mut self, method: CommandKind, args: Option<Vec<Value>>, session: &Option<String>) {
        self.notify(ContentEvent::Changed {
            method,
            args,
            session: session.clone(),
        });
    }

    fn process_undo(&mut self, session: &Option<String>) -> MutationResult<Outcome> {
        self.close_batch(session);
        let entry = self
            .histories
            .get_mut(session)
            .and_then(SessionHistory::pop_undo)
            .ok_or(MutationError::NothingToUndo)?;

        debug!(session = ?session, command = %entry.command.kind(), "Undo");
        entry.undo.apply(&mut self.document);
        self.histories
            .entry(session.clone())
            .or_default()
            .push_redo(entry);
        self.notify_change(CommandKind::Undo, Some(Vec::new()), session);
        Ok(Outcome::Done)
    }

    fn process_redo(&mut self, session: &Option<String>) -> MutationResult<Outcome> {
        self.close_batch(session);
        let entry = self
            .histories
            .get_mut(session)
            .and_then(SessionHistory::pop_redo)
            .ok_or(MutationError::NothingToRedo)?;

        debug!(session = ?session, command = %entry.command.kind(), "Redo");
        let was_redoing = std::mem::replace(&mut self.redo_in_progress, true);
        self.dispatch(entry.command, session);
        self.redo_in_progress = was_redoing;
        Ok(Outcome::Done)
    }

    fn process_batch(&mut self, session: &Option<String>, commands: Vec<Command>) -> MutationResult<Outcome> {
        let session_name = session.as_deref();
        self.start_batch(session_name);
        let mut applied = 0;
        for command in commands {
            if self.dispatch(command, session).is_success() {
                applied += 1;
            }
        }
        self.end_batch(session_name);
        if applied == 0 {
            return Err(MutationError::Unchanged);
        }
        Ok(Outcome::Done)
    }

    // ---- ids -----------------------------------------------------------

    /// Next free id, suffixed with `session` or the default session
    pub(crate) fn next_id(&mut self, session: Option<&str>) -> IdeaId {
        let last = self.last_id() + 1;
        self.cached_id = Some(last);
        IdeaId::generated(last, session.or(self.session_key.as_deref()))
    }

    /// The most recently allocated id number
    pub(crate) fn last_id(&self) -> u64 {
        self.cached_id.unwrap_or_else(|| self.document.max_id())
    }

    /// Forget the cached id after an explicit id entered the tree
    pub(crate) fn invalidate_id_cache(&mut self) {
        self.cached_id = None;
    }

    pub(crate) fn set_id_cache(&mut self, last: u64) {
        self.cached_id = Some(last);
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub(crate) fn resource_postfix(&self) -> &str {
        &self.resource_postfix
    }
}

impl Deref for Content {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

/// Prepare a freshly loaded or pasted idea: assign missing ids in sibling
/// order, drop empty attribute maps and, when `prune` is set, remove empty
/// group children.
pub(crate) fn init_idea(idea: &mut Idea, next_id: &mut dyn FnMut() -> IdeaId, prune: bool) {
    if idea.id.is_unassigned() {
        idea.id = next_id();
    }
    if idea.attr.as_ref().is_some_and(|attr| attr.is_empty()) {
        idea.attr = None;
    }
    if prune {
        idea.ideas.retain(|_, child| !child.is_empty_group());
    }
    for rank in rank::sorted_ranks(&idea.ideas) {
        if let Some(child) = idea.ideas.get_mut(&rank) {
            init_idea(child, next_id, true);
        }
    }
}
