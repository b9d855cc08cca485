//! Resource storage.
//!
//! Bodies are kept as shared [`Rc`]s: the stored value is the caller's value,
//! never a copy. Generated keys look like `<n>/<instance uuid>/<session>`,
//! where `n` counts up per session. Storing is not an undoable change, but
//! a batch that is rolled back takes its stored resources with it.

use crate::command::{Command, Outcome};
use crate::content::Content;
use crate::errors::MutationResult;
use crate::id::leading_integer;
use serde_json::Value;
use std::rc::Rc;

/// A resource write, kept so a rolled back batch can take it back
#[derive(Debug, Clone)]
pub(crate) struct StoredResource {
    pub key: String,
    pub body: Rc<Value>,
    /// Body previously stored under `key`
    pub replaced: Option<Rc<Value>>,
}

impl Content {
    /// Store a resource and return its key.
    ///
    /// Without an explicit key, a body equal to one already stored reuses
    /// that entry's key and publishes nothing.
    pub fn store_resource(&mut self, body: Rc<Value>, key: Option<&str>) -> Option<String> {
        let command = Command::StoreResource {
            body,
            key: key.map(str::to_string),
        };
        self.execute(command, None).resource_key()
    }

    pub(crate) fn process_store_resource(
        &mut self,
        session: &Option<String>,
        body: Rc<Value>,
        key: Option<String>,
    ) -> MutationResult<Outcome> {
        if key.is_none() {
            if let Some(existing) = self
                .resources()
                .iter()
                .find(|(_, stored)| Rc::ptr_eq(stored, &body) || **stored == body)
                .map(|(key, _)| key.clone())
            {
                return Ok(Outcome::Stored(existing));
            }
        }

        let key = match key {
            Some(key) => key,
            None => format!("{}{}", self.next_resource_number(), self.resource_postfix()),
        };
        let replaced = self
            .document_mut()
            .resources
            .insert(key.clone(), Rc::clone(&body));
        let stored = StoredResource {
            key: key.clone(),
            body,
            replaced,
        };
        self.announce_resource(stored, session);
        Ok(Outcome::Stored(key))
    }

    /// One past the highest number used by this instance's session
    fn next_resource_number(&self) -> u64 {
        let suffix = self.session_key().map(|session| format!("/{session}"));
        self.resources()
            .keys()
            .filter(|key| suffix.as_deref().map_or(true, |suffix| key.ends_with(suffix)))
            .map(|key| leading_integer(key))
            .max()
            .unwrap_or(0)
            + 1
    }
}
