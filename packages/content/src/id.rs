//! # Idea identifiers
//!
//! Ids are integers, or `"<integer>.<session>"` when generated on behalf of
//! a session. Numeric ids compare equal to their decimal text, so `12` and
//! `"12"` name the same idea. The empty id marks an idea that has not been
//! initialised yet.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// The reserved id of the document wrapper
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdeaId(String);

impl IdeaId {
    pub fn new(id: impl Into<String>) -> Self {
        IdeaId(id.into())
    }

    /// The id of the document wrapper
    pub fn root() -> Self {
        IdeaId(ROOT_ID.to_string())
    }

    /// A freshly allocated id, namespaced by session when there is one
    pub fn generated(number: u64, session: Option<&str>) -> Self {
        match session {
            Some(session) if !session.is_empty() => IdeaId(format!("{number}.{session}")),
            _ => IdeaId(number.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    /// True for ids made only of decimal digits
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// The leading integer part, or 0 when the id does not start with digits
    pub fn numeric(&self) -> u64 {
        leading_integer(&self.0)
    }

    /// The session suffix of a generated id
    pub fn session(&self) -> Option<&str> {
        match self.0.find('.') {
            Some(dot) if dot > 0 => Some(&self.0[dot + 1..]),
            _ => None,
        }
    }

    /// JSON form used in command arguments
    pub fn to_value(&self) -> Value {
        match self.0.parse::<u64>() {
            Ok(number) if self.is_numeric() => Value::from(number),
            _ => Value::String(self.0.clone()),
        }
    }

    /// Read an id from a command argument; `null` and `""` mean "no id"
    pub fn from_value(value: &Value) -> Option<IdeaId> {
        match value {
            Value::Number(number) => Some(IdeaId(number_text(number))),
            Value::String(text) if !text.is_empty() => Some(IdeaId(text.clone())),
            _ => None,
        }
    }
}

/// The integer a string starts with, ignoring everything from the first
/// non-digit on.
pub(crate) fn leading_integer(text: &str) -> u64 {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn number_text(number: &serde_json::Number) -> String {
    if let Some(n) = number.as_u64() {
        return n.to_string();
    }
    if let Some(n) = number.as_i64() {
        return n.to_string();
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => number.to_string(),
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdeaId {
    fn from(id: &str) -> Self {
        IdeaId(id.to_string())
    }
}

impl From<String> for IdeaId {
    fn from(id: String) -> Self {
        IdeaId(id)
    }
}

impl From<&String> for IdeaId {
    fn from(id: &String) -> Self {
        IdeaId(id.clone())
    }
}

impl From<&IdeaId> for IdeaId {
    fn from(id: &IdeaId) -> Self {
        id.clone()
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for IdeaId {
                fn from(id: $ty) -> Self {
                    IdeaId(id.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl PartialEq<&str> for IdeaId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for IdeaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(number) if self.is_numeric() => serializer.serialize_u64(number),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

struct IdeaIdVisitor;

impl<'de> Visitor<'de> for IdeaIdVisitor {
    type Value = IdeaId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or string idea id")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<IdeaId, E> {
        Ok(IdeaId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<IdeaId, E> {
        Ok(IdeaId(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<IdeaId, E> {
        if v.fract() == 0.0 && v.abs() < 1e15 {
            Ok(IdeaId(format!("{}", v as i64)))
        } else {
            Ok(IdeaId(v.to_string()))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<IdeaId, E> {
        Ok(IdeaId(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<IdeaId, E> {
        Ok(IdeaId(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<IdeaId, E> {
        Ok(IdeaId::default())
    }
}

impl<'de> Deserialize<'de> for IdeaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdeaIdVisitor)
    }
}
