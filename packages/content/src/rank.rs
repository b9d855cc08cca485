//! # Sibling ranks
//!
//! Children are stored under floating point ranks. The sign splits siblings
//! into two groups that are ordered independently by absolute value; the
//! non-negative group comes first. New siblings get fresh ranks without
//! renumbering anybody else:
//!
//! - appending takes the largest rank on a side and steps one further out
//! - inserting between two siblings takes the midpoint of their ranks
//!
//! `0` is never assigned. It only seeds the search when a side is empty.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key of a child inside its parent's `ideas` map
#[derive(Debug, Clone, Copy)]
pub struct Rank(f64);

impl Rank {
    pub fn new(value: f64) -> Self {
        // -0.0 and 0.0 must be the same key
        if value == 0.0 {
            Rank(0.0)
        } else {
            Rank(value)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn abs(self) -> f64 {
        self.0.abs()
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    /// `-1.0` for negative ranks, `1.0` otherwise
    pub fn sign(self) -> f64 {
        sign(self.0)
    }
}

/// Never returns 0, so every rank falls in exactly one group
pub fn sign(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Rank {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Rank {
    fn from(value: f64) -> Self {
        Rank::new(value)
    }
}

impl From<i32> for Rank {
    fn from(value: i32) -> Self {
        Rank::new(f64::from(value))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct RankVisitor;

impl<'de> Visitor<'de> for RankVisitor {
    type Value = Rank;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a numeric rank")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Rank, E> {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Rank::new)
            .ok_or_else(|| E::custom(format!("invalid rank: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rank, E> {
        Ok(Rank::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rank, E> {
        Ok(Rank::new(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rank, E> {
        Ok(Rank::new(v as f64))
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RankVisitor)
    }
}

/// Ranks in sibling order: non-negative ascending, then negative by
/// ascending absolute value
pub fn sorted_ranks<V>(children: &BTreeMap<Rank, V>) -> Vec<Rank> {
    let positive = children.keys().filter(|rank| !rank.is_negative());
    let negative = children.keys().rev().filter(|rank| rank.is_negative());
    positive.chain(negative).copied().collect()
}

/// Children in sibling order
pub fn sorted_children<V>(children: &BTreeMap<Rank, V>) -> Vec<&V> {
    sorted_ranks(children)
        .iter()
        .filter_map(|rank| children.get(rank))
        .collect()
}

/// The outermost rank on the `sign` side, or 0 when that side is empty
pub fn max_key<V>(children: &BTreeMap<Rank, V>, sign: f64) -> f64 {
    children
        .keys()
        .map(|rank| rank.value())
        .fold(0.0, |best, key| if key * sign > best * sign { key } else { best })
}

/// A rank one step beyond the outermost sibling on the `sign` side
pub fn next_rank<V>(children: &BTreeMap<Rank, V>, sign: f64) -> Rank {
    Rank::new(max_key(children, sign) + sign)
}

/// The rank halfway between two siblings
pub fn midpoint(before: f64, after: f64) -> f64 {
    before + (after - before) / 2.0
}

/// Side for a new child of a root idea: negative while that side has fewer
/// children, positive otherwise.
pub fn balanced_sign<V>(children: &BTreeMap<Rank, V>) -> f64 {
    let negative = children.keys().filter(|rank| rank.is_negative()).count();
    let positive = children.len() - negative;
    if negative < positive {
        -1.0
    } else {
        1.0
    }
}

/// Ranks on the same side as `rank`
pub fn same_side_ranks<V>(children: &BTreeMap<Rank, V>, rank: Rank) -> Vec<Rank> {
    children
        .keys()
        .filter(|key| key.value() * rank.value() >= 0.0)
        .copied()
        .collect()
}
