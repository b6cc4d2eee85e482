//! Keyspace: the typed key → value map behind every store implementation.
//!
//! A key holds exactly one kind of value: a string, an unordered set, or a
//! sorted set. Keys iterate in lexicographic order, which is the order
//! `keys()` returns matches in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glob::Pattern;

use super::error::{StoreError, StoreResult};
use super::ScoredMember;

/// A state-changing primitive. The unit of WAL logging and replay.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Set { key: String, value: String },
    Del { key: String },
    SetAdd { key: String, member: String },
    ZSetAdd { key: String, score: f64, member: String },
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(BTreeSet<String>),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Default)]
pub struct Keyspace {
    entries: BTreeMap<String, Value>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject a mutation that would hit a key holding another kind of value.
    /// Called before logging so the WAL never holds an op that fails on replay.
    pub fn check(&self, mutation: &Mutation) -> StoreResult<()> {
        let (key, ok) = match mutation {
            Mutation::Set { .. } | Mutation::Del { .. } => return Ok(()),
            Mutation::SetAdd { key, .. } => {
                (key, matches!(self.entries.get(key), None | Some(Value::Set(_))))
            }
            Mutation::ZSetAdd { key, .. } => {
                (key, matches!(self.entries.get(key), None | Some(Value::ZSet(_))))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(StoreError::WrongType { key: key.clone() })
        }
    }

    /// Apply a mutation. Returns whether something new was created
    /// (a new set/zset member, a removed key for `Del`; always true for `Set`).
    pub fn apply(&mut self, mutation: Mutation) -> StoreResult<bool> {
        self.check(&mutation)?;
        let changed = match mutation {
            Mutation::Set { key, value } => {
                self.entries.insert(key, Value::Str(value));
                true
            }
            Mutation::Del { key } => self.entries.remove(&key).is_some(),
            Mutation::SetAdd { key, member } => match self
                .entries
                .entry(key)
                .or_insert_with(|| Value::Set(BTreeSet::new()))
            {
                Value::Set(set) => set.insert(member),
                _ => false,
            },
            Mutation::ZSetAdd { key, score, member } => match self
                .entries
                .entry(key)
                .or_insert_with(|| Value::ZSet(HashMap::new()))
            {
                Value::ZSet(zset) => zset.insert(member, score).is_none(),
                _ => false,
            },
        };
        Ok(changed)
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    pub fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        match self.entries.get(key) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    pub fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    /// Rank range over a sorted set, Redis `ZRANGE key start stop [REV] WITHSCORES`.
    ///
    /// Ascending order is (score, member); `rev` flips both.
    pub fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        let zset = match self.entries.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::ZSet(zset)) => zset,
            Some(_) => return Err(wrong_type(key)),
        };

        let mut ranked: Vec<ScoredMember> = zset
            .iter()
            .map(|(member, score)| ScoredMember {
                member: member.clone(),
                score: *score,
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.member.cmp(&b.member))
        });
        if rev {
            ranked.reverse();
        }

        let Some(range) = rank_range(ranked.len(), start, stop) else {
            return Ok(Vec::new());
        };
        Ok(ranked.drain(range).collect())
    }

    /// All keys matching a glob pattern, in lexicographic order.
    pub fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let pattern =
            Pattern::new(pattern).map_err(|e| StoreError::InvalidPattern(e.to_string()))?;
        Ok(self
            .entries
            .keys()
            .filter(|k| pattern.matches(k))
            .cloned()
            .collect())
    }

    /// Minimal mutation sequence that rebuilds the current state.
    pub fn snapshot(&self) -> Vec<Mutation> {
        let mut out = Vec::new();
        for (key, value) in &self.entries {
            match value {
                Value::Str(s) => out.push(Mutation::Set {
                    key: key.clone(),
                    value: s.clone(),
                }),
                Value::Set(set) => out.extend(set.iter().map(|m| Mutation::SetAdd {
                    key: key.clone(),
                    member: m.clone(),
                })),
                Value::ZSet(zset) => {
                    let mut members: Vec<_> = zset.iter().collect();
                    members.sort_by(|a, b| a.0.cmp(b.0));
                    out.extend(members.into_iter().map(|(m, score)| Mutation::ZSetAdd {
                        key: key.clone(),
                        score: *score,
                        member: m.clone(),
                    }));
                }
            }
        }
        out
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

/// Normalize Redis-style inclusive rank bounds (negative = from the end).
fn rank_range(len: usize, start: i64, stop: i64) -> Option<std::ops::Range<usize>> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some(start as usize..stop as usize + 1)
}
