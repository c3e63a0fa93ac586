//! Version precedence map
//!
//! Maps every configuration version seen by the flatten walk to the
//! version it replaced. Built once, read by the service walk, and saved in
//! checkpoints so an interrupted run can pick it up again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use svcmgmt_model::DomInstanceId;

/// Result of looking up a configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Version was not seen by the flatten walk
    Unknown,
    /// Version has no predecessor
    Root,
    /// Version replaced the given predecessor
    Preceded(DomInstanceId),
}

/// Configuration version id to predecessor id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionPrecedenceMap {
    entries: BTreeMap<DomInstanceId, Option<DomInstanceId>>,
}

impl VersionPrecedenceMap {
    /// Create an empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the predecessor of a version, returning the previous record
    #[inline]
    pub fn record(
        &mut self,
        version: DomInstanceId,
        predecessor: Option<DomInstanceId>,
    ) -> Option<Option<DomInstanceId>> {
        self.entries.insert(version, predecessor)
    }

    /// Look up a version
    #[must_use]
    pub fn precedence(&self, version: DomInstanceId) -> Precedence {
        match self.entries.get(&version) {
            None => Precedence::Unknown,
            Some(None) => Precedence::Root,
            Some(Some(predecessor)) => Precedence::Preceded(*predecessor),
        }
    }

    /// Whether the version was recorded
    #[inline]
    #[must_use]
    pub fn contains(&self, version: DomInstanceId) -> bool {
        self.entries.contains_key(&version)
    }

    /// Number of recorded versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (DomInstanceId, Option<DomInstanceId>)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(DomInstanceId, Option<DomInstanceId>)> for VersionPrecedenceMap {
    fn from_iter<T: IntoIterator<Item = (DomInstanceId, Option<DomInstanceId>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_unknown_and_root() {
        let a = DomInstanceId::from_u128(1);
        let b = DomInstanceId::from_u128(2);
        let map: VersionPrecedenceMap = [(a, None), (b, Some(a))].into_iter().collect();

        assert_eq!(map.precedence(a), Precedence::Root);
        assert_eq!(map.precedence(b), Precedence::Preceded(a));
        assert_eq!(map.precedence(DomInstanceId::from_u128(3)), Precedence::Unknown);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn record_returns_previous_entry() {
        let mut map = VersionPrecedenceMap::new();
        let a = DomInstanceId::from_u128(1);

        assert_eq!(map.record(a, None), None);
        assert_eq!(map.record(a, Some(a)), Some(None));
    }

    #[test]
    fn map_serializes_as_object() {
        let a = DomInstanceId::from_u128(1);
        let map: VersionPrecedenceMap = [(a, None)].into_iter().collect();

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({ (a.to_string()): null }));

        let back: VersionPrecedenceMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
