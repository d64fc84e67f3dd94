//! Per-round record of votes and resolved values across a session.
//!
//! The ledger is append-only per round index. The one merge rule lives in
//! [`RoundRecord::absorb`]: an incoming resolved value wins when present, an
//! incoming non-empty vote map wins, and a known value is never downgraded to
//! unknown.

use crate::types::{DisplayName, Vote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    #[serde(default)]
    pub votes: BTreeMap<DisplayName, Vote>,
    #[serde(default)]
    pub resolved_value: Option<Vote>,
}

impl RoundRecord {
    pub fn new(votes: BTreeMap<DisplayName, Vote>, resolved_value: Option<Vote>) -> Self {
        Self {
            votes,
            resolved_value,
        }
    }

    /// Merge `incoming` into this record without losing anything already known
    pub fn absorb(&mut self, incoming: RoundRecord) {
        if incoming.resolved_value.is_some() {
            self.resolved_value = incoming.resolved_value;
        }
        if !incoming.votes.is_empty() {
            self.votes = incoming.votes;
        }
    }
}

/// Round index (1-based) -> record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    rounds: BTreeMap<u32, RoundRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, round: u32, record: RoundRecord) {
        self.rounds.entry(round).or_default().absorb(record);
    }

    pub fn get(&self, round: u32) -> Option<&RoundRecord> {
        self.rounds.get(&round)
    }

    pub fn resolved_value(&self, round: u32) -> Option<Vote> {
        self.rounds.get(&round).and_then(|r| r.resolved_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(entries: &[(&str, Vote)]) -> BTreeMap<DisplayName, Vote> {
        entries
            .iter()
            .map(|(name, vote)| (name.to_string(), *vote))
            .collect()
    }

    #[test]
    fn test_absent_value_never_erases() {
        let mut ledger = Ledger::new();
        ledger.absorb(
            1,
            RoundRecord::new(votes(&[("Alice", Vote::Five)]), Some(Vote::Five)),
        );
        ledger.absorb(1, RoundRecord::default());

        let record = ledger.get(1).unwrap();
        assert_eq!(record.resolved_value, Some(Vote::Five));
        assert_eq!(record.votes.len(), 1);
    }

    #[test]
    fn test_present_value_wins() {
        let mut ledger = Ledger::new();
        ledger.absorb(2, RoundRecord::new(BTreeMap::new(), Some(Vote::Three)));
        ledger.absorb(
            2,
            RoundRecord::new(votes(&[("Bob", Vote::Eight)]), Some(Vote::Eight)),
        );

        assert_eq!(ledger.resolved_value(2), Some(Vote::Eight));
        assert_eq!(ledger.get(2).unwrap().votes["Bob"], Vote::Eight);
    }

    #[test]
    fn test_rounds_are_kept_apart() {
        let mut ledger = Ledger::new();
        ledger.absorb(1, RoundRecord::new(BTreeMap::new(), Some(Vote::One)));
        ledger.absorb(2, RoundRecord::new(BTreeMap::new(), None));

        assert_eq!(ledger.resolved_value(1), Some(Vote::One));
        assert!(ledger.get(2).is_some());
        assert_eq!(ledger.resolved_value(2), None);
        assert!(ledger.get(3).is_none());
    }

    #[test]
    fn test_ledger_serializes_as_round_map() {
        let mut ledger = Ledger::new();
        ledger.absorb(
            1,
            RoundRecord::new(votes(&[("Alice", Vote::Two)]), Some(Vote::Two)),
        );
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["1"]["resolved_value"], "2");
        assert_eq!(json["1"]["votes"]["Alice"], "2");
    }
}
