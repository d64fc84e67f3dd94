use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type ConnectionId = String;
pub type DisplayName = String;
pub type GameId = String;

/// Distinct vote value -> names holding that vote, in join order
pub type TeamGrouping = BTreeMap<Vote, Vec<DisplayName>>;

/// A planning-poker card.
///
/// Ordered the way the deck is laid out: the numeric cards ascending, then the
/// two sentinels. On the wire every card is a string (`"5"`, `"coffee"`, `"?"`),
/// but bare JSON numbers are accepted for the numeric cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vote {
    Zero,
    One,
    Two,
    Three,
    Five,
    Eight,
    Thirteen,
    TwentyOne,
    Coffee,
    Unknown,
}

impl Vote {
    pub const DECK: [Vote; 10] = [
        Vote::Zero,
        Vote::One,
        Vote::Two,
        Vote::Three,
        Vote::Five,
        Vote::Eight,
        Vote::Thirteen,
        Vote::TwentyOne,
        Vote::Coffee,
        Vote::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vote::Zero => "0",
            Vote::One => "1",
            Vote::Two => "2",
            Vote::Three => "3",
            Vote::Five => "5",
            Vote::Eight => "8",
            Vote::Thirteen => "13",
            Vote::TwentyOne => "21",
            Vote::Coffee => "coffee",
            Vote::Unknown => "?",
        }
    }

    /// Numeric value of the card, `None` for the sentinels
    pub fn points(&self) -> Option<u32> {
        match self {
            Vote::Zero => Some(0),
            Vote::One => Some(1),
            Vote::Two => Some(2),
            Vote::Three => Some(3),
            Vote::Five => Some(5),
            Vote::Eight => Some(8),
            Vote::Thirteen => Some(13),
            Vote::TwentyOne => Some(21),
            Vote::Coffee | Vote::Unknown => None,
        }
    }

    fn from_points(points: u64) -> Option<Vote> {
        Vote::DECK
            .into_iter()
            .find(|v| v.points().map(u64::from) == Some(points))
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "coffee" | "☕" => Ok(Vote::Coffee),
            "?" => Ok(Vote::Unknown),
            other => other
                .parse::<u64>()
                .ok()
                .and_then(Vote::from_points)
                .ok_or_else(|| format!("'{}' is not a card in the deck", s)),
        }
    }
}

impl Serialize for Vote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct VoteVisitor;

impl<'de> Visitor<'de> for VoteVisitor {
    type Value = Vote;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a planning-poker card (0, 1, 2, 3, 5, 8, 13, 21, coffee or ?)")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Vote, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Vote, E> {
        Vote::from_points(v).ok_or_else(|| E::custom(format!("{} is not a card in the deck", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Vote, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(format!("{} is not a card in the deck", v)))
            .and_then(|v| self.visit_u64(v))
    }
}

impl<'de> Deserialize<'de> for Vote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(VoteVisitor)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameKind {
    PaddleDuel,
    LapRace,
    ChaseEvasion,
}

impl fmt::Display for MiniGameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MiniGameKind::PaddleDuel => "paddle_duel",
            MiniGameKind::LapRace => "lap_race",
            MiniGameKind::ChaseEvasion => "chase_evasion",
        };
        f.write_str(name)
    }
}

/// Control a player can hold during a mini-game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameAction {
    Up,
    Down,
    Left,
    Right,
    /// Chase-evasion only: drop an obstacle at the escapee's position
    DropObstacle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_wire_format() {
        assert_eq!(serde_json::to_string(&Vote::Thirteen).unwrap(), "\"13\"");
        assert_eq!(serde_json::to_string(&Vote::Coffee).unwrap(), "\"coffee\"");
        assert_eq!(serde_json::to_string(&Vote::Unknown).unwrap(), "\"?\"");
    }

    #[test]
    fn test_vote_accepts_numbers_and_strings() {
        let v: Vote = serde_json::from_str("8").unwrap();
        assert_eq!(v, Vote::Eight);
        let v: Vote = serde_json::from_str("\"21\"").unwrap();
        assert_eq!(v, Vote::TwentyOne);
        let v: Vote = serde_json::from_str("\"☕\"").unwrap();
        assert_eq!(v, Vote::Coffee);
    }

    #[test]
    fn test_vote_rejects_cards_outside_deck() {
        assert!(serde_json::from_str::<Vote>("4").is_err());
        assert!(serde_json::from_str::<Vote>("-1").is_err());
        assert!(serde_json::from_str::<Vote>("\"forty\"").is_err());
    }

    #[test]
    fn test_grouping_serializes_with_card_keys() {
        let mut teams = TeamGrouping::new();
        teams.insert(Vote::Three, vec!["Alice".to_string()]);
        teams.insert(Vote::Unknown, vec!["Bob".to_string()]);
        let json = serde_json::to_value(&teams).unwrap();
        assert_eq!(json["3"][0], "Alice");
        assert_eq!(json["?"][0], "Bob");
    }

    #[test]
    fn test_deck_order() {
        assert!(Vote::Two < Vote::Three);
        assert!(Vote::TwentyOne < Vote::Coffee);
        assert!(Vote::Coffee < Vote::Unknown);
    }
}
