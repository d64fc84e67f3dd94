//! Tie-break policy: which mini-game (if any) settles a revealed round.

use crate::types::{DisplayName, MiniGameKind, TeamGrouping, Vote};
use std::collections::BTreeMap;

/// Largest number of distinct votes a mini-game can seat
pub const MAX_TEAMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing to decide automatically; the round waits for a forced value or next round
    Pending,
    /// Every participant voted the same card
    Consensus(Vote),
    /// A single card among the voters, but some participants abstained
    Direct(Vote),
    MiniGame(MiniGameKind),
}

/// Group voters by card. Names keep the order of `participants` (join order),
/// so the first name of each group is deterministic.
pub fn team_grouping<'a>(
    participants: impl IntoIterator<Item = &'a DisplayName>,
    votes: &BTreeMap<DisplayName, Vote>,
) -> TeamGrouping {
    let mut teams = TeamGrouping::new();
    for name in participants {
        if let Some(vote) = votes.get(name) {
            teams.entry(*vote).or_default().push(name.clone());
        }
    }
    teams
}

/// Map a grouping to the tie-break mode. Pure: same input, same answer.
pub fn select_mode(teams: &TeamGrouping, participant_count: usize) -> Mode {
    let voters: usize = teams.values().map(Vec::len).sum();

    match teams.len() {
        0 => Mode::Pending,
        1 => match teams.keys().next() {
            Some(vote) if voters >= 2 && voters >= participant_count => Mode::Consensus(*vote),
            Some(vote) if voters >= 2 => Mode::Direct(*vote),
            _ => Mode::Pending,
        },
        2 => Mode::MiniGame(MiniGameKind::PaddleDuel),
        3 => Mode::MiniGame(MiniGameKind::LapRace),
        n if n <= MAX_TEAMS => Mode::MiniGame(MiniGameKind::ChaseEvasion),
        _ => Mode::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouping(entries: &[(&str, Vote)]) -> (Vec<DisplayName>, TeamGrouping) {
        let names: Vec<DisplayName> = entries.iter().map(|(n, _)| n.to_string()).collect();
        let votes: BTreeMap<DisplayName, Vote> = entries
            .iter()
            .map(|(n, v)| (n.to_string(), *v))
            .collect();
        let teams = team_grouping(&names, &votes);
        (names, teams)
    }

    #[test]
    fn test_grouping_keeps_join_order() {
        let (_, teams) = grouping(&[
            ("Zed", Vote::Three),
            ("Alice", Vote::Eight),
            ("Bob", Vote::Three),
        ]);
        assert_eq!(teams[&Vote::Three], vec!["Zed".to_string(), "Bob".to_string()]);
        assert_eq!(teams[&Vote::Eight], vec!["Alice".to_string()]);
    }

    #[test]
    fn test_grouping_skips_participants_without_votes() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        let mut votes = BTreeMap::new();
        votes.insert("Alice".to_string(), Vote::One);
        let teams = team_grouping(&names, &votes);
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[&Vote::One], vec!["Alice".to_string()]);
    }

    #[test]
    fn test_consensus() {
        let (names, teams) = grouping(&[("Alice", Vote::Five), ("Bob", Vote::Five)]);
        assert_eq!(select_mode(&teams, names.len()), Mode::Consensus(Vote::Five));
    }

    #[test]
    fn test_single_value_with_abstainers_is_direct() {
        let (_, teams) = grouping(&[("Alice", Vote::Five), ("Bob", Vote::Five)]);
        assert_eq!(select_mode(&teams, 3), Mode::Direct(Vote::Five));
    }

    #[test]
    fn test_single_voter_stays_pending() {
        let (_, teams) = grouping(&[("Alice", Vote::Five)]);
        assert_eq!(select_mode(&teams, 1), Mode::Pending);
        assert_eq!(select_mode(&teams, 4), Mode::Pending);
    }

    #[test]
    fn test_no_votes_is_pending() {
        assert_eq!(select_mode(&TeamGrouping::new(), 3), Mode::Pending);
    }

    #[test]
    fn test_cardinality_to_game() {
        let (_, two) = grouping(&[("A", Vote::Three), ("B", Vote::Eight)]);
        assert_eq!(select_mode(&two, 2), Mode::MiniGame(MiniGameKind::PaddleDuel));

        let (_, three) = grouping(&[("A", Vote::One), ("B", Vote::Two), ("C", Vote::Three)]);
        assert_eq!(select_mode(&three, 3), Mode::MiniGame(MiniGameKind::LapRace));

        let deck = Vote::DECK;
        for n in 4..=MAX_TEAMS {
            let entries: Vec<(String, Vote)> =
                (0..n).map(|i| (format!("P{}", i), deck[i])).collect();
            let refs: Vec<(&str, Vote)> = entries.iter().map(|(s, v)| (s.as_str(), *v)).collect();
            let (_, teams) = grouping(&refs);
            assert_eq!(
                select_mode(&teams, n),
                Mode::MiniGame(MiniGameKind::ChaseEvasion),
                "{} teams",
                n
            );
        }
    }

    #[test]
    fn test_more_than_eight_teams_is_pending() {
        let entries: Vec<(String, Vote)> = Vote::DECK
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("P{}", i), *v))
            .collect();
        let refs: Vec<(&str, Vote)> = entries.iter().map(|(s, v)| (s.as_str(), *v)).collect();
        let (_, teams) = grouping(&refs);
        assert_eq!(teams.len(), 10);
        assert_eq!(select_mode(&teams, 10), Mode::Pending);
    }

    #[test]
    fn test_select_mode_ignores_insertion_order() {
        let (_, a) = grouping(&[("A", Vote::Three), ("B", Vote::Eight), ("C", Vote::Three)]);
        let (_, b) = grouping(&[("C", Vote::Three), ("B", Vote::Eight), ("A", Vote::Three)]);
        assert_eq!(select_mode(&a, 3), select_mode(&b, 3));
    }
}
