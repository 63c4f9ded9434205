use serde::{Deserialize, Serialize};

use super::GameState;
use crate::types::{PlayerId, PlayerRoundState, ScoreEntry, SelectionType, Stage};

/// One judge's progress on the selected response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchStatus {
    pub id: PlayerId,
    pub matched: Option<String>,
    pub complete: bool,
}

/// Everything a player (re)joining a running game needs to pick up where
/// the room is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSnapshot {
    pub stage: Stage,
    /// Numbered like `begin_prompt` announces it
    pub round: u32,
    pub num_rounds: u32,
    pub prompt: String,
    pub selector: Option<PlayerId>,
    pub selection_type: Option<SelectionType>,
    pub selected_response: Option<String>,
    pub remaining_sike_retries: u32,
    /// Empty unless responses are being matched
    pub matching: Vec<MatchStatus>,
    pub scores: Vec<ScoreEntry>,
    /// The requesting player's own round state; `None` for spectators
    pub you: Option<PlayerRoundState>,
}

impl GameState {
    /// Judges of the selected response, everyone but the selector
    pub fn match_statuses(&self) -> Vec<MatchStatus> {
        self.players
            .iter()
            .filter(|p| !self.is_selector(&p.id))
            .map(|p| MatchStatus {
                id: p.id.clone(),
                matched: p.matched.clone(),
                complete: p.matching_complete,
            })
            .collect()
    }

    /// Current round as seen by `id`
    pub fn snapshot(&self, id: &str) -> RoundSnapshot {
        let selecting = matches!(
            self.stage,
            Stage::ResponseSelection | Stage::SikeDispute | Stage::ResponseMatching
        );
        let round = if self.stage == Stage::ResponseCollection {
            self.round + 1
        } else {
            self.round
        };

        RoundSnapshot {
            stage: self.stage,
            round,
            num_rounds: self.options.num_rounds,
            prompt: self.prompt.clone(),
            selector: self.selector_id().filter(|_| selecting).cloned(),
            selection_type: selecting.then_some(self.selection_type),
            selected_response: self.selected_response().filter(|_| selecting).map(str::to_string),
            remaining_sike_retries: self.remaining_sike_retries,
            matching: if self.stage == Stage::ResponseMatching {
                self.match_statuses()
            } else {
                Vec::new()
            },
            scores: self.scores(),
            you: self.player(id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::types::GameOptions;

    #[test]
    fn test_snapshot_during_collection() {
        let mut game = collecting(&["a", "b"], GameOptions::default());
        game.submit_response("a", "river").unwrap();

        let snap = game.snapshot("a");
        assert_eq!(snap.stage, Stage::ResponseCollection);
        assert_eq!(snap.round, 1);
        assert_eq!(snap.prompt, "Test prompt");
        assert_eq!(snap.selector, None);
        assert_eq!(snap.selection_type, None);
        assert!(snap.matching.is_empty());
        assert_eq!(snap.you.unwrap().responses, vec!["river"]);
    }

    #[test]
    fn test_snapshot_during_matching() {
        let mut game = collecting(&["a", "b", "c"], GameOptions::default());
        give(&mut game, "a", &["river"]);
        give(&mut game, "b", &["lake"]);
        give(&mut game, "c", &["ocean", "stream"]);
        let roster = TestRoster::default();
        assert!(game.begin_selection(&roster));
        force_type(&mut game, SelectionType::Strike);
        game.select_response("a", "river", &roster).unwrap();

        let snap = game.snapshot("c");
        assert_eq!(snap.stage, Stage::ResponseMatching);
        assert_eq!(snap.round, 1);
        assert_eq!(snap.selector.as_deref(), Some("a"));
        assert_eq!(snap.selection_type, Some(SelectionType::Strike));
        assert_eq!(snap.selected_response.as_deref(), Some("river"));
        let judges: Vec<_> = snap.matching.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(judges, vec!["b", "c"]);
        assert!(snap.matching.iter().all(|m| !m.complete));

        let you = snap.you.unwrap();
        assert_eq!(you.responses, vec!["ocean", "stream"]);
        assert!(you.used.is_empty());
    }

    #[test]
    fn test_snapshot_for_spectator() {
        let game = collecting(&["a"], GameOptions::default());
        let snap = game.snapshot("watcher");
        assert!(snap.you.is_none());
        assert_eq!(snap.scores.len(), 1);
    }
}
