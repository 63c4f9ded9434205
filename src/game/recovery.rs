use super::{DisputeAction, GameEvent, GameState, Roster};
use crate::types::Stage;

impl GameState {
    /// Recover from a player dropping out mid-game.
    ///
    /// `roster` must already report the player as inactive. Any follow-on
    /// transition the dispatcher has to drive is published on the event
    /// channel and returned.
    pub fn disconnect(&mut self, id: &str, roster: &impl Roster) -> Option<GameEvent> {
        if self.player_index(id).is_none() {
            return None;
        }
        tracing::debug!("{} disconnected during {:?}", id, self.stage);

        let event = match self.stage {
            Stage::Lobby => None,
            Stage::ResponseCollection => (self.options.prompt_skipping && self.skip_tally(roster).skip)
                .then_some(GameEvent::PromptSkipped {
                    generation: self.generation,
                }),
            Stage::ResponseSelection => self.is_selector(id).then_some(GameEvent::SelectionUnsuccessful {
                generation: self.generation,
            }),
            Stage::SikeDispute => match self.tally_dispute(roster) {
                DisputeAction::NoOp => None,
                action => Some(GameEvent::DisputeComplete {
                    generation: self.generation,
                    action,
                }),
            },
            Stage::ResponseMatching => self.matching_complete_event(roster),
        };

        if let Some(event) = &event {
            self.emit(event.clone());
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::types::{GameOptions, SelectionType};

    fn with_responses(names: &[&str], options: GameOptions) -> GameState {
        let mut game = collecting(names, options);
        for name in names {
            give(&mut game, name, &["shared", name]);
        }
        game
    }

    #[test]
    fn test_disconnect_in_lobby_is_quiet() {
        let mut game = game(&["a", "b"], GameOptions::default());
        let mut roster = TestRoster::default();
        roster.deactivate("a");
        assert_eq!(game.disconnect("a", &roster), None);
    }

    #[test]
    fn test_disconnect_unknown_player() {
        let mut game = collecting(&["a"], GameOptions::default());
        let roster = TestRoster::default();
        assert_eq!(game.disconnect("ghost", &roster), None);
    }

    #[test]
    fn test_disconnect_tips_skip_vote() {
        let options = GameOptions {
            prompt_skipping: true,
            ..GameOptions::default()
        };
        let mut game = collecting(&["a", "b", "c", "d"], options);
        let mut roster = TestRoster::default();
        let mut events = game.subscribe();

        // 1 of 4 is not enough
        assert!(!game.vote_skip("a", true, &roster).unwrap().skip);
        roster.deactivate("b");
        // 1 of 3 is still not enough
        assert_eq!(game.disconnect("b", &roster), None);
        roster.deactivate("c");
        let event = game.disconnect("c", &roster);
        assert_eq!(
            event,
            Some(GameEvent::PromptSkipped {
                generation: game.generation()
            })
        );
        assert_eq!(events.try_recv().ok(), event);
    }

    #[test]
    fn test_disconnect_does_not_skip_when_disabled() {
        let mut game = collecting(&["a", "b"], GameOptions::default());
        let mut roster = TestRoster::default();
        roster.deactivate("a");
        roster.deactivate("b");
        assert_eq!(game.disconnect("b", &roster), None);
    }

    #[test]
    fn test_selector_disconnect_fails_selection() {
        let mut game = with_responses(&["a", "b", "c"], GameOptions::default());
        let mut roster = TestRoster::default();
        assert!(game.begin_selection(&roster));

        roster.deactivate("b");
        assert_eq!(game.disconnect("b", &roster), None);

        roster.deactivate("a");
        assert!(matches!(
            game.disconnect("a", &roster),
            Some(GameEvent::SelectionUnsuccessful { .. })
        ));
        assert!(game.next_selection(&roster));
        assert_eq!(game.selector_id().unwrap(), "c");
    }

    #[test]
    fn test_disconnect_settles_dispute() {
        let options = GameOptions {
            sike_dispute: true,
            ..GameOptions::default()
        };
        let mut game = with_responses(&["a", "b", "c", "d"], options);
        let mut roster = TestRoster::default();
        assert!(game.begin_selection(&roster));
        force_type(&mut game, SelectionType::Sike);
        game.select_response("a", "a", &roster).unwrap();

        // 3 voters need 2 approvals; with d gone, 1 of 2 is enough
        game.vote_dispute("b", true, &roster).unwrap();
        roster.deactivate("d");
        let event = game.disconnect("d", &roster);
        assert!(matches!(
            event,
            Some(GameEvent::DisputeComplete {
                action: DisputeAction::BeginMatching,
                ..
            })
        ));
        assert_eq!(game.stage(), Stage::ResponseMatching);
    }

    /// Five players, `a` claims a sike and `b` and `c` vote it down.
    /// Four voters need three down-votes, so nothing is decided yet.
    fn disputed(sike_retries: u32) -> (GameState, TestRoster) {
        let options = GameOptions {
            sike_dispute: true,
            sike_retries,
            ..GameOptions::default()
        };
        let mut game = with_responses(&["a", "b", "c", "d", "e"], options);
        let roster = TestRoster::default();
        assert!(game.begin_selection(&roster));
        force_type(&mut game, SelectionType::Sike);
        game.select_response("a", "a", &roster).unwrap();

        assert_eq!(game.vote_dispute("b", false, &roster), Ok(DisputeAction::NoOp));
        assert_eq!(game.vote_dispute("c", false, &roster), Ok(DisputeAction::NoOp));
        (game, roster)
    }

    #[test]
    fn test_disconnect_rejects_sike_with_retry() {
        let (mut game, mut roster) = disputed(1);

        // three voters left: two down-votes now carry it
        roster.deactivate("e");
        let event = game.disconnect("e", &roster);
        assert_eq!(
            event,
            Some(GameEvent::DisputeComplete {
                generation: game.generation(),
                action: DisputeAction::ReSelect,
            })
        );
        assert_eq!(game.stage(), Stage::ResponseSelection);
        assert_eq!(game.remaining_sike_retries(), 0);
        assert_eq!(game.selector_id().unwrap(), "a");
        assert!(game.players().iter().all(|p| p.sike_vote == crate::types::SikeVote::Unset));
    }

    #[test]
    fn test_disconnect_rejects_sike_without_retries() {
        let (mut game, mut roster) = disputed(0);

        roster.deactivate("d");
        assert!(matches!(
            game.disconnect("d", &roster),
            Some(GameEvent::DisputeComplete {
                action: DisputeAction::NextSelection,
                ..
            })
        ));
        assert_eq!(game.stage(), Stage::SikeDispute);
    }

    #[test]
    fn test_departed_selector_gets_no_retry() {
        let (mut game, mut roster) = disputed(1);

        // the selector does not vote, so their leaving alone decides nothing
        roster.deactivate("a");
        assert_eq!(game.disconnect("a", &roster), None);

        roster.deactivate("e");
        assert!(matches!(
            game.disconnect("e", &roster),
            Some(GameEvent::DisputeComplete {
                action: DisputeAction::NextSelection,
                ..
            })
        ));
        assert_eq!(game.remaining_sike_retries(), 1);
    }

    #[test]
    fn test_disconnect_completes_matching() {
        let mut game = collecting(&["a", "b", "c"], GameOptions::default());
        give(&mut game, "a", &["pumpkin"]);
        give(&mut game, "b", &["tractor"]);
        give(&mut game, "c", &["harvest"]);
        let mut roster = TestRoster::default();
        assert!(game.begin_selection(&roster));
        force_type(&mut game, SelectionType::Strike);
        game.select_response("a", "pumpkin", &roster).unwrap();
        let mut events = game.subscribe();

        game.confirm_match("b", None, &roster).unwrap();
        assert!(events.try_recv().is_err());

        roster.deactivate("c");
        let event = game.disconnect("c", &roster);
        assert!(matches!(
            event,
            Some(GameEvent::MatchingComplete {
                selector_active: true,
                ..
            })
        ));
        assert_eq!(events.try_recv().ok(), event);
    }
}
