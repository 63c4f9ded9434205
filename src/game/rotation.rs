use rand::Rng;

use super::{GameState, Roster};
use crate::types::{SelectionType, SikeVote, Stage};

impl GameState {
    /// Close response collection and pick the first selector of the round.
    ///
    /// Returns false when nobody active has a response left to select.
    pub fn begin_selection(&mut self, roster: &impl Roster) -> bool {
        self.stage = Stage::ResponseSelection;
        // counting here keeps skipped prompts out of the round count
        self.round += 1;
        self.generation += 1;
        self.reset_selection();

        let n = self.players.len();
        for offset in 0..n {
            let j = (self.initial_selector + offset) % n;
            if self.is_eligible_selector(j, roster) {
                self.initial_selector = j;
                self.selector = j;
                self.randomize_selection_type();
                tracing::info!(
                    "Round {}: {} selects first ({:?})",
                    self.round,
                    self.players[j].id,
                    self.selection_type
                );
                return true;
            }
        }

        tracing::info!("Round {}: no player has a response to select", self.round);
        false
    }

    /// Hand selection to the next eligible player after the current selector.
    ///
    /// Rotation stops before wrapping back to the round's first selector; in
    /// that case the next round starts one seat further on and this returns false.
    pub fn next_selection(&mut self, roster: &impl Roster) -> bool {
        self.stage = Stage::ResponseSelection;
        self.generation += 1;
        self.reset_selection();

        let n = self.players.len();
        if n == 0 {
            return false;
        }

        for offset in 1..=n {
            let j = (self.selector + offset) % n;
            if j == self.initial_selector {
                break;
            }
            if self.is_eligible_selector(j, roster) {
                self.selector = j;
                self.randomize_selection_type();
                tracing::info!(
                    "Round {}: {} selects next ({:?})",
                    self.round,
                    self.players[j].id,
                    self.selection_type
                );
                return true;
            }
        }

        self.initial_selector = (self.initial_selector + 1) % n;
        tracing::info!("Round {}: selector rotation exhausted", self.round);
        false
    }

    fn is_eligible_selector(&self, i: usize, roster: &impl Roster) -> bool {
        let player = &self.players[i];
        roster.is_active(&player.id) && player.has_unused()
    }

    /// Strike 3/6, sike 2/6, selector's choice 1/6
    fn randomize_selection_type(&mut self) {
        let r = self.rng.random_range(0..6);
        self.selection_type_choice = false;
        self.selection_type = match r {
            0..=2 => SelectionType::Strike,
            3..=4 => SelectionType::Sike,
            _ => {
                self.selection_type_choice = true;
                SelectionType::Choice
            }
        };
    }

    pub(super) fn reset_selection(&mut self) {
        self.remaining_sike_retries = self.options.sike_retries;
        for player in &mut self.players {
            player.selected = None;
            player.sike_vote = SikeVote::Unset;
            player.matched = None;
            player.matching_complete = false;
        }
    }
}
