use super::{GameError, GameResult, GameState, Roster};
use crate::types::{SelectionType, Stage};

impl GameState {
    /// Let the selector pick strike or sike after drawing a choice
    pub fn choose_action_type(&mut self, id: &str, is_strike: bool) -> GameResult<SelectionType> {
        if !self.selection_type_choice || self.stage != Stage::ResponseSelection || !self.is_selector(id) {
            return Err(GameError::BadRequest);
        }

        self.selection_type = if is_strike {
            SelectionType::Strike
        } else {
            SelectionType::Sike
        };
        tracing::info!("{} chose {:?}", id, self.selection_type);
        Ok(self.selection_type)
    }

    /// Commit the selector's response.
    ///
    /// Enters the sike dispute when enabled for a sike, otherwise auto-matches
    /// and enters response matching. Returns the new stage.
    pub fn select_response(&mut self, id: &str, response: &str, roster: &impl Roster) -> GameResult<Stage> {
        if self.selection_type == SelectionType::Choice
            || self.stage != Stage::ResponseSelection
            || !self.is_selector(id)
        {
            return Err(GameError::BadRequest);
        }

        let selector = &mut self.players[self.selector];
        if !selector.is_unused(response) {
            return Err(GameError::BadRequest);
        }
        selector.selected = Some(response.to_string());
        selector.used.push(response.to_string());

        if self.options.sike_dispute && self.selection_type == SelectionType::Sike {
            self.stage = Stage::SikeDispute;
            self.generation += 1;
            tracing::info!("{} claims sike with '{}', dispute open", id, response);
        } else {
            tracing::info!("{} selected '{}' ({:?})", id, response, self.selection_type);
            self.begin_matching(roster);
        }

        Ok(self.stage)
    }
}
