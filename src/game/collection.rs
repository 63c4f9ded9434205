use serde::{Deserialize, Serialize};

use super::{GameError, GameResult, GameState, Roster};
use crate::prompts::{PromptError, PromptProvider};
use crate::similarity::{exact_matches, normalize_response};
use crate::types::Stage;

/// Current state of the vote to skip a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTally {
    pub count: usize,
    pub skip: bool,
}

impl GameState {
    /// Draw a new prompt and open response collection.
    ///
    /// Returns false when all rounds have been played or no prompt is left;
    /// the caller should end the game then.
    pub async fn begin_new_prompt(&mut self, provider: &dyn PromptProvider) -> bool {
        if self.round >= self.options.num_rounds {
            tracing::info!("All {} rounds played", self.options.num_rounds);
            return false;
        }

        let prompt = match provider.next_prompt(&self.used_prompts).await {
            Ok(prompt) => prompt,
            Err(PromptError::Exhausted) => {
                tracing::info!("Prompt deck exhausted after {} prompts", self.used_prompts.len());
                return false;
            }
            Err(e) => {
                tracing::error!("Failed to draw prompt: {}", e);
                return false;
            }
        };

        self.used_prompts.insert(prompt.id);
        self.prompt = prompt.text;
        self.stage = Stage::ResponseCollection;
        self.generation += 1;

        for player in &mut self.players {
            player.responses.clear();
            player.used.clear();
            player.vote_skip_prompt = false;
        }

        tracing::info!("New prompt for round {}: {}", self.round + 1, self.prompt);
        true
    }

    /// Accept a response to the current prompt; returns the normalized text
    pub fn submit_response(&mut self, id: &str, text: &str) -> GameResult<String> {
        if text.trim().is_empty() {
            return Err(GameError::EmptyResponse);
        }
        let response = normalize_response(text);

        if self.stage != Stage::ResponseCollection {
            return Err(GameError::BadRequest);
        }
        let i = self.player_index(id).ok_or(GameError::Spectator)?;

        let duplicate = self.players[i]
            .responses
            .iter()
            .any(|r| exact_matches(self.similarity.as_ref(), r, &response, &self.locale));
        if duplicate {
            return Err(GameError::DuplicateResponse);
        }

        self.players[i].responses.push(response.clone());
        Ok(response)
    }

    /// Record a player's vote to skip the current prompt.
    ///
    /// Does not transition; the caller begins a new prompt when `skip` is set.
    pub fn vote_skip(&mut self, id: &str, vote: bool, roster: &impl Roster) -> GameResult<SkipTally> {
        if self.stage != Stage::ResponseCollection || !self.options.prompt_skipping {
            return Err(GameError::BadRequest);
        }
        let i = self.player_index(id).ok_or(GameError::Spectator)?;
        self.players[i].vote_skip_prompt = vote;

        Ok(self.skip_tally(roster))
    }

    pub(super) fn skip_tally(&self, roster: &impl Roster) -> SkipTally {
        let majority = self.num_voters(roster, None).div_ceil(2);
        let count = self
            .players
            .iter()
            .filter(|p| roster.is_active(&p.id) && p.vote_skip_prompt)
            .count();

        SkipTally {
            count,
            skip: count >= majority,
        }
    }
}
