use serde::{Deserialize, Serialize};

use super::{GameError, GameEvent, GameResult, GameState, Roster};
use crate::similarity::{match_chance, AUTO_MATCH_THRESHOLD};
use crate::types::{SelectionType, Stage};

/// Outcome of a single player's judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchJudgement {
    pub selector_scored: bool,
    pub matching_complete: bool,
}

impl GameState {
    /// Enter response matching: auto-match obvious answers, then check
    /// whether anyone is left to judge
    pub(super) fn begin_matching(&mut self, roster: &impl Roster) {
        self.auto_match();
        self.stage = Stage::ResponseMatching;
        self.generation += 1;
        self.notify_if_matching_complete(roster);
    }

    /// Consume every other player's best candidate that is close enough to
    /// the selected response. Players without unused responses are done.
    /// Each auto-match scores for a strike like a manual match would.
    fn auto_match(&mut self) {
        let Some(response) = self.selected_response().map(str::to_string) else {
            return;
        };
        let selector = self.selector;
        let similarity = self.similarity.clone();
        let locale = self.locale.clone();
        let mut auto_matched = 0;

        for (i, player) in self.players.iter_mut().enumerate() {
            if i == selector {
                continue;
            }
            if !player.has_unused() {
                player.matching_complete = true;
                continue;
            }

            let best = player
                .unused_responses()
                .map(|r| (r, match_chance(similarity.as_ref(), r, &response, &locale)))
                .fold(None::<(&String, f64)>, |best, (r, chance)| match best {
                    Some((_, c)) if c >= chance => best,
                    _ => Some((r, chance)),
                });

            if let Some((candidate, chance)) = best {
                if chance > AUTO_MATCH_THRESHOLD {
                    let candidate = candidate.clone();
                    tracing::debug!(
                        "Auto-matched {}'s '{}' to '{}' ({:.3})",
                        player.id,
                        candidate,
                        response,
                        chance
                    );
                    player.used.push(candidate.clone());
                    player.matched = Some(candidate);
                    player.matching_complete = true;
                    auto_matched += 1;
                }
            }
        }

        // an auto-match is a confirmed strike
        if self.selection_type == SelectionType::Strike {
            self.players[selector].points += auto_matched;
        }
    }

    /// Judge the selected response for one player.
    ///
    /// `None` (or an empty string) means the player has no match, which scores
    /// for a sike. Otherwise the response must be one of the player's own
    /// unused responses, which scores for a strike.
    pub fn confirm_match(
        &mut self,
        id: &str,
        matched: Option<&str>,
        roster: &impl Roster,
    ) -> GameResult<MatchJudgement> {
        let i = self.player_index(id).ok_or(GameError::Spectator)?;
        if self.players[i].matching_complete {
            return Err(GameError::DuplicateRequest);
        }
        if self.stage != Stage::ResponseMatching || self.is_selector(id) {
            return Err(GameError::BadRequest);
        }

        let scoring_type = match matched.filter(|m| !m.is_empty()) {
            None => {
                self.players[i].matching_complete = true;
                tracing::info!("{} has no match", id);
                SelectionType::Sike
            }
            Some(response) => {
                let matcher = &mut self.players[i];
                if !matcher.is_unused(response) {
                    return Err(GameError::BadRequest);
                }
                matcher.used.push(response.to_string());
                matcher.matched = Some(response.to_string());
                matcher.matching_complete = true;
                tracing::info!("{} matched with '{}'", id, response);
                SelectionType::Strike
            }
        };

        let selector_scored = self.selection_type == scoring_type;
        if selector_scored {
            self.players[self.selector].points += 1;
        }

        Ok(MatchJudgement {
            selector_scored,
            matching_complete: self.notify_if_matching_complete(roster),
        })
    }

    /// Every active player has judged or is the selector
    pub fn is_matching_complete(&self, roster: &impl Roster) -> bool {
        self.stage == Stage::ResponseMatching
            && self.players.iter().enumerate().all(|(i, p)| {
                i == self.selector || p.matching_complete || !roster.is_active(&p.id)
            })
    }

    pub(super) fn matching_complete_event(&self, roster: &impl Roster) -> Option<GameEvent> {
        if !self.is_matching_complete(roster) {
            return None;
        }
        let selector_active = self.selector_id().is_some_and(|id| roster.is_active(id));
        Some(GameEvent::MatchingComplete {
            generation: self.generation,
            selector_active,
        })
    }

    pub(super) fn notify_if_matching_complete(&self, roster: &impl Roster) -> bool {
        match self.matching_complete_event(roster) {
            Some(event) => {
                self.emit(event);
                true
            }
            None => false,
        }
    }
}
