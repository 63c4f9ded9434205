use serde::{Deserialize, Serialize};

use super::{GameError, GameResult, GameState, Roster};
use crate::types::{SikeVote, Stage};

/// What the dispatcher should do after a dispute vote is tallied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeAction {
    /// The sike stands; response matching has begun
    BeginMatching,
    /// The sike was rejected; the selector picks another response
    ReSelect,
    /// The sike was rejected for good; advance the rotation
    NextSelection,
    /// Not decided yet
    NoOp,
}

impl GameState {
    /// Record a vote on whether the selector's sike is allowed
    pub fn vote_dispute(&mut self, id: &str, approve: bool, roster: &impl Roster) -> GameResult<DisputeAction> {
        if self.is_selector(id) || self.stage != Stage::SikeDispute {
            return Err(GameError::BadRequest);
        }
        let i = self.player_index(id).ok_or(GameError::Spectator)?;
        self.players[i].sike_vote = if approve { SikeVote::Up } else { SikeVote::Down };

        Ok(self.tally_dispute(roster))
    }

    /// Apply the dispute outcome if either side has a majority.
    ///
    /// Ties go to the selector: with an even number of voters the sike needs
    /// half the votes to stand but strictly more than half to fall.
    pub(super) fn tally_dispute(&mut self, roster: &impl Roster) -> DisputeAction {
        let selector_id = self.selector_id().cloned();
        let voters = self.num_voters(roster, selector_id.as_deref());
        let majority_favored = voters.div_ceil(2);
        let majority_unfavored = if voters % 2 == 1 {
            majority_favored
        } else {
            majority_favored + 1
        };

        let count = |vote: SikeVote| {
            self.players
                .iter()
                .filter(|p| roster.is_active(&p.id) && p.sike_vote == vote)
                .count()
        };
        let up_votes = count(SikeVote::Up);
        let down_votes = count(SikeVote::Down);

        let action = if up_votes >= majority_favored {
            self.begin_matching(roster);
            DisputeAction::BeginMatching
        } else if down_votes >= majority_unfavored {
            self.reject_sike(roster)
        } else {
            DisputeAction::NoOp
        };

        if action != DisputeAction::NoOp {
            tracing::info!(
                "Sike dispute decided {:?} ({} up, {} down, {} voters)",
                action,
                up_votes,
                down_votes,
                voters
            );
        }
        action
    }

    fn reject_sike(&mut self, roster: &impl Roster) -> DisputeAction {
        if self.remaining_sike_retries == 0 {
            return DisputeAction::NextSelection;
        }

        let selector = &self.players[self.selector];
        if !roster.is_active(&selector.id) || !selector.has_unused() {
            return DisputeAction::NextSelection;
        }

        self.stage = Stage::ResponseSelection;
        self.generation += 1;
        self.remaining_sike_retries -= 1;
        for player in &mut self.players {
            player.sike_vote = SikeVote::Unset;
        }
        DisputeAction::ReSelect
    }
}
