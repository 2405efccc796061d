use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::game::{Phase, QuestResult, TeamVoteResult};
use crate::player::{Player, PlayerId, PlayerView};
use crate::role::Faction;
use crate::room::Room;
use crate::time::Millis;

/// Everything one player may know about a room, as sent to clients.
///
/// Other players' roles are stripped according to the viewer's own role
/// until the game ends, at which point every role is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room_code: String,
    pub phase: Phase,
    pub round: u8,
    pub players: Vec<PlayerView>,
    pub leader_id: Option<PlayerId>,
    pub current_team: Vec<PlayerId>,
    pub quest_results: Vec<bool>,
    pub succeeded_quests: u8,
    pub failed_quests: u8,
    pub team_refusals: u8,
    pub cultist_count: usize,
    pub required_team_size: usize,
    pub winner: Option<Faction>,
    pub chat: Vec<ChatMessage>,
    pub phase_end_time: Option<Millis>,
    pub last_quest_result: Option<QuestResult>,
    pub last_team_vote: Option<TeamVoteResult>,
    /// Who has voted in the current phase. The votes themselves stay hidden.
    pub voted_player_ids: Vec<PlayerId>,
}

impl GameView {
    pub fn build(room: &Room, viewer: &Player) -> Self {
        let state = room.state();
        let reveal_all = state.phase == Phase::GameEnd;
        Self {
            room_code: room.code().to_string(),
            phase: state.phase,
            round: state.round,
            players: room
                .players()
                .iter()
                .map(|p| p.view_for(viewer, reveal_all))
                .collect(),
            leader_id: state.leader_id.clone(),
            current_team: state.current_team.clone(),
            quest_results: state.quest_results.clone(),
            succeeded_quests: state.succeeded_quests,
            failed_quests: state.failed_quests,
            team_refusals: state.team_refusals,
            cultist_count: state.cultist_count,
            required_team_size: room.required_team_size(),
            winner: state.winner,
            chat: state.chat.iter().cloned().collect(),
            phase_end_time: state.phase_end_time,
            last_quest_result: state.last_quest_result,
            last_team_vote: state.last_team_vote.clone(),
            voted_player_ids: room.voters().cloned().collect(),
        }
    }

    /// The viewer's own entry.
    pub fn me(&self, viewer: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == viewer)
    }
}
