use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chat::ChatLog;
use crate::error::{GameError, GameResult};
use crate::game::{GameState, Phase, QuestResult, TeamVoteResult, VoteLedger};
use crate::player::{Player, PlayerId, validate_avatar, validate_name};
use crate::role::{Faction, Role, assign_roles};
use crate::rules::{
    CHAT_CAPACITY, MAX_MESSAGE_LEN, MAX_PLAYERS, MAX_TEAM_REFUSALS, MIN_PLAYERS, QUESTS_TO_WIN,
    VOTE_DURATION, cultist_count, required_team_size,
};
use crate::snapshot::GameView;
use crate::time::Millis;

/// Per-room game settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub max_players: usize,
    pub vote_duration: Duration,
    pub chat_capacity: usize,
    /// When false, a proposed team goes straight to the quest vote.
    pub team_vote: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            vote_duration: VOTE_DURATION,
            chat_capacity: CHAT_CAPACITY,
            team_vote: true,
        }
    }
}

/// One game session: the roster, the authoritative game record, and the
/// votes cast in the current voting phase.
///
/// Timed phases are not driven by a timer. An expired deadline is resolved
/// the next time any operation on the room observes the clock, so a room
/// nobody reads can sit past its deadline indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    code: String,
    players: Vec<Player>,
    state: GameState,
    votes: VoteLedger,
    config: RoomConfig,
    last_activity: Millis,
}

impl Room {
    /// Create a room with `host` as its only player.
    pub fn new(code: String, mut host: Player, config: RoomConfig, now: Millis) -> Self {
        host.is_host = true;
        let mut chat = ChatLog::with_capacity(config.chat_capacity);
        chat.push_system(format!("Room {code} created."), now);
        Self {
            code,
            players: vec![host],
            state: GameState::new(chat),
            votes: VoteLedger::default(),
            config,
            last_activity: now,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn last_activity(&self) -> Millis {
        self.last_activity
    }

    pub fn touch(&mut self, now: Millis) {
        self.last_activity = self.last_activity.max(now);
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn leader(&self) -> Option<&Player> {
        self.state.leader_id.as_deref().and_then(|id| self.player(id))
    }

    pub fn required_team_size(&self) -> usize {
        required_team_size(self.players.len(), self.state.round)
    }

    /// Players who have voted in the current voting phase.
    pub fn voters(&self) -> impl Iterator<Item = &PlayerId> {
        self.votes.voters()
    }

    /// Add a non-host player. Only possible in the lobby.
    pub fn join(&mut self, name: &str, avatar: Option<&str>, now: Millis) -> GameResult<PlayerId> {
        let name = validate_name(name)?;
        let avatar = validate_avatar(avatar)?;
        self.expect_phase(&[Phase::Lobby], "lobby")?;
        if self.players.len() >= self.config.max_players {
            return Err(GameError::RoomFull(self.config.max_players));
        }

        let player = Player::new(name, avatar, false);
        let id = player.id.clone();
        self.state
            .chat
            .push_system(format!("{} joined the room.", player.name), now);
        tracing::debug!(room = %self.code, player_id = %id, "Player joined");
        self.players.push(player);
        Ok(id)
    }

    /// Host-only removal of another player while in the lobby.
    pub fn kick(&mut self, requester: &str, target: &str, now: Millis) -> GameResult<()> {
        let host = self
            .player(requester)
            .ok_or_else(|| GameError::PlayerNotFound(requester.to_string()))?;
        if !host.is_host {
            return Err(GameError::NotHost);
        }
        self.expect_phase(&[Phase::Lobby], "lobby")?;
        if requester == target {
            return Err(GameError::CannotKickSelf);
        }
        let idx = self
            .position(target)
            .ok_or_else(|| GameError::PlayerNotFound(target.to_string()))?;

        let kicked = self.players.remove(idx);
        self.state
            .chat
            .push_system(format!("{} was kicked from the room.", kicked.name), now);
        tracing::debug!(room = %self.code, player_id = %kicked.id, "Player kicked");
        Ok(())
    }

    /// Remove a player in any phase. The caller destroys the room once it is
    /// empty.
    pub fn leave(&mut self, player: &str, now: Millis) -> GameResult<()> {
        let idx = self
            .position(player)
            .ok_or_else(|| GameError::PlayerNotFound(player.to_string()))?;
        self.resolve_expired(now);

        let departed = self.players.remove(idx);
        self.state
            .chat
            .push_system(format!("{} left the room.", departed.name), now);
        tracing::debug!(room = %self.code, player_id = %departed.id, "Player left");

        if departed.is_host
            && let Some(new_host) = self.players.first_mut()
        {
            new_host.is_host = true;
            let msg = format!("{} is now the host.", new_host.name);
            self.state.chat.push_system(msg, now);
        }

        if !self.players.is_empty() && self.state.phase != Phase::Lobby {
            self.handle_departure(&departed.id, idx, now);
        }
        Ok(())
    }

    /// Deal roles and begin round 1. Also restarts a finished game.
    pub fn start_game<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Millis) -> GameResult<()> {
        self.expect_phase(&[Phase::Lobby, Phase::GameEnd], "lobby or game_end")?;
        let count = self.players.len();
        if count < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                required: MIN_PLAYERS,
                actual: count,
            });
        }

        self.state.reset_for_new_game();
        self.votes.clear();

        let roles = assign_roles(count, rng);
        for (player, role) in self.players.iter_mut().zip(roles) {
            player.role = Some(role);
        }
        let leader = &self.players[rng.random_range(0..count)];
        self.state.leader_id = Some(leader.id.clone());
        self.state.cultist_count = cultist_count(count);
        self.state.phase = Phase::TeamSelection;

        let msg = format!(
            "Game started! Roles have been dealt. {} leads round 1.",
            leader.name
        );
        self.state.chat.push_system(msg, now);
        tracing::info!(room = %self.code, players = count, "Game started");
        Ok(())
    }

    /// Propose the team for the current round.
    pub fn select_team(&mut self, team: &[PlayerId], now: Millis) -> GameResult<()> {
        self.resolve_expired(now);
        self.expect_phase(&[Phase::TeamSelection], "team_selection")?;

        let required = self.required_team_size();
        if team.len() != required {
            return Err(GameError::TeamSize {
                expected: required,
                actual: team.len(),
            });
        }
        let mut seen = HashSet::new();
        for id in team {
            if self.player(id).is_none() {
                return Err(GameError::InvalidTeam(format!("{id} is not in this room")));
            }
            if !seen.insert(id) {
                return Err(GameError::InvalidTeam(format!("{id} listed twice")));
            }
        }

        self.state.current_team = team.to_vec();
        self.votes.clear();
        self.state.phase_end_time = Some(self.deadline_from(now));
        let names = self.names_of(team);
        if self.config.team_vote {
            self.state.phase = Phase::TeamVoting;
            let msg = format!(
                "{} proposed {names}. Everyone votes to approve or reject the team.",
                self.leader_name()
            );
            self.state.chat.push_system(msg, now);
        } else {
            self.state.phase = Phase::QuestVoting;
            let msg = format!("Team selected: {names}. Team members, cast your votes.");
            self.state.chat.push_system(msg, now);
        }
        tracing::debug!(room = %self.code, phase = ?self.state.phase, "Team proposed");
        Ok(())
    }

    /// Approve (`true`) or reject the proposed team. Every player votes once.
    pub fn vote_team(&mut self, player: &str, approve: bool, now: Millis) -> GameResult<()> {
        self.resolve_expired(now);
        self.expect_phase(&[Phase::TeamVoting], "team_voting")?;
        if self.player(player).is_none() {
            return Err(GameError::PlayerNotFound(player.to_string()));
        }
        if !self.votes.cast(player, approve) {
            return Err(GameError::AlreadyVoted(player.to_string()));
        }

        if self.votes.len() >= self.players.len() {
            self.resolve_team_vote(now);
        }
        Ok(())
    }

    /// Team members vote the quest to succeed (`true`) or fail.
    pub fn vote_quest(&mut self, player: &str, succeed: bool, now: Millis) -> GameResult<()> {
        self.resolve_expired(now);
        self.expect_phase(&[Phase::QuestVoting], "quest_voting")?;
        if self.player(player).is_none() {
            return Err(GameError::PlayerNotFound(player.to_string()));
        }
        if !self.state.current_team.iter().any(|id| id == player) {
            return Err(GameError::NotOnTeam(player.to_string()));
        }
        if !self.votes.cast(player, succeed) {
            return Err(GameError::AlreadyVoted(player.to_string()));
        }

        if self.votes.len() >= self.state.current_team.len() {
            self.process_quest_result(now);
        }
        Ok(())
    }

    /// The cult's last chance after three successful quests.
    pub fn guess_seer(&mut self, target: &str, now: Millis) -> GameResult<()> {
        self.resolve_expired(now);
        self.expect_phase(&[Phase::SeerGuess], "seer_guess")?;
        let target = self
            .player(target)
            .ok_or_else(|| GameError::PlayerNotFound(target.to_string()))?;

        let name = target.name.clone();
        if target.role == Some(Role::Seer) {
            self.finish(
                Faction::Cult,
                format!("The cult unmasked {name} as the Seer!"),
                now,
            );
        } else {
            self.finish(Faction::Village, format!("{name} was not the Seer."), now);
        }
        Ok(())
    }

    /// Append a player chat message.
    pub fn add_chat_message(&mut self, sender: &str, text: &str, now: Millis) -> GameResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::InvalidMessage("message is empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(GameError::InvalidMessage(format!(
                "message exceeds {MAX_MESSAGE_LEN} chars"
            )));
        }
        self.resolve_expired(now);
        self.state.chat.push_player(sender, text, now);
        Ok(())
    }

    /// Viewer-scoped snapshot. Resolves an expired vote first.
    pub fn game_state(&mut self, viewer: &str, now: Millis) -> GameResult<GameView> {
        if self.player(viewer).is_none() {
            return Err(GameError::PlayerNotFound(viewer.to_string()));
        }
        self.resolve_expired(now);
        let viewer = self
            .player(viewer)
            .ok_or_else(|| GameError::PlayerNotFound(viewer.to_string()))?;
        Ok(GameView::build(self, viewer))
    }

    /// Resolve the current voting phase if its deadline has passed. Returns
    /// true if anything changed.
    pub fn resolve_expired(&mut self, now: Millis) -> bool {
        if !self.state.deadline_passed(now) {
            return false;
        }
        tracing::debug!(room = %self.code, phase = ?self.state.phase, "Vote deadline passed");
        match self.state.phase {
            Phase::TeamVoting => self.resolve_team_vote(now),
            Phase::QuestVoting => self.process_quest_result(now),
            _ => return false,
        }
        true
    }

    /// Close the team vote. Players who did not vote approve.
    fn resolve_team_vote(&mut self, now: Millis) {
        let everyone: Vec<PlayerId> = self.players.iter().map(|p| p.id.clone()).collect();
        self.votes.fill_missing(&everyone, true);
        let result = TeamVoteResult::tally(self.votes.take());
        self.state.phase_end_time = None;

        let summary = format!("{} for, {} against", result.approvals, result.rejections);
        let approved = result.approved;
        self.state.last_team_vote = Some(result);

        if approved {
            self.state.phase = Phase::QuestVoting;
            self.state.phase_end_time = Some(self.deadline_from(now));
            self.state.chat.push_system(
                format!("Team approved ({summary}). Team members, cast your quest votes."),
                now,
            );
            tracing::debug!(room = %self.code, "Team approved");
            return;
        }

        self.state.team_refusals += 1;
        self.state.current_team.clear();
        self.state
            .chat
            .push_system(format!("Team rejected ({summary})."), now);

        if self.state.team_refusals >= MAX_TEAM_REFUSALS {
            self.finish(
                Faction::Cult,
                format!("{MAX_TEAM_REFUSALS} teams were rejected in a row."),
                now,
            );
            return;
        }

        self.advance_leader();
        self.state.phase = Phase::TeamSelection;
        let msg = format!(
            "{} now proposes a team ({} of {MAX_TEAM_REFUSALS} refusals).",
            self.leader_name(),
            self.state.team_refusals
        );
        self.state.chat.push_system(msg, now);
        tracing::debug!(room = %self.code, refusals = self.state.team_refusals, "Team rejected");
    }

    /// Close the quest vote. Team members who did not vote succeed.
    fn process_quest_result(&mut self, now: Millis) {
        let team = self.state.current_team.clone();
        self.votes.fill_missing(&team, true);
        let votes = self.votes.take();
        let result = QuestResult::tally(votes.values());

        self.state.phase_end_time = None;
        self.state.phase = Phase::QuestResult;
        self.state.quest_results.push(result.success);
        if result.success {
            self.state.succeeded_quests += 1;
        } else {
            self.state.failed_quests += 1;
        }
        self.state.last_quest_result = Some(result);

        let outcome = if result.success {
            "SUCCEEDED"
        } else {
            "FAILED"
        };
        let msg = format!(
            "Quest {} {outcome}! ({} fail votes)",
            self.state.round, result.fail_votes
        );
        self.state.chat.push_system(msg, now);
        tracing::debug!(
            room = %self.code,
            round = self.state.round,
            success = result.success,
            "Quest resolved"
        );

        if self.state.failed_quests >= QUESTS_TO_WIN {
            self.finish(Faction::Cult, "Three quests have failed.".to_string(), now);
        } else if self.state.succeeded_quests >= QUESTS_TO_WIN {
            self.state.phase = Phase::SeerGuess;
            self.state.chat.push_system(
                "Village has 3 successes! Cult must identify the Seer to win.",
                now,
            );
        } else {
            self.state.round += 1;
            self.state.team_refusals = 0;
            self.state.current_team.clear();
            self.advance_leader();
            self.state.phase = Phase::TeamSelection;
            let msg = format!(
                "Round {}: {} proposes the next team.",
                self.state.round,
                self.leader_name()
            );
            self.state.chat.push_system(msg, now);
        }
    }

    /// Keep an in-progress game coherent after `departed` (formerly at roster
    /// index `idx`) left.
    fn handle_departure(&mut self, departed: &str, idx: usize, now: Millis) {
        self.votes.remove(departed);

        if self.state.leader_id.as_deref() == Some(departed) {
            let next = &self.players[idx % self.players.len()];
            self.state.leader_id = Some(next.id.clone());
        }

        let on_team = self.state.current_team.iter().any(|id| id == departed);
        match self.state.phase {
            Phase::TeamVoting | Phase::QuestVoting if on_team => {
                self.state.current_team.clear();
                self.votes.clear();
                self.state.phase_end_time = None;
                self.state.phase = Phase::TeamSelection;
                let msg = format!(
                    "The team broke up. {} proposes a new team.",
                    self.leader_name()
                );
                self.state.chat.push_system(msg, now);
            },
            Phase::TeamVoting if self.votes.len() >= self.players.len() => {
                self.resolve_team_vote(now);
            },
            _ => {},
        }
    }

    fn finish(&mut self, winner: Faction, reason: String, now: Millis) {
        self.state.winner = Some(winner);
        self.state.phase = Phase::GameEnd;
        self.state.phase_end_time = None;
        self.votes.clear();
        self.state.chat.push_system(reason, now);
        self.state
            .chat
            .push_system(format!("{winner} wins! All roles are revealed."), now);
        tracing::info!(room = %self.code, %winner, "Game over");
    }

    /// Pass leadership to the next player in roster order.
    fn advance_leader(&mut self) {
        if self.players.is_empty() {
            return;
        }
        let next = match self.state.leader_id.as_deref().and_then(|id| self.position(id)) {
            Some(idx) => (idx + 1) % self.players.len(),
            None => 0,
        };
        self.state.leader_id = Some(self.players[next].id.clone());
    }

    fn expect_phase(&self, allowed: &[Phase], expected: &'static str) -> GameResult<()> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(GameError::InvalidPhase {
                expected,
                actual: self.state.phase,
            })
        }
    }

    fn deadline_from(&self, now: Millis) -> Millis {
        now.saturating_add(self.config.vote_duration.as_millis() as Millis)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn leader_name(&self) -> &str {
        self.leader().map_or("The leader", |p| p.name.as_str())
    }

    fn names_of(&self, ids: &[PlayerId]) -> String {
        ids.iter()
            .filter_map(|id| self.player(id))
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
