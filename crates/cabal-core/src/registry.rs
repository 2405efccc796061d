use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::player::{Player, PlayerId, validate_avatar, validate_name};
use crate::room::{Room, RoomConfig};
use crate::snapshot::GameView;
use crate::time::{Clock, Millis, SystemClock};

const ROOM_CODE_LEN: usize = 4;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// What a client needs to keep talking to its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTicket {
    pub code: String,
    pub player_id: PlayerId,
}

/// Owns every live room, keyed by code.
///
/// All randomness and time come from the injected rng and clock so a whole
/// game can be replayed in tests.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    config: RoomConfig,
    rng: StdRng,
    clock: Arc<dyn Clock>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_parts(config, StdRng::from_os_rng(), Arc::new(SystemClock))
    }

    pub fn with_parts(config: RoomConfig, rng: StdRng, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            rng,
            clock,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn now(&self) -> Millis {
        self.clock.now_millis()
    }

    /// Create a room with `host_name` as host.
    pub fn create_room(
        &mut self,
        host_name: &str,
        avatar: Option<&str>,
    ) -> GameResult<RoomTicket> {
        let name = validate_name(host_name)?;
        let avatar = validate_avatar(avatar)?;
        let now = self.now();

        let code = generate_unique_room_code(&self.rooms, &mut self.rng);
        let host = Player::new(name, avatar, true);
        let player_id = host.id.clone();
        self.rooms.insert(
            code.clone(),
            Room::new(code.clone(), host, self.config.clone(), now),
        );
        tracing::info!(room = %code, player_id = %player_id, "Room created");
        Ok(RoomTicket { code, player_id })
    }

    pub fn join_room(
        &mut self,
        code: &str,
        name: &str,
        avatar: Option<&str>,
    ) -> GameResult<RoomTicket> {
        let now = self.now();
        let room = self.room_mut(code, now)?;
        let player_id = room.join(name, avatar, now)?;
        Ok(RoomTicket {
            code: room.code().to_string(),
            player_id,
        })
    }

    pub fn get_game_state(&mut self, code: &str, player_id: &str) -> GameResult<GameView> {
        let now = self.now();
        self.room_mut(code, now)?.game_state(player_id, now)
    }

    pub fn start_game(&mut self, code: &str) -> GameResult<()> {
        let now = self.now();
        let key = normalize_code(code);
        let room = self
            .rooms
            .get_mut(&key)
            .ok_or(GameError::RoomNotFound(key))?;
        room.touch(now);
        room.start_game(&mut self.rng, now)
    }

    pub fn select_team(&mut self, code: &str, team: &[PlayerId]) -> GameResult<()> {
        let now = self.now();
        self.room_mut(code, now)?.select_team(team, now)
    }

    pub fn vote_team(&mut self, code: &str, player_id: &str, approve: bool) -> GameResult<()> {
        let now = self.now();
        self.room_mut(code, now)?.vote_team(player_id, approve, now)
    }

    pub fn vote_quest(&mut self, code: &str, player_id: &str, succeed: bool) -> GameResult<()> {
        let now = self.now();
        self.room_mut(code, now)?.vote_quest(player_id, succeed, now)
    }

    pub fn guess_seer(&mut self, code: &str, target: &str) -> GameResult<()> {
        let now = self.now();
        self.room_mut(code, now)?.guess_seer(target, now)
    }

    /// Post `text` on behalf of a player; the sender shown is their name.
    pub fn add_chat_message(
        &mut self,
        code: &str,
        player_id: &str,
        text: &str,
    ) -> GameResult<()> {
        let now = self.now();
        let room = self.room_mut(code, now)?;
        let sender = room
            .player(player_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        room.add_chat_message(&sender, text, now)
    }

    pub fn kick_player(&mut self, code: &str, requester: &str, target: &str) -> GameResult<()> {
        let now = self.now();
        self.room_mut(code, now)?.kick(requester, target, now)
    }

    /// Remove a player. Returns true if that emptied and destroyed the room.
    pub fn leave_room(&mut self, code: &str, player_id: &str) -> GameResult<bool> {
        let now = self.now();
        let room = self.room_mut(code, now)?;
        room.leave(player_id, now)?;
        if !room.players().is_empty() {
            return Ok(false);
        }
        let key = room.code().to_string();
        self.rooms.remove(&key);
        tracing::info!(room = %key, "Room destroyed (empty)");
        Ok(true)
    }

    /// Read-only access for inspection. Does not resolve deadlines.
    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(&normalize_code(code))
    }

    pub fn room_exists(&self, code: &str) -> bool {
        self.rooms.contains_key(&normalize_code(code))
    }

    pub fn player_name(&self, code: &str, player_id: &str) -> Option<String> {
        self.room(code)?.player(player_id).map(|p| p.name.clone())
    }

    /// Returns (room_count, total_players).
    pub fn stats(&self) -> (usize, usize) {
        let players = self.rooms.values().map(|r| r.players().len()).sum();
        (self.rooms.len(), players)
    }

    /// Remove rooms that have been idle for longer than `max_idle`.
    /// Returns the number of rooms removed.
    pub fn cleanup_idle_rooms(&mut self, max_idle: Duration) -> usize {
        let now = self.now();
        let max_idle = max_idle.as_millis() as Millis;
        let before = self.rooms.len();
        self.rooms.retain(|code, room| {
            let keep = now.saturating_sub(room.last_activity()) < max_idle;
            if !keep {
                tracing::info!(room = %code, "Removing idle room");
            }
            keep
        });
        before - self.rooms.len()
    }

    fn room_mut(&mut self, code: &str, now: Millis) -> GameResult<&mut Room> {
        let key = normalize_code(code);
        let room = self
            .rooms
            .get_mut(&key)
            .ok_or(GameError::RoomNotFound(key))?;
        room.touch(now);
        Ok(room)
    }
}

/// Codes are case-insensitive on input.
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Generate a random room code (uppercase letters and digits).
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_CHARSET.len());
            char::from(ROOM_CODE_CHARSET[idx])
        })
        .collect()
}

pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Generate a unique room code, retrying on collision with existing rooms.
fn generate_unique_room_code<R: Rng + ?Sized>(
    existing: &HashMap<String, Room>,
    rng: &mut R,
) -> String {
    loop {
        let code = generate_room_code(rng);
        if !existing.contains_key(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Phase;
    use crate::role::{Faction, Role};
    use crate::rules::CHAT_CAPACITY;
    use crate::test_helpers::{ManualClock, seeded_registry, start_with_players};

    #[test]
    fn create_room_returns_valid_code() {
        let (mut reg, _clock) = seeded_registry(1);
        let ticket = reg.create_room("Alice", None).unwrap();
        assert!(is_valid_room_code(&ticket.code));
        assert!(reg.room_exists(&ticket.code));
        let room = reg.room(&ticket.code).unwrap();
        assert_eq!(room.phase(), Phase::Lobby);
        assert_eq!(room.host().unwrap().id, ticket.player_id);
    }

    #[test]
    fn create_room_rejects_blank_name() {
        let (mut reg, _clock) = seeded_registry(1);
        assert!(matches!(
            reg.create_room("   ", None),
            Err(GameError::InvalidName(_))
        ));
        assert_eq!(reg.stats(), (0, 0));
    }

    #[test]
    fn codes_unique_across_many_rooms() {
        let (mut reg, _clock) = seeded_registry(2);
        for i in 0..500 {
            reg.create_room(&format!("Host{i}"), None).unwrap();
        }
        assert_eq!(reg.stats(), (500, 500));
    }

    #[test]
    fn room_code_format() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert!(is_valid_room_code(&code), "Invalid room code: {code}");
        }
        assert!(!is_valid_room_code("abcd"));
        assert!(!is_valid_room_code("ABCDE"));
    }

    #[test]
    fn join_is_case_insensitive() {
        let (mut reg, _clock) = seeded_registry(4);
        let ticket = reg.create_room("Alice", None).unwrap();
        let joined = reg
            .join_room(&ticket.code.to_lowercase(), "Bob", Some("owl"))
            .unwrap();
        assert_eq!(joined.code, ticket.code);
        assert_eq!(reg.room(&ticket.code).unwrap().players().len(), 2);
    }

    #[test]
    fn join_nonexistent_room_fails() {
        let (mut reg, _clock) = seeded_registry(4);
        assert_eq!(
            reg.join_room("ZZZZ", "Bob", None),
            Err(GameError::RoomNotFound("ZZZZ".to_string()))
        );
    }

    #[test]
    fn operations_on_missing_room_fail() {
        let (mut reg, _clock) = seeded_registry(4);
        assert!(reg.start_game("NOPE").is_err());
        assert!(reg.get_game_state("NOPE", "p").is_err());
        assert!(reg.vote_quest("NOPE", "p", true).is_err());
        assert!(reg.leave_room("NOPE", "p").is_err());
    }

    #[test]
    fn leave_room_destroys_empty_room() {
        let (mut reg, _clock) = seeded_registry(5);
        let ticket = reg.create_room("Alice", None).unwrap();
        assert_eq!(reg.leave_room(&ticket.code, &ticket.player_id), Ok(true));
        assert!(!reg.room_exists(&ticket.code));
    }

    #[test]
    fn host_migration_on_leave() {
        let (mut reg, _clock) = seeded_registry(5);
        let host = reg.create_room("Alice", None).unwrap();
        let bob = reg.join_room(&host.code, "Bob", None).unwrap();
        reg.join_room(&host.code, "Cara", None).unwrap();
        assert_eq!(reg.leave_room(&host.code, &host.player_id), Ok(false));

        let room = reg.room(&host.code).unwrap();
        let hosts: Vec<_> = room.players().iter().filter(|p| p.is_host).collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].id, bob.player_id);
    }

    #[test]
    fn chat_uses_player_name_and_stays_bounded() {
        let (mut reg, _clock) = seeded_registry(6);
        let ticket = reg.create_room("Alice", None).unwrap();
        for i in 0..(CHAT_CAPACITY * 2) {
            reg.add_chat_message(&ticket.code, &ticket.player_id, &format!("msg {i}"))
                .unwrap();
        }
        let chat = &reg.room(&ticket.code).unwrap().state().chat;
        assert_eq!(chat.len(), CHAT_CAPACITY);
        let last = chat.last().unwrap();
        assert_eq!(last.sender, "Alice");
        assert_eq!(last.message, format!("msg {}", CHAT_CAPACITY * 2 - 1));
    }

    #[test]
    fn chat_from_stranger_rejected() {
        let (mut reg, _clock) = seeded_registry(6);
        let ticket = reg.create_room("Alice", None).unwrap();
        assert!(matches!(
            reg.add_chat_message(&ticket.code, "ghost", "hi"),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn idle_room_cleanup_removes_stale_rooms() {
        let (mut reg, clock) = seeded_registry(7);
        let stale = reg.create_room("Alice", None).unwrap();
        clock.advance(Duration::from_secs(7200));
        let fresh = reg.create_room("Bob", None).unwrap();

        let removed = reg.cleanup_idle_rooms(Duration::from_secs(3600));
        assert_eq!(removed, 1);
        assert!(!reg.room_exists(&stale.code));
        assert!(reg.room_exists(&fresh.code));
    }

    #[test]
    fn activity_keeps_room_alive() {
        let (mut reg, clock) = seeded_registry(7);
        let ticket = reg.create_room("Alice", None).unwrap();
        clock.advance(Duration::from_secs(3000));
        reg.get_game_state(&ticket.code, &ticket.player_id).unwrap();
        clock.advance(Duration::from_secs(3000));
        assert_eq!(reg.cleanup_idle_rooms(Duration::from_secs(3600)), 0);
    }

    #[test]
    fn polling_after_deadline_resolves_quest() {
        let (mut reg, clock) = seeded_registry(8);
        let (code, ids) = start_with_players(&mut reg, 5);
        let team = ids[..2].to_vec();
        reg.select_team(&code, &team).unwrap();
        for id in &ids {
            reg.vote_team(&code, id, true).unwrap();
        }
        reg.vote_quest(&code, &team[0], false).unwrap();

        clock.advance(Duration::from_secs(16));
        let view = reg.get_game_state(&code, &ids[4]).unwrap();
        assert_eq!(view.failed_quests, 1);
        assert_eq!(view.round, 2);
        assert_eq!(view.phase, Phase::TeamSelection);
    }

    #[test]
    fn full_village_win_with_wrong_guess() {
        let (mut reg, _clock) = seeded_registry(9);
        let (code, ids) = start_with_players(&mut reg, 4);
        for round in 0..3 {
            let size = reg.room(&code).unwrap().required_team_size();
            let team = ids[..size].to_vec();
            reg.select_team(&code, &team).unwrap();
            for id in &ids {
                reg.vote_team(&code, id, true).unwrap();
            }
            for id in &team {
                reg.vote_quest(&code, id, true).unwrap();
            }
            assert_eq!(
                reg.room(&code).unwrap().state().succeeded_quests,
                round + 1
            );
        }
        assert_eq!(reg.room(&code).unwrap().phase(), Phase::SeerGuess);

        let room = reg.room(&code).unwrap();
        let wrong = room
            .players()
            .iter()
            .find(|p| p.role != Some(Role::Seer))
            .map(|p| p.id.clone())
            .unwrap();
        reg.guess_seer(&code, &wrong).unwrap();
        let view = reg.get_game_state(&code, &ids[0]).unwrap();
        assert_eq!(view.winner, Some(Faction::Village));
        assert!(view.players.iter().all(|p| p.role.is_some()));
    }

    #[test]
    fn restart_keeps_role_counts() {
        let (mut reg, _clock) = seeded_registry(10);
        let (code, ids) = start_with_players(&mut reg, 8);
        for _ in 0..3 {
            let size = reg.room(&code).unwrap().required_team_size();
            let team = ids[..size].to_vec();
            reg.select_team(&code, &team).unwrap();
            for id in &ids {
                reg.vote_team(&code, id, true).unwrap();
            }
            for id in &team {
                reg.vote_quest(&code, id, false).unwrap();
            }
        }
        assert_eq!(reg.room(&code).unwrap().phase(), Phase::GameEnd);

        reg.start_game(&code).unwrap();
        let room = reg.room(&code).unwrap();
        let count = |role| room.players().iter().filter(|p| p.role == Some(role)).count();
        assert_eq!(count(Role::Cultist), 3);
        assert_eq!(count(Role::Seer), 1);
        assert_eq!(count(Role::Villager), 4);
    }

    #[test]
    fn seeded_registries_agree() {
        let clock_a = Arc::new(ManualClock::new(0));
        let clock_b = Arc::new(ManualClock::new(0));
        let mut a = RoomRegistry::with_parts(
            RoomConfig::default(),
            StdRng::seed_from_u64(77),
            clock_a,
        );
        let mut b = RoomRegistry::with_parts(
            RoomConfig::default(),
            StdRng::seed_from_u64(77),
            clock_b,
        );
        let ta = a.create_room("Alice", None).unwrap();
        let tb = b.create_room("Alice", None).unwrap();
        assert_eq!(ta.code, tb.code);
    }
}
