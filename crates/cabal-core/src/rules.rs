//! Fixed game balance tables.

use std::time::Duration;

pub const MIN_PLAYERS: usize = 4;
pub const MAX_PLAYERS: usize = 10;
pub const ROUNDS: u8 = 5;

/// Successes (or failures) needed to decide the quest track.
pub const QUESTS_TO_WIN: u8 = 3;

/// Rejected proposals in a single round that hand the game to the cult.
pub const MAX_TEAM_REFUSALS: u8 = 5;

pub const VOTE_DURATION: Duration = Duration::from_secs(15);
pub const CHAT_CAPACITY: usize = 50;

pub const MAX_NAME_LEN: usize = 24;
pub const MAX_AVATAR_LEN: usize = 32;
pub const MAX_MESSAGE_LEN: usize = 500;

/// Team size used when the player count or round falls outside the table.
pub const DEFAULT_TEAM_SIZE: usize = 2;

/// Team sizes per round, indexed by player count 4..=10.
const TEAM_SIZES: [[usize; ROUNDS as usize]; MAX_PLAYERS - MIN_PLAYERS + 1] = [
    [2, 2, 2, 3, 3], // 4
    [2, 3, 2, 3, 3], // 5
    [2, 3, 4, 3, 4], // 6
    [2, 3, 3, 4, 4], // 7
    [3, 4, 4, 5, 5], // 8
    [3, 4, 4, 5, 5], // 9
    [3, 4, 4, 5, 5], // 10
];

/// Number of players that must go on the quest for `round` (1-based).
pub fn required_team_size(player_count: usize, round: u8) -> usize {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) || !(1..=ROUNDS).contains(&round) {
        return DEFAULT_TEAM_SIZE;
    }
    TEAM_SIZES[player_count - MIN_PLAYERS][usize::from(round - 1)]
}

/// Number of cultists dealt for a roster of `player_count`.
pub fn cultist_count(player_count: usize) -> usize {
    match player_count {
        0..=4 => 1,
        5..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}
