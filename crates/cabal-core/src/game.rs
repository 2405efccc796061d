use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chat::ChatLog;
use crate::player::PlayerId;
use crate::role::Faction;
use crate::time::Millis;

/// Phase of a room's game.
///
/// `lobby → team_selection → team_voting → quest_voting → quest_result →
/// (team_selection | seer_guess | game_end)`, and `seer_guess → game_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    TeamSelection,
    TeamVoting,
    QuestVoting,
    QuestResult,
    SeerGuess,
    GameEnd,
}

impl Phase {
    /// Phases that carry a vote deadline.
    pub fn is_timed(self) -> bool {
        matches!(self, Phase::TeamVoting | Phase::QuestVoting)
    }
}

/// Summary of the most recently resolved quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestResult {
    pub success: bool,
    pub fail_votes: usize,
    pub success_votes: usize,
}

impl QuestResult {
    /// A single fail vote sinks the quest.
    pub fn tally<'a>(votes: impl IntoIterator<Item = &'a bool>) -> Self {
        let (mut fail_votes, mut success_votes) = (0, 0);
        for &vote in votes {
            if vote {
                success_votes += 1;
            } else {
                fail_votes += 1;
            }
        }
        Self {
            success: fail_votes == 0,
            fail_votes,
            success_votes,
        }
    }
}

/// Outcome of a team proposal vote. Team votes are public once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamVoteResult {
    pub approved: bool,
    pub approvals: usize,
    pub rejections: usize,
    pub votes: BTreeMap<PlayerId, bool>,
}

impl TeamVoteResult {
    /// Strict majority approves; a tie rejects.
    pub fn tally(votes: BTreeMap<PlayerId, bool>) -> Self {
        let approvals = votes.values().filter(|v| **v).count();
        let rejections = votes.len() - approvals;
        Self {
            approved: approvals > rejections,
            approvals,
            rejections,
            votes,
        }
    }
}

/// Authoritative per-room game record. Never sent to clients directly; see
/// [`crate::snapshot::GameView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    /// 1-based quest round.
    pub round: u8,
    pub leader_id: Option<PlayerId>,
    pub current_team: Vec<PlayerId>,
    pub quest_results: Vec<bool>,
    pub succeeded_quests: u8,
    pub failed_quests: u8,
    /// Rejected proposals in the current round.
    pub team_refusals: u8,
    pub cultist_count: usize,
    pub phase_end_time: Option<Millis>,
    pub last_quest_result: Option<QuestResult>,
    pub last_team_vote: Option<TeamVoteResult>,
    pub winner: Option<Faction>,
    pub chat: ChatLog,
}

impl GameState {
    pub fn new(chat: ChatLog) -> Self {
        Self {
            phase: Phase::Lobby,
            round: 1,
            leader_id: None,
            current_team: Vec::new(),
            quest_results: Vec::new(),
            succeeded_quests: 0,
            failed_quests: 0,
            team_refusals: 0,
            cultist_count: 0,
            phase_end_time: None,
            last_quest_result: None,
            last_team_vote: None,
            winner: None,
            chat,
        }
    }

    /// Clear everything a new game starts without. Chat is kept.
    pub fn reset_for_new_game(&mut self) {
        self.round = 1;
        self.leader_id = None;
        self.current_team.clear();
        self.quest_results.clear();
        self.succeeded_quests = 0;
        self.failed_quests = 0;
        self.team_refusals = 0;
        self.cultist_count = 0;
        self.phase_end_time = None;
        self.last_quest_result = None;
        self.last_team_vote = None;
        self.winner = None;
    }

    /// True once the timed phase's deadline is strictly in the past.
    pub fn deadline_passed(&self, now: Millis) -> bool {
        self.phase.is_timed() && self.phase_end_time.is_some_and(|end| now > end)
    }
}

/// Votes cast in the current voting phase, keyed by player. Holds either team
/// approvals or quest votes, never both; it is cleared on every phase entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: BTreeMap<PlayerId, bool>,
}

impl VoteLedger {
    /// Record a vote. The first vote is final: returns false if `player`
    /// already voted.
    pub fn cast(&mut self, player: &str, vote: bool) -> bool {
        if self.votes.contains_key(player) {
            return false;
        }
        self.votes.insert(player.to_string(), vote);
        true
    }

    pub fn has_voted(&self, player: &str) -> bool {
        self.votes.contains_key(player)
    }

    /// Fill in `default` for every listed player who has not voted.
    pub fn fill_missing<'a>(&mut self, players: impl IntoIterator<Item = &'a PlayerId>, default: bool) {
        for id in players {
            self.votes.entry(id.clone()).or_insert(default);
        }
    }

    pub fn remove(&mut self, player: &str) {
        self.votes.remove(player);
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn voters(&self) -> impl Iterator<Item = &PlayerId> {
        self.votes.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &bool> {
        self.votes.values()
    }

    /// Hand the votes over and leave the ledger empty.
    pub fn take(&mut self) -> BTreeMap<PlayerId, bool> {
        std::mem::take(&mut self.votes)
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fail_sinks_quest() {
        let r = QuestResult::tally(&[true, true, false]);
        assert!(!r.success);
        assert_eq!(r.fail_votes, 1);
        assert_eq!(r.success_votes, 2);
    }

    #[test]
    fn all_success_passes() {
        let r = QuestResult::tally(&[true, true]);
        assert!(r.success);
        assert_eq!(r.fail_votes, 0);
    }

    #[test]
    fn team_vote_tie_rejects() {
        let votes = BTreeMap::from([
            ("a".to_string(), true),
            ("b".to_string(), false),
            ("c".to_string(), true),
            ("d".to_string(), false),
        ]);
        let r = TeamVoteResult::tally(votes);
        assert!(!r.approved);
        assert_eq!(r.approvals, 2);
        assert_eq!(r.rejections, 2);
    }

    #[test]
    fn ledger_first_vote_is_final() {
        let mut ledger = VoteLedger::default();
        assert!(ledger.cast("a", false));
        assert!(!ledger.cast("a", true));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.values().copied().collect::<Vec<_>>(), vec![false]);
    }

    #[test]
    fn fill_missing_keeps_cast_votes() {
        let mut ledger = VoteLedger::default();
        ledger.cast("a", false);
        let team = vec!["a".to_string(), "b".to_string()];
        ledger.fill_missing(&team, true);
        let votes = ledger.take();
        assert!(!votes["a"]);
        assert!(votes["b"]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::TeamSelection).unwrap();
        assert_eq!(json, "\"team_selection\"");
    }

    #[test]
    fn deadline_only_in_timed_phases() {
        let mut state = GameState::new(ChatLog::default());
        state.phase_end_time = Some(100);
        assert!(!state.deadline_passed(200));
        state.phase = Phase::QuestVoting;
        assert!(!state.deadline_passed(100));
        assert!(state.deadline_passed(101));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quest_fails_iff_any_fail_vote(votes in proptest::collection::vec(any::<bool>(), 1..6)) {
                let r = QuestResult::tally(&votes);
                prop_assert_eq!(r.success, votes.iter().all(|v| *v));
                prop_assert_eq!(r.fail_votes + r.success_votes, votes.len());
            }
        }
    }
}
