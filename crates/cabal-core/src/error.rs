use thiserror::Error;

use crate::game::Phase;

/// Coarse failure category. The transport layer maps these to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidPhase,
    InvalidInput,
    Forbidden,
}

/// Every way a room operation can be rejected. A returned error means the
/// room was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("operation not allowed during {actual:?} (expected {expected})")]
    InvalidPhase { expected: &'static str, actual: Phase },
    #[error("team must have {expected} members, got {actual}")]
    TeamSize { expected: usize, actual: usize },
    #[error("invalid team: {0}")]
    InvalidTeam(String),
    #[error("need at least {required} players, have {actual}")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("room is full ({0} players)")]
    RoomFull(usize),
    #[error("player {0} is not on the current team")]
    NotOnTeam(String),
    #[error("player {0} has already voted")]
    AlreadyVoted(String),
    #[error("only the host can do that")]
    NotHost,
    #[error("the host cannot kick themselves")]
    CannotKickSelf,
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::PlayerNotFound(_) => ErrorKind::NotFound,
            Self::InvalidPhase { .. } => ErrorKind::InvalidPhase,
            Self::NotHost => ErrorKind::Forbidden,
            Self::TeamSize { .. }
            | Self::InvalidTeam(_)
            | Self::NotEnoughPlayers { .. }
            | Self::RoomFull(_)
            | Self::NotOnTeam(_)
            | Self::AlreadyVoted(_)
            | Self::CannotKickSelf
            | Self::InvalidName(_)
            | Self::InvalidMessage(_) => ErrorKind::InvalidInput,
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
