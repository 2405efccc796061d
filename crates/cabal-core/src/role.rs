use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::rules::cultist_count;

/// Secret role dealt to each player at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Seer,
    Cultist,
}

impl Role {
    pub fn faction(self) -> Faction {
        match self {
            Role::Villager | Role::Seer => Faction::Village,
            Role::Cultist => Faction::Cult,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Villager => write!(f, "Villager"),
            Role::Seer => write!(f, "Seer"),
            Role::Cultist => write!(f, "Cultist"),
        }
    }
}

/// Winning side of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Village,
    Cult,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Village => write!(f, "Village"),
            Faction::Cult => write!(f, "Cult"),
        }
    }
}

/// Deal roles for `player_count` seats.
///
/// The seats are shuffled and the shuffled order is sliced into
/// `[cultists][seer][villagers]`, so every mapping with the fixed counts is
/// equally likely. `result[i]` is the role for roster position `i`.
pub fn assign_roles<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> Vec<Role> {
    let cultists = cultist_count(player_count).min(player_count);
    let mut seats: Vec<usize> = (0..player_count).collect();
    seats.shuffle(rng);

    let mut roles = vec![Role::Villager; player_count];
    for (slot, &seat) in seats.iter().enumerate() {
        roles[seat] = if slot < cultists {
            Role::Cultist
        } else if slot == cultists {
            Role::Seer
        } else {
            Role::Villager
        };
    }
    roles
}
