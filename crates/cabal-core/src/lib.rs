pub mod chat;
pub mod error;
pub mod game;
pub mod player;
pub mod registry;
pub mod role;
pub mod room;
pub mod rules;
pub mod snapshot;
pub mod time;

pub use error::{ErrorKind, GameError, GameResult};
pub use game::Phase;
pub use player::PlayerId;
pub use registry::{RoomRegistry, RoomTicket};
pub use role::{Faction, Role};
pub use room::{Room, RoomConfig};
pub use snapshot::GameView;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::player::PlayerId;
    use crate::registry::RoomRegistry;
    use crate::room::RoomConfig;
    use crate::time::{Clock, Millis};

    /// Arbitrary fixed epoch so tests never depend on wall-clock time.
    pub const TEST_EPOCH: Millis = 1_700_000_000_000;

    /// A clock that only moves when told to.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: AtomicU64,
    }

    impl ManualClock {
        pub fn new(start: Millis) -> Self {
            Self {
                now: AtomicU64::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn set(&self, to: Millis) {
            self.now.store(to, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> Millis {
            self.now.load(Ordering::SeqCst)
        }
    }

    /// Registry with a seeded rng and a manual clock starting at `TEST_EPOCH`.
    pub fn seeded_registry(seed: u64) -> (RoomRegistry, Arc<ManualClock>) {
        seeded_registry_with(seed, RoomConfig::default())
    }

    pub fn seeded_registry_with(seed: u64, config: RoomConfig) -> (RoomRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(TEST_EPOCH));
        let registry = RoomRegistry::with_parts(
            config,
            StdRng::seed_from_u64(seed),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (registry, clock)
    }

    /// Create a room, fill it with `n` players named `Player1..=n` and start
    /// the game. Returns the code and player ids in roster order.
    pub fn start_with_players(registry: &mut RoomRegistry, n: usize) -> (String, Vec<PlayerId>) {
        let (code, ids) = lobby_with_players(registry, n);
        registry
            .start_game(&code)
            .unwrap_or_else(|e| panic!("start_game failed: {e}"));
        (code, ids)
    }

    /// Like [`start_with_players`] but leaves the room in the lobby.
    pub fn lobby_with_players(registry: &mut RoomRegistry, n: usize) -> (String, Vec<PlayerId>) {
        let host = registry
            .create_room("Player1", None)
            .unwrap_or_else(|e| panic!("create_room failed: {e}"));
        let mut ids = vec![host.player_id];
        for i in 2..=n {
            let ticket = registry
                .join_room(&host.code, &format!("Player{i}"), None)
                .unwrap_or_else(|e| panic!("join_room failed: {e}"));
            ids.push(ticket.player_id);
        }
        (host.code, ids)
    }
}
