use std::time::Duration;

use serde::Deserialize;

use cabal_core::RoomConfig;
use cabal_core::rules::{MAX_PLAYERS, MIN_PLAYERS};

const CONFIG_FILE: &str = "cabal.toml";

/// Top-level server configuration, loaded from `cabal.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Browser origins allowed to call the API. Empty disables CORS headers.
    pub cors_origins: Vec<String>,
    pub game: GameConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            cors_origins: Vec::new(),
            game: GameConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Rules knobs applied to every new room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub max_players: usize,
    pub vote_duration_secs: u64,
    pub chat_capacity: usize,
    /// Whole-table approval vote before each quest.
    pub team_vote: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        let room = RoomConfig::default();
        Self {
            max_players: room.max_players,
            vote_duration_secs: room.vote_duration.as_secs(),
            chat_capacity: room.chat_capacity,
            team_vote: room.team_vote,
        }
    }
}

impl GameConfig {
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players,
            vote_duration: Duration::from_secs(self.vote_duration_secs),
            chat_capacity: self.chat_capacity,
            team_vote: self.team_vote,
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Describe the first fatal problem, if any.
    pub fn check(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.game.max_players) {
            return Err(format!(
                "game.max_players must be between {MIN_PLAYERS} and {MAX_PLAYERS}"
            ));
        }
        if self.game.vote_duration_secs == 0 {
            return Err("game.vote_duration_secs must be > 0".to_string());
        }
        if self.game.chat_capacity == 0 {
            return Err("game.chat_capacity must be > 0".to_string());
        }
        if self.rooms.idle_timeout_secs == 0 {
            return Err("rooms.idle_timeout_secs must be > 0".to_string());
        }
        if self.rooms.idle_check_interval_secs == 0 {
            return Err("rooms.idle_check_interval_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Validate configuration, exiting on fatal values.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            tracing::error!("{e}");
            std::process::exit(1);
        }
        if self.cors_origins.iter().any(|o| o == "*") {
            tracing::warn!("cors_origins contains \"*\", which is not a valid origin; ignoring it");
        }
    }

    /// Load config from `cabal.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {CONFIG_FILE}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {CONFIG_FILE}: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {CONFIG_FILE} found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `CABAL_*` overrides from `lookup` (the process environment in
    /// production). Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("CABAL_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(val) = lookup("CABAL_VOTE_DURATION_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.game.vote_duration_secs = n;
        }
        if let Some(val) = lookup("CABAL_TEAM_VOTE")
            && let Ok(b) = val.parse::<bool>()
        {
            self.game.team_vote = b;
        }
        if let Some(val) = lookup("CABAL_ROOM_IDLE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.rooms.idle_timeout_secs = n;
        }
        if let Some(val) = lookup("CABAL_CORS_ORIGINS") {
            self.cors_origins = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
    }
}
