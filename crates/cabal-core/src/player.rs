use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GameError, GameResult};
use crate::role::Role;
use crate::rules::{MAX_AVATAR_LEN, MAX_NAME_LEN};

/// Opaque per-player token handed out on create/join.
pub type PlayerId = String;

/// Server-side player record, including the secret role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub is_host: bool,
    pub role: Option<Role>,
    /// Reserved; nothing in the current rules kills a player.
    pub is_dead: bool,
}

impl Player {
    /// Build a player with a fresh id. Name and avatar must already be validated.
    pub fn new(name: String, avatar: Option<String>, is_host: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            avatar,
            is_host,
            role: None,
            is_dead: false,
        }
    }

    /// The role `viewer` is allowed to see on this player, if any.
    ///
    /// Players always see themselves; cultists see fellow cultists and the
    /// seer sees every cultist. `reveal_all` (game over) shows everything.
    pub fn role_visible_to(&self, viewer: &Player, reveal_all: bool) -> Option<Role> {
        if reveal_all || self.id == viewer.id {
            return self.role;
        }
        match (viewer.role, self.role) {
            (Some(Role::Cultist), Some(Role::Cultist)) | (Some(Role::Seer), Some(Role::Cultist)) => {
                Some(Role::Cultist)
            },
            _ => None,
        }
    }

    /// Sanitized copy for `viewer`.
    pub fn view_for(&self, viewer: &Player, reveal_all: bool) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            is_host: self.is_host,
            role: self.role_visible_to(viewer, reveal_all),
            is_dead: self.is_dead,
        }
    }
}

/// Outward-facing player record. `role` is only present when the viewer may
/// see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub is_dead: bool,
}

/// Trim and bound-check a display name.
pub fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName("name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} chars"
        )));
    }
    Ok(name.to_string())
}

/// Blank avatars are treated as "no avatar".
pub fn validate_avatar(avatar: Option<&str>) -> GameResult<Option<String>> {
    let Some(avatar) = avatar.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    if avatar.chars().count() > MAX_AVATAR_LEN {
        return Err(GameError::InvalidName(format!(
            "avatar exceeds {MAX_AVATAR_LEN} chars"
        )));
    }
    Ok(Some(avatar.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_role(name: &str, role: Role) -> Player {
        let mut p = Player::new(name.to_string(), None, false);
        p.role = Some(role);
        p
    }

    #[test]
    fn self_always_visible() {
        let v = with_role("Vera", Role::Villager);
        assert_eq!(v.role_visible_to(&v, false), Some(Role::Villager));
    }

    #[test]
    fn villager_sees_nothing() {
        let viewer = with_role("Vera", Role::Villager);
        let cultist = with_role("Cal", Role::Cultist);
        let seer = with_role("Sam", Role::Seer);
        assert_eq!(cultist.role_visible_to(&viewer, false), None);
        assert_eq!(seer.role_visible_to(&viewer, false), None);
    }

    #[test]
    fn cultists_see_each_other_only() {
        let viewer = with_role("Cal", Role::Cultist);
        let other = with_role("Cora", Role::Cultist);
        let seer = with_role("Sam", Role::Seer);
        let villager = with_role("Vera", Role::Villager);
        assert_eq!(other.role_visible_to(&viewer, false), Some(Role::Cultist));
        assert_eq!(seer.role_visible_to(&viewer, false), None);
        assert_eq!(villager.role_visible_to(&viewer, false), None);
    }

    #[test]
    fn seer_sees_cultists() {
        let viewer = with_role("Sam", Role::Seer);
        let cultist = with_role("Cal", Role::Cultist);
        let villager = with_role("Vera", Role::Villager);
        assert_eq!(cultist.role_visible_to(&viewer, false), Some(Role::Cultist));
        assert_eq!(villager.role_visible_to(&viewer, false), None);
    }

    #[test]
    fn reveal_all_shows_everything() {
        let viewer = with_role("Vera", Role::Villager);
        let seer = with_role("Sam", Role::Seer);
        assert_eq!(seer.role_visible_to(&viewer, true), Some(Role::Seer));
    }

    #[test]
    fn view_omits_hidden_role_in_json() {
        let viewer = with_role("Vera", Role::Villager);
        let seer = with_role("Sam", Role::Seer);
        let json = serde_json::to_value(seer.view_for(&viewer, false)).unwrap();
        assert!(json.get("role").is_none());
        assert_eq!(json["isHost"], false);
    }

    #[test]
    fn name_validation() {
        assert_eq!(validate_name("  Alice ").unwrap(), "Alice");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn avatar_validation() {
        assert_eq!(validate_avatar(None).unwrap(), None);
        assert_eq!(validate_avatar(Some(" ")).unwrap(), None);
        assert_eq!(validate_avatar(Some("owl")).unwrap().as_deref(), Some("owl"));
        assert!(validate_avatar(Some(&"x".repeat(MAX_AVATAR_LEN + 1))).is_err());
    }
}
