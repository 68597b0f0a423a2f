//! Member profiles and profile updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an account takes part in the community.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Player,
    Coach,
    Fan,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Coach => "coach",
            Role::Fan => "fan",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "player" => Ok(Role::Player),
            "coach" => Ok(Role::Coach),
            "fan" => Ok(Role::Fan),
            other => Err(format!(
                "unknown role '{}' (expected player, coach, or fan)",
                other
            )),
        }
    }
}

/// A member profile as `/profile/me/` returns it. Accounts created
/// before the profile fields existed can have them missing, so the
/// presentation fields default rather than fail the parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    /// The name to show for this member: the display name when set,
    /// the username otherwise.
    pub fn shown_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// A partial profile update. Unset fields are left out of the request
/// entirely, so the server keeps their current values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.bio.is_none() && self.role.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_profile() {
        let json = r#"{
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "display_name": "Alice A.",
            "bio": "midfielder",
            "role": "coach"
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.display_name, "Alice A.");
        assert_eq!(profile.role, Role::Coach);
        assert_eq!(profile.shown_name(), "Alice A.");
    }

    #[test]
    fn test_missing_presentation_fields_default() {
        let json = r#"{"id": 7, "username": "alice", "email": "alice@example.com"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.display_name, "");
        assert_eq!(profile.bio, "");
        assert_eq!(profile.role, Role::Player);
        assert_eq!(profile.shown_name(), "alice");
    }

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("Coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!("fan".parse::<Role>().unwrap(), Role::Fan);
        assert!("referee".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Player).unwrap(), json!("player"));
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = ProfileUpdate {
            bio: Some("midfielder".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"bio": "midfielder"})
        );
    }

    #[test]
    fn test_empty_update_is_detectable() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            role: Some(Role::Fan),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
