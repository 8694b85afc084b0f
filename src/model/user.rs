use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::System
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub currency: String,
    #[serde(default)]
    pub theme: Theme,
    pub notifications: bool,
    pub email_updates: bool,
    pub push_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            currency: DEFAULT_CURRENCY.to_string(),
            theme: Theme::System,
            notifications: true,
            email_updates: true,
            push_notifications: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Identity-provider subject, e.g. "google:<sub>" or "email:<address>".
    pub external_id: Option<String>,
    pub created_ts: i64,
    #[serde(default)]
    pub updated_ts: i64,
    pub password_hash: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    pub meta: Option<serde_json::Value>,
}

impl User {
    /// Name for display: explicit name, then the local part of the email,
    /// then a generic placeholder.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(email) = &self.email {
            if let Some(local) = email.split('@').next() {
                if !local.is_empty() {
                    return local.to_string();
                }
            }
        }
        "User".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let user = User {
            id: "u1".into(),
            name: None,
            email: Some("sarah@example.com".into()),
            avatar_url: None,
            external_id: None,
            created_ts: 0,
            updated_ts: 0,
            password_hash: None,
            preferences: Preferences::default(),
            meta: None,
        };
        assert_eq!(user.display_name(), "sarah");
    }

    #[test]
    fn preferences_default_matches_new_profile() {
        let prefs = Preferences::default();
        assert_eq!(prefs.currency, DEFAULT_CURRENCY);
        assert_eq!(prefs.theme, Theme::System);
        assert!(prefs.notifications);
        assert!(!prefs.push_notifications);
    }
}
