use anyhow::{bail, Result};

const DEFAULT_USER: &str = "@bot_homelab:matrix.org";
const DEFAULT_HOMESERVER: &str = "https://matrix.org";

/// Process-wide settings, loaded once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fully qualified Matrix user ID of the bot account.
    pub user: String,
    pub password: String,
    /// Homeserver base URL, without a trailing slash.
    pub homeserver: String,
    pub room_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Tests inject a map here
    /// instead of mutating the process environment.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = lookup("MATRIX_USER").unwrap_or_else(|| DEFAULT_USER.to_string());
        let homeserver = lookup("HOMESERVER").unwrap_or_else(|| DEFAULT_HOMESERVER.to_string());

        let password = match lookup("MATRIX_PASSWORD") {
            Some(p) if !p.is_empty() => p,
            _ => bail!("MATRIX_PASSWORD is not set"),
        };
        let room_id = match lookup("ROOM_ID") {
            Some(r) if !r.is_empty() => r,
            _ => bail!("ROOM_ID is not set"),
        };

        Ok(Self {
            user,
            password,
            homeserver: homeserver.trim_end_matches('/').to_string(),
            room_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::load_from(lookup(&[
            ("MATRIX_PASSWORD", "hunter2"),
            ("ROOM_ID", "!room:matrix.org"),
        ]))
        .unwrap();

        assert_eq!(config.user, "@bot_homelab:matrix.org");
        assert_eq!(config.homeserver, "https://matrix.org");
        assert_eq!(config.room_id, "!room:matrix.org");
    }

    #[test]
    fn test_explicit_values_win() {
        let config = Config::load_from(lookup(&[
            ("MATRIX_USER", "@other:example.org"),
            ("MATRIX_PASSWORD", "hunter2"),
            ("HOMESERVER", "https://example.org/"),
            ("ROOM_ID", "!room:example.org"),
        ]))
        .unwrap();

        assert_eq!(config.user, "@other:example.org");
        // Trailing slash is stripped so URL joins stay clean
        assert_eq!(config.homeserver, "https://example.org");
    }

    #[test]
    fn test_missing_password_is_an_error() {
        let err = Config::load_from(lookup(&[("ROOM_ID", "!room:matrix.org")])).unwrap_err();
        assert!(err.to_string().contains("MATRIX_PASSWORD"));
    }

    #[test]
    fn test_missing_room_is_an_error() {
        let err = Config::load_from(lookup(&[("MATRIX_PASSWORD", "hunter2")])).unwrap_err();
        assert!(err.to_string().contains("ROOM_ID"));
    }

    #[test]
    fn test_empty_required_value_is_an_error() {
        assert!(Config::load_from(lookup(&[
            ("MATRIX_PASSWORD", ""),
            ("ROOM_ID", "!room:matrix.org"),
        ]))
        .is_err());
    }
}
