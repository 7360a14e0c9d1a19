use anyhow::{ensure, Context};

const DEFAULT_DATABASE_URL: &str = "sqlite://forum.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Process configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub frontend_url: Option<String>, // extra CORS origin
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let max_connections = match get("FORUM_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("FORUM_MAX_CONNECTIONS must be an integer, got `{raw}`"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        ensure!(max_connections > 0, "FORUM_MAX_CONNECTIONS must be at least 1");

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: get("FORUM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_connections,
            frontend_url: get("FRONTEND_URL").filter(|v| !v.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(s.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(s.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(s.frontend_url.is_none());
    }

    #[test]
    fn overrides_and_bad_values() {
        let s = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("FORUM_MAX_CONNECTIONS", " 8 "),
            ("FRONTEND_URL", "http://localhost:5173"),
        ]))
        .unwrap();
        assert_eq!(s.database_url, "sqlite::memory:");
        assert_eq!(s.max_connections, 8);
        assert_eq!(s.frontend_url.as_deref(), Some("http://localhost:5173"));

        assert!(Settings::from_lookup(lookup(&[("FORUM_MAX_CONNECTIONS", "many")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("FORUM_MAX_CONNECTIONS", "0")])).is_err());
    }
}
