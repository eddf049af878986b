use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9001";
pub const DEFAULT_TICK_MS: u64 = 1_000;
pub const DEFAULT_REFRESH_MS: u64 = 200;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Production cadence.
    pub tick_interval: Duration,
    /// How often each client is sent a fresh snapshot.
    pub refresh_interval: Duration,
    /// Overrides the catalog's starting balance when set.
    pub starting_coins: Option<u64>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_MS),
            starting_coins: None,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values are
    /// reported and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tick_ms = parse_or(get("GAME_TICK_MS"), "GAME_TICK_MS", DEFAULT_TICK_MS);
        let refresh_ms = parse_or(get("GAME_REFRESH_MS"), "GAME_REFRESH_MS", DEFAULT_REFRESH_MS);

        Self {
            bind_addr: get("GAME_BIND_ADDR").unwrap_or(defaults.bind_addr),
            tick_interval: Duration::from_millis(nonzero(tick_ms, "GAME_TICK_MS", DEFAULT_TICK_MS)),
            refresh_interval: Duration::from_millis(nonzero(
                refresh_ms,
                "GAME_REFRESH_MS",
                DEFAULT_REFRESH_MS,
            )),
            starting_coins: get("GAME_STARTING_COINS").and_then(|raw| {
                raw.parse::<u64>()
                    .map_err(|e| warn!("Ignoring GAME_STARTING_COINS={:?}: {}", raw, e))
                    .ok()
            }),
            catalog_path: get("GAME_CATALOG_PATH").map(PathBuf::from),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            default
        }),
    }
}

fn nonzero(value: u64, key: &str, default: u64) -> u64 {
    if value == 0 {
        warn!("{} must be positive, using {}", key, default);
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn reads_every_key() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("GAME_BIND_ADDR", "0.0.0.0:7000"),
            ("GAME_TICK_MS", "500"),
            ("GAME_REFRESH_MS", " 100 "),
            ("GAME_STARTING_COINS", "1000000"),
            ("GAME_CATALOG_PATH", "/tmp/catalog.json"),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:7000");
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.refresh_interval, Duration::from_millis(100));
        assert_eq!(config.starting_coins, Some(1_000_000));
        assert_eq!(config.catalog_path, Some(PathBuf::from("/tmp/catalog.json")));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("GAME_TICK_MS", "fast"),
            ("GAME_REFRESH_MS", "0"),
            ("GAME_STARTING_COINS", "-5"),
            ("GAME_BIND_ADDR", "   "),
        ]));
        assert_eq!(config, ServerConfig::default());
    }
}
