//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::bomb::{DEFAULT_BOMB_POWER, DEFAULT_EXPLOSION_MS, DEFAULT_FUSE_MS, MAX_BOMB_POWER};
use crate::game::movement::MovementEncoding;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,

    /// JSON arena layout; a seeded arena is generated when unset
    pub map_path: Option<PathBuf>,
    /// Seed for the generated arena
    pub map_seed: u64,
    /// Probability that a free cell of the generated arena holds a chest
    pub chest_density: f64,

    /// Wire encoding accepted for `playerMovement`
    pub movement_encoding: MovementEncoding,

    /// Blast radius in cells, at most `MAX_BOMB_POWER`
    pub bomb_power: u32,
    /// Delay between dropping a bomb and its detonation
    pub fuse_ms: u64,
    /// How long explosion markers stay visible
    pub explosion_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty() && s != "*")
                    .collect()
            })
            .unwrap_or_default();

        let chest_density: f64 = parse_or(&lookup, "CHEST_DENSITY", 0.6)?;
        if !(0.0..=1.0).contains(&chest_density) {
            return Err(ConfigError::Invalid("CHEST_DENSITY"));
        }

        let bomb_power: u32 = parse_or(&lookup, "BOMB_POWER", DEFAULT_BOMB_POWER)?;
        if bomb_power > MAX_BOMB_POWER {
            return Err(ConfigError::Invalid("BOMB_POWER"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origins,

            map_path: lookup("MAP_PATH").map(PathBuf::from),
            map_seed: parse_or(&lookup, "MAP_SEED", 0)?,
            chest_density,

            movement_encoding: parse_or(&lookup, "MOVEMENT_ENCODING", MovementEncoding::default())?,

            bomb_power,
            fuse_ms: parse_or(&lookup, "FUSE_MS", DEFAULT_FUSE_MS)?,
            explosion_ms: parse_or(&lookup, "EXPLOSION_MS", DEFAULT_EXPLOSION_MS)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = assert_ok!(config_from(&[]));
        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.bomb_power, 2);
        assert_eq!(config.fuse_ms, 2000);
        assert_eq!(config.explosion_ms, 567);
        assert!(config.map_path.is_none());
        assert!(config.client_origins.is_empty());
        assert_eq!(config.movement_encoding, MovementEncoding::Keys);
    }

    #[test]
    fn movement_encoding_is_selectable() {
        let config = assert_ok!(config_from(&[("MOVEMENT_ENCODING", "angle")]));
        assert_eq!(config.movement_encoding, MovementEncoding::Angle);

        let err = assert_err!(config_from(&[("MOVEMENT_ENCODING", "joystick")]));
        assert!(matches!(err, ConfigError::Invalid("MOVEMENT_ENCODING")));
    }

    #[test]
    fn bomb_power_is_bounded() {
        let config = assert_ok!(config_from(&[("BOMB_POWER", "64")]));
        assert_eq!(config.bomb_power, MAX_BOMB_POWER);

        let err = assert_err!(config_from(&[("BOMB_POWER", "65")]));
        assert!(matches!(err, ConfigError::Invalid("BOMB_POWER")));

        let err = assert_err!(config_from(&[("BOMB_POWER", "4294967295")]));
        assert!(matches!(err, ConfigError::Invalid("BOMB_POWER")));
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = assert_ok!(config_from(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]));
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn origins_are_split_and_wildcard_dropped() {
        let config = config_from(&[("CLIENT_ORIGIN", "http://a.test, *, http://b.test")]).unwrap();
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = assert_err!(config_from(&[("BOMB_POWER", "lots")]));
        assert!(matches!(err, ConfigError::Invalid("BOMB_POWER")));

        let err = assert_err!(config_from(&[("CHEST_DENSITY", "1.5")]));
        assert!(matches!(err, ConfigError::Invalid("CHEST_DENSITY")));

        let err = assert_err!(config_from(&[("SERVER_ADDR", "nowhere")]));
        assert!(matches!(err, ConfigError::InvalidAddress));
    }
}
