use std::path::PathBuf;
use std::str::FromStr;

use poise::serenity_prelude::{ChannelId, RoleId};

use crate::error::{BotError, Result};
use crate::managers::RoutingPolicy;

/// Runtime configuration, read once from the environment at startup.
///
/// Everything security-sensitive is required; nothing ships a placeholder
/// default.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// JSON whitelist mirror file.
    pub whitelist_path: PathBuf,
    /// Append-only registration log file.
    pub log_path: PathBuf,
    /// Channel where commands are accepted.
    pub target_channel: ChannelId,
    pub rcon_host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    /// Role granted after a successful registration; also the elevated role
    /// for routing bypass and the listing command.
    pub role_id: RoleId,
    pub role_name: String,
    pub routing: RoutingPolicy,
    /// Whether `!remove` self-service removal is available.
    pub enable_remove: bool,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let target_channel = nonzero("TARGET_CHANNEL_ID", parse_required("TARGET_CHANNEL_ID")?)?;
        let role_id = nonzero("WHITELIST_ROLE_ID", parse_required("WHITELIST_ROLE_ID")?)?;

        let routing = match std::env::var("ROUTING_POLICY") {
            Ok(raw) => {
                RoutingPolicy::from_str(&raw).map_err(|message| BotError::ConfigInvalid {
                    name: "ROUTING_POLICY".to_string(),
                    message,
                })?
            }
            Err(_) => RoutingPolicy::ChannelOnly,
        };

        let enable_remove = match std::env::var("ENABLE_REMOVE") {
            Ok(raw) => parse_bool("ENABLE_REMOVE", &raw)?,
            Err(_) => true,
        };

        Ok(Self {
            whitelist_path: PathBuf::from(require("WHITELIST_PATH")?),
            log_path: PathBuf::from(require("REGISTRATION_LOG_PATH")?),
            target_channel: ChannelId::new(target_channel),
            rcon_host: require("RCON_HOST")?,
            rcon_port: match std::env::var("RCON_PORT") {
                Ok(raw) => parse("RCON_PORT", &raw)?,
                Err(_) => 25575,
            },
            rcon_password: require("RCON_PASSWORD")?,
            role_id: RoleId::new(role_id),
            role_name: require("WHITELIST_ROLE_NAME")?,
            routing,
            enable_remove,
        })
    }
}

fn require(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BotError::ConfigMissing {
            name: name.to_string(),
        }),
    }
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| BotError::ConfigInvalid {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn parse_required<T: FromStr>(name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    parse(name, &require(name)?)
}

fn nonzero(name: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(BotError::ConfigInvalid {
            name: name.to_string(),
            message: "id must be non-zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(BotError::ConfigInvalid {
            name: name.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_parse_loosely() {
        assert!(parse_bool("X", "true").expect("parse"));
        assert!(parse_bool("X", "1").expect("parse"));
        assert!(parse_bool("X", " Yes ").expect("parse"));
        assert!(!parse_bool("X", "false").expect("parse"));
        assert!(!parse_bool("X", "0").expect("parse"));
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn zero_ids_are_rejected() {
        assert!(nonzero("X", 0).is_err());
        assert_eq!(nonzero("X", 5).expect("nonzero"), 5);
    }
}
