use std::str::FromStr;

use poise::serenity_prelude::ChannelId;
use tracing::{debug, warn};

use crate::{Context, Error};

/// Who gets their commands processed, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPolicy {
    /// Commands are only processed in the configured channel.
    ChannelOnly,
    /// Holders of the elevated role may use commands in any channel;
    /// everyone else is restricted to the configured channel.
    RoleBypass,
}

impl FromStr for RoutingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" | "channel-only" => Ok(RoutingPolicy::ChannelOnly),
            "role" | "role-bypass" => Ok(RoutingPolicy::RoleBypass),
            other => Err(format!(
                "unknown routing policy '{}' (expected 'channel' or 'role-bypass')",
                other
            )),
        }
    }
}

pub fn command_allowed(
    policy: RoutingPolicy,
    target_channel: ChannelId,
    channel: ChannelId,
    has_elevated_role: bool,
) -> bool {
    match policy {
        RoutingPolicy::ChannelOnly => channel == target_channel,
        RoutingPolicy::RoleBypass => has_elevated_role || channel == target_channel,
    }
}

/// Whether the invoking member holds the elevated role, matched by the
/// configured id or by name.
pub async fn member_has_elevated_role(ctx: &Context<'_>) -> bool {
    let config = &ctx.data().config;

    let Some(member) = ctx.author_member().await else {
        return false;
    };
    if member.roles.contains(&config.role_id) {
        return true;
    }

    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    match guild_id.roles(ctx.http()).await {
        Ok(roles) => roles
            .iter()
            .any(|(id, role)| role.name == config.role_name && member.roles.contains(id)),
        Err(e) => {
            warn!("Failed to fetch roles for guild {}: {}", guild_id, e);
            false
        }
    }
}

/// Global command gate. Returning `Ok(false)` makes the framework drop the
/// invocation silently, so unauthorized commands are ignored rather than
/// answered.
pub async fn check_command_access(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.guild_id().is_none() {
        return Ok(false);
    }

    let config = &ctx.data().config;
    let has_elevated_role = match config.routing {
        RoutingPolicy::ChannelOnly => false,
        RoutingPolicy::RoleBypass => member_has_elevated_role(&ctx).await,
    };

    let allowed = command_allowed(
        config.routing,
        config.target_channel,
        ctx.channel_id(),
        has_elevated_role,
    );

    if !allowed {
        debug!(
            "Ignoring '{}' from {} in channel {}",
            ctx.command().qualified_name,
            ctx.author().name,
            ctx.channel_id()
        );
    }

    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ChannelId {
        ChannelId::new(100)
    }

    fn elsewhere() -> ChannelId {
        ChannelId::new(200)
    }

    #[test]
    fn channel_only_ignores_other_channels() {
        let policy = RoutingPolicy::ChannelOnly;

        assert!(command_allowed(policy, target(), target(), false));
        assert!(!command_allowed(policy, target(), elsewhere(), false));
        // The role changes nothing under this policy.
        assert!(!command_allowed(policy, target(), elsewhere(), true));
    }

    #[test]
    fn role_bypass_admits_role_holders_anywhere() {
        let policy = RoutingPolicy::RoleBypass;

        assert!(command_allowed(policy, target(), elsewhere(), true));
        assert!(command_allowed(policy, target(), target(), false));
        assert!(!command_allowed(policy, target(), elsewhere(), false));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "channel".parse::<RoutingPolicy>(),
            Ok(RoutingPolicy::ChannelOnly)
        );
        assert_eq!(
            " Role-Bypass ".parse::<RoutingPolicy>(),
            Ok(RoutingPolicy::RoleBypass)
        );
        assert!("everywhere".parse::<RoutingPolicy>().is_err());
    }
}
