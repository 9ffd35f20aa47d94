use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::managers::{registration::normalize_username, Invoker};
use crate::messages;
use crate::{Context, Error};

/// How long the invoker gets to reply with their username.
const USERNAME_WAIT: Duration = Duration::from_secs(30);

/// Register your Minecraft username for the server whitelist
#[poise::command(prefix_command, guild_only)]
pub async fn whitelist(ctx: Context<'_>) -> Result<(), Error> {
    let registration = &ctx.data().registration;
    let invoker_id = ctx.author().id.get();

    let display_name = match ctx.author_member().await {
        Some(member) => member.display_name().to_string(),
        None => ctx.author().name.clone(),
    };

    if let Some(refusal) = registration.check_registration(invoker_id, &display_name).await? {
        ctx.say(messages::refusal(&refusal)).await?;
        return Ok(());
    }

    ctx.say(messages::prompt_username()).await?;

    // Exactly one follow-up message from the same invoker, anywhere in the
    // guild, within the window.
    let reply = serenity::MessageCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .filter(|m| m.guild_id.is_some())
        .timeout(USERNAME_WAIT)
        .await;

    let Some(reply) = reply else {
        ctx.say(messages::timeout()).await?;
        return Ok(());
    };

    let Some(username) = normalize_username(&reply.content) else {
        ctx.say(messages::invalid_length()).await?;
        return Ok(());
    };

    // The whitelist can change while we wait for the reply, so check again.
    if registration.is_name_listed(&username).await? {
        ctx.say(messages::name_taken(&username)).await?;
        return Ok(());
    }

    ctx.say(messages::checking(&username)).await?;

    let Some(profile) = registration.resolve(&username).await else {
        ctx.say(messages::not_found(&username)).await?;
        return Ok(());
    };

    let mut body = messages::progress_start().to_string();
    let mut progress = ctx.channel_id().say(ctx.http(), body.as_str()).await?;

    body.push_str(&messages::progress_validated(&profile.name));
    progress
        .edit(ctx.http(), serenity::EditMessage::new().content(body.as_str()))
        .await?;

    body.push_str(&messages::progress_adding(&profile.name));
    progress
        .edit(ctx.http(), serenity::EditMessage::new().content(body.as_str()))
        .await?;

    let invoker = Invoker {
        id: invoker_id,
        tag: invoker_tag(ctx.author()),
    };

    if registration.register(&invoker, &profile).await? {
        let role_granted = grant_role(&ctx).await;
        body.push_str(&messages::success(&profile.name, role_granted));
        info!(
            "Whitelisted '{}' for {} (ID: {})",
            profile.name,
            ctx.author().name,
            invoker_id
        );
    } else {
        body.push_str(&messages::grant_failed(&profile.name));
    }

    progress
        .edit(ctx.http(), serenity::EditMessage::new().content(body.as_str()))
        .await?;

    Ok(())
}

/// Remove your own whitelist registration
#[poise::command(prefix_command, guild_only)]
pub async fn remove(ctx: Context<'_>) -> Result<(), Error> {
    let registration = &ctx.data().registration;
    let invoker_id = ctx.author().id.get();

    let Some(record) = registration.record_for(invoker_id).await? else {
        ctx.say(messages::not_registered()).await?;
        return Ok(());
    };

    if registration.unregister(&record).await? {
        revoke_role(&ctx).await;
        ctx.say(messages::removed()).await?;
        info!(
            "Removed whitelist entry '{}' for {} (ID: {})",
            record.minecraft_name,
            ctx.author().name,
            invoker_id
        );
    } else {
        ctx.say(messages::remove_failed()).await?;
    }

    Ok(())
}

fn invoker_tag(user: &serenity::User) -> String {
    match user.discriminator {
        Some(discriminator) => format!("{}#{:04}", user.name, discriminator),
        None => format!("{}#0000", user.name),
    }
}

/// Best effort; registration counts even when the role can't be granted.
async fn grant_role(ctx: &Context<'_>) -> bool {
    let config = &ctx.data().config;
    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };

    match guild_id.member(ctx.http(), ctx.author().id).await {
        Ok(member) => match member.add_role(ctx.http(), config.role_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to grant role {} to {}: {}",
                    config.role_id,
                    ctx.author().id,
                    e
                );
                false
            }
        },
        Err(e) => {
            warn!("Failed to fetch member {}: {}", ctx.author().id, e);
            false
        }
    }
}

async fn revoke_role(ctx: &Context<'_>) {
    let config = &ctx.data().config;
    let Some(guild_id) = ctx.guild_id() else {
        return;
    };

    match guild_id.member(ctx.http(), ctx.author().id).await {
        Ok(member) => {
            if let Err(e) = member.remove_role(ctx.http(), config.role_id).await {
                warn!(
                    "Failed to revoke role {} from {}: {}",
                    config.role_id,
                    ctx.author().id,
                    e
                );
            }
        }
        Err(e) => warn!("Failed to fetch member {}: {}", ctx.author().id, e),
    }
}
