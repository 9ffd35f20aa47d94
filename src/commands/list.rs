use tracing::info;

use crate::managers::member_has_elevated_role;
use crate::messages;
use crate::{Context, Error};

/// List every whitelisted player (elevated role required)
#[poise::command(prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    if !member_has_elevated_role(&ctx).await {
        ctx.say(messages::missing_role()).await?;
        return Ok(());
    }

    let entries = ctx.data().registration.entries().await?;
    if entries.is_empty() {
        ctx.say(messages::empty_whitelist()).await?;
        return Ok(());
    }

    info!(
        "Listing {} whitelist entries for {}",
        entries.len(),
        ctx.author().name
    );
    ctx.say(messages::whitelist_listing(&entries)).await?;

    Ok(())
}
