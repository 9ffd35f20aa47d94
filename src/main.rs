use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

/// Discord bot for Minecraft whitelist self-registration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Load environment variables from this file instead of `.env`
    #[arg(long)]
    env_file: Option<std::path::PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

mod commands;
mod config;
mod error;
mod managers;
mod messages;
mod state;
mod storage;

use commands::{list, remove, whitelist};
use config::BotConfig;
use managers::{
    check_command_access, MojangResolver, RconGateway, RegistrationManager, RoutingPolicy,
};
use state::{create_shared_verified_users, VerifiedUsers};
use storage::{RegistrationLog, WhitelistFile};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub registration: Arc<RegistrationManager>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| {
                anyhow::anyhow!("Failed to load env file {}: {}", path.display(), e)
            })?;
        }
        None => {
            dotenv().ok();
        }
    }

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if args.check_config {
        info!("Configuration OK");
        return Ok(());
    }

    let token = std::env::var("DISCORD_TOKEN").expect("Missing DISCORD_TOKEN environment variable");

    let verified = create_shared_verified_users(VerifiedUsers::new());
    let registration = Arc::new(RegistrationManager::new(
        WhitelistFile::new(&config.whitelist_path),
        RegistrationLog::new(&config.log_path),
        verified,
        Arc::new(MojangResolver::new()),
        Arc::new(RconGateway::new(
            &config.rcon_host,
            config.rcon_port,
            &config.rcon_password,
        )),
    ));

    info!(
        "Rebuilding verified-user index from {}...",
        config.log_path.display()
    );
    match registration.rebuild_verified_index().await {
        Ok(count) => info!("Restored {} registered user(s) from the log", count),
        Err(e) => warn!("Could not rebuild verified-user index: {}", e),
    }

    let mut bot_commands = vec![whitelist()];
    if config.enable_remove {
        bot_commands.push(remove());
    } else {
        info!("Self-service removal is disabled");
    }
    bot_commands.push(list());

    match config.routing {
        RoutingPolicy::ChannelOnly => info!(
            "Routing policy: commands accepted only in channel {}",
            config.target_channel
        ),
        RoutingPolicy::RoleBypass => info!(
            "Routing policy: role '{}' may use commands anywhere, others only in channel {}",
            config.role_name, config.target_channel
        ),
    }

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: bot_commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".to_string()),
                ..Default::default()
            },
            command_check: Some(|ctx| Box::pin(check_command_access(ctx))),
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id()
                            .map(|g| g.to_string())
                            .unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Error in command '{}': {}",
                                ctx.command().qualified_name,
                                error
                            );
                            let _ = ctx.say(format!("❌ An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
                            if let Some(error) = error {
                                error!(
                                    "Check failed for '{}': {}",
                                    ctx.command().qualified_name,
                                    error
                                );
                            }
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!(
                                "Command '{}' is guild-only, used in DM by {}",
                                ctx.command().qualified_name,
                                ctx.author().name
                            );
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |_ctx, ready, _framework| {
            let config = config.clone();
            let registration = registration.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);
                info!("Whitelist file: {}", config.whitelist_path.display());
                info!("Registration log: {}", config.log_path.display());
                info!("Ready to validate whitelist requests");

                Ok(Data {
                    config,
                    registration,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    warn!("Bot ended.");

    Ok(())
}
