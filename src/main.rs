use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that announces resale tickets for sold-out matches
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Directory for the snapshot and subscription files (overrides STATE_PATH)
    #[arg(long)]
    state_path: Option<PathBuf>,
}

mod commands;
mod config;
mod error;
mod logging;
mod messages;
mod models;
mod scrape;
mod state;
mod watcher;

use commands::{help, ping, start, stop};
use config::WatchConfig;
use scrape::ChromeSession;
use state::{
    create_shared_subscription_registry, JsonSnapshotStore, SharedSubscriptionRegistry,
    SubscriptionRegistry,
};
use watcher::{DiscordSink, PollLoop};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub subscriptions: SharedSubscriptionRegistry,
}

/// Log the application ID encoded in the first segment of the token
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Some(id_str) = decoded.ok().and_then(|bytes| String::from_utf8(bytes).ok()) {
        info!("Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)", id_str, id_str);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init(logging::level_from_env());

    let mut watch_config = WatchConfig::from_env()?;
    if let Some(path) = args.state_path.clone() {
        watch_config.state_path = path;
    }

    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    log_bot_id(&token);

    // Ensure state directory exists
    tokio::fs::create_dir_all(&watch_config.state_path).await.ok();
    if let Err(e) = watch_config.adopt_legacy_files(std::path::Path::new(".")).await {
        warn!("Could not adopt legacy state files: {}", e);
    }

    info!("Loading subscriptions...");
    let subscriptions_path = watch_config.subscriptions_file();
    let registry = SubscriptionRegistry::load(&subscriptions_path)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load subscriptions: {}, using empty registry", e);
            SubscriptionRegistry::new(subscriptions_path.clone())
        });
    info!("{} subscription(s) loaded", registry.len());
    let subscriptions = create_shared_subscription_registry(registry);

    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![start(), stop(), ping(), help()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let subscriptions = subscriptions.clone();
            let watch_config = watch_config.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                if guild_commands || sync_commands {
                    let guilds: Vec<serenity::GuildId> = match target_guild_id {
                        Some(gid) => vec![serenity::GuildId::new(gid)],
                        None => ready.guilds.iter().map(|g| g.id).collect(),
                    };
                    for guild_id in &guilds {
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Registered commands for guild {}", guild_id);
                        }
                    }
                } else if let Err(e) =
                    poise::builtins::register_globally(ctx, &framework.options().commands).await
                {
                    error!("Failed to register commands globally: {}", e);
                }

                let store = Arc::new(JsonSnapshotStore::new(watch_config.snapshot_file()));
                let sink = Arc::new(DiscordSink::new(ctx.http.clone()));
                let poll_loop = PollLoop::new(
                    ChromeSession::new(watch_config.session_config()),
                    store,
                    sink,
                    subscriptions.clone(),
                    watch_config.poll_settings(),
                )
                .await?;
                tokio::spawn(poll_loop.run());

                Ok(Data { subscriptions })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable MESSAGE_CONTENT under Bot -> Privileged Gateway Intents in the Discord Developer Portal");
            return Err(anyhow::anyhow!("Disallowed gateway intents: MESSAGE_CONTENT"));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
