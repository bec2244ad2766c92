use poise::serenity_prelude as serenity;
use serenity::Mentionable;
use tracing::info;

use crate::messages;
use crate::state::{StartOutcome, StopOutcome};
use crate::{Context, Error};

/// Start posting resale alerts in this channel
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a guild")?;
    let mention = ctx.author().mention().to_string();

    let outcome = ctx
        .data()
        .subscriptions
        .write()
        .await
        .start(&guild_id.to_string(), &ctx.channel_id().to_string(), &mention)
        .await?;

    let reply = match outcome {
        StartOutcome::Activated => messages::WATCH_STARTED,
        StartOutcome::AlreadyActive => {
            info!("Watch already active for guild {}", guild_id);
            messages::WATCH_ALREADY_ACTIVE
        }
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Stop posting resale alerts for this server
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a guild")?;

    let outcome = ctx
        .data()
        .subscriptions
        .write()
        .await
        .stop(&guild_id.to_string())
        .await?;

    let reply = match outcome {
        StopOutcome::Deactivated => messages::WATCH_STOPPED,
        StopOutcome::NothingToStop => {
            info!("No watch to stop for guild {}", guild_id);
            messages::NOTHING_TO_STOP
        }
    };
    ctx.say(reply).await?;
    Ok(())
}
