use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{BotError, Result};
use crate::messages;
use crate::models::MatchRecord;
use crate::state::Subscription;
use crate::watcher::slug::resale_link;

pub const CARD_COLOR: u32 = 0x00ff00;

/// Rich card sent after the mention line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCard {
    pub color: u32,
    pub title: String,
    pub url: String,
    pub description: String,
    pub teams: String,
}

/// One outbound message pair for one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub mention_line: String,
    pub card: NotificationCard,
}

impl Notification {
    pub fn for_transition(mention_target: &str, record: &MatchRecord) -> Self {
        Self {
            mention_line: messages::transition_mention(mention_target),
            card: NotificationCard {
                color: CARD_COLOR,
                title: messages::CARD_TITLE.to_string(),
                url: resale_link(record),
                description: messages::CARD_DESCRIPTION.to_string(),
                teams: format!("**{}**", record.display_teams()),
            },
        }
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, channel_id: &str, notification: &Notification) -> Result<()>;
}

/// Sends notifications through the Discord REST API
pub struct DiscordSink {
    http: Arc<serenity::Http>,
}

impl DiscordSink {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn deliver(&self, channel_id: &str, notification: &Notification) -> Result<()> {
        let channel = channel_id
            .parse::<u64>()
            .map(serenity::ChannelId::new)
            .map_err(|_| BotError::Discord {
                message: format!("invalid channel id '{}'", channel_id),
            })?;

        let card = &notification.card;
        let embed = serenity::CreateEmbed::new()
            .color(card.color)
            .title(&card.title)
            .url(&card.url)
            .description(&card.description)
            .field(messages::CARD_TEAMS_FIELD, &card.teams, false)
            .timestamp(serenity::Timestamp::now());

        channel.say(&self.http, &notification.mention_line).await?;
        channel
            .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

/// Send one message pair per transition to a subscriber.
///
/// Delivery failures are logged and do not stop the remaining messages.
/// Returns the number of message pairs delivered.
pub async fn notify(
    sink: &dyn MessageSink,
    subscription: &Subscription,
    transitions: &[MatchRecord],
) -> usize {
    let mut delivered = 0;
    for record in transitions {
        let notification = Notification::for_transition(&subscription.mention_target, record);
        match sink.deliver(&subscription.channel_id, &notification).await {
            Ok(()) => delivered += 1,
            Err(e) => error!(
                "Failed to notify channel {} about {}: {}",
                subscription.channel_id,
                record.display_teams(),
                e
            ),
        }
    }

    if delivered > 0 {
        info!(
            "Sent {} notification(s) to channel {}",
            delivered, subscription.channel_id
        );
    }
    delivered
}
