// src/messages.rs

pub const CARD_TITLE: &str = "New ticket";
pub const CARD_DESCRIPTION: &str = "A ticket has just been put up for resale!";
pub const CARD_TEAMS_FIELD: &str = "Teams";

pub const WATCH_STARTED: &str = "✅ Resale watch activated. Notifications will be posted in this channel.";
pub const WATCH_ALREADY_ACTIVE: &str = "ℹ️ The resale watch is already active on this server.";
pub const WATCH_STOPPED: &str = "🛑 Resale watch deactivated.";
pub const NOTHING_TO_STOP: &str = "ℹ️ There is no active resale watch to stop.";

pub fn transition_mention(mention_target: &str) -> String {
    format!("{} Here are the detected changes:", mention_target)
}
