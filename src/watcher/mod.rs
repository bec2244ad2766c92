//! Change detection and notification pipeline

pub mod differ;
pub mod notifier;
pub mod poll_loop;
pub mod slug;

pub use notifier::DiscordSink;
pub use poll_loop::{PollLoop, PollSettings};
