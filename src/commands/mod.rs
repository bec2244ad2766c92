pub mod general;
pub mod watch;

pub use general::{help, ping};
pub use watch::{start, stop};
