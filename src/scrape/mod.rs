pub mod extractor;
pub mod renderer;

pub use extractor::Extractor;
pub use renderer::{ChromeSession, Readiness, Renderer, SessionConfig, TARGET_URL};
