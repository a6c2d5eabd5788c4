mod config;
mod engine;

pub use config::SessionConfig;
pub use engine::{format_countdown, SessionState, SessionTimer};
