pub mod config;
pub mod effects;
pub mod logging;
pub mod messages;
pub mod sessions;
pub mod telegram;

pub use config::{AppConfig, SmtpConfig};
pub use effects::{ChatSink, EffectRunner};
pub use sessions::Sessions;
