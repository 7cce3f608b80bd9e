//! Courier core: article data model and the pure bot conversation state machine.
mod command;
mod effect;
mod model;
mod msg;
mod state;
mod update;
mod validate;

pub use command::Command;
pub use effect::Effect;
pub use model::{title_from_url, ArticleRecord, ContentBlock, ImageRef, UNTITLED};
pub use msg::{ConversionOutcome, DeliveredArticle, Msg, PreferenceChange};
pub use state::{Conversation, Phase};
pub use update::update;
pub use validate::{is_kindle_address, parse_article_url};
