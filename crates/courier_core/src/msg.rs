#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Any text the user sent, commands included.
    TextReceived(String),
    /// The effect runner finished a `ConvertAndDeliver` effect.
    ConversionFinished {
        url: String,
        outcome: ConversionOutcome,
    },
    /// The effect runner tried to store a preference change.
    PreferenceSaved { change: PreferenceChange, saved: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceChange {
    KindleEmail(String),
    ImageLinks(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Delivered(DeliveredArticle),
    /// `message` is already phrased for the user.
    Failed { message: String },
}

/// What the user is told about a delivered article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredArticle {
    pub title: String,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub missing_images: usize,
}
