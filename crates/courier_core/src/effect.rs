#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Reply(String),
    ShowTyping,
    SaveKindleEmail(String),
    SetImageLinks(bool),
    /// Run the fetch/extract/package pipeline and mail the result.
    /// Everything the run needs travels with the effect.
    ConvertAndDeliver {
        url: String,
        to: String,
        preserve_image_links: bool,
    },
}
