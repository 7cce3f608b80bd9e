#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingEmail,
    AwaitingLink,
}

/// Per-user conversation state.
///
/// Seeded from the preference store when a user first writes; afterwards
/// `update` keeps the cached preferences in step with the effects it emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conversation {
    phase: Phase,
    kindle_email: Option<String>,
    preserve_image_links: bool,
    in_flight: Option<String>,
    sender_address: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferences(kindle_email: Option<String>, preserve_image_links: bool) -> Self {
        Self {
            kindle_email,
            preserve_image_links,
            ..Self::default()
        }
    }

    /// Address users must add to their approved sender list.
    pub fn with_sender_address(mut self, sender: impl Into<String>) -> Self {
        self.sender_address = Some(sender.into());
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kindle_email(&self) -> Option<&str> {
        self.kindle_email.as_deref()
    }

    pub fn preserve_image_links(&self) -> bool {
        self.preserve_image_links
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub(crate) fn sender_address(&self) -> Option<&str> {
        self.sender_address.as_deref()
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_kindle_email(&mut self, email: String) {
        self.kindle_email = Some(email);
    }

    pub(crate) fn set_preserve_image_links(&mut self, enabled: bool) {
        self.preserve_image_links = enabled;
    }

    pub(crate) fn begin_conversion(&mut self, url: String) {
        self.in_flight = Some(url);
    }

    pub(crate) fn finish_conversion(&mut self) {
        self.in_flight = None;
    }
}
