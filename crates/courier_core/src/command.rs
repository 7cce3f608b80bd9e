/// Slash commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Config,
    /// `/send` with an optional inline argument.
    Send(Option<String>),
    /// `/images`, `/images on`, `/images off`. Unrecognized arguments parse as `None`.
    Images(Option<bool>),
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parses `/name[@botname] [args]`. Returns `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }
        let arg = (!args.is_empty()).then(|| args.to_string());

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "config" => Command::Config,
            "send" => Command::Send(arg),
            "images" => Command::Images(arg.as_deref().and_then(parse_toggle)),
            "cancel" => Command::Cancel,
            _ => Command::Unknown(name),
        };
        Some(command)
    }
}

fn parse_toggle(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
