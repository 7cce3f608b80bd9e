use crate::{
    is_kindle_address, parse_article_url, Command, ConversionOutcome, Conversation,
    DeliveredArticle, Effect, Msg, Phase, PreferenceChange,
};

const HELP_TEXT: &str = "Hi! Use /config to set up your Kindle email. \
Afterwards use /send to process an article, or just paste a link.\n\
/images on|off toggles links on images in the generated book.";
const EMAIL_PROMPT: &str = "Please enter your Kindle email address:";
const INVALID_EMAIL: &str =
    "Please provide a valid Kindle email address (ending with @kindle.com)";
const LINK_PROMPT: &str = "Please provide the article link:";
const INVALID_LINK: &str = "That does not look like a link. Please send an http(s) URL.";
const NEEDS_CONFIG: &str = "Please configure your Kindle email first using /config";
const EMAIL_NOT_SAVED: &str =
    "Sorry, your Kindle email could not be saved. Please try /config again.";
const IMAGE_LINKS_NOT_SAVED: &str = "Sorry, the image setting could not be saved. Please try again.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: Conversation, msg: Msg) -> (Conversation, Vec<Effect>) {
    let effects = match msg {
        Msg::TextReceived(text) => match Command::parse(&text) {
            Some(command) => handle_command(&mut state, command),
            None => handle_text(&mut state, text.trim()),
        },
        Msg::ConversionFinished { url: _, outcome } => {
            state.finish_conversion();
            vec![Effect::Reply(outcome_message(&outcome))]
        }
        Msg::PreferenceSaved { change, saved } => preference_saved(&mut state, change, saved),
    };

    (state, effects)
}

fn handle_command(state: &mut Conversation, command: Command) -> Vec<Effect> {
    match command {
        Command::Start | Command::Help => {
            state.set_phase(Phase::Idle);
            vec![Effect::Reply(HELP_TEXT.to_string())]
        }
        Command::Config => {
            state.set_phase(Phase::AwaitingEmail);
            let prompt = match state.kindle_email() {
                Some(current) => format!(
                    "Your current Kindle email is: {current}\nEnter a new email to update:"
                ),
                None => EMAIL_PROMPT.to_string(),
            };
            vec![Effect::Reply(prompt)]
        }
        Command::Send(Some(arg)) => match parse_article_url(&arg) {
            Some(url) => {
                state.set_phase(Phase::Idle);
                start_conversion(state, url)
            }
            None => {
                state.set_phase(Phase::AwaitingLink);
                vec![Effect::Reply(INVALID_LINK.to_string())]
            }
        },
        Command::Send(None) => {
            state.set_phase(Phase::AwaitingLink);
            vec![Effect::Reply(LINK_PROMPT.to_string())]
        }
        Command::Images(Some(enabled)) => vec![Effect::SetImageLinks(enabled)],
        Command::Images(None) => {
            let status = image_links_status(state.preserve_image_links());
            vec![Effect::Reply(format!("{status}\nUse /images on or /images off to change it."))]
        }
        Command::Cancel => {
            state.set_phase(Phase::Idle);
            vec![Effect::Reply("Cancelled.".to_string())]
        }
        Command::Unknown(name) => {
            vec![Effect::Reply(format!("Unknown command /{name}.\n{HELP_TEXT}"))]
        }
    }
}

fn handle_text(state: &mut Conversation, text: &str) -> Vec<Effect> {
    match state.phase() {
        Phase::AwaitingEmail => {
            if !is_kindle_address(text) {
                return vec![Effect::Reply(INVALID_EMAIL.to_string())];
            }
            state.set_phase(Phase::Idle);
            vec![Effect::SaveKindleEmail(text.to_string())]
        }
        Phase::AwaitingLink | Phase::Idle => match parse_article_url(text) {
            Some(url) => {
                state.set_phase(Phase::Idle);
                start_conversion(state, url)
            }
            None if state.phase() == Phase::AwaitingLink => {
                vec![Effect::Reply(INVALID_LINK.to_string())]
            }
            None => vec![Effect::Reply(HELP_TEXT.to_string())],
        },
    }
}

/// State only changes once the store has accepted the change.
fn preference_saved(state: &mut Conversation, change: PreferenceChange, saved: bool) -> Vec<Effect> {
    match (change, saved) {
        (PreferenceChange::KindleEmail(email), true) => {
            state.set_kindle_email(email);
            let reply = match state.sender_address() {
                Some(sender) => format!(
                    "Thank you! Now please add {sender} to your approved sender list in your Kindle settings."
                ),
                None => "Thank you! Your Kindle email has been saved.".to_string(),
            };
            vec![Effect::Reply(reply)]
        }
        (PreferenceChange::KindleEmail(_), false) => vec![Effect::Reply(EMAIL_NOT_SAVED.to_string())],
        (PreferenceChange::ImageLinks(enabled), true) => {
            state.set_preserve_image_links(enabled);
            vec![Effect::Reply(image_links_status(enabled))]
        }
        (PreferenceChange::ImageLinks(_), false) => {
            vec![Effect::Reply(IMAGE_LINKS_NOT_SAVED.to_string())]
        }
    }
}

fn start_conversion(state: &mut Conversation, url: String) -> Vec<Effect> {
    if let Some(current) = state.in_flight() {
        return vec![Effect::Reply(format!(
            "Still working on {current}. Please wait for it to finish."
        ))];
    }
    let Some(to) = state.kindle_email().map(str::to_string) else {
        return vec![Effect::Reply(NEEDS_CONFIG.to_string())];
    };
    state.begin_conversion(url.clone());
    vec![
        Effect::ShowTyping,
        Effect::ConvertAndDeliver {
            url,
            to,
            preserve_image_links: state.preserve_image_links(),
        },
    ]
}

fn image_links_status(enabled: bool) -> String {
    if enabled {
        "Images will link back to their original source.".to_string()
    } else {
        "Images will be embedded without links.".to_string()
    }
}

fn outcome_message(outcome: &ConversionOutcome) -> String {
    match outcome {
        ConversionOutcome::Delivered(article) => delivered_message(article),
        ConversionOutcome::Failed { message } => format!("Error: {message}"),
    }
}

fn delivered_message(article: &DeliveredArticle) -> String {
    let mut text = String::from("Article has been sent to your Kindle!\n\n");
    text.push_str(&article.title);
    if let Some(author) = &article.author {
        text.push_str(&format!("\nBy {author}"));
    }
    if let Some(publication) = &article.publication {
        text.push_str(&format!("\nFrom: {publication}"));
    }
    match article.missing_images {
        0 => {}
        1 => text.push_str("\n\n1 image could not be downloaded."),
        n => text.push_str(&format!("\n\n{n} images could not be downloaded.")),
    }
    text
}
