use std::sync::Once;

use courier_core::{
    update, ConversionOutcome, Conversation, DeliveredArticle, Effect, Msg, Phase,
    PreferenceChange,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(courier_logging::initialize_for_tests);
}

fn say(state: Conversation, text: &str) -> (Conversation, Vec<Effect>) {
    update(state, Msg::TextReceived(text.to_string()))
}

fn saved(state: Conversation, change: PreferenceChange, saved: bool) -> (Conversation, Vec<Effect>) {
    update(state, Msg::PreferenceSaved { change, saved })
}

fn configured() -> Conversation {
    Conversation::with_preferences(Some("reader@kindle.com".to_string()), false)
}

#[test]
fn config_then_valid_email_saves_and_reminds_sender() {
    init_logging();
    let state = Conversation::new().with_sender_address("to_kindle@example.org");

    let (state, effects) = say(state, "/config");
    assert_eq!(state.phase(), Phase::AwaitingEmail);
    assert_eq!(
        effects,
        vec![Effect::Reply("Please enter your Kindle email address:".to_string())]
    );

    let (state, effects) = say(state, "reader@kindle.com");
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.kindle_email(), None);
    assert_eq!(
        effects,
        vec![Effect::SaveKindleEmail("reader@kindle.com".to_string())]
    );

    let change = PreferenceChange::KindleEmail("reader@kindle.com".to_string());
    let (state, effects) = saved(state, change, true);
    assert_eq!(state.kindle_email(), Some("reader@kindle.com"));
    assert_eq!(
        effects,
        vec![Effect::Reply(
            "Thank you! Now please add to_kindle@example.org to your approved sender list in your Kindle settings."
                .to_string()
        )]
    );
}

#[test]
fn unsaved_email_is_not_adopted() {
    init_logging();
    let (state, _) = say(Conversation::new(), "/config");
    let (state, _) = say(state, "reader@kindle.com");

    let change = PreferenceChange::KindleEmail("reader@kindle.com".to_string());
    let (state, effects) = saved(state, change, false);
    assert_eq!(state.kindle_email(), None);
    assert_eq!(
        effects,
        vec![Effect::Reply(
            "Sorry, your Kindle email could not be saved. Please try /config again.".to_string()
        )]
    );
}

#[test]
fn invalid_email_keeps_waiting() {
    init_logging();
    let (state, _) = say(Conversation::new(), "/config");
    let (state, effects) = say(state, "reader@gmail.com");

    assert_eq!(state.phase(), Phase::AwaitingEmail);
    assert_eq!(state.kindle_email(), None);
    assert!(matches!(effects.as_slice(), [Effect::Reply(text)] if text.contains("@kindle.com")));
}

#[test]
fn config_mentions_current_address() {
    init_logging();
    let (_state, effects) = say(configured(), "/config");
    assert!(matches!(
        effects.as_slice(),
        [Effect::Reply(text)] if text.starts_with("Your current Kindle email is: reader@kindle.com")
    ));
}

#[test]
fn send_with_inline_url_converts_immediately() {
    init_logging();
    let (state, effects) = say(configured(), "/send https://win.substack.com/p/bots");

    assert_eq!(state.in_flight(), Some("https://win.substack.com/p/bots"));
    assert_eq!(
        effects,
        vec![
            Effect::ShowTyping,
            Effect::ConvertAndDeliver {
                url: "https://win.substack.com/p/bots".to_string(),
                to: "reader@kindle.com".to_string(),
                preserve_image_links: false,
            },
        ]
    );
}

#[test]
fn send_without_url_waits_for_link() {
    init_logging();
    let (state, effects) = say(configured(), "/send");
    assert_eq!(state.phase(), Phase::AwaitingLink);
    assert_eq!(
        effects,
        vec![Effect::Reply("Please provide the article link:".to_string())]
    );

    let (state, effects) = say(state, "not a link");
    assert_eq!(state.phase(), Phase::AwaitingLink);
    assert_eq!(effects.len(), 1);

    let (state, effects) = say(state, "https://example.com/p/post");
    assert_eq!(state.phase(), Phase::Idle);
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::ConvertAndDeliver { url, .. } if url == "https://example.com/p/post")));
}

#[test]
fn bare_link_while_idle_is_converted() {
    init_logging();
    let (_state, effects) = say(configured(), "https://example.com/p/post");
    assert!(effects.contains(&Effect::ShowTyping));
}

#[test]
fn conversion_requires_configured_email() {
    init_logging();
    let (state, effects) = say(Conversation::new(), "https://example.com/p/post");

    assert_eq!(state.in_flight(), None);
    assert_eq!(
        effects,
        vec![Effect::Reply(
            "Please configure your Kindle email first using /config".to_string()
        )]
    );
}

#[test]
fn second_conversion_is_refused_while_one_is_running() {
    init_logging();
    let (state, _) = say(configured(), "https://example.com/p/one");
    let (state, effects) = say(state, "https://example.com/p/two");

    assert_eq!(state.in_flight(), Some("https://example.com/p/one"));
    assert!(matches!(effects.as_slice(), [Effect::Reply(text)] if text.starts_with("Still working on")));
}

#[test]
fn image_toggle_flows_into_next_conversion() {
    init_logging();
    let (state, effects) = say(configured(), "/images on");
    assert_eq!(effects, vec![Effect::SetImageLinks(true)]);
    assert!(!state.preserve_image_links());

    let (state, effects) = saved(state, PreferenceChange::ImageLinks(true), true);
    assert_eq!(
        effects,
        vec![Effect::Reply("Images will link back to their original source.".to_string())]
    );
    assert!(state.preserve_image_links());

    let (_state, effects) = say(state, "https://example.com/p/post");
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::ConvertAndDeliver { preserve_image_links: true, .. }
    )));
}

#[test]
fn unsaved_image_toggle_keeps_previous_setting() {
    init_logging();
    let (state, _) = say(configured(), "/images on");
    let (state, effects) = saved(state, PreferenceChange::ImageLinks(true), false);

    assert!(!state.preserve_image_links());
    assert_eq!(
        effects,
        vec![Effect::Reply(
            "Sorry, the image setting could not be saved. Please try again.".to_string()
        )]
    );
}

#[test]
fn image_toggle_without_argument_reports_status() {
    init_logging();
    let (state, effects) = say(configured(), "/images");
    assert!(!state.preserve_image_links());
    assert!(matches!(
        effects.as_slice(),
        [Effect::Reply(text)] if text.starts_with("Images will be embedded without links.")
    ));
}

#[test]
fn finished_conversion_clears_in_flight_and_reports_article() {
    init_logging();
    let (state, _) = say(configured(), "https://win.substack.com/p/bots");
    let (state, effects) = update(
        state,
        Msg::ConversionFinished {
            url: "https://win.substack.com/p/bots".to_string(),
            outcome: ConversionOutcome::Delivered(DeliveredArticle {
                title: "Can We Save Our Internet From The Bots, AND Preserve Anonymity?"
                    .to_string(),
                author: Some("Liv Boeree".to_string()),
                publication: Some("Win-Win".to_string()),
                missing_images: 1,
            }),
        },
    );

    assert_eq!(state.in_flight(), None);
    assert_eq!(
        effects,
        vec![Effect::Reply(
            "Article has been sent to your Kindle!\n\n\
Can We Save Our Internet From The Bots, AND Preserve Anonymity?\n\
By Liv Boeree\n\
From: Win-Win\n\n\
1 image could not be downloaded."
                .to_string()
        )]
    );
}

#[test]
fn failed_conversion_is_reported_as_error() {
    init_logging();
    let (state, _) = say(configured(), "https://example.com/p/gone");
    let (state, effects) = update(
        state,
        Msg::ConversionFinished {
            url: "https://example.com/p/gone".to_string(),
            outcome: ConversionOutcome::Failed {
                message: "The page could not be found (404).".to_string(),
            },
        },
    );

    assert_eq!(state.in_flight(), None);
    assert_eq!(
        effects,
        vec![Effect::Reply("Error: The page could not be found (404).".to_string())]
    );
}

#[test]
fn cancel_returns_to_idle() {
    init_logging();
    let (state, _) = say(configured(), "/config");
    let (state, effects) = say(state, "/cancel");
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(effects, vec![Effect::Reply("Cancelled.".to_string())]);
}
