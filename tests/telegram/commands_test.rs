//! Slash command aliases and inline callback data.

use postcraft::conversation::{Action, Flow};
use postcraft::platform::Platform;
use postcraft::telegram::commands::{
    expand_data, parse_callback, parse_command, pick_data, platform_data, revise_data, Command,
    ParsedCommand, APPROVE_CALENDAR_DATA, CANCEL_DATA, REGENERATE_DATA,
};
use postcraft::types::OptionLabel;

#[test]
fn commands_and_aliases() {
    let cases = [
        ("/start", Command::Help),
        ("/help", Command::Help),
        ("/post", Command::Post),
        ("/new", Command::Post),
        ("/calendar", Command::Calendar),
        ("/plan 5", Command::Calendar),
        ("/update_voice", Command::UpdateVoice),
        ("/voice", Command::UpdateVoice),
        ("/cancel", Command::Cancel),
        ("/RESET", Command::Cancel),
        ("  /post@postcraft_bot  ", Command::Post),
    ];
    for (text, expected) in cases {
        assert_eq!(
            parse_command(text),
            Some(ParsedCommand::Known(expected)),
            "{text}"
        );
    }
}

#[test]
fn unknown_command_keeps_its_name() {
    assert_eq!(
        parse_command("/publish@postcraft_bot now"),
        Some(ParsedCommand::Unknown("publish".to_owned()))
    );
}

#[test]
fn plain_text_is_not_a_command() {
    assert_eq!(parse_command("post about /slashes"), None);
    assert_eq!(parse_command("Rednote post about tea"), None);
}

#[test]
fn commands_map_to_engine_actions() {
    assert_eq!(Command::Help.action(), None);
    assert_eq!(Command::Post.action(), Some(Action::Start(Flow::Post)));
    assert_eq!(
        Command::Calendar.action(),
        Some(Action::Start(Flow::Calendar))
    );
    assert_eq!(
        Command::UpdateVoice.action(),
        Some(Action::Start(Flow::VoiceUpdate))
    );
    assert_eq!(Command::Cancel.action(), Some(Action::Cancel));
}

#[test]
fn generated_callback_data_parses_back() {
    let cases = [
        (
            platform_data(Platform::Rednote),
            Action::ChoosePlatform(Platform::Rednote),
        ),
        (
            pick_data(OptionLabel::A, false),
            Action::SelectOption {
                label: OptionLabel::A,
                image: false,
            },
        ),
        (
            pick_data(OptionLabel::B, true),
            Action::SelectOption {
                label: OptionLabel::B,
                image: true,
            },
        ),
        (
            revise_data(OptionLabel::B),
            Action::Revise {
                target: Some(OptionLabel::B),
                instruction: None,
            },
        ),
        (expand_data(3), Action::ExpandEntry(3)),
        (REGENERATE_DATA.to_owned(), Action::Regenerate),
        (CANCEL_DATA.to_owned(), Action::Cancel),
        (APPROVE_CALENDAR_DATA.to_owned(), Action::Approve),
    ];
    for (data, expected) in cases {
        assert_eq!(parse_callback(&data), Some(expected), "{data}");
    }
}

#[test]
fn malformed_callback_data_is_rejected() {
    for data in [
        "",
        "plat:tiktok",
        "pick:c",
        "pick:a:gif",
        "pick:a:img:extra",
        "rev",
        "regen:now",
        "cal:expand",
        "cal:expand:x",
        "cal:approve:1",
        "cancel:all",
    ] {
        assert_eq!(parse_callback(data), None, "{data}");
    }
}
