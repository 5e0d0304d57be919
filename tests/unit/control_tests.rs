//! Unit tests for control-channel command serialisation.

use botshell::bot::control::ControlCommand;
use botshell::bot::request::SettingsUpdate;

/// Each command serialises as `<TAG>:<value>` with its documented tag.
#[test]
fn commands_serialize_with_wire_tags() {
    let cases = [
        (
            ControlCommand::ChangeVoice("EXAVITQu4vr4xnSDxMaL".into()),
            "CHANGE_VOICE:EXAVITQu4vr4xnSDxMaL",
        ),
        (
            ControlCommand::UpdateGeminiKey("AIza-test".into()),
            "UPDATE_GEMINI_KEY:AIza-test",
        ),
        (
            ControlCommand::UpdateElevenlabsKey("el-test".into()),
            "UPDATE_ELEVENLABS_KEY:el-test",
        ),
        (
            ControlCommand::UpdatePersonality("cheerful pirate".into()),
            "UPDATE_PERSONALITY:cheerful pirate",
        ),
        (
            ControlCommand::UpdateAudioDevice("3".into()),
            "UPDATE_AUDIO_DEVICE:3",
        ),
        (ControlCommand::UpdateVolume(80), "UPDATE_VOLUME:80"),
        (
            ControlCommand::UpdateIaCommand("!ask".into()),
            "UPDATE_IA_COMMAND:!ask",
        ),
    ];

    for (command, expected) in cases {
        assert_eq!(command.to_line(), expected);
    }
}

/// An empty value still produces a well-formed `<TAG>:` line.
#[test]
fn empty_value_keeps_tag_and_separator() {
    let line = ControlCommand::UpdateGeminiKey(String::new()).to_line();
    assert_eq!(line, "UPDATE_GEMINI_KEY:");
}

/// A value containing the separator is carried verbatim; only the first
/// colon delimits the tag.
#[test]
fn value_may_contain_separator() {
    let line = ControlCommand::UpdatePersonality("speak like this: briefly".into()).to_line();
    assert_eq!(line, "UPDATE_PERSONALITY:speak like this: briefly");
}

/// A full settings update expands to one command per present field, in the
/// fixed documented order.
#[test]
fn settings_update_expands_in_fixed_order() {
    let update = SettingsUpdate {
        voice: Some("v1".into()),
        gemini_key: Some("g1".into()),
        elevenlabs_key: Some("e1".into()),
        personality: Some("p1".into()),
        audio_device: Some("2".into()),
        volume: Some(55),
        ia_command: Some("!ai".into()),
    };

    let lines: Vec<String> = update.commands().iter().map(ControlCommand::to_line).collect();
    assert_eq!(
        lines,
        vec![
            "CHANGE_VOICE:v1",
            "UPDATE_GEMINI_KEY:g1",
            "UPDATE_ELEVENLABS_KEY:e1",
            "UPDATE_PERSONALITY:p1",
            "UPDATE_AUDIO_DEVICE:2",
            "UPDATE_VOLUME:55",
            "UPDATE_IA_COMMAND:!ai",
        ]
    );
}

/// Absent fields produce no commands at all.
#[test]
fn empty_settings_update_expands_to_nothing() {
    let update = SettingsUpdate::default();
    assert!(update.commands().is_empty());
}

/// A partial update only expands the present fields.
#[test]
fn partial_settings_update_skips_absent_fields() {
    let update = SettingsUpdate {
        volume: Some(30),
        voice: Some("v2".into()),
        ..SettingsUpdate::default()
    };

    let lines: Vec<String> = update.commands().iter().map(ControlCommand::to_line).collect();
    assert_eq!(lines, vec!["CHANGE_VOICE:v2", "UPDATE_VOLUME:30"]);
}
