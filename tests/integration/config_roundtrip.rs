//! Configuration files and conversation scripts on disk.

use animatron::HeadError;
use animatron::config::HeadConfig;
use animatron::runtime::Stage;
use animatron::sim::ConversationScript;

#[test]
fn default_config_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = HeadConfig::default();
    config.save_to_file(&path).unwrap();

    let loaded = HeadConfig::from_file(&path).unwrap();
    assert_eq!(loaded.to_toml().unwrap(), config.to_toml().unwrap());
}

#[test]
fn partial_file_keeps_defaults_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[mouth]\nnum_pixels = 12\n\n[conversation]\nexit_phrases = [\"goodbye\"]\n",
    )
    .unwrap();

    let config = HeadConfig::from_file(&path).unwrap();
    assert_eq!(config.mouth.num_pixels, 12);
    assert_eq!(config.conversation.exit_phrases, vec!["goodbye".to_owned()]);
    assert_eq!(config.recording.threshold, HeadConfig::default().recording.threshold);
    assert_eq!(config.servo.eye_x, HeadConfig::default().servo.eye_x);
}

#[test]
fn invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[servo.eye_x]\nmin = 120\nmax = 60\n").unwrap();
    assert!(matches!(
        HeadConfig::from_file(&path),
        Err(HeadError::Config(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = HeadConfig::from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(HeadError::Io(_))));
}

#[test]
fn conversation_script_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.toml");
    std::fs::write(
        &path,
        r#"
[[turns]]
heard = "hello"
reply = "Hi! [emotion: happy]"

[[turns]]

[[turns]]
heard = "what's the weather?"
offline = "transcription"
"#,
    )
    .unwrap();

    let script = ConversationScript::from_file(&path).unwrap();
    assert_eq!(script.turns.len(), 3);
    assert_eq!(script.turns[0].heard.as_deref(), Some("hello"));
    assert!(script.turns[1].heard.is_none());
    assert_eq!(script.turns[2].offline, Some(Stage::Transcription));
}
