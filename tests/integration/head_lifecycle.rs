//! Full head runs from startup to shutdown.

use crate::helpers::{all_relaxed, sim_head, sim_ports, test_config, wait_until};
use animatron::config::HeadConfig;
use animatron::{Head, HeadError};
use animatron::ports::Rgb;
use animatron::sim::ConversationScript;
use std::time::Duration;

const SCRIPT: &str = r#"
[[turns]]
heard = "hello there"
reply = "Hello! Lovely to meet you. [emotion: happy]"

[[turns]]
heard = "Can you wink at me?"

[[turns]]
heard = "Blink twice if you understand."

[[turns]]
heard = "Stop!"
"#;

#[tokio::test]
async fn scripted_conversation_ends_on_exit_and_parks_the_head() {
    let mut config = test_config();
    config.conversation.startup_phrase = "Ready.".to_owned();
    let (head, rig) = sim_head(config, true);
    let state = head.state();
    ConversationScript::from_toml(SCRIPT)
        .unwrap()
        .load_into(&rig.recorder, &rig.recognizer, &rig.chat, &rig.tts);

    tokio::time::timeout(Duration::from_secs(5), head.run())
        .await
        .expect("head should exit on the stop command")
        .unwrap();

    assert_eq!(rig.chat.prompts(), vec!["hello there".to_owned()]);
    assert_eq!(
        rig.tts.spoken(),
        vec!["Ready.".to_owned(), "Hello! Lovely to meet you.".to_owned()]
    );
    assert_eq!(rig.recorder.remaining(), 0);
    assert!(state.last_blink_at().is_some(), "wink and double blink ran");

    assert!(all_relaxed(&rig.actuators));
    assert!(rig.actuators.mouth().iter().all(Rgb::is_off));
    assert!(!rig.actuators.status_led());
    assert!(!state.busy());
}

#[tokio::test]
async fn cancellation_stops_a_listening_head() {
    let (head, rig) = sim_head(test_config(), true);
    let cancel = head.cancel_token();
    let state = head.state();
    let handle = tokio::spawn(head.run());

    wait_until("recording to start", || rig.recorder.calls() > 0).await;
    wait_until("status LED on", || rig.actuators.status_led()).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("head should stop after cancel")
        .unwrap()
        .unwrap();

    assert!(state.armed());
    assert!(all_relaxed(&rig.actuators));
    assert!(!rig.actuators.status_led());
}

#[tokio::test]
async fn disarmed_head_never_records() {
    let (head, rig) = sim_head(test_config(), false);
    let cancel = head.cancel_token();
    let handle = tokio::spawn(head.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rig.recorder.calls(), 0);
    assert!(!rig.actuators.status_led());
    assert_eq!(
        rig.actuators.servo_writes(),
        6,
        "only the startup centring is written"
    );

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected_before_anything_moves() {
    let mut config = HeadConfig::instant();
    config.mouth.num_pixels = 7;
    let (ports, rig) = sim_ports(8, true);
    let result = Head::new(config, ports);
    assert!(matches!(result, Err(HeadError::Config(_))));
    assert_eq!(rig.actuators.servo_writes(), 0);
}
