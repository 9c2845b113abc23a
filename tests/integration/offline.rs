//! Lost connectivity to the remote services.

use crate::helpers::{sim_head, solid_frames, test_config, wait_until};
use animatron::config::HeadConfig;
use animatron::motion::joint::JointId;
use animatron::ports::Rgb;
use animatron::sim::{ConversationScript, Scripted};
use std::time::Duration;

#[tokio::test]
async fn transcription_outage_shows_the_offline_pose() {
    let (head, rig) = sim_head(test_config(), true);
    let state = head.state();
    let cancel = head.cancel_token();
    rig.recorder.push_utterance(0.4);
    rig.recognizer.push(Scripted::Offline);

    let handle = tokio::spawn(head.run());
    wait_until("offline flag", || state.offline()).await;
    wait_until("three red flashes", || {
        solid_frames(&rig.actuators, Rgb::RED) == 3
            && rig.actuators.mouth().iter().all(Rgb::is_off)
    })
    .await;
    // Back to listening for the next turn.
    wait_until("second recording", || rig.recorder.calls() == 2).await;

    assert!(!state.thinking());
    assert_eq!(state.joint_angle(JointId::LeftX), 110);
    assert_eq!(state.joint_angle(JointId::RightX), 70);
    assert!(rig.chat.prompts().is_empty());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(state.joint_angle(JointId::LeftX), 110, "eyes hold the pose");
    assert_eq!(solid_frames(&rig.actuators, Rgb::RED), 3);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn next_successful_turn_clears_offline() {
    let script = ConversationScript::from_toml(
        r#"
        [[turns]]
        heard = "are you there?"
        offline = "chat"

        [[turns]]
        heard = "are you there now?"
        reply = "Yes! [emotion: surprised]"

        [[turns]]
        heard = "exit"
        "#,
    )
    .unwrap();
    let (head, rig) = sim_head(test_config(), true);
    let state = head.state();
    script.load_into(&rig.recorder, &rig.recognizer, &rig.chat, &rig.tts);

    tokio::time::timeout(Duration::from_secs(5), head.run())
        .await
        .expect("script should reach exit")
        .unwrap();

    assert!(!state.offline());
    assert_eq!(solid_frames(&rig.actuators, Rgb::RED), 3);
    assert_eq!(rig.tts.spoken(), vec!["Yes!".to_owned()]);
    assert_eq!(
        rig.chat.prompts(),
        vec!["are you there?".to_owned(), "are you there now?".to_owned()]
    );
}

#[tokio::test]
async fn speech_outage_leaves_the_mouth_dark() {
    let script = ConversationScript::from_toml(
        r#"
        [[turns]]
        heard = "sing something"
        reply = "La la la. [emotion: happy]"
        offline = "speech"
        "#,
    )
    .unwrap();
    let (head, rig) = sim_head(test_config(), true);
    let state = head.state();
    let cancel = head.cancel_token();
    script.load_into(&rig.recorder, &rig.recognizer, &rig.chat, &rig.tts);

    let handle = tokio::spawn(head.run());
    wait_until("offline flag", || state.offline()).await;
    wait_until("second recording", || rig.recorder.calls() == 2).await;

    assert!(rig.tts.spoken().is_empty());
    assert!(!state.speaking());
    assert_eq!(solid_frames(&rig.actuators, Rgb::RED), 3);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_speech_outage_goes_offline_while_listening() {
    let mut config = test_config();
    config.idle_speech.enabled = true;
    config.idle_speech.idle_after_ms = 20;
    config.idle_speech.tick_ms = 5;
    let (head, rig) = sim_head(config, true);
    for phrase in HeadConfig::default().idle_speech.phrases {
        rig.tts.offline_for(&phrase);
    }
    let state = head.state();
    let cancel = head.cancel_token();
    let handle = tokio::spawn(head.run());

    // Nobody speaks, so the controller is still inside its first recording.
    wait_until("offline flag", || state.offline()).await;
    wait_until("three red flashes", || {
        solid_frames(&rig.actuators, Rgb::RED) == 3
            && rig.actuators.mouth().iter().all(Rgb::is_off)
    })
    .await;
    assert_eq!(state.joint_angle(JointId::LeftX), 110);
    assert_eq!(state.joint_angle(JointId::RightX), 70);
    wait_until("listening again", || rig.recorder.calls() == 2).await;

    // Later fillers fail too; the pose is not repeated and listening goes on.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(state.offline());
    assert_eq!(solid_frames(&rig.actuators, Rgb::RED), 3);
    assert_eq!(rig.recorder.calls(), 2);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
