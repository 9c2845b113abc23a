//! Flipping the arm switch while the head is busy.

use crate::helpers::{sim_head, test_config, wait_until};
use animatron::motion::joint::JointId;
use std::time::Duration;

#[tokio::test]
async fn disarm_mid_turn_closes_the_lids_once_and_stills_the_eyes() {
    let (head, rig) = sim_head(test_config(), true);
    let state = head.state();
    let cancel = head.cancel_token();

    rig.recorder.push_utterance(0.3);
    rig.recognizer.push_text("tell me a joke");
    let button = rig.button.clone();
    rig.recognizer.on_call(move || button.set_armed(false));
    rig.chat.push_text("Why did the servo blush? [emotion: happy]");

    let handle = tokio::spawn(head.run());
    wait_until("lids to relax", || {
        rig.actuators.relax_count(JointId::LeftBlink) == 1
            && rig.actuators.relax_count(JointId::RightBlink) == 1
    })
    .await;
    assert!(!state.armed());
    assert!(!state.thinking());

    assert_eq!(rig.recorder.calls(), 1);

    rig.actuators.clear_events();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(rig.actuators.servo_writes(), 0, "no servo moves while disarmed");
    assert_eq!(rig.actuators.relax_count(JointId::LeftBlink), 0, "lids close once");
    wait_until("status LED off", || !rig.actuators.status_led()).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn rearming_opens_the_lids_and_listens_again() {
    let (head, rig) = sim_head(test_config(), false);
    let state = head.state();
    let cancel = head.cancel_token();
    let handle = tokio::spawn(head.run());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(rig.recorder.calls(), 0);
    let before = rig.actuators.duties(JointId::LeftBlink).len();

    rig.button.set_armed(true);
    wait_until("recording after arming", || rig.recorder.calls() > 0).await;
    assert!(state.armed());
    assert!(rig.actuators.duties(JointId::LeftBlink).len() > before);
    wait_until("status LED on", || rig.actuators.status_led()).await;

    // Disarming aborts the pending recording.
    rig.button.set_armed(false);
    wait_until("lids to relax", || {
        rig.actuators.relax_count(JointId::LeftBlink) == 1
    })
    .await;
    assert!(!state.armed());

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
