//! Filler phrases while the head waits for someone to talk.

use crate::helpers::{sim_head, test_config, wait_until};
use animatron::config::HeadConfig;
use std::time::Duration;

#[tokio::test]
async fn one_filler_after_a_quiet_spell() {
    let mut config = test_config();
    config.idle_speech.enabled = true;
    config.idle_speech.idle_after_ms = 150;
    config.idle_speech.tick_ms = 5;
    let (head, rig) = sim_head(config, true);
    let state = head.state();
    let cancel = head.cancel_token();
    let handle = tokio::spawn(head.run());

    wait_until("a filler phrase", || !rig.tts.spoken().is_empty()).await;
    wait_until("speech to finish", || !state.speaking()).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    let spoken = rig.tts.spoken();
    assert_eq!(spoken.len(), 1, "spoken: {spoken:?}");
    assert!(HeadConfig::default().idle_speech.phrases.contains(&spoken[0]));
    assert!(!rig.actuators.mouth_frames().is_empty());
    assert!(!state.offline());
}

#[tokio::test]
async fn no_filler_while_disarmed() {
    let mut config = test_config();
    config.idle_speech.enabled = true;
    config.idle_speech.idle_after_ms = 10;
    config.idle_speech.tick_ms = 2;
    let (head, rig) = sim_head(config, false);
    let cancel = head.cancel_token();
    let handle = tokio::spawn(head.run());

    tokio::time::sleep(Duration::from_millis(80)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert!(rig.tts.spoken().is_empty());
}
