//! Shared helpers for integration tests.

use animatron::config::HeadConfig;
use animatron::motion::joint::JointId;
use animatron::ports::Rgb;
use animatron::sim::{
    NullAudioOutput, ScriptedChat, ScriptedRecognizer, ScriptedRecorder, SimulatedActuators,
    SimulatedButton, ToneSynthesizer,
};
use animatron::{Head, HeadPorts};
use std::sync::Arc;
use std::time::Duration;

/// Handles on every simulated port of a [`Head`].
pub(crate) struct SimRig {
    pub actuators: Arc<SimulatedActuators>,
    pub button: Arc<SimulatedButton>,
    pub recorder: Arc<ScriptedRecorder>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub chat: Arc<ScriptedChat>,
    pub tts: Arc<ToneSynthesizer>,
}

/// Fast timings, no startup line, no idle speech.
pub(crate) fn test_config() -> HeadConfig {
    let mut config = HeadConfig::instant();
    config.conversation.startup_phrase.clear();
    config.idle_speech.enabled = false;
    config
}

/// Fresh simulated ports, plus handles for inspecting them.
pub(crate) fn sim_ports(num_pixels: usize, armed: bool) -> (HeadPorts, SimRig) {
    let rig = SimRig {
        actuators: Arc::new(SimulatedActuators::new(num_pixels)),
        button: Arc::new(SimulatedButton::new(armed)),
        recorder: Arc::new(ScriptedRecorder::new()),
        recognizer: Arc::new(ScriptedRecognizer::new()),
        chat: Arc::new(ScriptedChat::new()),
        tts: Arc::new(ToneSynthesizer::new(16_000, 0.01)),
    };
    let ports = HeadPorts {
        actuators: rig.actuators.clone(),
        input: rig.button.clone(),
        recorder: rig.recorder.clone(),
        recognizer: rig.recognizer.clone(),
        chat: rig.chat.clone(),
        synthesizer: rig.tts.clone(),
        audio_out: Arc::new(NullAudioOutput::new()),
    };
    (ports, rig)
}

/// Build a head wired to fresh simulated ports.
pub(crate) fn sim_head(config: HeadConfig, armed: bool) -> (Head, SimRig) {
    let (ports, rig) = sim_ports(config.mouth.num_pixels, armed);
    let head = Head::new(config, ports).expect("valid test config");
    (head, rig)
}

/// Poll `condition` every couple of milliseconds, failing after two seconds.
pub(crate) async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Number of mouth frames that are entirely `color`.
pub(crate) fn solid_frames(actuators: &SimulatedActuators, color: Rgb) -> usize {
    actuators
        .mouth_frames()
        .iter()
        .filter(|frame| frame.iter().all(|p| *p == color))
        .count()
}

/// Every servo's last event was a relax.
pub(crate) fn all_relaxed(actuators: &SimulatedActuators) -> bool {
    JointId::ALL
        .iter()
        .all(|&joint| actuators.last_duty(joint).is_none())
}
