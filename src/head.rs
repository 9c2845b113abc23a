//! Wires the motion engine, speaker, behaviour tasks and conversation
//! controller together and owns their lifecycle.

use crate::behavior::{EyeBehaviorTask, IdleSpeechTask, StatusIndicatorTask};
use crate::config::HeadConfig;
use crate::conversation::{ConversationController, ConversationPorts};
use crate::error::Result;
use crate::motion::MotionEngine;
use crate::mouth::MouthAnimator;
use crate::ports::{
    ActuatorPort, AudioOutput, ChatClient, InputPort, RecordingPort, SpeechRecognizer,
    SpeechSynthesizer,
};
use crate::speech::Speaker;
use crate::state::{ModeWriter, RuntimeState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Every port the head needs.
#[derive(Clone)]
pub struct HeadPorts {
    pub actuators: Arc<dyn ActuatorPort>,
    pub input: Arc<dyn InputPort>,
    pub recorder: Arc<dyn RecordingPort>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub chat: Arc<dyn ChatClient>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub audio_out: Arc<dyn AudioOutput>,
}

/// A fully wired head, ready to [`run`](Self::run).
pub struct Head {
    config: HeadConfig,
    ports: HeadPorts,
    state: Arc<RuntimeState>,
    modes: ModeWriter,
    engine: Arc<MotionEngine>,
    speaker: Arc<Speaker>,
    cancel: CancellationToken,
}

impl Head {
    /// # Errors
    ///
    /// Returns [`HeadError::Config`](crate::HeadError::Config) if `config`
    /// is invalid.
    pub fn new(config: HeadConfig, ports: HeadPorts) -> Result<Self> {
        config.validate()?;
        let (state, modes) = RuntimeState::new(&config.servo);
        let engine = Arc::new(MotionEngine::new(
            &config,
            ports.actuators.clone(),
            state.clone(),
        ));
        let animator = MouthAnimator::new(
            config.mouth.clone(),
            ports.actuators.clone(),
            ports.audio_out.clone(),
        );
        let speaker = Arc::new(Speaker::new(
            state.clone(),
            ports.synthesizer.clone(),
            animator,
        ));
        Ok(Self {
            config,
            ports,
            state,
            modes,
            engine,
            speaker,
            cancel: CancellationToken::new(),
        })
    }

    /// Shared state, for observers.
    pub fn state(&self) -> Arc<RuntimeState> {
        self.state.clone()
    }

    /// Token that stops the head when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the behaviour tasks and run the conversation until an exit
    /// command or cancellation, then shut everything down cleanly: tasks
    /// joined, servos relaxed, mouth cleared, status LED off.
    ///
    /// # Errors
    ///
    /// Returns the startup error of the conversation controller, if any.
    /// Shutdown failures are logged.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            ports,
            state,
            modes,
            engine,
            speaker,
            cancel,
        } = self;
        let seed = config.motion.seed;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();
        let eyes = EyeBehaviorTask::new(engine.clone(), config.eyes.clone(), seed);
        tasks.push(("eyes", tokio::spawn(eyes.run(cancel.clone()))));
        let status =
            StatusIndicatorTask::new(ports.actuators.clone(), state.clone(), config.status.clone());
        tasks.push(("status", tokio::spawn(status.run(cancel.clone()))));
        if config.idle_speech.enabled {
            let idle = IdleSpeechTask::new(
                speaker.clone(),
                state.clone(),
                config.idle_speech.clone(),
                events_tx,
                seed,
            );
            tasks.push(("idle_speech", tokio::spawn(idle.run(cancel.clone()))));
        }
        info!(tasks = tasks.len(), "head started");

        let controller = ConversationController::new(
            config,
            modes,
            engine.clone(),
            speaker,
            ports.actuators.clone(),
            ConversationPorts {
                input: ports.input.clone(),
                recorder: ports.recorder.clone(),
                recognizer: ports.recognizer.clone(),
                chat: ports.chat.clone(),
            },
            events_rx,
            cancel.clone(),
        );
        let result = controller.run().await;
        if let Err(e) = &result {
            error!("conversation stopped: {e}");
        }

        info!("shutting down");
        cancel.cancel();
        for (name, handle) in tasks {
            if let Err(e) = handle.await {
                warn!(task = name, "task ended abnormally: {e}");
            }
        }
        if let Err(e) = engine.relax_all() {
            warn!("failed to relax servos: {e}");
        }
        if let Err(e) = ports.actuators.clear_mouth() {
            warn!("failed to clear mouth: {e}");
        }
        if let Err(e) = ports.actuators.set_status_led(false) {
            warn!("failed to switch off status LED: {e}");
        }
        info!("head stopped");
        result
    }
}
