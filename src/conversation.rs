//! The conversation loop: wait for the arm switch, listen, transcribe,
//! handle voice commands or ask the chat service, and speak the reply.
//!
//! The controller is the only writer of `armed`, `thinking` and `offline`.
//! Background tasks report connectivity changes over a [`ControlEvent`]
//! channel. The controller applies them at the start of each turn and
//! while it waits for someone to speak.

use crate::behavior::StatusPattern;
use crate::config::HeadConfig;
use crate::emotion::{Emotion, TaggedReply};
use crate::error::{HeadError, Result};
use crate::motion::{MotionEngine, pace};
use crate::ports::{
    ActuatorPort, ChatClient, InputPort, RecordedAudio, RecordingAbort, RecordingParams,
    RecordingPort, Rgb, SpeechRecognizer,
};
use crate::runtime::{ControlEvent, Stage};
use crate::speech::Speaker;
use crate::state::ModeWriter;
use crate::voice_command::{VoiceCommand, parse_voice_command};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How one turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The switch is off; nothing was recorded.
    Disarmed,
    /// Recording was aborted or captured nothing.
    NothingHeard,
    EmptyTranscript,
    /// A voice command was handled locally.
    Command(VoiceCommand),
    /// The chat reply was spoken.
    Replied(Emotion),
    /// A remote service was unreachable; the offline pose was shown.
    Offline(Stage),
    /// The turn was dropped after a non-connectivity error.
    Failed,
    /// An exit command was heard.
    Exit,
}

/// How listening ended.
enum Listened {
    Taken(Result<Option<RecordedAudio>>),
    /// A background task lost connectivity; the recording was dropped.
    Lost(Stage),
}

/// Input and remote-service ports used by the controller.
#[derive(Clone)]
pub struct ConversationPorts {
    pub input: Arc<dyn InputPort>,
    pub recorder: Arc<dyn RecordingPort>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub chat: Arc<dyn ChatClient>,
}

/// Sequential turn loop of the head.
pub struct ConversationController {
    config: HeadConfig,
    modes: ModeWriter,
    engine: Arc<MotionEngine>,
    speaker: Arc<Speaker>,
    actuators: Arc<dyn ActuatorPort>,
    ports: ConversationPorts,
    events: mpsc::UnboundedReceiver<ControlEvent>,
    cancel: CancellationToken,
    was_armed: bool,
}

impl ConversationController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: HeadConfig,
        modes: ModeWriter,
        engine: Arc<MotionEngine>,
        speaker: Arc<Speaker>,
        actuators: Arc<dyn ActuatorPort>,
        ports: ConversationPorts,
        events: mpsc::UnboundedReceiver<ControlEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            modes,
            engine,
            speaker,
            actuators,
            ports,
            events,
            cancel,
            was_armed: false,
        }
    }

    /// Run the startup sequence, then turns until exit or shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error only if the startup sequence cannot drive the
    /// actuators. Errors inside a turn are logged and the loop continues.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await?;
        let cancel = self.cancel.clone();
        let retry = Duration::from_millis(self.config.conversation.disarmed_poll_ms);
        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };
            match outcome {
                Ok(TurnOutcome::Exit) => {
                    info!("exit requested");
                    break;
                }
                Ok(outcome) => debug!(?outcome, "turn finished"),
                Err(e) => {
                    error!("turn failed: {e}");
                    pace(retry).await;
                }
            }
        }
        Ok(())
    }

    /// Centre the eyes, clear the mouth, say the startup line and sample the
    /// switch. The lids are not moved for the initial switch position.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails.
    pub async fn startup(&mut self) -> Result<()> {
        self.engine.center().await?;
        self.actuators.clear_mouth()?;

        let phrase = self.config.conversation.startup_phrase.clone();
        if !phrase.is_empty() {
            let color = self.config.conversation.startup_color;
            if let Err(e) = self.say(&phrase, color).await {
                self.remote_failure(Stage::Speech, e).await?;
            }
        }

        let armed = self.ports.input.button_is_armed();
        self.modes.set_armed(armed);
        self.was_armed = armed;
        StatusPattern::from_state(self.modes.state()).apply_steady(&*self.actuators)?;
        info!(armed, "head ready");
        Ok(())
    }

    /// Run one turn.
    ///
    /// # Errors
    ///
    /// Returns an error if an actuator write fails. Remote and recording
    /// failures are reported through the returned [`TurnOutcome`].
    pub async fn tick(&mut self) -> Result<TurnOutcome> {
        self.drain_events().await?;

        let armed = self.ports.input.button_is_armed();
        if armed != self.was_armed {
            self.on_arm_edge(armed).await?;
        }
        StatusPattern::from_state(self.modes.state()).apply_steady(&*self.actuators)?;

        if !armed {
            pace(Duration::from_millis(self.config.conversation.disarmed_poll_ms)).await;
            return Ok(TurnOutcome::Disarmed);
        }

        let params = RecordingParams {
            threshold: self.config.recording.threshold,
            silence_duration: self.config.recording.silence_duration(),
        };
        let abort = RecordingAbort::new(self.ports.input.clone(), self.cancel.clone());
        let audio = match self.listen(params, &abort).await {
            Listened::Lost(stage) => {
                self.go_offline(stage).await?;
                return Ok(TurnOutcome::Offline(stage));
            }
            Listened::Taken(Ok(Some(audio))) => audio,
            Listened::Taken(Ok(None)) => {
                self.modes.set_thinking(false);
                return Ok(TurnOutcome::NothingHeard);
            }
            Listened::Taken(Err(e)) => {
                error!("recording failed: {e}");
                self.modes.set_thinking(false);
                pace(Duration::from_millis(self.config.conversation.disarmed_poll_ms)).await;
                return Ok(TurnOutcome::Failed);
            }
        };

        self.modes.set_thinking(true);
        let transcript = match self.ports.recognizer.transcribe(&audio).await {
            Ok(text) => {
                self.modes.set_offline(false);
                text
            }
            Err(e) => return self.remote_failure(Stage::Transcription, e).await,
        };
        let transcript = transcript.trim();
        if transcript.is_empty() {
            self.modes.set_thinking(false);
            debug!("empty transcript");
            pace(Duration::from_millis(self.config.conversation.empty_transcript_pause_ms)).await;
            return Ok(TurnOutcome::EmptyTranscript);
        }
        info!(text = transcript, "heard");

        if let Some(command) = parse_voice_command(transcript, &self.config.conversation.exit_phrases)
        {
            self.modes.set_thinking(false);
            return self.run_command(command).await;
        }

        let reply = self.ports.chat.complete(transcript).await;
        self.modes.set_thinking(false);
        let reply = match reply {
            Ok(reply) => {
                self.modes.set_offline(false);
                reply
            }
            Err(e) => return self.remote_failure(Stage::Chat, e).await,
        };

        let TaggedReply { text, emotion } = TaggedReply::parse(&reply);
        info!(%emotion, text = %text, "reply");
        if text.is_empty() {
            return Ok(TurnOutcome::Replied(emotion));
        }
        match self.say(&text, emotion.color()).await {
            Ok(()) => Ok(TurnOutcome::Replied(emotion)),
            Err(e) => self.remote_failure(Stage::Speech, e).await,
        }
    }

    /// Record one utterance, applying control events as they arrive. Stops
    /// early only for a connectivity loss that needs the offline pose.
    async fn listen(&mut self, params: RecordingParams, abort: &RecordingAbort) -> Listened {
        let recorder = self.ports.recorder.clone();
        let mut recording = recorder.record_until_silence(params, abort);
        loop {
            tokio::select! {
                taken = &mut recording => return Listened::Taken(taken),
                Some(event) = self.events.recv() => {
                    if let Some(stage) = self.note_event(event) {
                        return Listened::Lost(stage);
                    }
                }
            }
        }
    }

    async fn say(&self, text: &str, color: Rgb) -> Result<()> {
        let poll = Duration::from_millis(self.config.conversation.disarmed_poll_ms);
        self.speaker.speak_when_free(text, color, poll).await?;
        self.modes.set_offline(false);
        Ok(())
    }

    async fn run_command(&self, command: VoiceCommand) -> Result<TurnOutcome> {
        info!(?command, "voice command");
        match command {
            VoiceCommand::Wink => {
                self.engine.wink(None).await?;
            }
            VoiceCommand::BlinkTwice => self.engine.blink_twice().await?,
            VoiceCommand::Exit => return Ok(TurnOutcome::Exit),
        }
        Ok(TurnOutcome::Command(command))
    }

    async fn on_arm_edge(&mut self, armed: bool) -> Result<()> {
        if armed {
            self.engine.open_eyelids().await?;
            self.modes.set_armed(true);
            info!("armed");
        } else {
            // Stop the behaviour tasks before the lids go down.
            self.modes.set_armed(false);
            self.modes.set_thinking(false);
            self.engine.close_eyelids().await?;
            info!("disarmed");
        }
        self.was_armed = armed;
        Ok(())
    }

    async fn drain_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            if let Some(stage) = self.note_event(event) {
                self.go_offline(stage).await?;
            }
        }
        Ok(())
    }

    /// Apply `event` to the mode flags. Returns the stage when the offline
    /// pose should be shown; losses while already offline are collapsed.
    fn note_event(&self, event: ControlEvent) -> Option<Stage> {
        match event {
            ControlEvent::ConnectivityLost { stage } if self.modes.state().offline() => {
                debug!(%stage, "still offline");
                None
            }
            ControlEvent::ConnectivityLost { stage } => Some(stage),
            ControlEvent::ConnectivityRestored => {
                self.modes.set_offline(false);
                None
            }
        }
    }

    async fn remote_failure(&self, stage: Stage, e: HeadError) -> Result<TurnOutcome> {
        self.modes.set_thinking(false);
        match e {
            HeadError::Connectivity(_) => {
                self.go_offline(stage).await?;
                Ok(TurnOutcome::Offline(stage))
            }
            HeadError::NoDevice(_) => {
                error!(%stage, "{e}");
                Ok(TurnOutcome::Failed)
            }
            e => {
                warn!(%stage, "{e}");
                Ok(TurnOutcome::Failed)
            }
        }
    }

    /// Raise `offline` and show the offline pose: crossed eyes and red
    /// mouth flashes.
    async fn go_offline(&self, stage: Stage) -> Result<()> {
        warn!(%stage, "remote service unreachable, going offline");
        self.modes.set_offline(true);
        self.modes.set_thinking(false);
        self.engine.show_offline_pose().await?;

        let flash = Duration::from_millis(self.config.conversation.offline_flash_ms);
        let red = vec![Rgb::RED; self.config.mouth.num_pixels];
        for _ in 0..self.config.conversation.offline_flashes {
            self.actuators.render_mouth(&red)?;
            pace(flash).await;
            self.actuators.clear_mouth()?;
            pace(flash).await;
        }
        Ok(())
    }
}
