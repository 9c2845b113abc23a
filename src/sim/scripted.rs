//! Scripted stand-ins for the microphone, speaker and remote services.
//!
//! Each service pops its next answer from a queue. When the queue runs dry
//! the recorder waits (like a quiet room) and the others fall back to a
//! neutral answer, so a simulation keeps running until it is stopped.

use crate::audio::wav::{decode_wav, encode_wav};
use crate::emotion::TaggedReply;
use crate::error::{HeadError, Result};
use crate::ports::{
    AudioInput, AudioOutput, ChatClient, RecordedAudio, RecordingAbort, RecordingParams,
    RecordingPort, SpeechRecognizer, SpeechSynthesizer, SynthesizedSpeech,
};
use crate::runtime::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scripted answer from a remote service.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Ok(T),
    /// Fail with [`HeadError::Connectivity`].
    Offline,
    /// Fail with [`HeadError::Remote`].
    Fail(String),
}

impl<T> Scripted<T> {
    fn into_result(self, service: &str) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Offline => Err(HeadError::Connectivity(format!("{service} unreachable"))),
            Self::Fail(msg) => Err(HeadError::Remote(format!("{service}: {msg}"))),
        }
    }
}

// ── Microphone ──────────────────────────────────────────────────────────

/// Raw microphone that plays back a fixed list of buffers, then ends.
pub struct ChunkedAudioInput {
    sample_rate: u32,
    chunks: Mutex<VecDeque<Vec<f32>>>,
    missing: bool,
}

impl ChunkedAudioInput {
    pub fn new(sample_rate: u32, chunks: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            chunks: Mutex::new(chunks.into()),
            missing: false,
        }
    }

    /// An input whose device is absent: every read fails with `NoDevice`.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::new(0, Vec::new())
        }
    }
}

#[async_trait]
impl AudioInput for ChunkedAudioInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_chunk(&self) -> Result<Option<Vec<f32>>> {
        if self.missing {
            return Err(HeadError::NoDevice("no input device".into()));
        }
        tokio::task::yield_now().await;
        Ok(lock(&self.chunks).pop_front())
    }
}

/// Recorder that hands out scripted utterances.
///
/// With the queue empty it waits until the recording is aborted.
pub struct ScriptedRecorder {
    takes: Mutex<VecDeque<Result<Option<RecordedAudio>>>>,
    poll: Duration,
    calls: AtomicUsize,
}

impl ScriptedRecorder {
    pub fn new() -> Self {
        Self {
            takes: Mutex::new(VecDeque::new()),
            poll: Duration::from_millis(5),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue one utterance of `secs` seconds of speech-level noise.
    pub fn push_utterance(&self, secs: f32) {
        let sample_rate = 16_000;
        let len = (secs.max(0.0) * sample_rate as f32) as usize;
        let samples = (0..len)
            .map(|i| if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        self.push(Ok(Some(RecordedAudio {
            samples,
            sample_rate,
        })));
    }

    /// Queue a take that captured nothing.
    pub fn push_silence(&self) {
        self.push(Ok(None));
    }

    pub fn push(&self, take: Result<Option<RecordedAudio>>) {
        lock(&self.takes).push_back(take);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        lock(&self.takes).len()
    }
}

impl Default for ScriptedRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordingPort for ScriptedRecorder {
    async fn record_until_silence(
        &self,
        _params: RecordingParams,
        abort: &RecordingAbort,
    ) -> Result<Option<RecordedAudio>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        loop {
            if abort.should_abort() {
                return Ok(None);
            }
            if let Some(take) = lock(&self.takes).pop_front() {
                return take;
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

// ── Remote services ─────────────────────────────────────────────────────

/// Speech-to-text that returns scripted transcripts.
#[derive(Default)]
pub struct ScriptedRecognizer {
    replies: Mutex<VecDeque<Scripted<String>>>,
    calls: AtomicUsize,
    on_call: Mutex<Option<Box<dyn FnMut() + Send>>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Scripted<String>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push(Scripted::Ok(text.to_owned()));
    }

    /// Run `hook` at the start of every transcription, e.g. to flip the
    /// arm switch while the head is thinking.
    pub fn on_call(&self, hook: impl FnMut() + Send + 'static) {
        *lock(&self.on_call) = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn transcribe(&self, audio: &RecordedAudio) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = lock(&self.on_call).as_mut() {
            hook();
        }
        tokio::task::yield_now().await;
        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or(Scripted::Ok(String::new()));
        debug!(secs = audio.duration_secs(), "scripted transcription");
        reply.into_result("speech-to-text")
    }
}

/// Chat completion that returns scripted replies.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Scripted<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Scripted<String>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push(Scripted::Ok(text.to_owned()));
    }

    /// Every user text sent so far.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, user_text: &str) -> Result<String> {
        lock(&self.prompts).push(user_text.to_owned());
        tokio::task::yield_now().await;
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Scripted::Ok("I heard you. [emotion: neutral]".to_owned()))
            .into_result("chat")
    }
}

/// Text-to-speech that renders a syllable-like tone envelope per word.
///
/// Output goes through a WAV round trip so playback sees exactly what a
/// remote service would return.
pub struct ToneSynthesizer {
    sample_rate: u32,
    secs_per_word: f32,
    offline_texts: Mutex<HashSet<String>>,
    spoken: Mutex<Vec<String>>,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32, secs_per_word: f32) -> Self {
        Self {
            sample_rate,
            secs_per_word,
            offline_texts: Mutex::new(HashSet::new()),
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// Fail with a connectivity error whenever asked to say `text`.
    pub fn offline_for(&self, text: &str) {
        lock(&self.offline_texts).insert(text.to_owned());
    }

    /// Every text synthesized so far, oldest first.
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.spoken).clone()
    }

    fn render(&self, text: &str) -> Vec<f32> {
        let words = text.split_whitespace().count().max(1);
        let word_len = (self.secs_per_word.max(0.0) * self.sample_rate as f32) as usize;
        let mut samples = Vec::with_capacity(words * word_len);
        for w in 0..words {
            let pitch = 140.0 + 30.0 * (w % 3) as f32;
            for i in 0..word_len {
                let t = i as f32 / self.sample_rate as f32;
                // Rise and fall over the word.
                let envelope = (std::f32::consts::PI * i as f32 / word_len as f32).sin();
                samples.push(0.6 * envelope * (2.0 * std::f32::consts::PI * pitch * t).sin());
            }
        }
        samples
    }
}

#[async_trait]
impl SpeechSynthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech> {
        if lock(&self.offline_texts).contains(text) {
            return Err(HeadError::Connectivity("text-to-speech unreachable".into()));
        }
        lock(&self.spoken).push(text.to_owned());
        let bytes = encode_wav(&self.render(text), self.sample_rate)?;
        decode_wav(&bytes)
    }
}

// ── Speaker ─────────────────────────────────────────────────────────────

/// Speaker that discards audio but counts what it was given.
#[derive(Default)]
pub struct NullAudioOutput {
    chunks: AtomicUsize,
    samples: AtomicUsize,
    missing: bool,
}

impl NullAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A speaker whose device is absent: every write fails with `NoDevice`.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    pub fn chunks(&self) -> usize {
        self.chunks.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for NullAudioOutput {
    async fn write_chunk(&self, samples: &[f32], _sample_rate: u32) -> Result<()> {
        if self.missing {
            return Err(HeadError::NoDevice("no output device".into()));
        }
        self.chunks.fetch_add(1, Ordering::SeqCst);
        self.samples.fetch_add(samples.len(), Ordering::SeqCst);
        Ok(())
    }
}

// ── Conversation scripts ────────────────────────────────────────────────

/// One turn of a simulated conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedTurn {
    /// What the user says. `None` records nothing for this turn.
    pub heard: Option<String>,
    /// Chat reply including its emotion tag. Defaults to a neutral echo.
    pub reply: Option<String>,
    /// Simulate a lost connection at this stage.
    pub offline: Option<Stage>,
    /// Length of the recorded utterance.
    pub utterance_secs: Option<f32>,
}

/// A conversation for the simulator, loaded from TOML:
///
/// ```toml
/// [[turns]]
/// heard = "hello there"
/// reply = "Hi! [emotion: happy]"
///
/// [[turns]]
/// heard = "stop"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationScript {
    pub turns: Vec<ScriptedTurn>,
}

impl ConversationScript {
    /// Load a script from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// # Errors
    ///
    /// Returns [`HeadError::Config`] if `content` is not a valid script.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HeadError::Config(format!("bad script: {e}")))
    }

    /// Queue every turn onto the scripted services.
    pub fn load_into(
        &self,
        recorder: &ScriptedRecorder,
        recognizer: &ScriptedRecognizer,
        chat: &ScriptedChat,
        synthesizer: &ToneSynthesizer,
    ) {
        for turn in &self.turns {
            let Some(heard) = &turn.heard else {
                recorder.push_silence();
                continue;
            };
            recorder.push_utterance(turn.utterance_secs.unwrap_or(1.0));
            if turn.offline == Some(Stage::Transcription) {
                recognizer.push(Scripted::Offline);
                continue;
            }
            recognizer.push_text(heard);
            if turn.offline == Some(Stage::Chat) {
                chat.push(Scripted::Offline);
                continue;
            }
            let reply = turn
                .reply
                .clone()
                .unwrap_or_else(|| format!("You said: {heard}. [emotion: neutral]"));
            if turn.offline == Some(Stage::Speech) {
                synthesizer.offline_for(&TaggedReply::parse(&reply).text);
            }
            chat.push(Scripted::Ok(reply));
        }
        info!(turns = self.turns.len(), "conversation script loaded");
    }
}
