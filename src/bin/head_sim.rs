//! Simulator for the animatronic head: runs the real controller and
//! behaviour tasks against in-memory actuators and scripted services.

use animatron::behavior::EyeBehaviorTask;
use animatron::config::{HeadConfig, MillisRange, MotionConfig};
use animatron::motion::MotionEngine;
use animatron::sim::{
    ConversationScript, NullAudioOutput, ScriptedChat, ScriptedRecognizer, ScriptedRecorder,
    SimulatedActuators, SimulatedButton, ToneSynthesizer,
};
use animatron::{Head, HeadPorts, RuntimeState};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Animatronic head simulator.
#[derive(Parser)]
#[command(name = "head-sim", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run only the eye behaviour with the head armed.
    Eyes {
        /// How long to run.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        /// Collapse motion delays and pauses.
        #[arg(long)]
        fast: bool,
    },

    /// Run a scripted conversation through the full head.
    Converse {
        /// TOML conversation script.
        script: PathBuf,

        /// Stop after this long even if the script has not ended.
        #[arg(short, long, default_value_t = 60)]
        seconds: u64,

        /// Collapse motion delays and pauses.
        #[arg(long)]
        fast: bool,
    },

    /// Print the default configuration as TOML.
    DefaultConfig {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref())?;

    let config_path = cli.config.clone().unwrap_or_else(HeadConfig::default_config_path);
    let config = if config_path.exists() {
        HeadConfig::from_file(&config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?
    } else if cli.config.is_some() {
        anyhow::bail!("config file not found: {}", config_path.display());
    } else {
        HeadConfig::default()
    };

    match cli.command {
        Command::Eyes { seconds, fast } => run_eyes(with_speed(config, fast), seconds).await,
        Command::Converse {
            script,
            seconds,
            fast,
        } => run_converse(with_speed(config, fast), &script, seconds).await,
        Command::DefaultConfig { output } => write_default_config(output.as_deref()),
    }
}

/// Console logging, plus a rolling file when `log_dir` is given.
fn init_tracing(
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("animatron=info"));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "head-sim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter())
                .with(console)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter()).with(console).init();
            Ok(None)
        }
    }
}

fn with_speed(mut config: HeadConfig, fast: bool) -> HeadConfig {
    if fast {
        let seed = config.motion.seed;
        config.motion = MotionConfig {
            seed,
            ..MotionConfig::instant()
        };
        config.eyes.thinking_pause_ms = 50;
        config.eyes.speaking_pause_ms = MillisRange::new(20, 60);
        config.eyes.idle_pause_ms = MillisRange::new(20, 100);
        config.eyes.blink_interval_ms = MillisRange::new(300, 600);
    }
    config
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    });
}

fn cancel_after(cancel: CancellationToken, seconds: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        info!(seconds, "time limit reached");
        cancel.cancel();
    });
}

async fn run_eyes(config: HeadConfig, seconds: u64) -> anyhow::Result<()> {
    config.validate()?;
    let actuators = Arc::new(SimulatedActuators::without_history(config.mouth.num_pixels));
    let (state, modes) = RuntimeState::new(&config.servo);
    let engine = Arc::new(MotionEngine::new(&config, actuators.clone(), state.clone()));
    engine.center().await?;
    modes.set_armed(true);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    cancel_after(cancel.clone(), seconds);

    println!("Watching the eyes for {seconds} s. Press Ctrl+C to stop.");
    EyeBehaviorTask::new(engine.clone(), config.eyes.clone(), config.motion.seed)
        .run(cancel)
        .await;
    engine.relax_all()?;

    println!("servo writes: {}", actuators.servo_writes());
    println!("final angles: {:?}", state.joint_angles());
    Ok(())
}

async fn run_converse(config: HeadConfig, script_path: &Path, seconds: u64) -> anyhow::Result<()> {
    let script = ConversationScript::from_file(script_path)
        .with_context(|| format!("loading script {}", script_path.display()))?;

    let actuators = Arc::new(SimulatedActuators::new(config.mouth.num_pixels));
    let recorder = Arc::new(ScriptedRecorder::new());
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let chat = Arc::new(ScriptedChat::new());
    let tts = Arc::new(ToneSynthesizer::new(24_000, 0.25));
    script.load_into(&recorder, &recognizer, &chat, &tts);

    let ports = HeadPorts {
        actuators: actuators.clone(),
        input: Arc::new(SimulatedButton::new(true)),
        recorder: recorder.clone(),
        recognizer,
        chat: chat.clone(),
        synthesizer: tts.clone(),
        audio_out: Arc::new(NullAudioOutput::new()),
    };
    let head = Head::new(config, ports)?;
    let state = head.state();
    let cancel = head.cancel_token();
    cancel_on_ctrl_c(cancel.clone());
    cancel_after(cancel, seconds);

    println!("Animatron v{}", env!("CARGO_PKG_VERSION"));
    println!("Running {} scripted turns. Press Ctrl+C to stop.\n", script.turns.len());
    head.run().await?;

    println!("\nheard:");
    for prompt in chat.prompts() {
        println!("  > {prompt}");
    }
    println!("said:");
    for line in tts.spoken() {
        println!("  < {line}");
    }
    println!(
        "servo writes: {}, mouth frames: {}, offline: {}, unplayed turns: {}",
        actuators.servo_writes(),
        actuators.mouth_frames().len(),
        state.offline(),
        recorder.remaining()
    );
    Ok(())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = HeadConfig::default();
    match output {
        Some(path) => {
            config.save_to_file(path)?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
