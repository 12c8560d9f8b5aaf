use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodgate::audio;
use moodgate::config::{Config, DEFAULT_PORT};
use moodgate::embedding::{OnnxVoiceEncoder, VoiceEncoder};
use moodgate::enroll::{self, MoodSample};
use moodgate::mood::Mood;
use moodgate::server::{self, AppState};
use moodgate::store::ProfileStore;
use moodgate::detect;
use std::path::{Path, PathBuf};
use tracing::info;

/// Voice-profile registration and speaker-verified mood detection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory for stored profiles
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    /// Path to the speaker embedding ONNX model
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new speaker from mood-labeled WAV files
    Register {
        /// Speaker name (must not already exist)
        #[arg(short, long)]
        name: String,

        /// Neutral-mood WAV files (repeatable)
        #[arg(long)]
        neutral: Vec<PathBuf>,

        /// Happy-mood WAV files (repeatable)
        #[arg(long)]
        happy: Vec<PathBuf>,

        /// Sad-mood WAV files (repeatable)
        #[arg(long)]
        sad: Vec<PathBuf>,
    },

    /// Detect the mood of a recording from a registered speaker
    Detect {
        /// Registered speaker name
        #[arg(short, long)]
        name: String,

        /// WAV file to analyze
        file: PathBuf,
    },

    /// Run the HTTP detection service
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load(&Config::default_config_path()?)?;

    let store_root = match &cli.store_root {
        Some(root) => root.clone(),
        None => config.profiles_root()?,
    };
    let store = ProfileStore::new(store_root);

    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => config.resolved_model_path()?,
    };

    match cli.command {
        Command::Register {
            name,
            neutral,
            happy,
            sad,
        } => {
            let mut encoder = build_encoder(&model_path, config.n_threads)?;
            let mut samples = Vec::new();
            for (mood, paths) in [
                (Mood::Neutral, &neutral),
                (Mood::Happy, &happy),
                (Mood::Sad, &sad),
            ] {
                for path in paths {
                    let wave = audio::decode_wav_file(path)
                        .with_context(|| format!("Failed to decode {:?}", path))?;
                    samples.push(MoodSample::new(mood, wave));
                }
            }

            let profile = enroll::register(&name, &samples, encoder.as_mut(), &store)?;
            println!(
                "Registered '{}' with {} samples across {} moods.",
                profile.name,
                samples.len(),
                profile.centroids.len()
            );
        }

        Command::Detect { name, file } => {
            let mut encoder = build_encoder(&model_path, config.n_threads)?;
            let recording = audio::decode_wav_file(&file)
                .with_context(|| format!("Failed to decode {:?}", file))?;

            let detection = detect::detect(&name, &recording, encoder.as_mut(), &store)?;
            println!("Detected mood: {}", detection.mood);
        }

        Command::Serve { port } => {
            let encoder = build_encoder(&model_path, config.n_threads)?;
            info!("Profiles root: {:?}", store.root());
            let state = AppState::new(store, encoder);
            server::serve(state, port).await?;
        }
    }

    Ok(())
}

fn build_encoder(model_path: &Path, n_threads: usize) -> Result<Box<dyn VoiceEncoder>> {
    if !model_path.exists() {
        eprintln!("\nSpeaker embedding model not found: {:?}", model_path);
        eprintln!("\nDownload a 256-dim speaker embedding ONNX model (for example a");
        eprintln!("WeSpeaker ResNet34 export) and place it at the path above, or pass");
        eprintln!("a custom location with: --model /path/to/model.onnx");
        anyhow::bail!("model file not found: {:?}", model_path);
    }

    let encoder = OnnxVoiceEncoder::new(model_path, n_threads)
        .with_context(|| format!("Failed to load encoder from {:?}", model_path))?;
    Ok(Box::new(encoder))
}
