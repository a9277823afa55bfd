// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::ai::gemini::GeminiClient;
use crate::ai::prompts::Feature;
use crate::assist::{Assistant, Narration, Outcome};
use crate::config::{Config, Settings};
use crate::error::StartupError;
use crate::ocr::{OcrEngine, TesseractEngine};
use crate::speech::{AudioPlayer, EspeakSynthesizer, SpeechSynthesizer};
use crate::upload::UploadedImage;

mod ai;
mod assist;
mod config;
mod error;
mod gui;
mod ocr;
mod session;
mod speech;
mod upload;

#[derive(Parser)]
#[command(name = "visionvoice")]
#[command(about = "Describe, read and narrate images for visually impaired users", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the graphical interface (default)
    Gui,
    /// Run one feature on an image and print the result
    Run {
        /// JPEG or PNG image to analyze
        image: PathBuf,

        /// Which feature to run
        #[arg(long, short = 'f', value_enum, default_value_t = Feature::default())]
        feature: Feature,

        /// Print the text without narrating it
        #[arg(long)]
        no_speech: bool,

        /// Play the narration once it is ready
        #[arg(long)]
        play: bool,
    },
    /// Run simple interactive mode
    Interactive {
        /// Image to start with
        image: Option<PathBuf>,
    },
    /// List the available features
    Features,
    /// Check the API key, the model endpoint and the local engines
    Check,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info")
    );

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => {
            gui::run_gui(startup(cli.settings))
        }
        Commands::Run { image, feature, no_speech, play } => {
            let (assistant, player) = startup(cli.settings)?;
            run_once(&assistant.with_narration(!no_speech), &player, &image, feature, play)
        }
        Commands::Interactive { image } => {
            let (assistant, player) = startup(cli.settings)?;
            run_interactive_mode(&assistant, &player, image)
        }
        Commands::Features => {
            list_features();
            Ok(())
        }
        Commands::Check => {
            check_setup(cli.settings)
        }
    }
}

/// Resolve configuration and build every adapter once.
fn startup(settings: Settings) -> Result<(Assistant, AudioPlayer), StartupError> {
    let config = Config::resolve(settings)?;
    info!(
        "Using model {} at {}, OCR language {}, speech via {}",
        config.model.model, config.model.endpoint, config.ocr.language, config.speech.command
    );
    let assistant = Assistant::from_config(&config)?;
    Ok((assistant, AudioPlayer::new(config.speech.player.clone())))
}

fn run_once(assistant: &Assistant, player: &AudioPlayer, path: &Path, feature: Feature, play: bool) -> Result<()> {
    let image = UploadedImage::from_path(path)
        .with_context(|| format!("Cannot use {} as input", path.display()))?;

    println!("{}", feature.busy_message());
    let outcome = assistant.run(feature, &image);
    print_outcome(&outcome);

    if play {
        if let Some(artifact) = outcome.audio() {
            player
                .play(artifact)
                .with_context(|| format!("Failed to start audio player `{}`", player.command()))?;
        }
    }

    match outcome.error_message() {
        Some(message) => Err(anyhow::anyhow!(message)),
        None => Ok(()),
    }
}

fn print_outcome(outcome: &Outcome) {
    if let Some(message) = outcome.error_message() {
        println!("\n✗ {}", message);
        return;
    }

    println!("\n=== {} ===", outcome.feature);
    match outcome.text() {
        Some(text) if !text.trim().is_empty() => println!("{}", text.trim_end()),
        _ => println!("(no text was found in the image)"),
    }
    println!("===========================================");

    match &outcome.narration {
        Narration::Ready(artifact) => {
            println!("✓ Narration saved to {} ({}, {} bytes)", artifact.path.display(), artifact.mime_type, artifact.bytes);
        }
        Narration::Failed(e) => println!("✗ Audio generation failed: {}", e),
        Narration::NotAttempted => {}
    }
    println!();
}

fn list_features() {
    println!("\nAvailable features:");
    for (i, feature) in Feature::ALL.iter().enumerate() {
        let default = if i == 0 { " (default)" } else { "" };
        println!("  {:<8} {}{}", feature.cli_name(), feature.label(), default);
    }
    println!();
}

fn check_setup(settings: Settings) -> Result<()> {
    let config = match Config::resolve(settings) {
        Ok(config) => config,
        Err(e) => {
            println!("✗ {}", e);
            return Err(e.into());
        }
    };
    println!("✓ API key found");

    let client = GeminiClient::new(&config.model)?;
    match client.check_model_available() {
        Ok(()) => println!("✓ Model {} is reachable at {}", config.model.model, config.model.endpoint),
        Err(e) => {
            println!("✗ Model check failed: {}", e);
            warn!("Vision features will not work until this is fixed");
        }
    }

    match TesseractEngine::new(&config.ocr).probe() {
        Ok(version) => println!("✓ OCR engine: {}", version),
        Err(e) => println!("✗ {}", e),
    }

    match EspeakSynthesizer::new(&config.speech).probe() {
        Ok(version) => println!("✓ Speech engine: {}", version),
        Err(e) => println!("✗ {}", e),
    }

    println!("  Narration file: {}", config.speech.audio_path.display());
    println!("  Audio player: {}", config.speech.player);
    Ok(())
}

fn run_interactive_mode(assistant: &Assistant, player: &AudioPlayer, initial: Option<PathBuf>) -> Result<()> {
    use std::io::{self, Write};

    println!("👁  VisionVoice Interactive Mode");
    println!("===============================");
    println!();

    let stdin = io::stdin();
    let mut input = String::new();
    let mut image: Option<UploadedImage> = None;

    if let Some(path) = initial {
        match UploadedImage::from_path(&path) {
            Ok(loaded) => image = Some(loaded),
            Err(e) => println!("✗ {}", e),
        }
    }

    // Main menu loop
    loop {
        match &image {
            Some(current) => {
                let (w, h) = current.dimensions();
                println!("\nImage: {} ({}x{})", current.name, w, h);
            }
            None => println!("\nPlease load an image to proceed."),
        }
        println!("Main Menu:");
        for (i, feature) in Feature::ALL.iter().enumerate() {
            println!("{}. {}", i + 1, feature.label());
        }
        println!("5. Load an image");
        println!("6. Exit");
        print!("\nEnter your choice (1-6): ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let choice = input.trim();

        match choice {
            "1" | "2" | "3" | "4" => {
                let Some(current) = &image else {
                    println!("✗ Please load an image first (option 5)");
                    continue;
                };
                let index: usize = choice.parse().unwrap_or(1);
                let feature = Feature::ALL[index - 1];
                println!("\n{}", feature.busy_message());
                let outcome = assistant.run(feature, current);
                print_outcome(&outcome);

                if let Some(artifact) = outcome.audio() {
                    if let Err(e) = player.play(artifact) {
                        error!("Failed to start {}: {}", player.command(), e);
                    }
                }
            }
            "5" => {
                print!("Enter image path (JPEG or PNG): ");
                io::stdout().flush()?;

                input.clear();
                stdin.lock().read_line(&mut input)?;
                let path = input.trim();
                if path.is_empty() {
                    continue;
                }
                match UploadedImage::from_path(Path::new(path)) {
                    Ok(loaded) => {
                        println!("✓ Loaded {}", loaded.name);
                        image = Some(loaded);
                    }
                    Err(e) => println!("✗ {}", e),
                }
            }
            "6" => {
                println!("Exiting VisionVoice");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter a number between 1 and 6.");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_feature_names() {
        let cli = Cli::try_parse_from([
            "visionvoice", "--api-key", "k", "run", "sign.png", "--feature", "text", "--no-speech",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run { image, feature, no_speech, play }) => {
                assert_eq!(image, PathBuf::from("sign.png"));
                assert_eq!(feature, Feature::TextToSpeech);
                assert!(no_speech);
                assert!(!play);
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.settings.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn no_subcommand_means_gui() {
        let cli = Cli::try_parse_from(["visionvoice", "--api-key", "k"]).unwrap();
        assert!(cli.command.is_none());
    }
}
