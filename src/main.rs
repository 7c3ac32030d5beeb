use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lumen_voice::engine::{CommandRecorder, UtteranceSource};
use lumen_voice::{Config, Daemon};

/// Lumen - wake-word voice control gateway
#[derive(Parser)]
#[command(name = "lumen", version, about)]
struct Cli {
    /// Path to a TOML config file (default: ~/.config/lumen/config.toml)
    #[arg(short, long, env = "LUMEN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the wake phrase
    #[arg(long, env = "LUMEN_PHRASE")]
    phrase: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Record one test utterance and report its size
    TestRecorder,
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,lumen_voice=info",
        1 => "info,lumen_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(phrase) = cli.phrase {
        config.keyword.phrase = phrase;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestRecorder => test_recorder(&config).await,
            Command::ShowConfig => show_config(&config),
        };
    }

    tracing::info!(
        phrase = %config.keyword.phrase,
        "starting lumen gateway - say \"{}\"",
        config.keyword.phrase
    );

    let daemon = Daemon::new(config);
    daemon.run().await?;

    Ok(())
}

/// Record one utterance with the configured recorder command
async fn test_recorder(config: &Config) -> anyhow::Result<()> {
    println!(
        "Recording one utterance with: {}",
        config.dictation.recorder_cmd.join(" ")
    );
    println!("Speak into your microphone!\n");

    let recorder = CommandRecorder::from_config(&config.dictation);
    let audio = recorder.record().await?;

    println!("Captured {} bytes of audio", audio.len());
    println!("\n---");
    println!("If the byte count is above a few kilobytes, your mic is working.");
    println!("If recording failed, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");
    println!("  3. Try the recorder command above by hand");

    Ok(())
}

/// Print the effective configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("wake phrase:      {}", config.keyword.phrase);
    println!("search id:        {}", config.keyword.search_id);
    println!("threshold:        {:e}", config.keyword.threshold);
    println!("spotter:          {}", config.keyword.spotter_cmd.join(" "));
    println!("asset dir:        {}", config.keyword.asset_dir.display());
    println!("provider:         {}", config.dictation.provider);
    println!("model:            {}", config.dictation.model);
    println!("timeout:          {}s", config.dictation.timeout_secs);
    println!("max alternatives: {}", config.dictation.max_alternatives);
    println!("recorder:         {}", config.dictation.recorder_cmd.join(" "));
    println!("sink:             {}", config.sink);
    Ok(())
}
