use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{Level, info, warn};

use crate::config::Config;
use crate::credentials::{Credential, resolve_from_process};
use crate::llm::GeminiClient;
use crate::presenter::{FormInput, Presenter};
use crate::profile::{Profile, ProfileKind};
use crate::translation_service::TranslationService;
use crate::tui::TuiApp;
use crate::tui::form_state::{FormState, Preselection};

mod config;
mod credentials;
mod error;
mod llm;
mod presenter;
mod profile;
mod prompt;
mod translation;
mod translation_service;
mod tui;

/// Translate text with Google Gemini, from a terminal form or the command line.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: ~/.config/gemini-translator/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the profile set in the config file
    #[arg(long, global = true, value_enum)]
    profile: Option<ProfileKind>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive translation form (default)
    Tui,
    /// Translate once and print the result
    Translate(TranslateArgs),
    /// List the models, languages and tones of the active profile
    Options,
}

#[derive(Debug, Args)]
struct TranslateArgs {
    /// Target language label
    #[arg(long)]
    to: Option<String>,

    /// Tone label
    #[arg(long)]
    tone: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// API key; takes priority over the environment and the secrets file
    #[arg(long)]
    api_key: Option<String>,

    /// Text to translate; read from stdin when omitted
    text: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = Config::resolve_path(cli.config.clone());
    let command = cli.command.unwrap_or(Command::Tui);

    let log_file = matches!(command, Command::Tui).then(|| log_path(&config_path));
    init_tracing(cli.verbose, log_file.as_deref())?;

    let mut config = Config::load_from_path(&config_path)?;
    if let Some(kind) = cli.profile {
        config.profile = kind;
    }
    let profile = config.profile();
    info!("Using {} profile", profile.kind);

    match command {
        Command::Options => {
            print_options(&profile);
            Ok(ExitCode::SUCCESS)
        }
        Command::Translate(args) => run_translate(&config, profile, args).await,
        Command::Tui => {
            run_tui(&config, profile)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn log_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("gemini-translator.log")
}

/// Log to stderr, or to a file while the terminal UI owns the screen.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn resolve_credential(config: &Config) -> Option<Credential> {
    match resolve_from_process(Some(config.secrets_path())) {
        Ok(credential) => credential,
        Err(e) => {
            warn!("Ignoring secrets file: {:#}", e);
            None
        }
    }
}

/// An explicit `--api-key` wins over a key found in the environment or the
/// secrets file.
fn choose_credential(
    explicit: Option<String>,
    resolve: impl FnOnce() -> Option<Credential>,
) -> Option<Credential> {
    let Some(credential) = explicit.and_then(Credential::manual) else {
        return resolve();
    };
    if let Some(ambient) = resolve() {
        warn!("--api-key overrides the key from {}", ambient.source());
    }
    Some(credential)
}

fn gemini_connector(
    config: &Config,
    profile: &Profile,
) -> impl Fn(&Credential) -> Result<GeminiClient> + Send + Sync + use<> {
    let base_url = config.base_url.clone();
    let timeout = config.timeout();
    let models = profile.models.clone();

    move |credential: &Credential| {
        GeminiClient::new(credential.clone(), models.clone(), base_url.clone(), timeout)
    }
}

fn pick(explicit: Option<String>, configured: &Option<String>, options: &[String]) -> String {
    explicit
        .or_else(|| configured.clone())
        .or_else(|| options.first().cloned())
        .unwrap_or_default()
}

async fn run_translate(config: &Config, profile: Profile, args: TranslateArgs) -> Result<ExitCode> {
    let source_text = match args.text {
        Some(text) => text,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            text
        }
    };

    let form = FormInput {
        credential: choose_credential(args.api_key, || resolve_credential(config)),
        source_text,
        target_language: pick(args.to, &config.target_language, &profile.languages),
        tone: pick(args.tone, &config.tone, &profile.tones),
        model: pick(args.model, &config.model, &profile.models),
    };

    let connector = gemini_connector(config, &profile);
    let presenter = Presenter::new(profile, connector);
    let outcome = presenter.submit(&form).await;
    let heading = outcome.heading();

    match outcome.into_result() {
        Ok(result) => {
            println!("{heading}:");
            println!("{}", result.output_text);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_tui(config: &Config, profile: Profile) -> Result<()> {
    let credential = resolve_credential(config);
    let preselection = Preselection {
        model: config.model.clone(),
        target_language: config.target_language.clone(),
        tone: config.tone.clone(),
    };

    let connector = gemini_connector(config, &profile);
    let service = TranslationService::new(Presenter::new(profile.clone(), connector));
    let form = FormState::new(profile, credential, preselection);
    let mut app = TuiApp::new(form, service);

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    result
}

fn print_options(profile: &Profile) {
    println!("Profile: {} ({})", profile.kind, profile.title);
    println!("Models:");
    for model in &profile.models {
        println!("  {model}");
    }
    println!("Languages:");
    for language in &profile.languages {
        println!("  {language}");
    }
    println!("Tones:");
    for tone in &profile.tones {
        println!("  {tone}");
    }
}
