//! LLMDebate CLI - three-way AI debate
//!
//! Runs an advocate, a critic and a moderator through an adversarial debate
//! using template speakers or OpenAI-compatible chat models.

use std::env;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use colored::Colorize;
use llmdebate_core::chat::{list_models, missing_models};
use llmdebate_core::{
    Config, DebateEvent, DebateOrchestrator, DebateRequest, ModeratorPolicy, NeutralFollowUp,
    SpeakerRegistry, Stance, default_config,
};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "llmdebate",
    version,
    about = "LLM debate CLI with adversarial turn selection",
    long_about = "Runs a debate between an advocate, a critic and a moderator. Consecutive \
                  opinionated turns always alternate stance. Uses template speakers by default, \
                  or OpenAI-compatible chat models (e.g. Ollama) with --ai."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC", required_unless_present = "list_models")]
    topic: Option<String>,

    /// Number of speaker turns [default: 6]
    #[arg(short, long, value_name = "TURNS")]
    turns: Option<usize>,

    /// RNG seed for reproducible runs
    #[arg(short, long, value_name = "SEED")]
    seed: Option<u64>,

    /// Use chat models instead of template speakers
    #[arg(long)]
    ai: bool,

    /// List the models served by the chat backend and exit
    #[arg(long)]
    list_models: bool,

    /// TOML config file with roles, backend and moderator settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Give the moderator every K-th turn
    #[arg(long, value_name = "K", conflicts_with = "moderator_chance")]
    moderator_every: Option<usize>,

    /// Give the moderator each later turn with probability P
    #[arg(long, value_name = "P")]
    moderator_chance: Option<f64>,

    /// After the moderator, answer the last opinionated speaker
    #[arg(long)]
    oppose_last: bool,

    /// With --ai, fail instead of falling back to template speakers when the
    /// backend is unreachable, a model is missing or a chat call fails
    #[arg(long)]
    no_fallback: bool,

    /// Print the transcript as JSON instead of the live console view
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };

    // Get API configuration from environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .ok();
    let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
    let settings = config.chat_settings(api_base, api_key);

    if cli.list_models {
        match list_models(&settings.api_base, &settings.api_key).await {
            Ok(models) if !models.is_empty() => {
                println!("{}", format!("Models at {}:", settings.api_base).bold());
                for model in models {
                    println!("  - {}", model);
                }
            }
            Ok(_) => println!("No models found at {}.", settings.api_base),
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                eprintln!("Is the chat backend running at {}?", settings.api_base);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let topic = cli.topic.clone().unwrap_or_default();

    let mut policy = config.moderator.scheduling_policy()?;
    if let Some(every) = cli.moderator_every {
        policy.moderator = ModeratorPolicy::Interval { every };
    }
    if let Some(chance) = cli.moderator_chance {
        policy.moderator = ModeratorPolicy::Probability { chance };
    }
    if cli.oppose_last {
        policy.follow_up = NeutralFollowUp::OpposeLast;
    }

    let (registry, backend) = if cli.ai {
        chat_registry_or_templates(&config, &settings, !cli.no_fallback).await?
    } else {
        (config.template_registry()?, Backend::Templates)
    };

    let mut request = DebateRequest::new(&topic, cli.turns.unwrap_or(config.debate.turns));
    if let Some(seed) = cli.seed.or(config.debate.seed) {
        request = request.with_seed(seed);
    }

    if cli.json {
        let mut orchestrator = DebateOrchestrator::new(registry, policy);
        let transcript = orchestrator.run(&request).await?;
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    print_header(&topic, &registry, backend);

    let mut orchestrator =
        DebateOrchestrator::new(registry, policy).with_callback(create_console_callback());
    orchestrator.run(&request).await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  Debate ended.".bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    Ok(())
}

/// Install the global tracing subscriber on stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

/// Which kind of speaker voices the roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Chat,
    Templates,
}

impl Backend {
    fn label(self) -> &'static str {
        match self {
            Backend::Chat => "chat models",
            Backend::Templates => "templates",
        }
    }
}

/// Chat-backed registry. When the backend is down or lacks a configured
/// model this falls back to the template registry if `fallback` is set and
/// fails otherwise.
async fn chat_registry_or_templates(
    config: &Config,
    settings: &llmdebate_core::ChatSettings,
    fallback: bool,
) -> Result<(SpeakerRegistry, Backend), Box<dyn std::error::Error>> {
    let available = match list_models(&settings.api_base, &settings.api_key).await {
        Ok(models) => models,
        Err(e) => {
            warn!(api_base = %settings.api_base, error = %e, "chat backend unreachable");
            if !fallback {
                return Err(format!(
                    "could not reach the chat backend at {}: {}",
                    settings.api_base, e
                )
                .into());
            }
            eprintln!(
                "{}",
                format!(
                    "Warning: could not reach the chat backend at {}. \
                     Falling back to template speakers.",
                    settings.api_base
                )
                .yellow()
            );
            return Ok((config.template_registry()?, Backend::Templates));
        }
    };

    let missing = missing_models(&config.required_models(), &available);
    if !missing.is_empty() {
        eprintln!(
            "{}",
            format!("Warning: missing models {}. You can install them with:", missing.join(", "))
                .yellow()
        );
        for model in &missing {
            eprintln!("  ollama pull {}", model);
        }
        if !fallback {
            return Err(format!("missing models at {}: {}", settings.api_base, missing.join(", "))
                .into());
        }
        eprintln!("{}", "Falling back to template speakers for now.".yellow());
        return Ok((config.template_registry()?, Backend::Templates));
    }

    info!(models = ?config.required_models(), "using chat speakers");
    Ok((config.chat_registry(settings, fallback)?, Backend::Chat))
}

fn print_header(topic: &str, registry: &SpeakerRegistry, backend: Backend) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", "LLMDebate".bold()).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), topic.bright_white());
    println!(
        "{} {}",
        "Speakers:".bold(),
        backend.label().dimmed()
    );
    println!();
    println!("{}", "Participants:".bold());
    for (i, role) in registry.all_roles().iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            role.name.bright_cyan(),
            stance_label(role.stance)
        );
    }
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

fn stance_label(stance: Stance) -> colored::ColoredString {
    match stance {
        Stance::Pro => stance.display_name().green(),
        Stance::Con => stance.display_name().red(),
        Stance::Neutral => stance.display_name().yellow(),
    }
}

/// Create a callback that prints debate events to the console.
fn create_console_callback() -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    Box::new(move |event| match event {
        DebateEvent::DebateStart { turns, .. } => {
            println!("{}", format!("  {} turns", turns).dimmed());
        }
        DebateEvent::SpeakerStart { turn, name, stance } => {
            println!();
            println!("{}", format!("--- Turn {} ---", turn).dimmed());
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                name.bright_cyan().bold(),
                format!("({})", stance_label(stance))
            );
        }
        DebateEvent::SpeakerMessage { content, .. } => {
            let wrapped = textwrap(&content, 76);
            for line in wrapped.lines() {
                println!("  {}", line);
            }
        }
        DebateEvent::DebateEnd => {
            // Handled in main
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line_len + word_len + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word_len;
    }

    result
}
