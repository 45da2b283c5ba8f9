//! gemgate: command-line front end for the governed Gemini client

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gemgate::{AiResponse, Config, GemgateBuilder, ImageInput, Secrets};

/// Gemgate CLI
#[derive(Parser)]
#[command(name = "gemgate")]
#[command(version)]
#[command(about = "Governed Gemini client: cache, rate limit, offline fallback")]
struct Args {
    /// Config file (default: ~/.gemgate/config.toml, then /etc/gemgate/config.toml)
    #[arg(short, long, env = "GEMGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate text from a prompt
    Generate {
        /// Prompt text (or omit to read from stdin)
        prompt: Option<String>,
        /// Attach an image (jpeg, png, webp, gif)
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Model to use (default from config)
        #[arg(short, long)]
        model: Option<String>,
        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,
    },

    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Generate {
            prompt,
            image,
            model,
            temperature,
        } => {
            let prompt = resolve_prompt(prompt)?;
            let mut options = config.generation.options();
            if let Some(model) = model {
                options.model = model;
            }
            if let Some(temperature) = temperature {
                options.temperature = Some(temperature);
            }

            let mut builder = GemgateBuilder::from_config(&config);
            if let Some(key) = Secrets::load()?.api_key() {
                builder = builder.api_key(key);
            }
            let client = builder.build()?;

            let answer = match image {
                Some(path) => {
                    let image = ImageInput::from_path(&path)?;
                    client
                        .generate_text_from_image(&prompt, image, &options)
                        .await
                }
                None => client.generate_text(&prompt, &options).await,
            };

            match answer {
                Ok(AiResponse::Live(live)) => println!("{}", live.response.text),
                Ok(AiResponse::Synthetic(synthetic)) => {
                    eprintln!("(offline: {} template)", synthetic.template.as_str());
                    println!("{}", synthetic.text);
                }
                Err(e) => return Err(e.user_message().into()),
            }
        }

        Command::Config => {
            println!("gemini.base_url: {}", config.gemini.base_url);
            println!("gemini.timeout_secs: {}", config.gemini.timeout_secs);
            println!("generation.model: {}", config.generation.model);
            println!(
                "cache: max_entries={} evict_count={} ttl={}s image_ttl={}s",
                config.cache.max_entries,
                config.cache.evict_count,
                config.cache.ttl_secs,
                config.cache.image_ttl_secs
            );
            println!(
                "rate_limit: {}/min, min interval {}ms",
                config.rate_limit.max_requests_per_minute,
                config.rate_limit.min_request_interval_ms
            );
            println!(
                "breaker: threshold={} cooldown={}s",
                config.breaker.failure_threshold, config.breaker.cooldown_secs
            );
            println!(
                "queue: concurrency={} spacing={}ms",
                config.queue.max_concurrent_requests, config.queue.request_spacing_ms
            );
            let has_key = Secrets::load()?.api_key().is_some();
            println!("api key: {}", if has_key { "configured" } else { "missing" });
        }
    }

    Ok(())
}

/// Resolve the prompt from an optional argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_prompt(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err("generate: no prompt provided (pass text as argument or via stdin)".into())
        }
    }
}
