//! mission - Mission Control chat from the terminal

mod config;
mod history;
mod utils;

use anyhow::Context;
use clap::Parser;
use history::JsonlHistory;
use mission_ai::providers::google::GoogleProvider;
use mission_core::{ChatEvent, ChatPipeline, Headroom, HistoryStore, SmartCrusher, route};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// mission - talk to the agent fleet
#[derive(Parser, Debug)]
#[command(name = "mission")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Send one message and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Gemini model to use (skips the fallback list)
    #[arg(short, long)]
    model: Option<String>,

    /// History file (JSONL)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Print which persona a message routes to, then exit
    #[arg(long)]
    route: Option<String>,

    /// Compress a JSON or JSONL message file and print the result
    #[arg(long)]
    compress: Option<PathBuf>,

    /// Run SmartCrusher over a text file and print the result
    #[arg(long)]
    crush: Option<PathBuf>,

    /// Character budget for --crush
    #[arg(long, default_value_t = mission_core::crusher::DEFAULT_MAX_CHARS)]
    max_chars: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("mission=debug,mission_core=debug,mission_ai=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Offline tools
    if let Some(text) = args.route {
        println!("{}", route(&text));
        return Ok(());
    }

    let cfg = config::Config::load();

    if let Some(path) = args.compress {
        let messages = utils::read_messages(&path)?;
        let compressed = Headroom::new(cfg.headroom()).compress(&messages);
        println!("{}", serde_json::to_string_pretty(&compressed)?);
        return Ok(());
    }

    if let Some(path) = args.crush {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = SmartCrusher::new(args.max_chars).crush(&raw);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    // Chat needs a key
    let Some(api_key) = cfg.google_api_key() else {
        eprintln!("Error: No Google API key found");
        eprintln!();
        eprintln!("Set your API key with: export GOOGLE_API_KEY=your-key");
        eprintln!("Or add it to config file: mission --init-config");
        std::process::exit(1);
    };

    let models = match args.model {
        Some(model) => vec![model],
        None => cfg.models.clone().unwrap_or_else(|| {
            mission_ai::providers::google::DEFAULT_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect()
        }),
    };
    let mut provider = GoogleProvider::new(api_key).with_models(models);
    if let Some(base_url) = &cfg.base_url {
        provider = provider.with_base_url(base_url.as_str());
    }
    let oracle = Arc::new(provider);

    let history_path = args
        .history
        .or_else(|| cfg.history_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(JsonlHistory::default_path);
    let history = Arc::new(
        JsonlHistory::open(&history_path)
            .with_context(|| format!("Failed to open history {}", history_path.display()))?,
    );

    let pipeline = ChatPipeline::new(cfg.chat_config(), oracle, history.clone());
    let timeout = Duration::from_secs(cfg.timeout_secs());

    if let Some(command) = args.command {
        run_turn(&pipeline, &command, timeout).await;
        return Ok(());
    }

    run_interactive(&pipeline, &history, timeout).await
}

/// Run one turn and print the outcome
async fn run_turn(pipeline: &ChatPipeline, text: &str, timeout: Duration) {
    let mut receiver = pipeline.subscribe();

    // Spawn event handler
    let handle = tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if let ChatEvent::Compressed { stats } = &event {
                if stats.compressed() {
                    println!(
                        "[Headroom: {} -> {} chars, {}% saved]",
                        stats.original_chars, stats.compressed_chars, stats.savings_percent
                    );
                }
            }
            if event.is_terminal() {
                break;
            }
        }
    });

    match tokio::time::timeout(timeout, pipeline.handle(text)).await {
        Ok(Ok(reply)) => {
            let _ = handle.await;
            println!("[{}] {}", reply.persona, reply.reply);
        }
        Ok(Err(mission_core::Error::Ai(mission_ai::Error::AllModelsFailed(log)))) => {
            handle.abort();
            println!("[SYSTEM] ALL MODELS FAILED.\n\nDebug Log:\n{}", log);
        }
        Ok(Err(e)) => {
            handle.abort();
            eprintln!("Error: {}", e);
            println!("{}", failure_notice(&e));
        }
        Err(_) => {
            handle.abort();
            eprintln!("Error: no reply within {}s", timeout.as_secs());
            println!("[SYSTEM] Communication link unstable. Please retry.");
        }
    }
}

/// What to tell the operator when a turn fails
fn failure_notice(error: &mission_core::Error) -> &'static str {
    if error.is_context_overflow() {
        "[SYSTEM] Context too large for every model. Use /clear or lower history_window."
    } else if error.is_retryable() {
        "[SYSTEM] Communication link unstable. Please retry."
    } else {
        "[SYSTEM] Request rejected. Check the model list and API key."
    }
}

async fn run_interactive(
    pipeline: &ChatPipeline,
    history: &JsonlHistory,
    timeout: Duration,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!(
            "mission ({} messages in {})",
            history.len(),
            history.path().display()
        );
        eprintln!("Tag a persona with @boss, @engineer, @analyst, @ab-, @custodian or @deployer.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" => break,
            "/history" => {
                let window = pipeline.config().history_window;
                for message in history.recent(window).await? {
                    println!("{}", utils::format_message(&message));
                }
            }
            "/clear" => {
                history.reset()?;
                println!("Cleared history.");
            }
            cmd if cmd.starts_with('/') => {
                println!("Unknown command: {}", cmd);
                println!("Commands: /history, /clear, /exit");
            }
            text => run_turn(pipeline, text, timeout).await,
        }
    }

    Ok(())
}
