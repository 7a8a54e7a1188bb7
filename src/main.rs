use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chatlog_bot::application::messaging::{Dispatcher, Outcome};
use chatlog_bot::application::services::{read_snapshot, AiBridge, Exporter, MessageService};
use chatlog_bot::domain::traits::{Bot, MessageStore};
use chatlog_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use chatlog_bot::infrastructure::config::Config;
use chatlog_bot::infrastructure::database::SqliteStore;
use chatlog_bot::infrastructure::llm::{self, LLM};
use chatlog_bot::infrastructure::storage::MemoryStore;

type AppResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "chatlog-bot")]
#[command(about = "Silently logs chat messages and answers /ai and /export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot
    Run,
    /// Chat with the bot on stdin (dev mode)
    Console {
        /// Keep messages in memory instead of the database
        #[arg(long)]
        in_memory: bool,
    },
    /// Write the message log to CSV and exit
    Export {
        /// Destination (defaults to storage.export-path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Console { in_memory } => run_console(&cli.config, in_memory),
        Commands::Export { output } => run_export(&cli.config, output),
        Commands::Version => {
            println!("chatlog-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn open_database(config: &Config) -> Result<Arc<SqliteStore>, Box<dyn Error>> {
    let store = SqliteStore::open(&config.storage.database)?;
    store.init().await?;

    let count = store.count().await?;
    tracing::info!("Message log ready: {} messages in {}", count, config.storage.database.display());

    Ok(Arc::new(store))
}

fn build_dispatcher(config: &Config, store: Arc<dyn MessageStore>, llm: Arc<dyn LLM>) -> Dispatcher {
    let ai = AiBridge::from_config(llm, &config.llm);
    let exporter = Exporter::new(Arc::clone(&store), config.storage.export_path.clone());
    Dispatcher::new(config.bot.prefix.clone(), store, ai, exporter)
}

fn run_bot(config_path: &str, token_override: Option<String>) -> AppResult {
    let mut config = Config::resolve(config_path)?;
    if let Some(token) = token_override {
        config.telegram.token = Some(token);
    }

    // Fail fast before touching the network or the database.
    config.validate()?;

    tracing::info!("Starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let store = open_database(&config).await?;
        let llm = llm::from_config(&config.llm)?;

        let mut bot = TelegramAdapter::new(config.telegram.token.clone().unwrap_or_default());
        bot.fetch_bot_info().await?;

        // Register bot commands with Telegram
        if let Err(e) = bot.register_commands().await {
            tracing::warn!("Failed to register commands: {}", e);
        }

        let dispatcher = build_dispatcher(&config, store, llm).with_bot_username(bot.bot_info().username);
        run_telegram_bot(bot, dispatcher, config.telegram.poll_timeout_secs).await
    })
}

async fn run_telegram_bot(bot: TelegramAdapter, dispatcher: Dispatcher, poll_timeout: u64) -> AppResult {
    bot.start().await?;

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let mut service = MessageService::new(Arc::new(bot), Arc::new(dispatcher));
    let mut offset: i64 = 0;

    tracing::info!("Starting message loop...");

    loop {
        let polled = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            updates = service.bot().get_updates(offset, poll_timeout) => Some(updates),
        };

        let Some(updates) = polled else {
            // Started commands still owe their replies.
            tracing::info!("Shutting down, waiting for {} running commands", service.in_flight());
            service.drain().await;
            return Ok(());
        };

        match updates {
            Ok(updates) => {
                if !updates.is_empty() {
                    tracing::debug!("Received {} updates", updates.len());
                }

                offset = TelegramAdapter::get_next_offset(&updates, offset);

                // Plain messages are stored here in batch order; commands run detached.
                for update in &updates {
                    if let Some(event) = update.to_event() {
                        service.deliver(event).await;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Failed to get updates: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        }
    }
}

fn run_console(config_path: &str, in_memory: bool) -> AppResult {
    let config = Config::resolve(config_path)?;
    config.validate_core()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let store: Arc<dyn MessageStore> = if in_memory {
            Arc::new(MemoryStore::new())
        } else {
            open_database(&config).await?
        };
        let llm = llm::from_config(&config.llm)?;
        let dispatcher = Arc::new(build_dispatcher(&config, store, llm));

        let bot = Arc::new(ConsoleAdapter::new());
        bot.start().await?;
        println!("Type a message to log it, {}ai <question> or {}export. Ctrl-D to quit.", config.bot.prefix, config.bot.prefix);

        let mut service = MessageService::new(Arc::clone(&bot), dispatcher);
        let mut lines = bot.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(Outcome::Silent) = service.deliver(bot.event(line)).await {
                tracing::debug!("Stored");
            }
        }

        service.drain().await;

        Ok::<(), Box<dyn Error>>(())
    })
}

fn run_export(config_path: &str, output: Option<PathBuf>) -> AppResult {
    let config = Config::resolve(config_path)?;
    let output = output.unwrap_or_else(|| config.storage.export_path.clone());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let store = open_database(&config).await?;
        let exporter = Exporter::new(store, output);
        let file = exporter.snapshot().await?;

        let parsed = read_snapshot(&file.path)?;
        if parsed.len() != file.rows {
            tracing::warn!("Export has {} rows, expected {}", parsed.len(), file.rows);
        }

        println!("Exported {} messages to {}", file.rows, file.path.display());
        Ok::<(), Box<dyn Error>>(())
    })
}

fn init_config(config_path: &str) -> AppResult {
    let path = Path::new(config_path);
    if path.exists() {
        println!("{} already exists, leaving it untouched.", path.display());
        return Ok(());
    }

    let yaml = Config::default().to_yaml()?;
    std::fs::write(path, yaml)?;
    println!("Wrote {}. Set telegram.token and llm.api-key (or BOT_TOKEN / GEMINI_API_KEY) before running.", path.display());
    Ok(())
}
