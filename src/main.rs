// main.rs - Bot entry point
// Loads botconfig.txt, starts logging, restores the bank and case log from
// the data directory, registers every cog with the standard framework and
// runs until Ctrl+C, a console `quit` or an owner ^shutdown.

mod bank;
mod commands;
mod config;
mod dice;
mod json;
mod modlog;
mod mutes;
mod slots;
mod storage;
mod utils;

use crate::bank::{Bank, BankKey};
use crate::commands::admin::ADMIN_GROUP;
use crate::commands::dice::DICE_GROUP;
use crate::commands::economy::{BANKACCOUNTS_GROUP, ECONOMY_GROUP};
use crate::commands::general::{StopwatchKey, GENERAL_GROUP};
use crate::commands::help::HELP_GROUP;
use crate::commands::image::IMAGE_GROUP;
use crate::commands::league::LEAGUE_GROUP;
use crate::commands::moderation::MODERATION_GROUP;
use crate::commands::modlog::CASELOG_GROUP;
use crate::commands::wiki::WIKI_GROUP;
use crate::commands::youtube::YOUTUBE_GROUP;
use crate::commands::{save_bank_data, save_modlog_data};
use crate::config::{BotConfig, ConfigKey};
use crate::modlog::{ModLog, ModLogKey};
use log::{debug, error, info, warn};
use serenity::{
    async_trait,
    client::{Client, Context, EventHandler},
    framework::standard::StandardFramework,
    model::gateway::Ready,
    prelude::{GatewayIntents, RwLock, TypeMap},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;

// Event handler implementation
struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("[MAIN] Bot connected as {} ({})", ready.user.name, ready.user.id);
        info!("[MAIN] Connected to {} guilds", ready.guilds.len());
    }
}

async fn save_all(data: &RwLock<TypeMap>) {
    save_bank_data(data).await;
    save_modlog_data(data).await;
    info!("[MAIN] Bank and case log saved");
}

async fn print_status(data: &RwLock<TypeMap>) {
    let data = data.read().await;
    println!("🤖 Bot Status: Running");
    if let Some(bank) = data.get::<BankKey>() {
        println!(
            "🏦 Bank: {} mode, {} accounts",
            if bank.is_global() { "global" } else { "per-server" },
            bank.account_count()
        );
    }
    if let Some(config) = data.get::<ConfigKey>() {
        println!("📁 Data directory: {}", config.data_dir.display());
        println!("🔣 JSON backend: {}", json::backend().name);
    }
}

// Console commands read from stdin while the bot runs
async fn handle_command_line(shutdown_tx: mpsc::Sender<String>, data: Arc<RwLock<TypeMap>>) {
    use tokio::io::AsyncWriteExt;
    use tokio::time::{sleep, Duration};

    println!("📝 Command line interface active. Type 'help' for available commands.");

    // Let the connection messages print before the first prompt
    sleep(Duration::from_millis(1500)).await;

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = io::stdout();

    loop {
        if stdout.write_all(b"> ").await.is_err() || stdout.flush().await.is_err() {
            warn!("[CONSOLE] Failed to write prompt, console disabled");
            break;
        }

        let command = match reader.next_line().await {
            Ok(Some(line)) => line.trim().to_lowercase(),
            // EOF reached
            Ok(None) => break,
            Err(e) => {
                error!("[CONSOLE] Error reading command line: {}", e);
                break;
            }
        };

        match command.as_str() {
            "quit" | "q" | "exit" => {
                println!("⏹️  Shutting down bot...");
                if shutdown_tx.send(command).await.is_err() {
                    error!("[CONSOLE] Failed to send shutdown signal");
                }
                break;
            }
            "help" | "h" => {
                println!("🤖 Available commands:");
                println!("  quit, q, exit  - Save data and stop the bot");
                println!("  help, h        - Show this help message");
                println!("  status         - Show bot status");
                println!("  save           - Write the bank and case log to disk now");
            }
            "status" => print_status(&data).await,
            "save" => save_all(&data).await,
            "" => {}
            _ => {
                println!("❓ Unknown command: '{}'. Type 'help' for available commands.", command);
            }
        }
    }
}

/// Load a persisted document, refusing to start over a corrupt file
fn load_document<T>(config: &BotConfig, file: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let path = config.data_dir.join(file);
    match storage::load_or_default(&path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            error!("[MAIN] Could not read {}: {}", path.display(), e);
            error!("[MAIN] Fix or move the file away; refusing to overwrite it");
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let loaded = config::load_bot_config();
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize logger - RUST_LOG still wins over LOG_LEVEL
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let config = match loaded {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("[MAIN] Failed to load botconfig.txt: {}", e);
            eprintln!("Create a botconfig.txt file in the project root with: DISCORD_TOKEN=your_token_here and PREFIX=^");
            return;
        }
    };
    info!("[MAIN] Starting bot with prefix '{}'", config.prefix);

    let preferences: Vec<&str> = config.json_backends.iter().map(String::as_str).collect();
    let backend = json::init(&preferences);
    debug!("[MAIN] JSON backend preferences {:?} -> {}", preferences, backend.name);

    let bank: Bank = match load_document(&config, storage::BANK_FILE) {
        Some(bank) => bank,
        None => return,
    };
    let mut modlog: ModLog = match load_document(&config, storage::MODLOG_FILE) {
        Some(modlog) => modlog,
        None => return,
    };
    modlog.ensure_default_casetypes();
    info!("[MAIN] Bank has {} accounts", bank.account_count());

    let mut owners = HashSet::new();
    if let Some(owner) = config.owner_id {
        owners.insert(owner);
    } else {
        warn!("[MAIN] BOT_OWNER_ID not set, owner commands are disabled");
    }

    let framework = StandardFramework::new()
        .configure(|c| {
            c.prefix(&config.prefix)
                .case_insensitivity(true)
                .no_dm_prefix(true)
                .with_whitespace(true)
                .owners(owners)
        })
        .before(|_ctx, msg, command_name| {
            Box::pin(async move {
                debug!("[MAIN] '{}' invoked by {} ({})", command_name, msg.author.name, msg.author.id);
                true
            })
        })
        .after(|_ctx, msg, command_name, result| {
            Box::pin(async move {
                if let Err(e) = result {
                    error!(
                        "[MAIN] Command '{}' failed for user {} ({}): {:?}",
                        command_name, msg.author.name, msg.author.id, e
                    );
                }
            })
        })
        .unrecognised_command(|_ctx, msg, unrecognised| {
            Box::pin(async move {
                debug!("[MAIN] Unrecognised command '{}' from {}", unrecognised, msg.author.id);
            })
        })
        .group(&GENERAL_GROUP)
        .group(&DICE_GROUP)
        .group(&BANKACCOUNTS_GROUP)
        .group(&ECONOMY_GROUP)
        .group(&MODERATION_GROUP)
        .group(&CASELOG_GROUP)
        .group(&YOUTUBE_GROUP)
        .group(&WIKI_GROUP)
        .group(&IMAGE_GROUP)
        .group(&LEAGUE_GROUP)
        .group(&ADMIN_GROUP)
        .group(&HELP_GROUP);

    // Members intent is needed for bank pruning and member lookups
    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = match Client::builder(&config.token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("[MAIN] Error creating Discord client: {:?}", e);
            eprintln!("Check your token in botconfig.txt file");
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<ConfigKey>(Arc::clone(&config));
        data.insert::<BankKey>(bank);
        data.insert::<ModLogKey>(modlog);
        data.insert::<StopwatchKey>(HashMap::new());
    }

    // Set up command line interface for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<String>(1);
    let cmd_data = Arc::clone(&client.data);
    let cmd_task = tokio::spawn(async move {
        handle_command_line(shutdown_tx, cmd_data).await;
    });

    info!("[MAIN] Bot is running. Use 'quit' to stop gracefully, or press Ctrl+C");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("[MAIN] Received Ctrl+C, stopping bot gracefully...");
        }
        shutdown_signal = shutdown_rx.recv() => {
            if let Some(signal) = shutdown_signal {
                info!("[MAIN] Received '{}' command, stopping bot gracefully...", signal);
            }
        }
        result = client.start() => {
            if let Err(why) = result {
                error!("[MAIN] Client error: {:?}", why);
            }
        }
    }

    save_all(&client.data).await;
    cmd_task.abort();
    client.shard_manager.lock().await.shutdown_all().await;
    info!("[MAIN] Bot stopped");
}
