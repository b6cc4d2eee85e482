use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chatindex::chat::{timestamp, ChatMessage, ChatService};
use chatindex::config::ChatConfig;
use chatindex::registry::UserRegistry;
use chatindex::store::DurableStore;

#[derive(Parser)]
#[command(name = "chatindex", about = "Two-party chat history over a primitive key-value store.")]
struct Cli {
    /// Config file (defaults to .chatindex/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new user
    Register { username: String, password: String },
    /// Check a username/password pair
    Login { username: String, password: String },
    /// Check that a user exists
    VerifyContact { username: String },
    /// Store and index one message
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        message: String,
        /// Seconds since the epoch (defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Messages between two users, newest first
    History {
        user_a: String,
        user_b: String,
        #[arg(long, default_value = "-inf", allow_hyphen_values = true)]
        from: String,
        #[arg(long, default_value = "+inf", allow_hyphen_values = true)]
        to: String,
    },
    /// A user's contacts, most recent first
    Contacts { username: String },
    /// Mark a contact as just interacted with
    Touch { owner: String, contact: String },
    /// Rewrite the store's log to its minimal form
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ChatConfig::load(cli.config.as_deref());
    if let Some(dir) = cli.dir {
        config.data_dir = dir;
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&config.log_filter)?)
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(DurableStore::open(&config.data_dir, config.sync_writes)?);
    info!("chatindex using {}", store.data_dir().display());

    let chat = ChatService::new(store.clone());
    let registry = UserRegistry::new(store.clone());

    let outcome = run(cli.command, &chat, &registry, &store).await;
    chat.close().await?;
    outcome
}

async fn run(
    command: Command,
    chat: &ChatService,
    registry: &UserRegistry,
    store: &DurableStore,
) -> Result<()> {
    match command {
        Command::Register { username, password } => {
            registry.register(&username, &password).await?;
            println!("registered {username}");
        }
        Command::Login { username, password } => {
            registry.authenticate(&username, &password).await?;
            println!("ok");
        }
        Command::VerifyContact { username } => {
            registry.verify_contact(&username).await?;
            println!("ok");
        }
        Command::Send {
            from,
            to,
            message,
            timestamp: ts,
        } => {
            let ts = ts.unwrap_or_else(timestamp::now_secs);
            let message = ChatMessage::new(from, to, message, ts);
            let key = chat.create_chat(&message).await?;
            println!("{}", serde_json::json!({ "key": key, "chat": message }));
        }
        Command::History {
            user_a,
            user_b,
            from,
            to,
        } => {
            let messages = chat.fetch_chat_between(&user_a, &user_b, &from, &to).await?;
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
        Command::Contacts { username } => {
            let contacts = chat.fetch_contact_list(&username).await?;
            println!("{}", serde_json::to_string_pretty(&contacts)?);
        }
        Command::Touch { owner, contact } => {
            chat.update_contact_list(&owner, &contact).await?;
            println!("ok");
        }
        Command::Compact => {
            let size = store.compact().await?;
            println!("log is now {size} bytes");
        }
    }
    Ok(())
}
