//! Chat Conductor CLI - Terminal Client for a Messaging Conversation
//!
//! Opens (or resumes) a conversation with a brand's agents and turns the
//! terminal into a transcript: lines typed on stdin are sent, agent
//! messages and typing indicators are printed as they arrive.
//!
//! # Usage
//!
//! ```bash
//! # Uses ~/.config/chat-conductor/conductor.toml
//! chat-conductor
//!
//! # Override brand and API location
//! chat-conductor --brand 12345678 --base-url https://messaging.example.com
//!
//! # Continue the last conversation of this brand
//! chat-conductor --resume
//!
//! # Verbose logging (logs go to stderr)
//! RUST_LOG=debug chat-conductor
//! ```
//!
//! # Commands
//!
//! - any text: send it
//! - `/typing`: tell the agent you are typing
//! - `/reconnect`: re-attach live updates after they were lost
//! - `/close`: close the conversation and exit
//! - `/quit`: exit, leaving the conversation open for `--resume`
//!
//! `Ctrl-C` closes the conversation before exiting.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use chat_conductor::config::load_config_from_path;
use chat_conductor::{
    last_conversation, load_config, ChatMessage, ChatState, Conductor, ConfigOverrides,
    Conversation, ConversationEvent, FileStore, HttpMessagingApi, MessageDirection,
    PresenceState, SseLiveSource,
};

type CliConductor = Conductor<HttpMessagingApi, SseLiveSource, FileStore>;

/// Chat Conductor - talk to a brand's agents from the terminal
#[derive(Parser, Debug)]
#[command(name = "chat-conductor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CHAT_CONDUCTOR_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Brand (account) id
    #[arg(short = 'b', long, value_name = "ID")]
    brand: Option<String>,

    /// Base URL of the messaging API
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Name shown on the messages you send
    #[arg(short = 'u', long, value_name = "NAME")]
    user_name: Option<String>,

    /// Directory for per-brand conversation state
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Resume the last conversation stored for this brand
    #[arg(short = 'r', long)]
    resume: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHAT_CONDUCTOR_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(brand) = &self.brand {
            overrides = overrides.with_brand_id(brand.clone());
        }
        if let Some(url) = &self.base_url {
            overrides = overrides.with_base_url(url.clone());
        }
        if let Some(name) = &self.user_name {
            overrides = overrides.with_user_name(name.clone());
        }
        if let Some(dir) = &self.state_dir {
            overrides = overrides.with_state_dir(dir.clone());
        }
        overrides
    }
}

/// A line of user input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    Typing,
    Reconnect,
    Close,
    Quit,
    Empty,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "/typing" => Self::Typing,
            "/reconnect" => Self::Reconnect,
            "/close" => Self::Close,
            "/quit" => Self::Quit,
            text => Self::Send(text.to_string()),
        }
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they do not interleave with the transcript.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "chat_conductor={level},chat_conductor_cli={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn format_time(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn print_message(message: &ChatMessage) {
    if message.show_author_label() {
        let who = match message.direction {
            MessageDirection::Sent => format!("{} (you)", message.author_name),
            MessageDirection::Received => message.author_name.clone(),
        };
        println!("{who}:");
    }
    println!("  [{}] {}", format_time(message.timestamp), message.text);
}

/// Print messages appended since `printed`, returning the new count
fn print_new_messages(conversation: &Conversation, printed: usize) -> usize {
    let messages = conversation.messages();
    for message in messages.iter().skip(printed) {
        print_message(message);
    }
    messages.len()
}

fn print_event(conversation: &Conversation, event: &ConversationEvent) {
    match event {
        ConversationEvent::PresenceChanged {
            state: PresenceState::Typing,
        } => println!("  ... agent is typing"),
        ConversationEvent::DeliveryRead { sequences } => {
            for message in conversation.messages() {
                if message.direction == MessageDirection::Sent
                    && message.sequence.is_some_and(|s| sequences.contains(&s))
                {
                    println!("  (read) {}", message.text);
                }
            }
        }
        _ => {}
    }
}

/// Build a Conductor, restoring the last conversation when asked to
async fn connect(args: &Args) -> Result<CliConductor> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        brand_id = %config.brand_id,
        base_url = %config.base_url,
        "Configuration loaded"
    );

    let api = HttpMessagingApi::new(&config.base_url, config.request_timeout)
        .context("Failed to create messaging API client")?;
    let live = SseLiveSource::new(config.live_url(), config.request_timeout)
        .context("Failed to create live event client")?
        .with_capacity(config.live_channel_capacity);
    let state_dir = config
        .state_dir
        .clone()
        .or_else(FileStore::default_dir)
        .context("No state directory available, set store.state_dir")?;
    let store = FileStore::new(state_dir);

    let restored = if args.resume {
        last_conversation(&store, &config.brand_id)
            .await
            .context("Failed to read stored conversation")?
            .filter(Conversation::is_authenticated)
    } else {
        None
    };

    let mut conductor = match restored {
        Some(conversation) => {
            info!(
                conversation_id = ?conversation.conversation_id(),
                messages = conversation.messages().len(),
                "Resuming stored conversation"
            );
            Conductor::with_conversation(api, live, store, config, conversation)
        }
        None => Conductor::new(api, live, store, config),
    };

    if !conductor.conversation().is_authenticated() {
        conductor
            .authenticate()
            .await
            .context("Authentication failed")?;
    }
    if conductor.conversation().is_open() {
        conductor
            .resubscribe()
            .context("Failed to attach live updates")?;
    } else {
        conductor
            .open()
            .await
            .context("Failed to open conversation")?;
    }

    Ok(conductor)
}

/// Close the conversation if it is still open, reporting but not failing
async fn close_quietly(conductor: &mut CliConductor) {
    if !conductor.conversation().is_open() {
        return;
    }
    match conductor.close().await {
        Ok(()) => println!("Conversation closed."),
        Err(e) => warn!(error = %e, "Failed to close conversation"),
    }
}

async fn run(conductor: &mut CliConductor) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = print_new_messages(conductor.conversation(), 0);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed, leaving conversation open");
                    break;
                };
                match Command::parse(&line) {
                    Command::Empty => {}
                    Command::Send(text) => {
                        if let Err(e) = conductor.send(&text).await {
                            eprintln!("Send failed: {e}");
                        }
                    }
                    Command::Typing => {
                        if let Err(e) = conductor.send_presence(ChatState::Composing) {
                            eprintln!("Typing indicator failed: {e}");
                        }
                    }
                    Command::Reconnect => match conductor.resubscribe() {
                        Ok(()) => println!("Live updates re-attached."),
                        Err(e) => eprintln!("Reconnect failed: {e}"),
                    },
                    Command::Close => {
                        close_quietly(conductor).await;
                        break;
                    }
                    Command::Quit => {
                        println!("Leaving the conversation open. Use --resume to continue.");
                        break;
                    }
                }
            }
            events = conductor.recv_live(), if conductor.is_subscribed() => {
                printed = print_new_messages(conductor.conversation(), printed);
                for event in events.unwrap_or_default() {
                    print_event(conductor.conversation(), &event);
                }
                if !conductor.is_subscribed() {
                    println!("Live updates lost. Type /reconnect to re-attach.");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                close_quietly(conductor).await;
                break;
            }
        }

        printed = print_new_messages(conductor.conversation(), printed);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut conductor = connect(&args).await?;
    if let Some(id) = conductor.conversation().conversation_id() {
        println!("Connected to conversation {id}.");
    }
    println!("Type a message, or /typing, /reconnect, /close, /quit.");

    run(&mut conductor).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("  hello there "), Command::Send("hello there".to_string()));
        assert_eq!(Command::parse("/typing"), Command::Typing);
        assert_eq!(Command::parse("/reconnect"), Command::Reconnect);
        assert_eq!(Command::parse("/close"), Command::Close);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Empty);
        // Unknown slash commands are sent as text
        assert_eq!(Command::parse("/shrug"), Command::Send("/shrug".to_string()));
    }

    #[test]
    fn test_args_to_overrides() {
        let args = Args::parse_from([
            "chat-conductor",
            "--brand",
            "b1",
            "--user-name",
            "Ana",
            "--state-dir",
            "/tmp/state",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.brand_id.as_deref(), Some("b1"));
        assert_eq!(overrides.user_name.as_deref(), Some("Ana"));
        assert_eq!(overrides.base_url, None);
        assert_eq!(overrides.state_dir, Some(PathBuf::from("/tmp/state")));
        assert!(!args.resume);
    }

    #[test]
    fn test_format_time_out_of_range() {
        assert_eq!(format_time(u64::MAX), "--:--:--");
        assert_eq!(format_time(0).len(), 8);
    }
}
