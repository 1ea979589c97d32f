//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod history;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::history::{delete_conversation, export_conversation, list_conversations};
use crate::core::config::{ClientSettings, Config, RelaySettings};
use crate::core::export::ExportFormat;
use crate::core::storage::ConversationStore;
use crate::logging::{init_tracing, CHAT_LOG_FILTER, SERVE_LOG_FILTER};
use crate::server;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "mental-coach")]
#[command(version)]
#[command(about = "A supportive mental coach in your terminal")]
#[command(
    long_about = "mental-coach is a terminal chat with a supportive coach. Replies stream in \
from a small relay that forwards your messages to an OpenAI-compatible completion API.\n\n\
Run 'mental-coach serve' to start the relay and 'mental-coach' to chat with it.\n\n\
Environment Variables:\n\
  MENTAL_COACH_API_URL  Relay address for the chat client (default http://localhost:8000)\n\
  OPENAI_API_KEY        API key the relay uses upstream (required by 'serve')\n\
  OPENAI_BASE_URL       Upstream API base URL (optional, defaults to https://api.openai.com/v1)\n\
  RUST_LOG              Log filter, e.g. 'debug' or 'mental_coach=trace'\n\n\
Chat:\n\
  Enter             Send the message\n\
  Ctrl+C            Stop a streaming reply, or quit when idle\n\
  /help             List the slash commands"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the relay the chat client talks to
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Directory holding saved conversations
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file to load instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append diagnostic logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Run the HTTP relay in front of the completion API
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// List saved conversations
    History,
    /// Export a saved conversation
    Export {
        /// Conversation id or unique id prefix
        id: String,
        /// Output format: json, md or txt
        #[arg(short, long, default_value = "md")]
        format: ExportFormat,
        /// Output file or directory
        #[arg(short, long, value_name = "PATH", default_value = ".")]
        output: PathBuf,
    },
    /// Delete a saved conversation
    Delete {
        /// Conversation id or unique id prefix
        id: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let Args {
        command,
        api_url,
        data_dir,
        config,
        log_file,
    } = args;
    let command = command.unwrap_or(Commands::Chat);

    let filter = match command {
        Commands::Serve { .. } => SERVE_LOG_FILTER,
        _ => CHAT_LOG_FILTER,
    };
    init_tracing(filter, log_file.as_deref())?;

    let config = Config::load(config.as_deref())?;
    let env = |key: &str| std::env::var(key).ok();
    let client_settings =
        || ClientSettings::resolve(&config, env, api_url.as_deref(), data_dir.as_deref());

    match command {
        Commands::Chat => run_chat(client_settings()).await,
        Commands::Serve { bind } => {
            let settings = RelaySettings::resolve(&config, env, bind.as_deref());
            if settings.api_key.is_none() {
                eprintln!("⚠️  OPENAI_API_KEY is not set; chat requests will fail until it is.");
            }
            server::serve(settings).await
        }
        Commands::History => {
            let store = ConversationStore::open(client_settings().data_dir);
            print!("{}", list_conversations(&store));
            Ok(())
        }
        Commands::Export { id, format, output } => {
            let store = ConversationStore::open(client_settings().data_dir);
            let path = export_conversation(&store, &id, format, &output)?;
            println!("✅ Exported to {}", path.display());
            Ok(())
        }
        Commands::Delete { id } => {
            let mut store = ConversationStore::open(client_settings().data_dir);
            let deleted = delete_conversation(&mut store, &id)?;
            println!("✅ Deleted conversation {}", deleted.short_id());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
