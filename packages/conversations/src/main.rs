#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for browsing and auditing stored chat sessions.
//!
//! ```text
//! channel_scope_conversations list [--limit 20]
//! channel_scope_conversations show <id>
//! channel_scope_conversations export <id>
//! channel_scope_conversations delete <id>
//! ```

use std::path::PathBuf;

use channel_scope_conversations::{
    delete_conversation, format_conversation, get_conversation_messages, list_conversations,
    load_messages, open_db, resolve_id, DEFAULT_DB_PATH,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "channel_scope_conversations",
    about = "Browse and audit chat session history"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recent chat sessions
    List {
        /// Maximum number of sessions to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show a chat session in readable format
    Show {
        /// Conversation ID (UUID or prefix)
        id: String,
    },
    /// Export a chat session as JSON
    Export {
        /// Conversation ID (UUID or prefix)
        id: String,
    },
    /// Delete a chat session
    Delete {
        /// Conversation ID
        id: String,
    },
}

/// Resolves the database path from `CONVERSATIONS_DB_PATH`.
fn db_path() -> PathBuf {
    std::env::var("CONVERSATIONS_DB_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let db = open_db(&db_path()).await?;

    match cli.command {
        Commands::List { limit } => {
            let conversations = list_conversations(db.as_ref(), limit, 0).await?;

            if conversations.is_empty() {
                println!("No chat sessions found.");
                return Ok(());
            }

            println!("{:<38} {:<6} {:<22} TITLE", "ID", "MSGS", "UPDATED");
            println!("{}", "-".repeat(100));

            for conv in &conversations {
                let title = conv.title.as_deref().unwrap_or("(no title)");
                // Truncate title for display
                let display_title = if title.len() > 50 {
                    format!("{}...", &title[..47])
                } else {
                    title.to_string()
                };

                // Parse and format the date more compactly
                let date = &conv.updated_at;
                let short_date = if date.len() >= 19 { &date[..19] } else { date };

                println!(
                    "{:<38} {:<6} {:<22} {}",
                    conv.id, conv.message_count, short_date, display_title
                );
            }

            println!("\n{} chat session(s)", conversations.len());
        }
        Commands::Show { id } => {
            let resolved = resolve_id(db.as_ref(), &id).await?;
            let messages = get_conversation_messages(db.as_ref(), &resolved).await?;

            if let Some(msgs) = messages {
                println!("Conversation: {resolved}\n");
                print!("{}", format_conversation(&msgs));
            } else {
                eprintln!("Chat session not found: {id}");
                std::process::exit(1);
            }
        }
        Commands::Export { id } => {
            let resolved = resolve_id(db.as_ref(), &id).await?;
            let messages = load_messages(db.as_ref(), &resolved).await?;

            if let Some(msgs) = messages {
                let json = serde_json::to_string_pretty(&msgs)?;
                println!("{json}");
            } else {
                eprintln!("Chat session not found: {id}");
                std::process::exit(1);
            }
        }
        Commands::Delete { id } => {
            let resolved = resolve_id(db.as_ref(), &id).await?;
            let deleted = delete_conversation(db.as_ref(), &resolved).await?;
            if deleted {
                println!("Deleted chat session: {resolved}");
            } else {
                eprintln!("Chat session not found: {id}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
