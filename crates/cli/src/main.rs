//! Atelier CLI - operator tools for the item store and console.
//!
//! # Usage
//!
//! ```bash
//! # List every workshop
//! atelier-cli items list workshop
//!
//! # Show one item as JSON
//! atelier-cli items get 3f2a9c
//!
//! # Back up the catalog, then restore it
//! atelier-cli items export --type product --out products.json
//! atelier-cli items import products.json
//!
//! # Delete an item (asks for --yes)
//! atelier-cli items delete 3f2a9c --yes
//!
//! # Check which secrets the store holds
//! atelier-cli secrets get s3_access_key_id s3_secret_access_key
//!
//! # Hash a console password for ADMIN_PASSWORD_HASH (reads stdin)
//! atelier-cli admin hash-password
//! ```
//!
//! # Environment Variables
//!
//! - `ITEM_STORE_URL` - Item store base URL
//! - `ITEM_STORE_API_KEY` - Optional bearer key

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage raw items
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Read secrets held by the item store
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },
    /// Console setup helpers
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List items of one type
    List {
        /// Item type (course, workshop, product, blog, order, ...)
        item_type: String,
    },
    /// Print one item as JSON
    Get {
        /// Item id
        id: String,
    },
    /// Delete one item
    Delete {
        /// Item id
        id: String,

        /// Confirm the delete
        #[arg(long)]
        yes: bool,
    },
    /// Write items as a JSON array
    Export {
        /// Only this type (default: every type)
        #[arg(short = 't', long = "type")]
        item_type: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Save every item from a JSON array produced by `export`
    Import {
        /// Input file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SecretsAction {
    /// Fetch secrets by key
    Get {
        /// Secret keys
        #[arg(required = true)]
        keys: Vec<String>,

        /// Print values instead of masking them
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Print an Argon2 hash of a password read from stdin
    HashPassword,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_cli=info,atelier_core=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Items { action } => {
            let store = commands::store_from_env()?;
            match action {
                ItemsAction::List { item_type } => {
                    commands::items::list(&store, &item_type).await?;
                }
                ItemsAction::Get { id } => commands::items::get(&store, &id).await?,
                ItemsAction::Delete { id, yes } => {
                    commands::items::delete(&store, &id, yes).await?;
                }
                ItemsAction::Export { item_type, out } => {
                    commands::items::export(&store, item_type.as_deref(), out.as_deref()).await?;
                }
                ItemsAction::Import { file } => commands::items::import(&store, &file).await?,
            }
        }
        Commands::Secrets {
            action: SecretsAction::Get { keys, reveal },
        } => {
            let store = commands::store_from_env()?;
            commands::secrets::get(&store, &keys, reveal).await?;
        }
        Commands::Admin {
            action: AdminAction::HashPassword,
        } => commands::admin::hash_password_from_stdin()?,
    }
    Ok(())
}
