// src/main.rs
//
// PetHub command-line entry point. Every command prints its JSON envelope.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use pethub::application::commands::*;
use pethub::application::{ApiResponse, AppState, ErrorResponse, ListPetsQuery};
use pethub::config::AppConfig;
use pethub::db::SqliteDocumentStore;

#[derive(Debug, Parser)]
#[command(name = "pethub")]
#[command(about = "PetHub - pet records over a local document store", long_about = None)]
struct Cli {
    /// Database file (overrides PETHUB_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List pets, one page at a time
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, conflicts_with = "page")]
        skip: Option<usize>,
        /// 1-based page number (page size is --limit, default 10)
        #[arg(long)]
        page: Option<usize>,
        /// Cursor token from a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show one pet
    Get { id: String },
    /// Create a pet from a JSON object
    Create { json: String },
    /// Apply a partial JSON object to a pet
    Update { id: String, json: String },
    /// Delete a pet
    Delete { id: String },
    /// Show database size and document counts
    Stats,
}

fn print_result<T: Serialize>(result: Result<T, ErrorResponse>) -> anyhow::Result<bool> {
    let (value, ok) = match result {
        Ok(response) => (serde_json::to_value(response)?, true),
        Err(error) => (serde_json::to_value(error)?, false),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ok)
}

fn parse_json(raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).context("Request body is not valid JSON")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // 1. CONFIGURATION
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.db {
        config.database_path = path;
    }

    // 2. INFRASTRUCTURE
    let store = SqliteDocumentStore::open(&config)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    // 3. APPLICATION STATE
    let store = Arc::new(store);
    let state = AppState::new(store.clone());

    // 4. DISPATCH
    let ok = match cli.command {
        Commands::List {
            limit,
            skip,
            page,
            cursor,
        } => {
            let query = ListPetsQuery {
                limit,
                skip,
                page,
                cursor,
            };
            print_result(list_pets(&state, query).await)?
        }
        Commands::Get { id } => print_result(get_pet(&state, &id).await)?,
        Commands::Create { json } => print_result(create_pet(&state, parse_json(&json)?).await)?,
        Commands::Update { id, json } => {
            print_result(update_pet(&state, &id, parse_json(&json)?).await)?
        }
        Commands::Delete { id } => print_result(delete_pet(&state, &id).await)?,
        Commands::Stats => {
            let stats = store.stats().await?;
            print_result(Ok::<_, ErrorResponse>(ApiResponse::ok(stats)))?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
