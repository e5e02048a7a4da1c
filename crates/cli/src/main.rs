//! Bloom Beauty CLI - Database migrations, catalog seeding and order administration.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bloom-cli migrate
//!
//! # Load or refresh the product catalog
//! bloom-cli seed products --file crates/cli/data/products.yaml
//!
//! # Replace the active catalog
//! bloom-cli seed products --file catalog.yaml --clear
//!
//! # List recent orders
//! bloom-cli orders list --status pending
//!
//! # Move an order along its lifecycle
//! bloom-cli orders set-status 42 confirmed
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bloom_core::{OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "bloom-cli")]
#[command(author, version, about = "Bloom Beauty CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Administer orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or refresh products from a YAML catalog
    Products {
        /// Path to the catalog file
        #[arg(short, long)]
        file: PathBuf,

        /// Deactivate every existing product before loading
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List recent orders
    List {
        /// Only orders in this status
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Move an order to a new status
    SetStatus {
        /// Order id
        order_id: OrderId,

        /// Target status (`confirmed`, `processing`, `shipped`, `delivered`, `cancelled`)
        status: OrderStatus,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => {
                commands::seed::products(&file, clear).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::List { status } => commands::orders::list(status).await?,
            OrderAction::SetStatus { order_id, status } => {
                commands::orders::set_status(order_id, status).await?;
            }
        },
    }
    Ok(())
}
