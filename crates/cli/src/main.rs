//! Storehouse CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! storehouse-cli migrate
//!
//! # Create (or promote) an admin account
//! storehouse-cli admin create -e admin@example.com -n "Admin Name" -p 'long password'
//!
//! # Load, list and clean up catalog products
//! storehouse-cli products seed catalog.yaml --replace
//! storehouse-cli products list
//! storehouse-cli products cleanup --keep-host media.example.com --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `STOREHOUSE_DATABASE_URL` or `DATABASE_URL` - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "storehouse-cli")]
#[command(author, version, about = "Storehouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage catalog products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin account, or promote an existing one
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Load products from a YAML file
    Seed {
        /// Path to the catalog file
        file: String,

        /// Delete the existing catalog first
        #[arg(long)]
        replace: bool,
    },
    /// Print every product
    List,
    /// Delete products whose images are not served from the media host
    Cleanup {
        /// Host that serves the images to keep
        #[arg(long)]
        keep_host: String,

        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storehouse_cli=info,storehouse_api=info".into()),
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create(&email, &name, &password).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductAction::Seed { file, replace } => {
                commands::products::seed(&file, replace).await?;
            }
            ProductAction::List => commands::products::list().await?,
            ProductAction::Cleanup { keep_host, dry_run } => {
                commands::products::cleanup(&keep_host, dry_run).await?;
            }
        },
    }
    Ok(())
}
