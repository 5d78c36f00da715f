//! CLI entry point for mdpost

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdpost")]
#[command(version)]
#[command(about = "A markdown blog backend serving front-matter posts from SQLite", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post document
    New {
        /// Title of the new post
        title: String,

        /// Slug to use instead of the slugified title
        #[arg(short, long)]
        slug: Option<String>,

        /// Directory for the new document (defaults to posts/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse documents and store them
    Import {
        /// A document or a directory of documents
        path: PathBuf,
    },

    /// List stored posts
    List,

    /// Start the API server
    #[command(alias = "s")]
    Server {
        /// Port to listen on (overrides mdpost.yml)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (overrides mdpost.yml)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdpost=debug,info"
    } else {
        "mdpost=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            mdpost::commands::init::init_site(&target_dir).await?;
            println!("Initialized mdpost site in {:?}", target_dir);
        }

        Commands::New {
            title,
            slug,
            output,
        } => {
            let site = mdpost::MdPost::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            mdpost::commands::new::create_post(
                &site,
                &title,
                slug.as_deref(),
                output.as_deref(),
            )?;
        }

        Commands::Import { path } => {
            let site = mdpost::MdPost::new(&base_dir)?;
            mdpost::commands::import::run(&site, &path).await?;
        }

        Commands::List => {
            let site = mdpost::MdPost::new(&base_dir)?;
            mdpost::commands::list::run(&site).await?;
        }

        Commands::Server { port, ip } => {
            let site = mdpost::MdPost::new(&base_dir)?;
            let port = port.unwrap_or(site.config.port);
            let ip = ip.unwrap_or_else(|| site.config.ip.clone());

            tracing::info!("Starting server at http://{}:{}", ip, port);
            mdpost::server::start(&site, &ip, port).await?;
        }

        Commands::Version => {
            println!("mdpost version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
