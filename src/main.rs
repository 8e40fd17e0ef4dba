//! CLI entry point for folio-rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_rs::commands::list::Filter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Render markdown articles into highlighted, interactive HTML", long_about = None)]
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
    /// List posts, newest first
    #[command(alias = "ls")]
    List {
        /// Only posts in this category slug
        #[arg(long, group = "filter")]
        category: Option<String>,

        /// Only posts with this tag slug
        #[arg(long, group = "filter")]
        tag: Option<String>,

        /// Only posts by this author slug
        #[arg(long, group = "filter")]
        author: Option<String>,

        /// Only posts from this month, as `month-year` (e.g. 3-2025)
        #[arg(long, group = "filter")]
        archive: Option<String>,

        /// Only these post ids
        #[arg(long, group = "filter", value_delimiter = ',')]
        featured: Option<Vec<String>>,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Posts per page (defaults to `per_page` from the config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a post's rendered HTML
    Show {
        /// Post id (file name without extension)
        id: String,
    },

    /// List the posts related to a post
    Related {
        /// Post id
        id: String,
    },

    /// Render every post into the public folder
    #[command(alias = "r")]
    Render {
        /// Re-render on file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Regenerate the posts snapshot
    Snapshot,

    /// Print a post with its code blocks enhanced
    Preview {
        /// Post id
        id: String,
    },

    /// Clean the public folder and snapshot
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "folio_rs=debug,info"
    } else {
        "folio_rs=info"
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
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::List {
            category,
            tag,
            author,
            archive,
            featured,
            page,
            limit,
        } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            let filter = if let Some(slug) = category {
                Filter::Category(slug)
            } else if let Some(slug) = tag {
                Filter::Tag(slug)
            } else if let Some(slug) = author {
                Filter::Author(slug)
            } else if let Some(slug) = archive {
                Filter::Archive(slug)
            } else if let Some(ids) = featured {
                Filter::Featured(ids)
            } else {
                Filter::All
            };
            folio_rs::commands::list::run(&folio, &filter, page, limit)?;
        }

        Commands::Show { id } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio_rs::commands::show::run(&folio, &id)?;
        }

        Commands::Related { id } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio_rs::commands::show::related(&folio, &id)?;
        }

        Commands::Render { watch } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            tracing::info!("Rendering posts...");

            let report = folio_rs::commands::render::run(&folio)?;
            println!(
                "Rendered {} posts into {}",
                report.rendered.len(),
                folio.public_dir.join("posts").display()
            );

            if watch {
                folio_rs::commands::render::watch(&folio).await?;
            }
        }

        Commands::Snapshot => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio.snapshot()?;
        }

        Commands::Preview { id } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio_rs::commands::preview::run(&folio, &id)?;
        }

        Commands::Clean => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            folio.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("folio-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
