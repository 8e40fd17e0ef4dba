//! folio-rs: a markdown article publisher
//!
//! Posts are markdown files with YAML front-matter. The content pipeline
//! renders them to highlighted HTML, and the enhancer turns the code blocks
//! of a mounted article into copyable, line-numbered widgets.

pub mod commands;
pub mod config;
pub mod content;
pub mod enhance;
pub mod snapshot;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::{MarkdownPipeline, PostRepository};

/// The main Folio application
#[derive(Debug, Clone)]
pub struct Folio {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Post source directory
    pub posts_dir: PathBuf,
    /// Snapshot output directory
    pub snapshot_dir: PathBuf,
    /// Rendered output directory
    pub public_dir: PathBuf,
}

impl Folio {
    /// Create a new Folio instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let posts_dir = base_dir.join(&config.posts_dir);
        let snapshot_dir = base_dir.join(&config.snapshot_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            posts_dir,
            snapshot_dir,
            public_dir,
        })
    }

    /// Markdown pipeline built from the highlight settings
    pub fn pipeline(&self) -> MarkdownPipeline {
        MarkdownPipeline::new(&self.config.highlight)
    }

    /// Repository over the posts directory, already loaded
    pub fn repository(&self) -> PostRepository {
        let mut repo = PostRepository::new(&self.posts_dir, self.pipeline());
        repo.load();
        repo
    }

    /// Render every post to the public directory
    pub fn render(&self) -> Result<()> {
        commands::render::run(self).map(|_| ())
    }

    /// Rewrite the snapshot artifact
    pub fn snapshot(&self) -> Result<()> {
        commands::snapshot::run(self)
    }

    /// Clean the public directory and snapshot
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
