//! Post repository - loads posts from the posts directory

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::markdown::{MarkdownPipeline, PipelineError};
use super::post::{author_slug, label_slug};
use super::{FrontMatter, Post};
use crate::snapshot;

/// Errors raised while loading a post
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Post `{0}` has no parsable date")]
    MissingDate(String),

    #[error(transparent)]
    Transform(#[from] PipelineError),
}

/// One page of posts
#[derive(Debug)]
pub struct Paginated<'a> {
    pub items: &'a [Post],
    pub total: usize,
}

/// Outcome of rendering every post
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Posts with `content_html` populated, in listing order
    pub rendered: Vec<Post>,
    /// Ids of posts whose transformation failed
    pub failed: Vec<String>,
}

/// Reads posts from storage and serves listings and lookups
pub struct PostRepository {
    posts_dir: PathBuf,
    pipeline: MarkdownPipeline,
    posts: Vec<Post>,
}

impl PostRepository {
    /// Create a repository over a posts directory; call [`load`](Self::load) next
    pub fn new<P: AsRef<Path>>(posts_dir: P, pipeline: MarkdownPipeline) -> Self {
        Self {
            posts_dir: posts_dir.as_ref().to_path_buf(),
            pipeline,
            posts: Vec::new(),
        }
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    /// Read every post file, replacing whatever was loaded before
    ///
    /// Files that cannot be read or carry no date are logged and skipped.
    pub fn load(&mut self) -> usize {
        self.posts.clear();

        if !self.posts_dir.exists() {
            tracing::warn!("Posts directory {:?} does not exist", self.posts_dir);
            return 0;
        }

        for entry in WalkDir::new(&self.posts_dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_markdown_file(path) {
                match read_post(path) {
                    Ok(post) => self.posts.push(post),
                    Err(e) => {
                        tracing::warn!("Failed to load post {:?}: {}", path, e);
                    }
                }
            }
        }

        // Newest first; equal dates keep file-name order
        self.posts.sort_by(|a, b| b.date.cmp(&a.date));

        tracing::debug!("Loaded {} posts from {:?}", self.posts.len(), self.posts_dir);
        self.posts.len()
    }

    /// All posts, newest first
    pub fn list_all(&self) -> &[Post] {
        &self.posts
    }

    /// Every post id
    pub fn all_ids(&self) -> Vec<&str> {
        self.posts.iter().map(|p| p.id.as_str()).collect()
    }

    /// Posts with a category whose slug equals `slug`
    pub fn filter_by_category(&self, slug: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.categories.iter().any(|c| label_slug(c) == slug))
            .collect()
    }

    /// Posts with a tag whose slug equals `slug`
    pub fn filter_by_tag(&self, slug: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.tags.iter().any(|t| label_slug(t) == slug))
            .collect()
    }

    /// Posts whose string author normalizes to `slug`
    pub fn filter_by_author(&self, slug: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.author_str().is_some_and(|a| author_slug(a) == slug))
            .collect()
    }

    /// Posts published in a month, `slug` being `month-year` (`3-2025`)
    pub fn filter_by_archive(&self, slug: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.archive_slug() == slug)
            .collect()
    }

    /// Posts whose id is listed, newest first
    pub fn featured(&self, ids: &[&str]) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| ids.contains(&p.id.as_str()))
            .collect()
    }

    /// Page `page` (1-based) of `limit` posts; out-of-range pages are empty
    pub fn paginate(&self, limit: usize, page: usize) -> Paginated<'_> {
        let total = self.posts.len();
        let start = page.saturating_sub(1).saturating_mul(limit);
        let end = page.saturating_mul(limit).min(total);
        let items = if page == 0 || start >= end {
            &self.posts[..0]
        } else {
            &self.posts[start..end]
        };
        Paginated { items, total }
    }

    /// Every other post, ordered by raw category label
    pub fn related(&self, id: &str) -> Vec<&Post> {
        let mut others: Vec<&Post> = self.posts.iter().filter(|p| p.id != id).collect();
        others.sort_by(|a, b| a.category_label().cmp(b.category_label()));
        others
    }

    /// Read a post fresh from disk and render it
    ///
    /// `None` when no file backs `id`; read and transform failures are logged
    /// and also reported as `None`.
    pub fn get_by_id(&self, id: &str) -> Option<Post> {
        let path = self.path_for(id)?;
        let mut post = match read_post(&path) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!("Failed to load post {:?}: {}", path, e);
                return None;
            }
        };
        match self.pipeline.render(&post.content) {
            Ok(html) => {
                post.content_html = Some(html);
                Some(post)
            }
            Err(e) => {
                tracing::error!(post = %id, "Failed to transform post: {}", e);
                None
            }
        }
    }

    /// Render one post's body
    pub fn render(&self, post: &Post) -> Result<Post, PipelineError> {
        let html = self.pipeline.render(&post.content)?;
        let mut rendered = post.clone();
        rendered.content_html = Some(html);
        Ok(rendered)
    }

    /// Render every loaded post in parallel
    ///
    /// `jobs` bounds the worker count (0 = available parallelism). A post that
    /// fails is logged and left out; the rest still render.
    pub fn render_all(&self, jobs: usize) -> BatchReport {
        self.render_batch(jobs, |post| self.render(post))
    }

    /// Run `render` over every post on a pool of `jobs` workers
    fn render_batch<F>(&self, jobs: usize, render: F) -> BatchReport
    where
        F: Fn(&Post) -> Result<Post, PipelineError> + Sync,
    {
        let run = || {
            self.posts
                .par_iter()
                .map(|post| (post, render(post)))
                .collect::<Vec<_>>()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!("Falling back to the global thread pool: {}", e);
                run()
            }
        };

        let mut report = BatchReport::default();
        for (post, result) in results {
            match result {
                Ok(rendered) => report.rendered.push(rendered),
                Err(e) => {
                    tracing::error!(post = %post.id, "Failed to transform post: {}", e);
                    report.failed.push(post.id.clone());
                }
            }
        }
        tracing::info!(
            "Rendered {} posts ({} failed)",
            report.rendered.len(),
            report.failed.len()
        );
        report
    }

    /// Rewrite the snapshot artifact in `dir`
    ///
    /// A write failure is logged and reported as `None`.
    pub fn write_snapshot<P: AsRef<Path>>(&self, dir: P) -> Option<PathBuf> {
        match snapshot::write(dir.as_ref(), &self.posts) {
            Ok(path) => {
                tracing::info!("Wrote snapshot of {} posts to {:?}", self.posts.len(), path);
                Some(path)
            }
            Err(e) => {
                tracing::error!("Failed to write snapshot to {:?}: {}", dir.as_ref(), e);
                None
            }
        }
    }

    /// Backing file for an id, if one exists
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id == ".." {
            return None;
        }
        ["md", "markdown"]
            .iter()
            .map(|ext| self.posts_dir.join(format!("{}.{}", id, ext)))
            .find(|path| path.is_file())
    }
}

/// Read and parse one post file
fn read_post(path: &Path) -> Result<Post, ContentError> {
    let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (fm, body) = FrontMatter::parse(&content);

    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    Post::from_parts(id.clone(), fm, body).ok_or(ContentError::MissingDate(id))
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}
